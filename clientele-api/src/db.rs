//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres and the
//! [`PgRecordStore`] implementation of [`RecordStore`] over the `customers`
//! table. Every mutation runs in an explicit transaction on one pooled
//! connection; the connection goes back to the pool when the `Object` drops.

use async_trait::async_trait;
use clientele_core::{
    ClienteleError, ClienteleResult, ConfigError, Customer, CustomerFields, CustomerId,
    StorageError,
};
use clientele_storage::RecordStore;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::config::Env;
use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Timeout for waiting on / creating a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "customers".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        Self::from_source(&Env::new(&lookup))
    }

    pub(crate) fn from_source(env: &Env<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: env.string("POSTGRES_HOST", &defaults.host),
            port: env.parse("POSTGRES_PORT", defaults.port)?,
            dbname: env.string("POSTGRES_DB", &defaults.dbname),
            user: env.string("POSTGRES_USER", &defaults.user),
            password: env.get("POSTGRES_PASSWORD").unwrap_or_default(),
            max_size: env.parse("DB_POOL_SIZE", defaults.max_size)?,
            timeout: Duration::from_secs(env.parse("DB_TIMEOUT_SECS", 30)?),
        })
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened until the first checkout.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// DDL for the customers table. Idempotent.
pub const CUSTOMERS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS customers (
    id          BIGSERIAL PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,
    phone       TEXT,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ
)";

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, email, phone, created_at, updated_at";

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn query_error(operation: &str, err: tokio_postgres::Error) -> ClienteleError {
    if let Some(state) = err.code() {
        if *state == SqlState::UNIQUE_VIOLATION
            || *state == SqlState::CHECK_VIOLATION
            || *state == SqlState::NOT_NULL_VIOLATION
        {
            let reason = err
                .as_db_error()
                .map(|db| db.message().to_string())
                .unwrap_or_else(|| err.to_string());
            return StorageError::Conflict { reason }.into();
        }
    }
    tracing::error!(operation, error = ?err, "Database query failed");
    if err.is_closed() {
        return StorageError::Unavailable {
            reason: format!("{}: connection closed", operation),
        }
        .into();
    }
    StorageError::QueryFailed {
        reason: format!("{} failed", operation),
    }
    .into()
}

fn commit_error(operation: &str, err: tokio_postgres::Error) -> ClienteleError {
    tracing::error!(operation, error = ?err, "Transaction commit failed");
    StorageError::TransactionFailed {
        reason: format!("{} commit failed", operation),
    }
    .into()
}

fn pool_error(err: PoolError) -> ClienteleError {
    tracing::error!("Connection pool error: {:?}", err);
    StorageError::Unavailable {
        reason: match err {
            PoolError::Timeout(_) => "connection pool exhausted".to_string(),
            PoolError::Closed => "connection pool is closed".to_string(),
            other => format!("failed to acquire connection: {}", other),
        },
    }
    .into()
}

fn customer_from_row(row: &Row) -> ClienteleResult<Customer> {
    let decode = |e: tokio_postgres::Error| -> ClienteleError {
        StorageError::QueryFailed {
            reason: format!("failed to decode customer row: {}", e),
        }
        .into()
    };
    Ok(Customer {
        id: row.try_get("id").map_err(decode)?,
        first_name: row.try_get("first_name").map_err(decode)?,
        last_name: row.try_get("last_name").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

// ============================================================================
// POSTGRES RECORD STORE
// ============================================================================

/// [`RecordStore`] over a deadpool-postgres pool.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: Pool,
}

impl PgRecordStore {
    /// Create a new record store with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new record store from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> ClienteleResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Create the customers table if it does not exist.
    pub async fn ensure_schema(&self) -> ClienteleResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(CUSTOMERS_SCHEMA)
            .await
            .map_err(|e| query_error("ensure_schema", e))?;
        tracing::info!("Customers schema ensured");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, fields: &CustomerFields) -> ClienteleResult<Customer> {
        let mut conn = self.get_conn().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| query_error("insert", e))?;

        let sql = format!(
            "INSERT INTO customers (first_name, last_name, email, phone) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            CUSTOMER_COLUMNS
        );
        let row = tx
            .query_one(
                sql.as_str(),
                &[&fields.first_name, &fields.last_name, &fields.email, &fields.phone],
            )
            .await
            .map_err(|e| query_error("insert", e))?;
        let customer = customer_from_row(&row)?;

        tx.commit().await.map_err(|e| commit_error("insert", e))?;
        Ok(customer)
    }

    async fn get_by_id(&self, id: CustomerId) -> ClienteleResult<Option<Customer>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS);
        let row = conn
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(|e| query_error("get_by_id", e))?;
        row.as_ref().map(customer_from_row).transpose()
    }

    async fn list(&self, offset: i64, limit: i64) -> ClienteleResult<Vec<Customer>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM customers ORDER BY id ASC OFFSET $1 LIMIT $2",
            CUSTOMER_COLUMNS
        );
        let rows = conn
            .query(sql.as_str(), &[&offset, &limit])
            .await
            .map_err(|e| query_error("list", e))?;
        rows.iter().map(customer_from_row).collect()
    }

    async fn update(&self, id: CustomerId, fields: &CustomerFields) -> ClienteleResult<Customer> {
        let mut conn = self.get_conn().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| query_error("update", e))?;

        let sql = format!(
            "UPDATE customers \
             SET first_name = $2, last_name = $3, email = $4, phone = $5, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            CUSTOMER_COLUMNS
        );
        let row = tx
            .query_opt(
                sql.as_str(),
                &[
                    &id,
                    &fields.first_name,
                    &fields.last_name,
                    &fields.email,
                    &fields.phone,
                ],
            )
            .await
            .map_err(|e| query_error("update", e))?;

        // Dropping the transaction rolls it back.
        let Some(row) = row else {
            return Err(StorageError::NotFound { id }.into());
        };
        let customer = customer_from_row(&row)?;

        tx.commit().await.map_err(|e| commit_error("update", e))?;
        Ok(customer)
    }

    async fn delete_by_id(&self, id: CustomerId) -> ClienteleResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| query_error("delete", e))?;

        let deleted = tx
            .execute("DELETE FROM customers WHERE id = $1", &[&id])
            .await
            .map_err(|e| query_error("delete", e))?;
        if deleted == 0 {
            return Err(StorageError::NotFound { id }.into());
        }

        tx.commit().await.map_err(|e| commit_error("delete", e))?;
        Ok(())
    }

    async fn ping(&self) -> ClienteleResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(|e| query_error("ping", e))?;
        Ok(())
    }
}
