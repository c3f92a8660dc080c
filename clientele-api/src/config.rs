//! Service Configuration Module
//!
//! All settings are read once from the environment in `main` and handed to
//! constructors by reference. Every value has a development default.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use clientele_core::ConfigError;

use crate::db::DbConfig;
use crate::telemetry::TelemetryConfig;

// ============================================================================
// ENVIRONMENT LOOKUP
// ============================================================================

/// Typed access to a key/value source such as the process environment.
pub(crate) struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> Env<'a> {
    pub(crate) fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self { lookup }
    }

    /// Non-blank value for `key`.
    pub(crate) fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub(crate) fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    pub(crate) fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(default)
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP surface settings: CORS.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
        }
    }
}

impl ApiConfig {
    /// Environment variables:
    /// - `CLIENTELE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `CLIENTELE_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `CLIENTELE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    pub(crate) fn from_source(env: &Env<'_>) -> Result<Self, ConfigError> {
        let cors_origins = env
            .get("CLIENTELE_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            cors_origins,
            cors_allow_credentials: env.flag("CLIENTELE_CORS_ALLOW_CREDENTIALS", false),
            cors_max_age_secs: env.parse("CLIENTELE_CORS_MAX_AGE_SECS", 86400)?,
        })
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

// ============================================================================
// SIDECAR CONFIGURATION
// ============================================================================

/// Where the Dapr sidecar lives and which components to address.
#[derive(Debug, Clone, PartialEq)]
pub struct SidecarConfig {
    /// Sidecar HTTP base URL, e.g. `http://localhost:3500`.
    pub base_url: String,
    /// State store component name.
    pub state_store: String,
    /// Pub/sub component name.
    pub pubsub: String,
    /// Per-call timeout for sidecar requests.
    pub timeout: Duration,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3500".to_string(),
            state_store: "statestore".to_string(),
            pubsub: "pubsub".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl SidecarConfig {
    pub(crate) fn from_source(env: &Env<'_>) -> Result<Self, ConfigError> {
        let port: u16 = env.parse("DAPR_HTTP_PORT", 3500)?;
        let base_url = env
            .get("DAPR_HTTP_ENDPOINT")
            .unwrap_or_else(|| format!("http://localhost:{}", port));
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            state_store: env.string("STATE_STORE_NAME", "statestore"),
            pubsub: env.string("PUBSUB_NAME", "pubsub"),
            timeout: Duration::from_secs(env.parse("SIDECAR_TIMEOUT_SECS", 5)?),
        })
    }
}

// ============================================================================
// STARTUP CONFIGURATION
// ============================================================================

/// Bounded retry while waiting for the record store at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupConfig {
    pub max_retries: u32,
    pub retry_interval: Duration,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_interval: Duration::from_secs(5),
        }
    }
}

impl StartupConfig {
    pub(crate) fn from_source(env: &Env<'_>) -> Result<Self, ConfigError> {
        let max_retries: u32 = env.parse("DB_MAX_RETRIES", 5)?;
        if max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DB_MAX_RETRIES".to_string(),
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        Ok(Self {
            max_retries,
            retry_interval: Duration::from_secs(env.parse("DB_RETRY_INTERVAL_SECS", 5)?),
        })
    }
}

// ============================================================================
// APPLICATION CONFIGURATION
// ============================================================================

/// Route prefix used when `API_V1_STR` is unset.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_name: String,
    pub version: String,
    /// Prefix every customer route is mounted under, e.g. `/api/v1`.
    pub api_prefix: String,
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub sidecar: SidecarConfig,
    pub startup: StartupConfig,
    pub api: ApiConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env::new(&lookup);

        let api_prefix = env.string("API_V1_STR", DEFAULT_API_PREFIX);
        if !api_prefix.starts_with('/') || api_prefix.len() < 2 || api_prefix.ends_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "API_V1_STR".to_string(),
                value: api_prefix,
                reason: "must start with '/' and must not end with '/'".to_string(),
            });
        }

        Ok(Self {
            project_name: env.string("PROJECT_NAME", "Customer Management Service"),
            version: env.string("VERSION", env!("CARGO_PKG_VERSION")),
            api_prefix,
            bind_addr: resolve_bind_addr(&env)?,
            db: DbConfig::from_source(&env)?,
            sidecar: SidecarConfig::from_source(&env)?,
            startup: StartupConfig::from_source(&env)?,
            api: ApiConfig::from_source(&env)?,
            telemetry: TelemetryConfig::from_source(&env)?,
        })
    }
}

fn resolve_bind_addr(env: &Env<'_>) -> Result<SocketAddr, ConfigError> {
    let host = env.string("CLIENTELE_API_BIND", "0.0.0.0");
    let port: u16 = env.parse("PORT", 8000)?;
    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidValue {
            field: "CLIENTELE_API_BIND".to_string(),
            value: addr.clone(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() -> Result<(), ConfigError> {
        let config = load(&[])?;
        assert_eq!(config.project_name, "Customer Management Service");
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.sidecar, SidecarConfig::default());
        assert_eq!(config.startup, StartupConfig::default());
        assert!(!config.api.is_production());
        assert_eq!(config.db.port, 5432);
        Ok(())
    }

    #[test]
    fn test_sidecar_port_builds_base_url() -> Result<(), ConfigError> {
        let config = load(&[("DAPR_HTTP_PORT", "3601"), ("PUBSUB_NAME", "events")])?;
        assert_eq!(config.sidecar.base_url, "http://localhost:3601");
        assert_eq!(config.sidecar.pubsub, "events");
        Ok(())
    }

    #[test]
    fn test_explicit_sidecar_endpoint_wins() -> Result<(), ConfigError> {
        let config = load(&[
            ("DAPR_HTTP_PORT", "3601"),
            ("DAPR_HTTP_ENDPOINT", "http://dapr.local:3500/"),
        ])?;
        assert_eq!(config.sidecar.base_url, "http://dapr.local:3500");
        Ok(())
    }

    #[test]
    fn test_invalid_port_is_reported() {
        let err = load(&[("POSTGRES_PORT", "not-a-port")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "POSTGRES_PORT"
        ));
    }

    #[test]
    fn test_zero_retries_rejected() {
        assert!(load(&[("DB_MAX_RETRIES", "0")]).is_err());
    }

    #[test]
    fn test_api_prefix_shape() {
        assert!(load(&[("API_V1_STR", "api/v1")]).is_err());
        assert!(load(&[("API_V1_STR", "/api/v1/")]).is_err());
        assert!(load(&[("API_V1_STR", "/v2")]).is_ok());
    }

    #[test]
    fn test_cors_origins_parsed() -> Result<(), ConfigError> {
        let config = load(&[(
            "CLIENTELE_CORS_ORIGINS",
            "https://a.example, https://b.example,,",
        )])?;
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(config.api.is_production());
        Ok(())
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() -> Result<(), ConfigError> {
        let config = load(&[("POSTGRES_HOST", "  "), ("PORT", "")])?;
        assert_eq!(config.db.host, "localhost");
        assert_eq!(config.bind_addr.port(), 8000);
        Ok(())
    }
}
