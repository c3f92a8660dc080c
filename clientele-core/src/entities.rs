//! Customer entity and its write payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned customer identifier.
pub type CustomerId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Prefix of every customer entry in the side cache.
pub const CUSTOMER_KEY_PREFIX: &str = "customer-";

/// Cache key for a customer id, e.g. `customer-42`.
pub fn customer_key(id: CustomerId) -> String {
    format!("{}{}", CUSTOMER_KEY_PREFIX, id)
}

/// A customer row as committed to the record store.
///
/// The record store is authoritative; a cached `Customer` is a projection
/// of the row at the time it was written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    /// Null until the first successful update.
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub updated_at: Option<Timestamp>,
}

impl Customer {
    /// Mutable fields of this customer.
    pub fn fields(&self) -> CustomerFields {
        CustomerFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    /// Replace every mutable field and stamp `updated_at`.
    pub fn apply(&mut self, fields: &CustomerFields, now: Timestamp) {
        self.first_name = fields.first_name.clone();
        self.last_name = fields.last_name.clone();
        self.email = fields.email.clone();
        self.phone = fields.phone.clone();
        self.updated_at = Some(now);
    }

    /// Full name, first then last.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Body of a create request and of a full-replace update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CustomerFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl CustomerFields {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}
