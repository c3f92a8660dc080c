//! Field validation for customer payloads.
//!
//! Validation runs at the HTTP boundary, before the record store is touched.

use crate::error::ValidationError;
use crate::CustomerFields;
use once_cell::sync::Lazy;
use regex::Regex;

/// `local@domain.tld`: no whitespace, a single `@`, at least one dot after it.
static EMAIL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").ok());

/// Trait for validating non-empty strings.
///
/// # Example
/// ```
/// use clientele_core::validation::ValidateNonEmpty;
///
/// assert!("Ada".validate_non_empty("first_name").is_ok());
/// assert!("   ".validate_non_empty("first_name").is_err());
/// ```
pub trait ValidateNonEmpty {
    /// Validate that the value is non-empty.
    ///
    /// # Errors
    /// Returns `ValidationError::RequiredFieldMissing` if the value is empty or
    /// whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        if self.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: field_name.to_string(),
            });
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        self.as_str().validate_non_empty(field_name)
    }
}

/// Check that `email` is a syntactically valid address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    email.validate_non_empty("email")?;
    let valid = EMAIL_PATTERN
        .as_ref()
        .map(|pattern| pattern.is_match(email))
        .unwrap_or(false);
    if !valid {
        return Err(ValidationError::InvalidValue {
            field: "email".to_string(),
            reason: "value is not a valid email address".to_string(),
        });
    }
    Ok(())
}

/// Payloads that can be checked before they reach the record store.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for CustomerFields {
    fn validate(&self) -> Result<(), ValidationError> {
        self.first_name.validate_non_empty("first_name")?;
        self.last_name.validate_non_empty("last_name")?;
        validate_email(&self.email)?;
        if let Some(phone) = &self.phone {
            phone.validate_non_empty("phone")?;
        }
        Ok(())
    }
}
