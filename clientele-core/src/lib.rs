//! Clientele Core - Entity Types
//!
//! The customer entity, cache key naming, field validation and the error
//! taxonomy shared by every other crate in the workspace. No I/O lives here.

pub mod entities;
pub mod error;
pub mod validation;

pub use entities::{
    customer_key, Customer, CustomerFields, CustomerId, Timestamp,
    CUSTOMER_KEY_PREFIX,
};
pub use error::{
    ClienteleError, ClienteleResult, ConfigError, SidecarError, SidecarResult, StorageError,
    ValidationError,
};
pub use validation::{validate_email, Validate, ValidateNonEmpty};

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_customer_key_embeds_id(id in 1i64..i64::MAX) {
            let key = customer_key(id);
            prop_assert!(key.starts_with(CUSTOMER_KEY_PREFIX));
            prop_assert_eq!(&key[CUSTOMER_KEY_PREFIX.len()..], id.to_string());
        }

        #[test]
        fn prop_generated_emails_validate(
            local in "[a-z][a-z0-9._]{0,15}",
            domain in "[a-z][a-z0-9-]{0,10}",
            tld in "[a-z]{2,6}",
        ) {
            let email = format!("{}@{}.{}", local, domain, tld);
            prop_assert!(validate_email(&email).is_ok());
        }

        #[test]
        fn prop_whitespace_names_rejected(name in "[ \t]{0,5}") {
            let fields = CustomerFields::new(name, "B", "a@b.com");
            prop_assert!(fields.validate().is_err());
        }
    }
}
