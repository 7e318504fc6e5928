//! Input and configuration validation support

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Trait for validating configuration values
pub trait ValidateConfig: Serialize + for<'de> Deserialize<'de> {
    /// Validate the configuration
    ///
    /// Returns Ok(()) if valid, or an error describing what's wrong
    fn validate(&self) -> CoreResult<()>;
}

/// Common validation helpers
pub mod validators {
    use super::{CoreError, CoreResult};
    use regex::Regex;
    use std::sync::LazyLock;

    static PHONE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[+]?[0-9\s\-()]{10,20}$").expect("phone pattern is valid")
    });

    static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[0-9A-Za-z\s\-]{3,20}$").expect("postal code pattern is valid")
    });

    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field: &str) -> CoreResult<()> {
        if value.trim().is_empty() {
            return Err(CoreError::validation(field, "cannot be empty"));
        }
        Ok(())
    }

    /// Validate a minimum length in characters
    pub fn validate_min_length(value: &str, min: usize, field: &str) -> CoreResult<()> {
        if value.chars().count() < min {
            return Err(CoreError::validation(
                field,
                format!("must be at least {min} characters"),
            ));
        }
        Ok(())
    }

    /// Validate URL format
    pub fn validate_url(url: &str, field: &str) -> CoreResult<()> {
        url::Url::parse(url)
            .map_err(|e| CoreError::validation(field, format!("invalid URL - {e}")))?;
        Ok(())
    }

    /// Validate email format (basic check)
    pub fn validate_email(email: &str, field: &str) -> CoreResult<()> {
        let mut parts = email.trim().split('@');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
        );
        if !valid {
            return Err(CoreError::validation(field, "invalid email format"));
        }
        Ok(())
    }

    /// Validate a phone number: 10-20 digits, spaces, dashes or parentheses, optional leading `+`
    pub fn validate_phone(phone: &str, field: &str) -> CoreResult<()> {
        if !PHONE.is_match(phone) {
            return Err(CoreError::validation(field, "invalid phone number format"));
        }
        Ok(())
    }

    /// Validate a postal code: 3-20 letters, digits, spaces or dashes
    pub fn validate_postal_code(code: &str, field: &str) -> CoreResult<()> {
        if !POSTAL_CODE.is_match(code) {
            return Err(CoreError::validation(field, "invalid postal code format"));
        }
        Ok(())
    }

    /// Validate that a value is within range
    pub fn validate_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> CoreResult<()> {
        if value < min || value > max {
            return Err(CoreError::validation(
                field,
                format!("must be between {min} and {max}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validators::*;

    #[test]
    fn test_email() {
        assert!(validate_email("asha@bloomkart.in", "email").is_ok());
        assert!(validate_email("asha", "email").is_err());
        assert!(validate_email("a@b@c", "email").is_err());
        assert!(validate_email("@bloomkart.in", "email").is_err());
    }

    #[test]
    fn test_phone() {
        assert!(validate_phone("+91 98765 43210", "phoneNumber").is_ok());
        assert!(validate_phone("(022) 1234-5678", "phoneNumber").is_ok());
        assert!(validate_phone("12345", "phoneNumber").is_err());
        assert!(validate_phone("98765abc43", "phoneNumber").is_err());
    }

    #[test]
    fn test_postal_code() {
        assert!(validate_postal_code("560001", "postalCode").is_ok());
        assert!(validate_postal_code("SW1A 1AA", "postalCode").is_ok());
        assert!(validate_postal_code("1", "postalCode").is_err());
    }

    #[test]
    fn test_range_and_lengths() {
        assert!(validate_range(300, 0, 3600, "refresh_threshold_secs").is_ok());
        assert!(validate_range(0, 1, 600, "timeout_secs").is_err());
        assert!(validate_min_length("secret", 6, "password").is_ok());
        assert!(validate_min_length("abc", 6, "password").is_err());
        assert!(validate_not_empty("  ", "name").is_err());
    }
}
