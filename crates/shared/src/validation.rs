//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of a bot configuration or playlist name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of a KYC rejection reason.
pub const MAX_REASON_LENGTH: usize = 500;

/// Validates that a string contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a settings or page key: lowercase letters, digits and underscores.
pub fn validate_setting_key(key: &str) -> Result<(), ValidationError> {
    let valid = !key.is_empty()
        && key.len() <= 100
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("setting_key");
        err.message =
            Some("Key must be 1-100 lowercase letters, digits or underscores".into());
        Err(err)
    }
}

/// Validates that a points or amount value is not negative.
pub fn validate_non_negative(value: f64) -> Result<(), ValidationError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Value must be zero or positive".into());
        Err(err)
    }
}

/// Normalizes an optional free-text reason: trims it and maps blank to `None`.
pub fn normalize_reason(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| r.chars().take(MAX_REASON_LENGTH).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Morning bot").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   \t").is_err());
    }

    #[test]
    fn test_validate_not_blank_error_message() {
        let err = validate_not_blank(" ").unwrap_err();
        assert_eq!(err.message.unwrap().to_string(), "Value must not be blank");
    }

    #[test]
    fn test_validate_setting_key() {
        assert!(validate_setting_key("points_per_minute").is_ok());
        assert!(validate_setting_key("page_about_2").is_ok());
        assert!(validate_setting_key("").is_err());
        assert!(validate_setting_key("Points").is_err());
        assert!(validate_setting_key("drop table;").is_err());
        assert!(validate_setting_key(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative(0.0).is_ok());
        assert!(validate_non_negative(12.5).is_ok());
        assert!(validate_non_negative(-0.01).is_err());
        assert!(validate_non_negative(f64::NAN).is_err());
    }

    #[test]
    fn test_normalize_reason() {
        assert_eq!(normalize_reason(None), None);
        assert_eq!(normalize_reason(Some("  ")), None);
        assert_eq!(
            normalize_reason(Some("  Blurry scan ")).as_deref(),
            Some("Blurry scan")
        );
        let long = "x".repeat(MAX_REASON_LENGTH + 20);
        assert_eq!(
            normalize_reason(Some(&long)).unwrap().len(),
            MAX_REASON_LENGTH
        );
    }
}
