//! Input validation for IPC request parameters.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum method name length.
pub const MAX_METHOD_NAME_LEN: usize = 64;

/// Method names are identifiers: a letter followed by letters, digits, or underscores.
static METHOD_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// Validation error types.
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Method name is empty or contains invalid characters
    InvalidMethodName(String),
    /// String field exceeds maximum length
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidMethodName(name) => {
                write!(f, "Invalid method name: {:?}", name)
            }
            ValidationError::StringTooLong { field, len, max } => {
                write!(f, "{} too long: {} chars (max {})", field, len, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a method name.
pub fn validate_method_name(name: &str) -> Result<(), ValidationError> {
    if name.len() > MAX_METHOD_NAME_LEN {
        return Err(ValidationError::StringTooLong {
            field: "method",
            len: name.len(),
            max: MAX_METHOD_NAME_LEN,
        });
    }
    if !METHOD_NAME_PATTERN.is_match(name) {
        return Err(ValidationError::InvalidMethodName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_method_names() {
        assert!(validate_method_name("startVoiceService").is_ok());
        assert!(validate_method_name("stop_voice_service").is_ok());
        assert!(validate_method_name("x1").is_ok());
    }

    #[test]
    fn test_invalid_method_names() {
        assert!(validate_method_name("").is_err());
        assert!(validate_method_name("1start").is_err());
        assert!(validate_method_name("start voice").is_err());
        assert!(validate_method_name("../../etc").is_err());
    }

    #[test]
    fn test_method_name_length_limit() {
        let long = "a".repeat(MAX_METHOD_NAME_LEN + 1);
        assert!(matches!(
            validate_method_name(&long),
            Err(ValidationError::StringTooLong { .. })
        ));
        assert!(validate_method_name(&"a".repeat(MAX_METHOD_NAME_LEN)).is_ok());
    }
}
