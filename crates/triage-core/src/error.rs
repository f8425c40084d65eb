//! # Error Hierarchy
//!
//! Structured validation errors for domain primitives, built with
//! `thiserror`. Each variant carries the invalid input or enough context
//! to diagnose the rejection without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// An image reference was empty after trimming.
    #[error("image reference must not be empty")]
    EmptyImageRef,

    /// An image reference exceeded the maximum length.
    #[error("image reference exceeds maximum length: {0} characters")]
    ImageRefTooLong(usize),

    /// A required credential field was empty after trimming.
    #[error("required field \"{0}\" must not be empty")]
    EmptyField(&'static str),
}

/// Check that a required text field is non-empty after trimming,
/// returning the trimmed value.
///
/// Registration forms route every required field through this helper so
/// that `"   "` and `""` are rejected identically.
pub fn require_trimmed(name: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(name));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_trimmed_returns_trimmed_value() {
        assert_eq!(require_trimmed("username", "  alice  ").unwrap(), "alice");
    }

    #[test]
    fn require_trimmed_rejects_blank() {
        assert_eq!(
            require_trimmed("email", "   "),
            Err(ValidationError::EmptyField("email"))
        );
    }

    #[test]
    fn error_messages_name_the_field() {
        let err = ValidationError::EmptyField("fullname");
        assert!(err.to_string().contains("fullname"));
    }
}
