//! # Image References
//!
//! A validated reference to an uploaded image held by the external object
//! store. The reference is required on every issue and immutable after
//! creation; validating at construction means no downstream code has to
//! handle an empty reference.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum accepted length for an image reference.
const MAX_IMAGE_REF_LEN: usize = 2048;

/// A validated, stable reference to an image in the object store.
///
/// Serializes/deserializes as a plain string. Validated on construction
/// via [`ImageRef::new`] to ensure it is non-empty after trimming and
/// within length limits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Create a validated image reference.
    ///
    /// Returns an error if the string is empty after trimming or exceeds
    /// 2048 characters.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyImageRef);
        }
        if trimmed.len() > MAX_IMAGE_REF_LEN {
            return Err(ValidationError::ImageRefTooLong(trimmed.len()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for ImageRef {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_reference() {
        let r = ImageRef::new("blobs/2026/rash-01.jpg").unwrap();
        assert_eq!(r, "blobs/2026/rash-01.jpg");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let r = ImageRef::new("  img1  ").unwrap();
        assert_eq!(r.as_str(), "img1");
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            ImageRef::new(""),
            Err(ValidationError::EmptyImageRef)
        ));
        assert!(matches!(
            ImageRef::new("   "),
            Err(ValidationError::EmptyImageRef)
        ));
    }

    #[test]
    fn rejects_overlong() {
        let long = "x".repeat(MAX_IMAGE_REF_LEN + 1);
        assert!(matches!(
            ImageRef::new(long),
            Err(ValidationError::ImageRefTooLong(_))
        ));
    }

    #[test]
    fn serializes_transparently() {
        let r = ImageRef::new("img1").unwrap();
        assert_eq!(serde_json::to_string(&r).unwrap(), "\"img1\"");
    }
}
