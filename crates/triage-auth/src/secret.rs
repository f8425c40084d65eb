//! # Secret Wrapper
//!
//! A string wrapper for token secrets that zeroizes its memory on drop
//! and redacts itself in `Debug` output, so a stray `{:?}` on a config
//! struct cannot leak key material into logs.

use zeroize::Zeroizing;

/// A secret string, zeroized on drop.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Expose the secret for signing/verification. Callers must not log
    /// or persist the returned slice.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
