#![deny(missing_docs)]

//! # triage-auth — Credential Machinery
//!
//! Password hashing and session-token issuance for the Triage clinical
//! backend.
//!
//! - [`password`] — Argon2id hashing and verification (PHC strings).
//! - [`token`] — HS256 JWT access/refresh tokens. The two token kinds are
//!   signed with distinct secrets and carry distinct claim sets; secrets
//!   and expiries arrive via [`TokenConfig`], injected at construction so
//!   tests can supply fixtures instead of reading ambient process state.
//! - [`secret`] — zeroize-on-drop secret wrapper with a redacting `Debug`.

pub mod password;
pub mod secret;
pub mod token;

pub use password::{hash_password, verify_password};
pub use secret::SecretString;
pub use token::{AccessClaims, AuthError, RefreshClaims, TokenConfig, TokenService, TokenSubject};
