//! # Session Tokens
//!
//! HS256 JWT issuance and verification for the two session token kinds:
//!
//! - **Access token** — short-lived, carries the full principal identity
//!   (`{sub, username, email, fullname, role}`), signed with the access
//!   secret. Presented on every authenticated request via cookie.
//! - **Refresh token** — longer-lived, carries only the principal id,
//!   signed with a distinct refresh secret. One active value per
//!   principal, persisted on login (last-write-wins) and cleared on
//!   logout.
//!
//! Issuance and verification are generic over [`PrincipalId`]: the
//! subject's role is taken from the id type, and
//! [`TokenService::verify_access`] rejects a token minted for the other
//! partition before any caller sees its claims.
//!
//! Secrets and expiries are injected through [`TokenConfig`] rather than
//! read from ambient process state, so tests construct fixtures directly.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_core::{PrincipalId, Role};
use uuid::Uuid;

use crate::secret::SecretString;

/// Errors raised by credential machinery.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The token's expiry has passed.
    #[error("token expired")]
    Expired,

    /// The token failed verification: bad signature, malformed payload,
    /// or claims that do not decode.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token is valid but was minted for the other partition.
    #[error("token role {found} does not satisfy {expected}")]
    WrongRole {
        /// The role the verifying partition requires.
        expected: Role,
        /// The role the token was minted for.
        found: Role,
    },

    /// Token encoding failed (should not occur with valid config).
    #[error("failed to encode token: {0}")]
    Encoding(String),

    /// Password hashing or hash parsing failed.
    #[error("password hash error: {0}")]
    PasswordHash(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::InvalidToken(err.to_string()),
        }
    }
}

/// Token service configuration: two distinct secrets, two expiries.
///
/// `Debug` is derived and safe — the secrets redact themselves.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret for signing access tokens.
    pub access_secret: SecretString,
    /// Secret for signing refresh tokens. Must differ from the access
    /// secret so one token kind can never stand in for the other.
    pub refresh_secret: SecretString,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
}

impl TokenConfig {
    /// Load configuration from the environment.
    ///
    /// Variables:
    /// - `ACCESS_TOKEN_SECRET` / `REFRESH_TOKEN_SECRET` — signing keys.
    ///   When unset, an ephemeral random secret is generated and a
    ///   warning logged: sessions will not survive a restart.
    /// - `ACCESS_TOKEN_TTL_SECS` (default 900 — 15 minutes)
    /// - `REFRESH_TOKEN_TTL_SECS` (default 864000 — 10 days)
    pub fn from_env() -> Self {
        Self {
            access_secret: env_secret("ACCESS_TOKEN_SECRET"),
            refresh_secret: env_secret("REFRESH_TOKEN_SECRET"),
            access_ttl_secs: env_ttl("ACCESS_TOKEN_TTL_SECS", 900),
            refresh_ttl_secs: env_ttl("REFRESH_TOKEN_TTL_SECS", 864_000),
        }
    }

    /// Fixed configuration for tests.
    pub fn fixture(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access_secret: SecretString::new(access_secret),
            refresh_secret: SecretString::new(refresh_secret),
            access_ttl_secs: 900,
            refresh_ttl_secs: 864_000,
        }
    }
}

fn env_secret(var: &str) -> SecretString {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => SecretString::new(value),
        _ => {
            tracing::warn!(
                variable = var,
                "secret not configured — generating ephemeral value; \
                 sessions will not be verifiable after restart"
            );
            SecretString::new(generate_secret())
        }
    }
}

fn env_ttl(var: &str, default: i64) -> i64 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Generate a 256-bit random secret, hex-encoded.
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Claims carried by an access token, typed by the principal partition
/// they were minted for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims<I> {
    /// Principal id.
    pub sub: I,
    /// Unique username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub fullname: String,
    /// Principal role as minted — checked against the id type's
    /// partition during verification.
    pub role: Role,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Claims carried by a refresh token: the principal id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Principal id.
    pub sub: Uuid,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// The identity fields a token is minted for. The role comes from the
/// id type, not a field — there is no way to mint a doctor token from a
/// [`triage_core::PatientId`].
#[derive(Debug, Clone)]
pub struct TokenSubject<I: PrincipalId> {
    /// Principal id.
    pub id: I,
    /// Unique username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub fullname: String,
}

/// Issues and verifies the two session token kinds.
#[derive(Debug)]
pub struct TokenService {
    config: TokenConfig,
    validation: Validation,
}

impl TokenService {
    /// Create a token service from explicit configuration.
    pub fn new(config: TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Sessions expire exactly at `exp`; no clock leeway.
        validation.leeway = 0;
        Self { config, validation }
    }

    /// Issue an access token for the given principal.
    pub fn issue_access_token<I: PrincipalId>(
        &self,
        subject: &TokenSubject<I>,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: subject.id,
            username: subject.username.clone(),
            email: subject.email.clone(),
            fullname: subject.fullname.clone(),
            role: I::ROLE,
            iat: now,
            exp: now + self.config.access_ttl_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.access_secret.expose().as_bytes()),
        )
        .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Issue a refresh token carrying only the principal id.
    ///
    /// The wire form is just `{sub}` — no role claim — so the claims
    /// come back as a plain UUID from [`TokenService::verify_refresh`].
    pub fn issue_refresh_token<I: PrincipalId>(&self, id: I) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: id.uuid(),
            iat: now,
            exp: now + self.config.refresh_ttl_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.refresh_secret.expose().as_bytes()),
        )
        .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Verify an access token for the partition named by `I`.
    ///
    /// A token whose signature, shape, or expiry fails is rejected as
    /// usual; a structurally valid token minted for the other role fails
    /// with [`AuthError::WrongRole`], so no caller ever holds claims
    /// from the wrong partition.
    pub fn verify_access<I: PrincipalId>(&self, token: &str) -> Result<AccessClaims<I>, AuthError> {
        let data = decode::<AccessClaims<I>>(
            token,
            &DecodingKey::from_secret(self.config.access_secret.expose().as_bytes()),
            &self.validation,
        )?;
        if data.claims.role != I::ROLE {
            return Err(AuthError::WrongRole {
                expected: I::ROLE,
                found: data.claims.role,
            });
        }
        Ok(data.claims)
    }

    /// Verify a refresh token, returning its claims.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let data = decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.config.refresh_secret.expose().as_bytes()),
            &self.validation,
        )?;
        Ok(data.claims)
    }
}
