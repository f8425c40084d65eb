//! # Credential Lifecycle Flows
//!
//! Register / login / logout / current-principal, shared by the doctor
//! and patient route modules. Every flow is generic over
//! [`PrincipalId`], so each call site is pinned to one partition's
//! store at compile time — there is no way to log a doctor in against
//! the patient store.

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use triage_auth::{hash_password, verify_password, TokenService};
use triage_core::error::require_trimmed;
use triage_core::PrincipalId;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::extractors::FormRules;
use crate::state::{CredentialStore, PrincipalProfile, PrincipalRecord};

/// Registration form. All fields are required and must be non-empty
/// after trimming.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Unique username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub fullname: String,
    /// Plaintext password; hashed before it is stored.
    pub password: String,
}

impl FormRules for RegisterRequest {
    fn check(&self) -> Result<(), String> {
        let fields = [
            &self.username,
            &self.email,
            &self.fullname,
            &self.password,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err("All fields are required".to_string());
        }
        Ok(())
    }
}

/// Login form: identify by email or username, plus password.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username, if identifying by username.
    #[serde(default)]
    pub username: Option<String>,
    /// Email, if identifying by email.
    #[serde(default)]
    pub email: Option<String>,
    /// Plaintext password.
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    /// The identifier the caller supplied, username taking precedence.
    fn identifier(&self) -> Option<&str> {
        [self.username.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|s| !s.is_empty())
    }
}

impl FormRules for LoginRequest {
    fn check(&self) -> Result<(), String> {
        if self.identifier().is_none() {
            return Err("Email or username is required".to_string());
        }
        if self.password().is_none() {
            return Err("Password is required".to_string());
        }
        Ok(())
    }
}

/// Register a new principal in `store`'s partition.
pub async fn register<I: PrincipalId>(
    store: &CredentialStore<I>,
    pool: Option<&PgPool>,
    req: RegisterRequest,
) -> Result<PrincipalProfile, AppError> {
    let now = Utc::now();
    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let record = PrincipalRecord {
        id: I::from_uuid(Uuid::new_v4()),
        username: require_trimmed("username", &req.username)?.to_lowercase(),
        email: require_trimmed("email", &req.email)?.to_lowercase(),
        fullname: require_trimmed("fullname", &req.fullname)?,
        password_hash,
        refresh_token: None,
        created_at: now,
        updated_at: now,
    };

    store.insert_unique(record.clone()).map_err(|_| {
        AppError::Conflict("User already exists with this email or username".to_string())
    })?;

    if let Some(pool) = pool {
        if let Err(e) = db::principals::insert(pool, &record).await {
            tracing::error!(role = %I::ROLE, id = %record.id, error = %e, "failed to persist registration");
        }
    }

    tracing::info!(role = %I::ROLE, id = %record.id, username = %record.username, "principal registered");
    Ok(record.profile())
}

/// Authenticate a principal and mint both session tokens.
///
/// The new refresh token is persisted on the record — last-write-wins,
/// implicitly invalidating any previously issued refresh token.
pub async fn login<I: PrincipalId>(
    store: &CredentialStore<I>,
    tokens: &TokenService,
    pool: Option<&PgPool>,
    req: LoginRequest,
) -> Result<(PrincipalProfile, String, String), AppError> {
    let identifier = req
        .identifier()
        .ok_or_else(|| AppError::BadRequest("Email or username is required".to_string()))?;
    let password = req
        .password()
        .ok_or_else(|| AppError::BadRequest("Password is required".to_string()))?
        .to_string();

    let record = store
        .find_by_identifier(identifier)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let stored_hash = record.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    if !matches {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    let access = tokens.issue_access_token(&record.token_subject())?;
    let refresh = tokens.issue_refresh_token(record.id)?;

    let now = Utc::now();
    let updated = store
        .set_refresh_token(&record.id, Some(refresh.clone()), now)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    persist_refresh(pool, record.id, Some(&refresh), now).await;

    tracing::info!(role = %I::ROLE, id = %record.id, "principal logged in");
    Ok((updated.profile(), access, refresh))
}

/// Clear the caller's persisted refresh token.
pub async fn logout<I: PrincipalId>(
    store: &CredentialStore<I>,
    pool: Option<&PgPool>,
    id: I,
) -> Result<(), AppError> {
    let now = Utc::now();
    store
        .set_refresh_token(&id, None, now)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    persist_refresh(pool, id, None, now).await;
    tracing::info!(role = %I::ROLE, %id, "principal logged out");
    Ok(())
}

/// Return the authenticated principal's profile.
pub fn current<I: PrincipalId>(
    store: &CredentialStore<I>,
    id: I,
) -> Result<PrincipalProfile, AppError> {
    store
        .get(&id)
        .map(|record| record.profile())
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Best-effort write-through of the refresh token column.
async fn persist_refresh<I: PrincipalId>(
    pool: Option<&PgPool>,
    id: I,
    token: Option<&str>,
    now: chrono::DateTime<Utc>,
) {
    if let Some(pool) = pool {
        if let Err(e) = db::principals::set_refresh_token(pool, id, token, now).await {
            tracing::error!(role = %I::ROLE, %id, error = %e, "failed to persist refresh token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_auth::TokenConfig;
    use triage_core::{PatientId, Role};

    fn store() -> CredentialStore<PatientId> {
        CredentialStore::new()
    }

    fn tokens() -> TokenService {
        TokenService::new(TokenConfig::fixture("access-secret", "refresh-secret"))
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            username: "Alice".into(),
            email: "ALICE@x.com".into(),
            fullname: "Alice Example".into(),
            password: "pw123456".into(),
        }
    }

    fn login_as(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.into()),
            email: None,
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn register_normalizes_and_never_stores_plaintext() {
        let store = store();
        let profile = register(&store, None, alice()).await.unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email, "alice@x.com");

        let record = store.find_by_identifier("alice").unwrap();
        assert!(record.password_hash.starts_with("$argon2id$"));
        assert_ne!(record.password_hash, "pw123456");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let store = store();
        register(&store, None, alice()).await.unwrap();
        let err = register(&store, None, alice()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_issues_tokens_and_persists_refresh() {
        let store = store();
        let tokens = tokens();
        let profile = register(&store, None, alice()).await.unwrap();

        let (logged_in, access, refresh) = login(&store, &tokens, None, login_as("alice", "pw123456"))
            .await
            .unwrap();

        assert_eq!(logged_in.id, profile.id);
        let claims = tokens.verify_access::<PatientId>(&access).unwrap();
        assert_eq!(claims.sub.uuid(), profile.id);
        assert_eq!(claims.role, Role::Patient);

        let record = store.find_by_identifier("alice").unwrap();
        assert_eq!(record.refresh_token.as_deref(), Some(refresh.as_str()));
    }

    #[tokio::test]
    async fn login_by_email_works() {
        let store = store();
        register(&store, None, alice()).await.unwrap();
        let result = login(
            &store,
            &tokens(),
            None,
            LoginRequest {
                username: None,
                email: Some("alice@x.com".into()),
                password: Some("pw123456".into()),
            },
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn login_wrong_password_is_unauthorized_and_leaves_no_token() {
        let store = store();
        register(&store, None, alice()).await.unwrap();
        let err = login(&store, &tokens(), None, login_as("alice", "wrong-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(store
            .find_by_identifier("alice")
            .unwrap()
            .refresh_token
            .is_none());
    }

    #[tokio::test]
    async fn login_unknown_principal_is_not_found() {
        let err = login(&store(), &tokens(), None, login_as("nobody", "pw123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn login_without_identifier_or_password_is_bad_request() {
        let store = store();
        register(&store, None, alice()).await.unwrap();

        let err = login(
            &store,
            &tokens(),
            None,
            LoginRequest {
                username: None,
                email: None,
                password: Some("pw123456".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = login(
            &store,
            &tokens(),
            None,
            LoginRequest {
                username: Some("alice".into()),
                email: None,
                password: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn logout_clears_refresh_token() {
        let store = store();
        let tokens = tokens();
        register(&store, None, alice()).await.unwrap();
        login(&store, &tokens, None, login_as("alice", "pw123456"))
            .await
            .unwrap();

        let id = store.find_by_identifier("alice").unwrap().id;
        logout(&store, None, id).await.unwrap();
        assert!(store
            .find_by_identifier("alice")
            .unwrap()
            .refresh_token
            .is_none());
    }

    #[test]
    fn register_rules_require_every_field() {
        let mut req = alice();
        assert!(req.check().is_ok());
        req.fullname = "   ".into();
        assert_eq!(req.check().unwrap_err(), "All fields are required");
    }

    #[test]
    fn login_rules_require_identifier_and_password() {
        let req = LoginRequest {
            username: None,
            email: None,
            password: Some("pw123456".into()),
        };
        assert_eq!(req.check().unwrap_err(), "Email or username is required");

        let req = LoginRequest {
            username: Some("  ".into()),
            email: Some("alice@x.com".into()),
            password: None,
        };
        // A blank username falls through to the email identifier.
        assert_eq!(req.identifier(), Some("alice@x.com"));
        assert_eq!(req.check().unwrap_err(), "Password is required");
    }
}
