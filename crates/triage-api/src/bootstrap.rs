//! # Bootstrap
//!
//! Builds the application state from the environment and logs a startup
//! banner describing which collaborators are configured.
//!
//! ## Bootstrap Sequence
//!
//! 1. **Token config** — secrets and expiries from env (ephemeral
//!    fallback with a warning).
//! 2. **Object store** — `BLOB_STORE_URL` if present; uploads are
//!    unavailable otherwise.
//! 3. **Database** — `DATABASE_URL` if present; in-memory-only otherwise.
//! 4. **Banner** — structured startup summary.

use std::sync::Arc;

use sqlx::PgPool;
use triage_auth::{TokenConfig, TokenService};
use triage_blob::{BlobError, BlobStoreConfig, ConfigError, HttpObjectStore, ObjectStore};

use crate::state::{AppConfig, AppState};

/// Errors during startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The configured database could not be reached or initialized.
    #[error("database initialization failed: {0}")]
    Database(#[from] sqlx::Error),

    /// The object store was configured but the client could not be built.
    #[error("object store initialization failed: {0}")]
    ObjectStore(#[from] BlobError),
}

/// Load application configuration from the environment.
pub fn load_config() -> AppConfig {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    AppConfig { port }
}

/// Build the object-store client if `BLOB_STORE_URL` is configured.
///
/// An unset URL is a supported mode (uploads report the store
/// unavailable); a set-but-invalid configuration is an error.
pub fn load_object_store() -> Result<Option<Arc<dyn ObjectStore>>, BootstrapError> {
    match BlobStoreConfig::from_env() {
        Ok(config) => {
            let store = HttpObjectStore::new(config)?;
            Ok(Some(Arc::new(store)))
        }
        Err(ConfigError::MissingUrl) => {
            tracing::warn!(
                "BLOB_STORE_URL not set — image uploads will report the object store unavailable"
            );
            Ok(None)
        }
        Err(e) => Err(BootstrapError::ObjectStore(BlobError::Config(e))),
    }
}

/// Assemble the application state and log the startup banner.
pub fn bootstrap(
    config: AppConfig,
    tokens: TokenService,
    object_store: Option<Arc<dyn ObjectStore>>,
    db_pool: Option<PgPool>,
) -> AppState {
    let state = AppState::with_parts(config, tokens, object_store, db_pool);
    log_banner(&state);
    state
}

fn log_banner(state: &AppState) {
    let store_display = if state.object_store.is_some() {
        "configured"
    } else {
        "not configured"
    };
    let db_display = if state.db_pool.is_some() {
        "postgres"
    } else {
        "in-memory only"
    };

    tracing::info!(
        port = state.config.port,
        object_store = store_display,
        persistence = db_display,
        "bootstrap complete"
    );

    println!("┌──────────────────────────────────────────────────┐");
    println!("│  Triage API Server — v0.3.2                      │");
    println!("├──────────────────────────────────────────────────┤");
    println!("│  Port:          {:<33}│", state.config.port);
    println!("│  Object store:  {:<33}│", store_display);
    println!("│  Persistence:   {:<33}│", db_display);
    println!("└──────────────────────────────────────────────────┘");
}

/// Load the token service from environment configuration.
pub fn load_token_service() -> TokenService {
    TokenService::new(TokenConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_auth::TokenConfig;

    #[test]
    fn bootstrap_assembles_state_without_collaborators() {
        let state = bootstrap(
            AppConfig { port: 3000 },
            TokenService::new(TokenConfig::fixture("a", "r")),
            None,
            None,
        );
        assert_eq!(state.config.port, 3000);
        assert!(state.object_store.is_none());
        assert!(state.db_pool.is_none());
    }

    #[test]
    fn load_config_defaults_port() {
        // PORT may or may not be set in the test environment; the parsed
        // value must at least be a valid port either way.
        let config = load_config();
        assert!(config.port > 0);
    }
}
