//! # Database Persistence
//!
//! Optional Postgres write-through behind the in-memory stores. When
//! `DATABASE_URL` is set, writes mirror into Postgres and the stores are
//! hydrated from it on startup; when it is not, the API runs
//! in-memory-only.
//!
//! Queries use runtime binding (`sqlx::query` / `query_as`), never the
//! compile-time checked macros — no live database is needed to build.

pub mod issues;
pub mod principals;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres if `DATABASE_URL` is configured.
///
/// Returns `Ok(None)` when the variable is unset — that is a supported
/// mode, not an error. Connection or schema failures are errors: a
/// configured database that cannot be reached should stop startup rather
/// than silently dropping durability.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::info!("DATABASE_URL not set — running with in-memory stores only");
            return Ok(None);
        }
    };

    let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await?;
    ensure_schema(&pool).await?;

    tracing::info!(max_connections, "connected to Postgres");
    Ok(Some(pool))
}

/// Create the tables if they do not exist.
///
/// Uniqueness of (role, username) and (role, email) is a database
/// constraint, mirroring the store-level check.
async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS principals (
             id UUID PRIMARY KEY,
             role TEXT NOT NULL,
             username TEXT NOT NULL,
             email TEXT NOT NULL,
             fullname TEXT NOT NULL,
             password_hash TEXT NOT NULL,
             refresh_token TEXT,
             created_at TIMESTAMPTZ NOT NULL,
             updated_at TIMESTAMPTZ NOT NULL,
             UNIQUE (role, username),
             UNIQUE (role, email)
         )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS issues (
             id UUID PRIMARY KEY,
             patient_id UUID NOT NULL,
             doctor_id UUID,
             title TEXT NOT NULL,
             description TEXT,
             image_ref TEXT NOT NULL,
             response JSONB,
             status TEXT NOT NULL,
             created_at TIMESTAMPTZ NOT NULL,
             updated_at TIMESTAMPTZ NOT NULL
         )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
