//! Principal persistence — doctors and patients share one table,
//! partitioned by the `role` column. All functions are generic over
//! [`PrincipalId`], so the role bound into each query comes from the id
//! type and cannot disagree with the record being written.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use triage_core::PrincipalId;
use uuid::Uuid;

use crate::state::PrincipalRecord;

/// Insert a newly registered principal.
pub async fn insert<I: PrincipalId>(
    pool: &PgPool,
    record: &PrincipalRecord<I>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO principals (id, role, username, email, fullname, password_hash,
         refresh_token, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(record.id.uuid())
    .bind(I::ROLE.as_str())
    .bind(&record.username)
    .bind(&record.email)
    .bind(&record.fullname)
    .bind(&record.password_hash)
    .bind(&record.refresh_token)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Replace the stored refresh token (login sets, logout clears).
pub async fn set_refresh_token<I: PrincipalId>(
    pool: &PgPool,
    id: I,
    token: Option<&str>,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE principals SET refresh_token = $1, updated_at = $2
         WHERE id = $3 AND role = $4",
    )
    .bind(token)
    .bind(updated_at)
    .bind(id.uuid())
    .bind(I::ROLE.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all principals of one partition into the in-memory store on
/// startup.
pub async fn load_all<I: PrincipalId>(pool: &PgPool) -> Result<Vec<PrincipalRecord<I>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PrincipalRow>(
        "SELECT id, username, email, fullname, password_hash, refresh_token,
         created_at, updated_at
         FROM principals WHERE role = $1 ORDER BY created_at",
    )
    .bind(I::ROLE.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PrincipalRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct PrincipalRow {
    id: Uuid,
    username: String,
    email: String,
    fullname: String,
    password_hash: String,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PrincipalRow {
    fn into_record<I: PrincipalId>(self) -> PrincipalRecord<I> {
        PrincipalRecord {
            id: I::from_uuid(self.id),
            username: self.username,
            email: self.email,
            fullname: self.fullname,
            password_hash: self.password_hash,
            refresh_token: self.refresh_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
