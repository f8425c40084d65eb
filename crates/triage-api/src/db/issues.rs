//! Issue persistence.
//!
//! The review transition is a single conditional UPDATE keyed on the
//! current status — never a client-side read-modify-write — so the
//! at-most-once-review invariant holds at the database even under
//! concurrent attempts.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use triage_core::{DoctorId, ImageRef, IssueId, PatientId, PrincipalId};
use triage_state::{IssueStatus, ReviewRecord};
use uuid::Uuid;

use crate::state::IssueRecord;

/// Serialize a review record for the JSONB `response` column.
fn serialize_response(response: &ReviewRecord) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(response).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize issue response");
        sqlx::Error::Encode(Box::new(e))
    })
}

/// Insert a newly created issue.
pub async fn insert(pool: &PgPool, record: &IssueRecord) -> Result<(), sqlx::Error> {
    let response = record.response.as_ref().map(serialize_response).transpose()?;

    sqlx::query(
        "INSERT INTO issues (id, patient_id, doctor_id, title, description, image_ref,
         response, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(Uuid::from(record.id))
    .bind(record.patient_id.uuid())
    .bind(record.doctor_id.map(|d| d.uuid()))
    .bind(&record.title)
    .bind(&record.description)
    .bind(record.image_ref.as_str())
    .bind(response)
    .bind(record.status.as_str())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a review: set doctor, response, and status in one statement,
/// guarded on the issue not yet being reviewed.
///
/// Returns `false` when no row matched — the issue is absent or was
/// already reviewed by a concurrent request.
pub async fn mark_reviewed(
    pool: &PgPool,
    id: IssueId,
    doctor_id: DoctorId,
    response: &ReviewRecord,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let response = serialize_response(response)?;

    let result = sqlx::query(
        "UPDATE issues SET doctor_id = $1, response = $2, status = $3, updated_at = $4
         WHERE id = $5 AND status <> $3",
    )
    .bind(doctor_id.uuid())
    .bind(&response)
    .bind(IssueStatus::Reviewed.as_str())
    .bind(updated_at)
    .bind(Uuid::from(id))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all issues into the in-memory store on startup.
///
/// Rows whose stored fields no longer parse are skipped with an error
/// log rather than loaded with guessed values.
pub async fn load_all(pool: &PgPool) -> Result<Vec<IssueRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, IssueRow>(
        "SELECT id, patient_id, doctor_id, title, description, image_ref, response,
         status, created_at, updated_at
         FROM issues ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(IssueRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct IssueRow {
    id: Uuid,
    patient_id: Uuid,
    doctor_id: Option<Uuid>,
    title: String,
    description: Option<String>,
    image_ref: String,
    response: Option<serde_json::Value>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IssueRow {
    fn into_record(self) -> Option<IssueRecord> {
        let status = match IssueStatus::from_name(&self.status) {
            Some(status) => status,
            None => {
                tracing::error!(
                    id = %self.id,
                    status = %self.status,
                    "unknown issue status in database — skipping row; \
                     investigate: this may indicate prior data corruption"
                );
                return None;
            }
        };

        let image_ref = match ImageRef::new(self.image_ref) {
            Ok(image_ref) => image_ref,
            Err(e) => {
                tracing::error!(id = %self.id, error = %e, "invalid image_ref in database — skipping row");
                return None;
            }
        };

        let response = match self.response {
            Some(value) => match serde_json::from_value::<ReviewRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::error!(id = %self.id, error = %e, "invalid response payload in database — skipping row");
                    return None;
                }
            },
            None => None,
        };

        Some(IssueRecord {
            id: IssueId::from_uuid(self.id),
            patient_id: PatientId::from_uuid(self.patient_id),
            doctor_id: self.doctor_id.map(DoctorId::from_uuid),
            title: self.title,
            description: self.description,
            image_ref,
            response,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
