//! # Dashboard Routes — Issue Intake & Review
//!
//! Patient side: create an issue (multipart image upload), list/fetch
//! owned issues, download the report. Doctor side: list open issues,
//! fetch any issue, record a review.
//!
//! ## Endpoints
//!
//! - `POST /api/v1/dashboard/patient/create` — create issue (multipart)
//! - `GET /api/v1/dashboard/patient/issues` — own issues, newest first
//! - `GET /api/v1/dashboard/patient/issues/:id` — one owned issue
//! - `GET /api/v1/dashboard/patient/issue/:id/pdf` — report download
//! - `GET /api/v1/dashboard/doctor/issues` — open issues, newest first
//! - `GET /api/v1/dashboard/doctor/issues/:id` — any issue
//! - `POST /api/v1/dashboard/doctor/review/:id` — review transition

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_core::{ImageRef, IssueId, PatientId};
use triage_report::{IssueReport, PdfRenderer, ReportIdentity, ReportRenderer};
use triage_state::{IssueStatus, ReviewNote, ReviewRecord};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthDoctor, AuthPatient};
use crate::db;
use crate::error::{ApiResponse, AppError};
use crate::extractors::{FormRules, ValidJson};
use crate::state::{AppState, IssueRecord, PrincipalSummary};

/// Patient-facing dashboard routes (layered with patient auth in `app()`).
pub fn patient_router() -> Router<AppState> {
    Router::new()
        .route("/patient/create", post(create_issue))
        .route("/patient/issues", get(list_my_issues))
        .route("/patient/issues/:id", get(get_my_issue))
        .route("/patient/issue/:id/pdf", get(download_report))
}

/// Doctor-facing dashboard routes (layered with doctor auth in `app()`).
pub fn doctor_router() -> Router<AppState> {
    Router::new()
        .route("/doctor/issues", get(list_open_issues))
        .route("/doctor/issues/:id", get(get_issue))
        .route("/doctor/review/:id", post(review_issue))
}

// ── DTOs ────────────────────────────────────────────────────────────

/// An issue as returned by the API, with identities resolved per the
/// caller's view.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueView {
    /// Issue id.
    #[schema(value_type = Uuid)]
    pub id: IssueId,
    /// Issue title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Stable reference to the uploaded image.
    #[schema(value_type = String)]
    pub image_ref: ImageRef,
    /// Lifecycle status.
    #[schema(value_type = String)]
    pub status: IssueStatus,
    /// The doctor's response, present once reviewed.
    #[schema(value_type = Option<Object>)]
    pub response: Option<ReviewRecord>,
    /// The owning patient, when resolved for this view.
    pub patient: Option<PrincipalSummary>,
    /// The reviewing doctor, when resolved for this view.
    pub doctor: Option<PrincipalSummary>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// List payload: `{ "issues": [...] }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssueList {
    /// The issues, newest first.
    pub issues: Vec<IssueView>,
}

/// A doctor's review submission. Every field is optional; the report
/// renderer substitutes placeholders for absent ones.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    /// Free-text assessment.
    #[serde(default)]
    pub review_text: Option<String>,
    /// Prescribed treatment.
    #[serde(default)]
    pub treatment: Option<String>,
    /// Precautions for the patient.
    #[serde(default)]
    pub precautions: Option<String>,
}

impl FormRules for ReviewRequest {
    // Every field is optional: an empty review is representable and the
    // renderer substitutes placeholders.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Resolve an issue record into a view, attaching the identities the
/// caller's listing is entitled to see.
fn resolve_view(
    state: &AppState,
    issue: IssueRecord,
    include_patient: bool,
    include_doctor: bool,
) -> IssueView {
    let patient = if include_patient {
        state
            .patients
            .get(&issue.patient_id)
            .map(|record| record.summary())
    } else {
        None
    };
    let doctor = if include_doctor {
        issue
            .doctor_id
            .and_then(|id| state.doctors.get(&id))
            .map(|record| record.summary())
    } else {
        None
    };

    IssueView {
        id: issue.id,
        title: issue.title,
        description: issue.description,
        image_ref: issue.image_ref,
        status: issue.status,
        response: issue.response,
        patient,
        doctor,
        created_at: issue.created_at,
        updated_at: issue.updated_at,
    }
}

// ── Patient handlers ────────────────────────────────────────────────

struct IssueIntake {
    title: String,
    description: Option<String>,
    image: Vec<u8>,
    filename: String,
}

/// Pull title/description/image out of the multipart form.
async fn read_intake(mut multipart: Multipart) -> Result<IssueIntake, AppError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut image: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            "description" => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            "image" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                image = Some((bytes.to_vec(), filename));
            }
            _ => {}
        }
    }

    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Title is required".to_string()))?;
    let (image, filename) = image
        .filter(|(bytes, _)| !bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest("Image is required".to_string()))?;
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Ok(IssueIntake {
        title,
        description,
        image,
        filename,
    })
}

/// Hand the staged bytes to the object store.
///
/// Consumes the scratch file: it is deleted when this function returns,
/// whether the upload succeeded or failed.
async fn upload_from_scratch(
    store: &dyn triage_blob::ObjectStore,
    scratch: tempfile::NamedTempFile,
    filename: &str,
) -> Result<ImageRef, AppError> {
    let staged = tokio::fs::read(scratch.path())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let image_ref = store.put(staged, filename).await?;
    drop(scratch);
    Ok(image_ref)
}

/// POST /api/v1/dashboard/patient/create — Create a new issue.
#[utoipa::path(
    post,
    path = "/api/v1/dashboard/patient/create",
    responses(
        (status = 201, description = "Issue created", body = IssueView),
        (status = 400, description = "Missing title or image"),
        (status = 503, description = "Image storage unavailable"),
    ),
    tag = "dashboard"
)]
pub(crate) async fn create_issue(
    State(state): State<AppState>,
    AuthPatient(patient): AuthPatient,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<IssueView>>), AppError> {
    let intake = read_intake(multipart).await?;

    let store = state
        .object_store
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Image storage is not configured".to_string()))?;

    // Stage the upload on disk first; the scratch artifact lives exactly
    // as long as the upload attempt.
    let scratch =
        tempfile::NamedTempFile::new().map_err(|e| AppError::Internal(e.to_string()))?;
    tokio::fs::write(scratch.path(), &intake.image)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let image_ref = upload_from_scratch(store.as_ref(), scratch, &intake.filename).await?;

    let issue = IssueRecord::new(
        patient.id,
        intake.title,
        intake.description,
        image_ref,
        Utc::now(),
    );
    state.issues.add(issue.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::issues::insert(pool, &issue).await {
            tracing::error!(id = %issue.id, error = %e, "failed to persist issue");
        }
    }

    tracing::info!(id = %issue.id, patient = %patient.id, "issue created");
    let view = resolve_view(&state, issue, false, true);
    Ok(ApiResponse::ok(
        StatusCode::CREATED,
        view,
        "Issue created successfully",
    ))
}

/// GET /api/v1/dashboard/patient/issues — The caller's issues.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/patient/issues",
    responses(
        (status = 200, description = "Issues owned by the caller, newest first", body = IssueList),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "dashboard"
)]
pub(crate) async fn list_my_issues(
    State(state): State<AppState>,
    AuthPatient(patient): AuthPatient,
) -> Result<(StatusCode, Json<ApiResponse<IssueList>>), AppError> {
    let issues = state
        .issues
        .owned_by(patient.id)
        .into_iter()
        .map(|issue| resolve_view(&state, issue, false, true))
        .collect();
    Ok(ApiResponse::ok(
        StatusCode::OK,
        IssueList { issues },
        "Issues fetched successfully",
    ))
}

/// Look up an issue owned by the calling patient.
fn owned_issue(
    state: &AppState,
    patient_id: PatientId,
    issue_id: IssueId,
) -> Result<IssueRecord, AppError> {
    state
        .issues
        .get(&issue_id)
        .filter(|issue| issue.patient_id == patient_id)
        .ok_or_else(|| AppError::NotFound("Issue not found".to_string()))
}

/// GET /api/v1/dashboard/patient/issues/:id — One owned issue.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/patient/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "The issue", body = IssueView),
        (status = 404, description = "Absent or owned by another patient"),
    ),
    tag = "dashboard"
)]
pub(crate) async fn get_my_issue(
    State(state): State<AppState>,
    AuthPatient(patient): AuthPatient,
    Path(id): Path<IssueId>,
) -> Result<(StatusCode, Json<ApiResponse<IssueView>>), AppError> {
    let issue = owned_issue(&state, patient.id, id)?;
    let view = resolve_view(&state, issue, false, true);
    Ok(ApiResponse::ok(
        StatusCode::OK,
        view,
        "Issue fetched successfully",
    ))
}

/// GET /api/v1/dashboard/patient/issue/:id/pdf — Download the report.
///
/// Rendering is isolated from the lifecycle: a failure here surfaces as
/// a generic rendering error and cannot touch issue state.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/patient/issue/{id}/pdf",
    params(("id" = Uuid, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "PDF report (application/pdf attachment)"),
        (status = 404, description = "Absent or owned by another patient"),
    ),
    tag = "dashboard"
)]
pub(crate) async fn download_report(
    State(state): State<AppState>,
    AuthPatient(patient): AuthPatient,
    Path(id): Path<IssueId>,
) -> Result<(StatusCode, [(header::HeaderName, String); 2], Vec<u8>), AppError> {
    let issue = owned_issue(&state, patient.id, id)?;

    let report = IssueReport {
        title: issue.title,
        description: issue.description,
        status: issue.status,
        patient: ReportIdentity {
            fullname: Some(patient.profile.fullname),
            email: Some(patient.profile.email),
        },
        review: issue.response,
    };

    let renderer = PdfRenderer::new();
    let mut body = Vec::new();
    renderer.render(&report, &mut body)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, renderer.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=issue_report_{id}.pdf"),
            ),
        ],
        body,
    ))
}

// ── Doctor handlers ─────────────────────────────────────────────────

/// GET /api/v1/dashboard/doctor/issues — All open issues.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/doctor/issues",
    responses(
        (status = 200, description = "Open issues, newest first", body = IssueList),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "dashboard"
)]
pub(crate) async fn list_open_issues(
    State(state): State<AppState>,
    AuthDoctor(_doctor): AuthDoctor,
) -> Result<(StatusCode, Json<ApiResponse<IssueList>>), AppError> {
    let issues = state
        .issues
        .open()
        .into_iter()
        .map(|issue| resolve_view(&state, issue, true, false))
        .collect();
    Ok(ApiResponse::ok(
        StatusCode::OK,
        IssueList { issues },
        "Open issues fetched successfully",
    ))
}

/// GET /api/v1/dashboard/doctor/issues/:id — Any issue, both identities.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/doctor/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "The issue", body = IssueView),
        (status = 404, description = "Issue not found"),
    ),
    tag = "dashboard"
)]
pub(crate) async fn get_issue(
    State(state): State<AppState>,
    AuthDoctor(_doctor): AuthDoctor,
    Path(id): Path<IssueId>,
) -> Result<(StatusCode, Json<ApiResponse<IssueView>>), AppError> {
    let issue = state
        .issues
        .get(&id)
        .ok_or_else(|| AppError::NotFound("Issue not found".to_string()))?;
    let view = resolve_view(&state, issue, true, true);
    Ok(ApiResponse::ok(
        StatusCode::OK,
        view,
        "Issue fetched successfully",
    ))
}

/// POST /api/v1/dashboard/doctor/review/:id — Record a review.
///
/// [`crate::state::IssueStore::review`] runs the transition as a single
/// guarded update: doctor, response (server-stamped), and status change
/// together or not at all, and a second review fails with `Conflict`
/// leaving the first untouched.
#[utoipa::path(
    post,
    path = "/api/v1/dashboard/doctor/review/{id}",
    params(("id" = Uuid, Path, description = "Issue ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Issue reviewed", body = IssueView),
        (status = 404, description = "Issue not found"),
        (status = 409, description = "Issue already reviewed"),
    ),
    tag = "dashboard"
)]
pub(crate) async fn review_issue(
    State(state): State<AppState>,
    AuthDoctor(doctor): AuthDoctor,
    Path(id): Path<IssueId>,
    ValidJson(req): ValidJson<ReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IssueView>>), AppError> {
    let note = ReviewNote {
        text: req.review_text,
        treatment: req.treatment,
        precautions: req.precautions,
    };
    let now = Utc::now();

    let issue = state.issues.review(&id, doctor.id, note, now)?;

    // Write-through is itself conditional on status, so the at-most-once
    // rule also holds at the database.
    if let (Some(pool), Some(response)) = (&state.db_pool, &issue.response) {
        match db::issues::mark_reviewed(pool, id, doctor.id, response, now).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(%id, "review write-through matched no open issue row")
            }
            Err(e) => tracing::error!(%id, error = %e, "failed to persist review"),
        }
    }

    tracing::info!(%id, doctor = %doctor.id, "issue reviewed");
    let view = resolve_view(&state, issue, true, true);
    Ok(ApiResponse::ok(
        StatusCode::OK,
        view,
        "Issue reviewed successfully",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_auth::{TokenConfig, TokenService};
    use triage_core::{DoctorId, PrincipalId};

    use crate::state::PrincipalRecord;

    fn state() -> AppState {
        AppState::new(TokenService::new(TokenConfig::fixture("a", "r")))
    }

    fn principal<I: PrincipalId>(username: &str) -> PrincipalRecord<I> {
        let now = Utc::now();
        PrincipalRecord {
            id: I::from_uuid(Uuid::new_v4()),
            username: username.to_string(),
            email: format!("{username}@x.com"),
            fullname: format!("{username} Example"),
            password_hash: "$argon2id$stub".to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn resolve_view_attaches_requested_identities() {
        let state = state();
        let patient = principal::<PatientId>("alice");
        let doctor = principal::<DoctorId>("bob");
        let patient_id = patient.id;
        let doctor_id = doctor.id;
        state.patients.insert_unique(patient).unwrap();
        state.doctors.insert_unique(doctor).unwrap();

        let mut issue = IssueRecord::new(
            patient_id,
            "rash".into(),
            None,
            ImageRef::new("img1").unwrap(),
            Utc::now(),
        );
        issue
            .apply_review(doctor_id, ReviewNote::default(), Utc::now())
            .unwrap();

        let both = resolve_view(&state, issue.clone(), true, true);
        assert_eq!(both.patient.as_ref().unwrap().fullname, "alice Example");
        assert_eq!(both.doctor.as_ref().unwrap().fullname, "bob Example");

        let patient_view = resolve_view(&state, issue, false, true);
        assert!(patient_view.patient.is_none());
        assert!(patient_view.doctor.is_some());
    }

    #[test]
    fn issue_view_serializes_camel_case() {
        let state = state();
        let issue = IssueRecord::new(
            PatientId::new(),
            "rash".into(),
            Some("itchy".into()),
            ImageRef::new("img1").unwrap(),
            Utc::now(),
        );
        let view = resolve_view(&state, issue, false, false);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["imageRef"], "img1");
        assert_eq!(json["status"], "OPEN");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[tokio::test]
    async fn scratch_artifact_removed_when_upload_fails() {
        let failing = triage_blob::MemoryObjectStore::failing();
        let scratch = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), b"fakejpegbytes").unwrap();
        let path = scratch.path().to_path_buf();

        let result = upload_from_scratch(&failing, scratch, "img1.jpg").await;
        assert!(result.is_err());
        assert!(!path.exists(), "scratch artifact must be removed on failure");
    }

    #[tokio::test]
    async fn scratch_artifact_removed_on_success() {
        let store = triage_blob::MemoryObjectStore::new();
        let scratch = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), b"fakejpegbytes").unwrap();
        let path = scratch.path().to_path_buf();

        let image_ref = upload_from_scratch(&store, scratch, "img1.jpg").await.unwrap();
        assert!(store.get(&image_ref).is_some());
        assert!(!path.exists(), "scratch artifact must be removed on success");
    }
}
