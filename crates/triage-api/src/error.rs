//! # API Error Types & Response Envelope
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every response — success or failure — shares one envelope:
//! `{ statusCode, data, message, success, errors }`. Domain errors map to
//! 4xx statuses with their message; anything not explicitly raised by the
//! domain layer is reported as a generic internal error with no detail
//! leakage.

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use triage_auth::AuthError;
use triage_blob::BlobError;
use triage_core::ValidationError;
use triage_report::RenderError;

use crate::state::ReviewRejected;

/// The shared response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// HTTP status code, mirrored into the body.
    pub status_code: u16,
    /// The payload, `null` on errors.
    pub data: Option<T>,
    /// Human-readable outcome message.
    pub message: String,
    /// Whether the request succeeded (`status < 400`).
    pub success: bool,
    /// Error details, empty on success.
    pub errors: Vec<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Build a success envelope with the given status and payload.
    pub fn ok(
        status: StatusCode,
        data: T,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ApiResponse<T>>) {
        (
            status,
            Json(ApiResponse {
                status_code: status.as_u16(),
                data: Some(data),
                message: message.into(),
                success: true,
                errors: Vec::new(),
            }),
        )
    }
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid input (400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid, or expired credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Entity absent or not owned by the caller (404).
    #[error("{0}")]
    NotFound(String),

    /// Duplicate registration or double review (409).
    #[error("{0}")]
    Conflict(String),

    /// An external collaborator is unconfigured or unreachable (503).
    #[error("{0}")]
    Unavailable(String),

    /// Report rendering failed (500). Cause is logged, not returned.
    #[error("report rendering failed: {0}")]
    Render(String),

    /// Internal error (500). Cause is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status for this error.
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Render(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message returned to the client. Internal causes never leak.
    fn client_message(&self) -> String {
        match self {
            Self::Render(_) => "Failed to generate report".to_string(),
            Self::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.client_message();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body: ApiResponse<serde_json::Value> = ApiResponse {
            status_code: status.as_u16(),
            data: None,
            message: message.clone(),
            success: false,
            errors: vec![message],
        };
        (status, Json(body)).into_response()
    }
}

/// Fallback for unknown routes: a structured 404 envelope.
pub async fn not_found(uri: Uri) -> Response {
    AppError::NotFound(format!("Route {uri} not found")).into_response()
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ReviewRejected> for AppError {
    fn from(err: ReviewRejected) -> Self {
        match err {
            ReviewRejected::Missing => Self::NotFound("Issue not found".to_string()),
            ReviewRejected::AlreadyReviewed => {
                Self::Conflict("Issue already reviewed".to_string())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            // Verification failures surface as one generic message; the
            // middleware logs the specific cause.
            AuthError::Expired | AuthError::InvalidToken(_) | AuthError::WrongRole { .. } => {
                Self::Unauthorized("Invalid or missing access token".to_string())
            }
            AuthError::Encoding(msg) | AuthError::PasswordHash(msg) => Self::Internal(msg),
        }
    }
}

impl From<BlobError> for AppError {
    fn from(err: BlobError) -> Self {
        tracing::warn!(error = %err, "image upload failed");
        Self::Unavailable("Image upload failed".to_string())
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        Self::Render(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    /// Extract status and envelope from a response.
    async fn response_parts(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn bad_request_envelope() {
        let (status, body) = response_parts(AppError::BadRequest("Image is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"], serde_json::Value::Null);
        assert_eq!(body["message"], "Image is required");
        assert_eq!(body["errors"][0], "Image is required");
    }

    #[tokio::test]
    async fn conflict_envelope() {
        let (status, body) = response_parts(AppError::Conflict("Issue already reviewed".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["statusCode"], 409);
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let (status, body) =
            response_parts(AppError::Internal("db connection refused".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal Server Error");
        assert!(!body.to_string().contains("db connection"));
    }

    #[tokio::test]
    async fn render_error_hides_cause_and_is_distinct_from_lifecycle() {
        let (status, body) = response_parts(AppError::Render("bad sink".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to generate report");
        assert!(!body.to_string().contains("bad sink"));
    }

    #[tokio::test]
    async fn unavailable_envelope() {
        let (status, body) =
            response_parts(AppError::Unavailable("Image upload failed".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["statusCode"], 503);
    }

    #[test]
    fn review_rejections_map_to_not_found_and_conflict() {
        assert!(matches!(
            AppError::from(ReviewRejected::Missing),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(ReviewRejected::AlreadyReviewed),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn token_errors_convert_to_generic_unauthorized() {
        let err = AppError::from(AuthError::InvalidToken("signature mismatch".into()));
        match err {
            AppError::Unauthorized(msg) => {
                assert_eq!(msg, "Invalid or missing access token");
                assert!(!msg.contains("signature"));
            }
            other => panic!("expected Unauthorized, got {other:?}"),
        }

        // A wrong-partition token gets the same opaque message.
        let err = AppError::from(AuthError::WrongRole {
            expected: triage_core::Role::Patient,
            found: triage_core::Role::Doctor,
        });
        match err {
            AppError::Unauthorized(msg) => assert_eq!(msg, "Invalid or missing access token"),
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn success_envelope_shape() {
        let (status, Json(body)) =
            ApiResponse::ok(StatusCode::CREATED, 42, "Issue created successfully");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.status_code, 201);
        assert!(body.success);
        assert_eq!(body.data, Some(42));
        assert!(body.errors.is_empty());
    }
}
