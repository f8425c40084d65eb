//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Triage API — Clinical Issue Tracking",
        version = "0.3.2",
        description = "Patients register, authenticate, and submit health issues; doctors review and respond. Session transport is http-only cookies.",
        license(name = "MIT")
    ),
    paths(
        // Doctors
        crate::routes::doctors::register,
        crate::routes::doctors::login,
        crate::routes::doctors::logout,
        crate::routes::doctors::me,
        // Patients
        crate::routes::patients::register,
        crate::routes::patients::login,
        crate::routes::patients::logout,
        crate::routes::patients::me,
        // Dashboard
        crate::routes::issues::create_issue,
        crate::routes::issues::list_my_issues,
        crate::routes::issues::get_my_issue,
        crate::routes::issues::download_report,
        crate::routes::issues::list_open_issues,
        crate::routes::issues::get_issue,
        crate::routes::issues::review_issue,
    ),
    components(schemas(
        crate::routes::credentials::RegisterRequest,
        crate::routes::credentials::LoginRequest,
        crate::routes::issues::IssueView,
        crate::routes::issues::IssueList,
        crate::routes::issues::ReviewRequest,
        crate::state::PrincipalProfile,
        crate::state::PrincipalSummary,
    )),
    tags(
        (name = "doctors", description = "Doctor registration and sessions"),
        (name = "patients", description = "Patient registration and sessions"),
        (name = "dashboard", description = "Issue intake, review, and reports"),
    )
)]
pub struct ApiDoc;

/// Serve the assembled spec.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_assembles_and_contains_all_route_groups() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("/api/v1/doctors/register"));
        assert!(json.contains("/api/v1/patients/login"));
        assert!(json.contains("/api/v1/dashboard/patient/create"));
        assert!(json.contains("/api/v1/dashboard/doctor/review/{id}"));
    }
}
