//! # Patient Account Routes
//!
//! `/api/v1/patients/*`: registration and session management for the
//! patient partition. Logout and `me` sit behind
//! [`crate::auth::patient_auth`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{self, AuthPatient};
use crate::error::{ApiResponse, AppError};
use crate::extractors::ValidJson;
use crate::routes::credentials::{self, LoginRequest, RegisterRequest};
use crate::state::{AppState, PrincipalProfile};

/// Routes that require no authentication.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes guarded by the patient auth middleware (layered in `app()`).
pub fn session_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// POST /api/v1/patients/register — Register a new patient.
#[utoipa::path(
    post,
    path = "/api/v1/patients/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Patient registered", body = PrincipalProfile),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Username or email already registered"),
    ),
    tag = "patients"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalProfile>>), AppError> {
    let profile = credentials::register(&state.patients, state.db_pool.as_ref(), req).await?;
    Ok(ApiResponse::ok(
        StatusCode::CREATED,
        profile,
        "Patient registered successfully",
    ))
}

/// POST /api/v1/patients/login — Log a patient in and set session cookies.
#[utoipa::path(
    post,
    path = "/api/v1/patients/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookies set", body = PrincipalProfile),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "No such patient"),
    ),
    tag = "patients"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<(CookieJar, (StatusCode, Json<ApiResponse<PrincipalProfile>>)), AppError> {
    let (profile, access, refresh) =
        credentials::login(&state.patients, &state.tokens, state.db_pool.as_ref(), req).await?;
    let jar = auth::session_cookies(jar, access, refresh);
    Ok((
        jar,
        ApiResponse::ok(StatusCode::OK, profile, "Patient logged in successfully"),
    ))
}

/// POST /api/v1/patients/logout — Clear the session.
#[utoipa::path(
    post,
    path = "/api/v1/patients/logout",
    responses(
        (status = 200, description = "Logged out; cookies cleared"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "patients"
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    AuthPatient(patient): AuthPatient,
    jar: CookieJar,
) -> Result<(CookieJar, (StatusCode, Json<ApiResponse<()>>)), AppError> {
    credentials::logout(&state.patients, state.db_pool.as_ref(), patient.id).await?;
    let jar = auth::clear_session_cookies(jar);
    Ok((
        jar,
        ApiResponse::ok(StatusCode::OK, (), "Patient logged out successfully"),
    ))
}

/// GET /api/v1/patients/me — The authenticated patient's profile.
#[utoipa::path(
    get,
    path = "/api/v1/patients/me",
    responses(
        (status = 200, description = "Current patient", body = PrincipalProfile),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "patients"
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    AuthPatient(patient): AuthPatient,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalProfile>>), AppError> {
    let profile = credentials::current(&state.patients, patient.id)?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        profile,
        "Patient profile retrieved successfully",
    ))
}
