//! # Doctor Account Routes
//!
//! `/api/v1/doctors/*`: registration and session management for the
//! doctor partition. Logout and `me` sit behind [`crate::auth::doctor_auth`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{self, AuthDoctor};
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

/// Routes guarded by the doctor auth middleware (layered in `app()`).
pub fn session_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// POST /api/v1/doctors/register — Register a new doctor.
#[utoipa::path(
    post,
    path = "/api/v1/doctors/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Doctor registered", body = PrincipalProfile),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Username or email already registered"),
    ),
    tag = "doctors"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalProfile>>), AppError> {
    let profile = credentials::register(&state.doctors, state.db_pool.as_ref(), req).await?;
    Ok(ApiResponse::ok(
        StatusCode::CREATED,
        profile,
        "User registered successfully",
    ))
}

/// POST /api/v1/doctors/login — Log a doctor in and set session cookies.
#[utoipa::path(
    post,
    path = "/api/v1/doctors/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookies set", body = PrincipalProfile),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "No such doctor"),
    ),
    tag = "doctors"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<(CookieJar, (StatusCode, Json<ApiResponse<PrincipalProfile>>)), AppError> {
    let (profile, access, refresh) =
        credentials::login(&state.doctors, &state.tokens, state.db_pool.as_ref(), req).await?;
    let jar = auth::session_cookies(jar, access, refresh);
    Ok((
        jar,
        ApiResponse::ok(StatusCode::OK, profile, "User logged in successfully"),
    ))
}

/// POST /api/v1/doctors/logout — Clear the session.
#[utoipa::path(
    post,
    path = "/api/v1/doctors/logout",
    responses(
        (status = 200, description = "Logged out; cookies cleared"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "doctors"
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    AuthDoctor(doctor): AuthDoctor,
    jar: CookieJar,
) -> Result<(CookieJar, (StatusCode, Json<ApiResponse<()>>)), AppError> {
    credentials::logout(&state.doctors, state.db_pool.as_ref(), doctor.id).await?;
    let jar = auth::clear_session_cookies(jar);
    Ok((
        jar,
        ApiResponse::ok(StatusCode::OK, (), "User logged out successfully"),
    ))
}

/// GET /api/v1/doctors/me — The authenticated doctor's profile.
#[utoipa::path(
    get,
    path = "/api/v1/doctors/me",
    responses(
        (status = 200, description = "Current doctor", body = PrincipalProfile),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "doctors"
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    AuthDoctor(doctor): AuthDoctor,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalProfile>>), AppError> {
    let profile = credentials::current(&state.doctors, doctor.id)?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        profile,
        "User profile retrieved successfully",
    ))
}
