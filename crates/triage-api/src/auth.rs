//! # Authentication Middleware & Role-Partitioned Contexts
//!
//! Per-request gate resolving a caller's identity from the `accessToken`
//! cookie. Two middleware functions — [`doctor_auth`] and
//! [`patient_auth`] — verify the token against their partition's id type
//! and look the principal up in that partition's store.
//!
//! [`DoctorContext`] carries a [`DoctorId`] and [`PatientContext`] a
//! [`PatientId`]; together with the [`AuthDoctor`] / [`AuthPatient`]
//! extractors, a doctor session cannot reach a patient-only handler, and
//! a handler cannot pass the wrong partition's id into the domain — the
//! latter is a type error, not a runtime check.
//!
//! Every failure logs its specific cause at `warn` and returns one
//! generic unauthorized message — the caller learns nothing about which
//! check failed.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use triage_auth::TokenService;
use triage_core::{DoctorId, PatientId, PrincipalId};

use crate::error::AppError;
use crate::state::{AppState, CredentialStore, PrincipalProfile, PrincipalRecord};

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The one message unauthorized callers see, whatever the cause.
const UNAUTHORIZED_MSG: &str = "Invalid or missing access token";

/// Request context for an authenticated doctor.
#[derive(Debug, Clone)]
pub struct DoctorContext {
    /// The caller's typed id.
    pub id: DoctorId,
    /// The resolved doctor, sans secret fields.
    pub profile: PrincipalProfile,
}

/// Request context for an authenticated patient.
#[derive(Debug, Clone)]
pub struct PatientContext {
    /// The caller's typed id.
    pub id: PatientId,
    /// The resolved patient, sans secret fields.
    pub profile: PrincipalProfile,
}

/// Resolve the caller in `store`'s partition, or fail with a generic 401.
///
/// The partition check happens inside
/// [`TokenService::verify_access`]: a token minted for the other role
/// never yields claims here.
fn authenticate<I: PrincipalId>(
    tokens: &TokenService,
    store: &CredentialStore<I>,
    jar: &CookieJar,
) -> Result<PrincipalRecord<I>, AppError> {
    let token = jar.get(ACCESS_COOKIE).map(Cookie::value).ok_or_else(|| {
        tracing::warn!(role = %I::ROLE, "authentication failed: no access token cookie");
        AppError::Unauthorized(UNAUTHORIZED_MSG.to_string())
    })?;

    let claims = tokens.verify_access::<I>(token).map_err(|e| {
        tracing::warn!(role = %I::ROLE, reason = %e, "authentication failed: token rejected");
        AppError::Unauthorized(UNAUTHORIZED_MSG.to_string())
    })?;

    store.get(&claims.sub).ok_or_else(|| {
        tracing::warn!(role = %I::ROLE, id = %claims.sub, "authentication failed: principal no longer exists");
        AppError::Unauthorized(UNAUTHORIZED_MSG.to_string())
    })
}

/// Middleware guarding doctor-only routes.
pub async fn doctor_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let record = authenticate(&state.tokens, &state.doctors, &jar)?;
    request.extensions_mut().insert(DoctorContext {
        id: record.id,
        profile: record.profile(),
    });
    Ok(next.run(request).await)
}

/// Middleware guarding patient-only routes.
pub async fn patient_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let record = authenticate(&state.tokens, &state.patients, &jar)?;
    request.extensions_mut().insert(PatientContext {
        id: record.id,
        profile: record.profile(),
    });
    Ok(next.run(request).await)
}

/// Extractor for the authenticated doctor.
///
/// Rejects with 401 if no [`DoctorContext`] is present (the middleware
/// didn't run or failed).
#[derive(Debug, Clone)]
pub struct AuthDoctor(pub DoctorContext);

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AuthDoctor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<DoctorContext>()
            .map(|ctx| Self(ctx.clone()))
            .ok_or_else(|| AppError::Unauthorized(UNAUTHORIZED_MSG.to_string()))
    }
}

/// Extractor for the authenticated patient.
#[derive(Debug, Clone)]
pub struct AuthPatient(pub PatientContext);

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AuthPatient {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PatientContext>()
            .map(|ctx| Self(ctx.clone()))
            .ok_or_else(|| AppError::Unauthorized(UNAUTHORIZED_MSG.to_string()))
    }
}

// ── Session cookies ─────────────────────────────────────────────────

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Attach both session cookies after a successful login.
pub fn session_cookies(jar: CookieJar, access: String, refresh: String) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, access))
        .add(session_cookie(REFRESH_COOKIE, refresh))
}

/// Expire both session cookies on logout.
pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/").build())
        .remove(Cookie::build(REFRESH_COOKIE).path("/").build())
}
