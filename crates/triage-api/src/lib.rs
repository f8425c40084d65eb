//! # triage-api — Axum API Service for the Triage Clinical Backend
//!
//! Patients register, authenticate, and submit health issues (title,
//! description, photo); doctors review them and respond. Sessions ride in
//! http-only cookies; the issue lifecycle is `OPEN → REVIEWED`, enforced
//! by `triage-state`.
//!
//! ## API Surface
//!
//! | Prefix                        | Module                | Auth    |
//! |-------------------------------|-----------------------|---------|
//! | `/api/v1/doctors/*`           | [`routes::doctors`]   | per route |
//! | `/api/v1/patients/*`          | [`routes::patients`]  | per route |
//! | `/api/v1/dashboard/patient/*` | [`routes::issues`]    | patient |
//! | `/api/v1/dashboard/doctor/*`  | [`routes::issues`]    | doctor  |
//! | `/health/*`, `/openapi.json`  | probes & spec         | none    |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → (per-partition) doctor_auth | patient_auth → Handler
//! ```
//!
//! Unknown routes fall through to a structured 404 envelope.

pub mod auth;
pub mod bootstrap;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Maximum accepted upload size for issue images.
const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/openapi.json` are mounted outside the auth
/// middleware so they remain accessible without credentials. The doctor
/// and patient partitions each get their own auth layer; nothing is
/// shared between them.
pub fn app(state: AppState) -> Router {
    let doctors = routes::doctors::public_router().merge(
        routes::doctors::session_router()
            .layer(from_fn_with_state(state.clone(), auth::doctor_auth)),
    );

    let patients = routes::patients::public_router().merge(
        routes::patients::session_router()
            .layer(from_fn_with_state(state.clone(), auth::patient_auth)),
    );

    let dashboard = routes::issues::patient_router()
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .layer(from_fn_with_state(state.clone(), auth::patient_auth))
        .merge(
            routes::issues::doctor_router()
                .layer(from_fn_with_state(state.clone(), auth::doctor_auth)),
        );

    let api = Router::new()
        .nest("/api/v1/doctors", doctors)
        .nest("/api/v1/patients", patients)
        .nest("/api/v1/dashboard", dashboard)
        .merge(openapi::router())
        .layer(middleware::tracing_layer::layer())
        .with_state(state);

    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(api)
        .fallback(error::not_found)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
