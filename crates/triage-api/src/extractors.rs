//! # Request-Body Extraction
//!
//! [`ValidJson`] deserializes a JSON body and runs the form's business
//! rules in one step, so handlers only ever see a well-formed value.
//! Malformed JSON and rule violations both reject with the envelope's
//! 400, carrying the rule's message.

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Business rules a request form must satisfy beyond deserialization —
/// required fields non-empty after trimming, identifier presence, and
/// the like.
pub trait FormRules {
    /// Check the rules. The returned message becomes the 400 envelope's
    /// message verbatim.
    fn check(&self) -> Result<(), String>;
}

/// A JSON request body that deserialized cleanly and passed its
/// [`FormRules`].
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + FormRules,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(form) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        form.check().map_err(AppError::BadRequest)?;
        Ok(Self(form))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct ProbeForm {
        name: String,
    }

    impl FormRules for ProbeForm {
        fn check(&self) -> Result<(), String> {
            if self.name.trim().is_empty() {
                return Err("name must not be empty".to_string());
            }
            Ok(())
        }
    }

    fn probe_app() -> Router {
        Router::new().route(
            "/probe",
            post(|ValidJson(form): ValidJson<ProbeForm>| async move { form.name }),
        )
    }

    async fn post_probe(body: &str) -> (StatusCode, Vec<u8>) {
        let response = probe_app()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/probe")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn valid_body_reaches_the_handler() {
        let (status, body) = post_probe(r#"{"name":"ok"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn rule_violation_rejects_with_envelope() {
        let (status, body) = post_probe(r#"{"name":"   "}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["statusCode"], 400);
        assert_eq!(envelope["message"], "name must not be empty");
    }

    #[tokio::test]
    async fn malformed_json_rejects_with_envelope() {
        let (status, body) = post_probe("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["success"], false);
    }
}
