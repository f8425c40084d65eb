#![deny(missing_docs)]

//! # triage-blob — Object-Store Client
//!
//! Typed client for the external blob service that holds uploaded issue
//! images. This crate is the only path by which the Triage stack touches
//! image bytes; everything downstream of upload works with the stable
//! [`ImageRef`] the store returns.
//!
//! The service is an external collaborator: when it is not configured at
//! bootstrap, the API starts without it and issue creation reports the
//! store unavailable. Uploads are blocking best-effort — no internal
//! retries; a failure surfaces immediately to the caller.

pub mod config;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use triage_core::ImageRef;

pub use config::{BlobStoreConfig, ConfigError};

/// Errors from object-store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Transport-level failure talking to the store.
    #[error("object store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("object store returned status {status}")]
    Status {
        /// The HTTP status code returned.
        status: u16,
    },

    /// The store's response did not contain a usable reference.
    #[error("object store response unusable: {0}")]
    BadResponse(String),

    /// Client configuration was invalid.
    #[error("object store configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Persists uploaded images and returns a retrievable reference.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Store `bytes` under a name derived from `filename`; return the
    /// stable reference to fetch it later.
    async fn put(&self, bytes: Vec<u8>, filename: &str) -> Result<ImageRef, BlobError>;
}

// ── HTTP client ─────────────────────────────────────────────────────

/// Response body returned by the blob service on upload.
#[derive(Debug, serde::Deserialize)]
struct UploadResponse {
    url: String,
}

/// Object store backed by the external blob service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    http: reqwest::Client,
    base_url: url::Url,
}

impl HttpObjectStore {
    /// Create a client from configuration.
    pub fn new(config: BlobStoreConfig) -> Result<Self, BlobError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(token) = &config.api_token {
            let mut headers = reqwest::header::HeaderMap::new();
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| {
                    BlobError::BadResponse("blob store token is not a valid header value".into())
                })?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, bytes: Vec<u8>, filename: &str) -> Result<ImageRef, BlobError> {
        let mut endpoint = self.base_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|()| BlobError::BadResponse("blob store URL cannot be a base".into()))?
            .push("images");
        endpoint.query_pairs_mut().append_pair("filename", filename);

        let response = self
            .http
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), filename, "image upload rejected");
            return Err(BlobError::Status {
                status: status.as_u16(),
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| BlobError::BadResponse(e.to_string()))?;
        ImageRef::new(body.url).map_err(|e| BlobError::BadResponse(e.to_string()))
    }
}

// ── In-memory fixture ───────────────────────────────────────────────

/// In-memory object store for tests and fixtures.
///
/// Stores bytes under `mem://<n>-<filename>` keys. Can be switched into
/// a failing mode to exercise upload-failure paths.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail: AtomicBool,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose every `put` fails, for failure-path tests.
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::Relaxed);
        store
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch stored bytes by reference.
    pub fn get(&self, image_ref: &ImageRef) -> Option<Vec<u8>> {
        self.objects.lock().get(image_ref.as_str()).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, bytes: Vec<u8>, filename: &str) -> Result<ImageRef, BlobError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(BlobError::Status { status: 502 });
        }
        let mut objects = self.objects.lock();
        let key = format!("mem://{}-{}", objects.len(), filename);
        objects.insert(key.clone(), bytes);
        drop(objects);
        ImageRef::new(key).map_err(|e| BlobError::BadResponse(e.to_string()))
    }
}
