//! # Middleware
//!
//! Cross-cutting request plumbing. Authentication middleware lives in
//! [`crate::auth`]; this module holds the observability layers.

pub mod tracing_layer;
