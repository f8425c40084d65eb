#![deny(missing_docs)]

//! # triage-core — Foundational Types for the Triage Clinical Backend
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies — only `serde`, `serde_json`,
//! `thiserror`, `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type. You cannot pass a [`DoctorId`] where a [`PatientId`]
//!    is expected, which is what makes the doctor/patient partition hold
//!    at compile time rather than by convention.
//!
//! 2. **Validation at construction.** [`ImageRef`] and the credential
//!    field helpers reject invalid input when a value is created, not when
//!    it is used. Downstream code never re-checks.
//!
//! 3. **Structured errors with `thiserror`.** No `Box<dyn Error>`, no
//!    `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod image;
pub mod role;

// Re-export primary types at crate root for ergonomic imports.
pub use error::ValidationError;
pub use identity::{DoctorId, IssueId, PatientId, PrincipalId};
pub use image::ImageRef;
pub use role::Role;
