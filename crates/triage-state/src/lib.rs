#![deny(missing_docs)]

//! # triage-state — Issue Lifecycle State Machine
//!
//! The lifecycle of a patient-submitted issue is deliberately small:
//!
//! ```text
//! OPEN ─review()──▶ REVIEWED
//! ```
//!
//! `REVIEWED` is terminal. There is no delete transition and no way back.
//! The guard lives here, away from the HTTP layer, so every caller —
//! in-memory store, Postgres write-through, tests — enforces the same
//! at-most-once-review rule.

pub mod issue;

pub use issue::{IssueStatus, LifecycleError, ReviewNote, ReviewRecord};
