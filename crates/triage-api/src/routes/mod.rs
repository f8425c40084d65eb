//! # API Route Modules
//!
//! - [`doctors`] / [`patients`] — registration, login, logout, and
//!   current-principal lookup for each role. The two surfaces are
//!   identical in shape but partitioned: each consults only its own
//!   credential store and is guarded by its own middleware.
//! - [`credentials`] — the shared register/login/logout/me flows the two
//!   role modules delegate to.
//! - [`issues`] — the dashboard: patient issue intake (multipart image
//!   upload), per-role listings, report download, and the doctor review
//!   transition.

pub mod credentials;
pub mod doctors;
pub mod issues;
pub mod patients;
