//! # Issue Status & Review Transition
//!
//! An issue is created `OPEN` and moves to `REVIEWED` exactly once, when a
//! doctor responds. An earlier schema also declared an `assigned` status,
//! but no operation ever produced it; it has been removed rather than
//! given invented semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The lifecycle status of an issue.
///
/// Uses `SCREAMING_SNAKE_CASE` for serialization so the stored string can
/// never drift from the variant set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    /// Submitted by a patient, awaiting a doctor's review.
    Open,
    /// A doctor has responded. Terminal state.
    Reviewed,
}

impl IssueStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Reviewed => "REVIEWED",
        }
    }

    /// Parse a status from its canonical string form.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "OPEN" => Some(Self::Open),
            "REVIEWED" => Some(Self::Reviewed),
            _ => None,
        }
    }

    /// Whether this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reviewed)
    }

    /// Attempt the review transition.
    ///
    /// Returns the new status, or [`LifecycleError::AlreadyReviewed`] if
    /// the issue has already been reviewed. Callers must run this inside
    /// a single guarded update (write lock or conditional SQL) so that
    /// concurrent review attempts cannot both succeed.
    pub fn review(self) -> Result<Self, LifecycleError> {
        match self {
            Self::Open => Ok(Self::Reviewed),
            Self::Reviewed => Err(LifecycleError::AlreadyReviewed),
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by lifecycle transition guards.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// The issue has already been reviewed; the first review's fields
    /// must not be overwritten.
    #[error("issue has already been reviewed")]
    AlreadyReviewed,
}

/// A doctor's review as submitted: all fields optional.
///
/// The original intake form does not force any single field, so an empty
/// note is representable; the report renderer substitutes placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewNote {
    /// Free-text assessment.
    pub text: Option<String>,
    /// Prescribed treatment.
    pub treatment: Option<String>,
    /// Precautions for the patient.
    pub precautions: Option<String>,
}

impl ReviewNote {
    /// Stamp this note into a persisted review record.
    ///
    /// The review timestamp is server-assigned by the caller, never taken
    /// from client input.
    pub fn into_record(self, reviewed_at: DateTime<Utc>) -> ReviewRecord {
        ReviewRecord {
            text: self.text,
            treatment: self.treatment,
            precautions: self.precautions,
            reviewed_at,
        }
    }
}

/// A persisted doctor review, set exactly once per issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    /// Free-text assessment.
    pub text: Option<String>,
    /// Prescribed treatment.
    pub treatment: Option<String>,
    /// Precautions for the patient.
    pub precautions: Option<String>,
    /// When the review was recorded (server-assigned).
    pub reviewed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn open_reviews_to_reviewed() {
        assert_eq!(IssueStatus::Open.review().unwrap(), IssueStatus::Reviewed);
    }

    #[test]
    fn second_review_is_rejected() {
        let reviewed = IssueStatus::Open.review().unwrap();
        assert_eq!(reviewed.review(), Err(LifecycleError::AlreadyReviewed));
    }

    #[test]
    fn reviewed_is_terminal_open_is_not() {
        assert!(!IssueStatus::Open.is_terminal());
        assert!(IssueStatus::Reviewed.is_terminal());
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&IssueStatus::Open).unwrap(),
            "\"OPEN\""
        );
        assert_eq!(
            serde_json::to_string(&IssueStatus::Reviewed).unwrap(),
            "\"REVIEWED\""
        );
    }

    #[test]
    fn from_name_round_trips_every_status() {
        for status in [IssueStatus::Open, IssueStatus::Reviewed] {
            assert_eq!(IssueStatus::from_name(status.as_str()), Some(status));
        }
    }

    #[test]
    fn from_name_rejects_unknown_and_removed_states() {
        assert_eq!(IssueStatus::from_name("ASSIGNED"), None);
        assert_eq!(IssueStatus::from_name("open"), None);
        assert_eq!(IssueStatus::from_name(""), None);
    }

    #[test]
    fn note_into_record_preserves_fields_and_stamps_time() {
        let now = Utc::now();
        let note = ReviewNote {
            text: Some("apply cream".into()),
            treatment: Some("hydrocortisone 1%".into()),
            precautions: None,
        };
        let record = note.into_record(now);
        assert_eq!(record.text.as_deref(), Some("apply cream"));
        assert_eq!(record.treatment.as_deref(), Some("hydrocortisone 1%"));
        assert!(record.precautions.is_none());
        assert_eq!(record.reviewed_at, now);
    }

    proptest! {
        /// Whatever sequence of review attempts is made, exactly the first
        /// one succeeds and the status ends up terminal.
        #[test]
        fn at_most_one_review_succeeds(attempts in 1usize..20) {
            let mut status = IssueStatus::Open;
            let mut successes = 0;
            for _ in 0..attempts {
                match status.review() {
                    Ok(next) => {
                        status = next;
                        successes += 1;
                    }
                    Err(LifecycleError::AlreadyReviewed) => {}
                }
            }
            prop_assert_eq!(successes, 1);
            prop_assert_eq!(status, IssueStatus::Reviewed);
        }
    }
}
