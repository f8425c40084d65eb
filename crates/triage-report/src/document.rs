//! # Report Document Assembly
//!
//! Builds the textual content of an issue report from a fully resolved
//! issue view. Every optional field has a placeholder so assembly can
//! never fail on missing data.

use triage_state::{IssueStatus, ReviewRecord};

/// Heading rendered at the top of the first page.
pub const REPORT_HEADING: &str = "Patient Issue Report";

/// Placeholder for an absent patient name.
const ANONYMOUS: &str = "Anonymous";
/// Placeholder for an absent email.
const NOT_AVAILABLE: &str = "N/A";
/// Placeholder for absent free-text fields.
const DASH: &str = "-";

/// The identity of a principal as it appears on a report.
#[derive(Debug, Clone, Default)]
pub struct ReportIdentity {
    /// Display name, if resolved.
    pub fullname: Option<String>,
    /// Email address, if resolved.
    pub email: Option<String>,
}

/// A fully resolved issue, ready to render.
#[derive(Debug, Clone)]
pub struct IssueReport {
    /// Issue title.
    pub title: String,
    /// Issue description, if provided.
    pub description: Option<String>,
    /// Current lifecycle status.
    pub status: IssueStatus,
    /// The owning patient's identity.
    pub patient: ReportIdentity,
    /// The doctor's review, if the issue has been reviewed.
    pub review: Option<ReviewRecord>,
}

impl IssueReport {
    /// Assemble the report body as lines of text.
    ///
    /// Multi-line field values are split so pagination operates on
    /// physical lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        lines.push(format!(
            "Patient: {}",
            self.patient.fullname.as_deref().unwrap_or(ANONYMOUS)
        ));
        lines.push(format!(
            "Email: {}",
            self.patient.email.as_deref().unwrap_or(NOT_AVAILABLE)
        ));
        lines.push(String::new());

        lines.push(format!("Title: {}", self.title));
        push_multiline(
            &mut lines,
            "Description",
            self.description.as_deref().unwrap_or(DASH),
        );
        lines.push(format!("Status: {}", self.status));
        lines.push(String::new());

        match &self.review {
            Some(review) => {
                lines.push("Doctor Review:".to_string());
                lines.push(format!(
                    "Review: {}",
                    review.text.as_deref().unwrap_or(DASH)
                ));
                lines.push(format!(
                    "Treatment: {}",
                    review.treatment.as_deref().unwrap_or(DASH)
                ));
                lines.push(format!(
                    "Precautions: {}",
                    review.precautions.as_deref().unwrap_or(DASH)
                ));
                lines.push(format!(
                    "Reviewed At: {}",
                    review.reviewed_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            None => lines.push("No doctor review yet.".to_string()),
        }

        lines
    }
}

/// Push `label: value`, continuing on separate lines when the value
/// itself spans lines.
fn push_multiline(lines: &mut Vec<String>, label: &str, value: &str) {
    let mut parts = value.lines();
    let first = parts.next().unwrap_or(DASH);
    lines.push(format!("{label}: {first}"));
    for part in parts {
        lines.push(part.to_string());
    }
}
