#![deny(missing_docs)]

//! # triage-report — Issue Report Rendering
//!
//! Turns a fully resolved issue (identities populated) into a paginated
//! document streamed to a byte sink.
//!
//! Rendering is isolated from the issue lifecycle: a [`RenderError`] never
//! surfaces as a lifecycle error and cannot touch issue state. Absent
//! optional fields never fail a render — the document substitutes
//! placeholders instead.
//!
//! The built-in [`PdfRenderer`] emits a small, self-contained PDF (plain
//! text objects, Helvetica, one content stream per page). A deployment
//! that renders through an external document service implements
//! [`ReportRenderer`] over its own client instead.

pub mod document;
pub mod pdf;

use std::io::Write;

pub use document::{IssueReport, ReportIdentity};

/// Errors raised while rendering a report.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Writing to the output sink failed.
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders an [`IssueReport`] to a byte sink.
pub trait ReportRenderer {
    /// Stream the rendered document into `out`.
    fn render(&self, report: &IssueReport, out: &mut dyn Write) -> Result<(), RenderError>;

    /// MIME type of the rendered output.
    fn content_type(&self) -> &'static str;
}

/// Renderer producing a minimal paginated PDF.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    lines_per_page: usize,
}

impl PdfRenderer {
    /// Create a renderer with the default page capacity.
    pub fn new() -> Self {
        Self { lines_per_page: 44 }
    }

    /// Override the number of body lines per page (minimum 1).
    pub fn with_lines_per_page(lines_per_page: usize) -> Self {
        Self {
            lines_per_page: lines_per_page.max(1),
        }
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRenderer for PdfRenderer {
    fn render(&self, report: &IssueReport, out: &mut dyn Write) -> Result<(), RenderError> {
        pdf::write_pdf(
            document::REPORT_HEADING,
            &report.lines(),
            self.lines_per_page,
            out,
        )?;
        Ok(())
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }
}
