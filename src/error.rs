//! Error types for the conteur library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConteurError`] — **Fatal**: the operation cannot proceed at all
//!   (template PDF missing, record failed validation, unknown id). Returned
//!   as `Err(ConteurError)` from the top-level `generate*` and load
//!   functions.
//!
//! * [`PreviewError`] — **Non-fatal**: a single page failed to paint (render
//!   glitch) or the render was superseded before it could apply. Stored
//!   inside per-page results so callers can inspect partial success rather
//!   than losing the whole story to one bad page.
//!
//! Cancellation is deliberately its own [`PreviewError`] variant: a
//! superseded render is expected behaviour, never something to surface to
//! the user as a failure.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the conteur library.
///
/// Page-level failures use [`PreviewError`] and are stored alongside page
/// results rather than propagated here.
#[derive(Debug, Error)]
pub enum ConteurError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Template PDF was not found at the given path.
    #[error("template PDF not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("file is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("template PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Requested page number exceeds the document's page count.
    #[error("page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Record errors ─────────────────────────────────────────────────────
    /// A record (template, element, histoire, user) failed schema validation.
    ///
    /// Carries every field-level violation, not just the first, so a form
    /// can show all problems at once.
    #[error("validation failed: {}", format_violations(.violations))]
    Validation {
        violations: Vec<crate::schema::FieldViolation>,
    },

    /// A record id was looked up but does not exist.
    #[error("{kind} not found: '{id}'")]
    NotFound { kind: &'static str, id: String },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// A data URI handed to the raster collaborator was malformed.
    ///
    /// The triggering input is never persisted; only the reason travels up.
    #[error("invalid image data URI: {reason}")]
    InvalidDataUri { reason: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// Every page preview failed; the story output would be empty.
    #[error("all {total} page previews failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// The stored session token is expired or invalid.
    ///
    /// Intercepted at the session-check chokepoint in
    /// [`crate::store::SessionStore`]; local state is cleared without any
    /// remote call.
    #[error("session is expired or invalid")]
    AuthExpired,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write a generated output file.
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persistence adapter behind a store failed.
    #[error("store adapter error: {0}")]
    StoreAdapter(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "failed to bind to pdfium library: {0}\n\
         Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_violations(violations: &[crate::schema::FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A non-fatal error for a single preview page.
///
/// Stored alongside per-page results when a paint fails. The overall
/// generation continues unless ALL pages fail.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PreviewError {
    /// Page rasterisation failed. Navigating away and back re-attempts it.
    #[error("page {page}: render failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The render was superseded by a newer (page, zoom) request before it
    /// could apply. Not a failure; never shown to the user.
    #[error("page {page}: render superseded")]
    Cancelled { page: usize },

    /// The document could not be loaded; recoverable via a user retry.
    #[error("document load failed: {detail}")]
    LoadFailed { detail: String },
}

impl PreviewError {
    /// True for superseded renders, which callers should silently drop.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PreviewError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldViolation;

    #[test]
    fn validation_display_lists_all_fields() {
        let e = ConteurError::Validation {
            violations: vec![
                FieldViolation::missing("title"),
                FieldViolation::bad_enum("gender", "robot", &["boy", "girl", "neutral"]),
            ],
        };
        let msg = e.to_string();
        assert!(msg.contains("title"), "got: {msg}");
        assert!(msg.contains("gender"), "got: {msg}");
    }

    #[test]
    fn not_found_display() {
        let e = ConteurError::NotFound {
            kind: "template",
            id: "tmpl-42".into(),
        };
        assert!(e.to_string().contains("template"));
        assert!(e.to_string().contains("tmpl-42"));
    }

    #[test]
    fn cancelled_is_cancellation() {
        assert!(PreviewError::Cancelled { page: 2 }.is_cancellation());
        assert!(!PreviewError::RenderFailed {
            page: 2,
            detail: "x".into()
        }
        .is_cancellation());
    }

    #[test]
    fn page_out_of_range_display() {
        let e = ConteurError::PageOutOfRange { page: 9, total: 4 };
        assert!(e.to_string().contains("9"));
        assert!(e.to_string().contains("4 pages"));
    }
}
