//! Error types for the pdfops library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`PdfOpsError`]: **Fatal.** The job cannot produce its output (bad
//!   options, wrong file type, invalid page range, cancellation, collaborator
//!   failure). Returned as `Err(PdfOpsError)` from [`crate::job::run_job`] and
//!   friends; together with `Ok(JobOutput)` it is the job's typed outcome.
//!
//! * [`PageRangeError`]: a page selection that does not fit the document.
//!   Always detected before any collaborator I/O and wrapped in
//!   [`PdfOpsError::InvalidPageRange`].
//!
//! * [`PageError`]: **Non-fatal.** One OCR page failed to rasterise or
//!   recognise. Stored inside [`crate::output::PageText`] and rendered as an
//!   inline marker; the remaining pages still run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfops library.
#[derive(Debug, Error)]
pub enum PdfOpsError {
    // ── Validation errors (raised before any collaborator I/O) ────────────
    /// Missing or contradictory job input.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// An input file is not of the type the operation accepts.
    #[error("Invalid file type for '{name}': expected {expected}")]
    InvalidFileType { name: String, expected: String },

    /// A page selection or range does not fit the document.
    #[error(transparent)]
    InvalidPageRange(#[from] PageRangeError),

    /// The selection resolved to zero pages for an operation that needs one.
    #[error("No valid pages selected (document has {total} pages)")]
    NoValidPages { total: usize },

    // ── Run-time outcomes ────────────────────────────────────────────────
    /// The caller's cancellation token was set between units of work.
    #[error("Processing cancelled")]
    Cancelled,

    /// A collaborator (document model, rasteriser, recogniser) failed.
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// The document is encrypted and cannot be processed.
    #[error("Document '{name}' is encrypted.\nRemove the password first, e.g. qpdf --decrypt input.pdf output.pdf")]
    Encrypted { name: String },

    // ── Input / output errors ─────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Collaborator setup errors ─────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Rasterising operations (ocr, recolor) need libpdfium.\n\
  • Install it system-wide, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    /// The vision provider backing OCR is not initialised (missing API key etc.).
    #[error("Recognition provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable classification of [`PdfOpsError`] for exit codes and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidOptions,
    InvalidFileType,
    InvalidPageRange,
    ProcessingCancelled,
    ProcessingFailed,
    EncryptedDocument,
}

impl PdfOpsError {
    /// Classify the error into one of the job-level outcome kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfOpsError::InvalidOptions(_)
            | PdfOpsError::FileNotFound { .. }
            | PdfOpsError::PermissionDenied { .. } => ErrorKind::InvalidOptions,
            PdfOpsError::InvalidFileType { .. } => ErrorKind::InvalidFileType,
            PdfOpsError::InvalidPageRange(_) | PdfOpsError::NoValidPages { .. } => {
                ErrorKind::InvalidPageRange
            }
            PdfOpsError::Cancelled => ErrorKind::ProcessingCancelled,
            PdfOpsError::Encrypted { .. } => ErrorKind::EncryptedDocument,
            PdfOpsError::ProcessingFailed(_)
            | PdfOpsError::OutputWriteFailed { .. }
            | PdfOpsError::PdfiumBindingFailed(_)
            | PdfOpsError::ProviderNotConfigured { .. }
            | PdfOpsError::Internal(_) => ErrorKind::ProcessingFailed,
        }
    }

    /// `true` when the job stopped because the caller asked it to.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PdfOpsError::Cancelled)
    }
}

/// A page selection that does not fit the document.
///
/// `position` is the 1-based position of the offending entry in the caller's
/// list, so error messages point at what the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PageRangeError {
    /// A range starts before page 1.
    #[error("Range {position}: start page {start} is below 1")]
    StartBelowOne { position: usize, start: u32 },

    /// A range ends before it starts.
    #[error("Range {position}: end page {end} is before start page {start}")]
    EndBeforeStart { position: usize, start: u32, end: u32 },

    /// A range ends past the last page.
    #[error("Range {position}: end page {end} exceeds the document's {total} pages")]
    EndBeyondDocument { position: usize, end: u32, total: usize },

    /// A single page number is outside `1..=total`.
    #[error("Page entry {position}: page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { position: usize, page: u32, total: usize },
}

impl PageRangeError {
    /// 1-based position of the offending entry in the input list.
    pub fn position(&self) -> usize {
        match self {
            PageRangeError::StartBelowOne { position, .. }
            | PageRangeError::EndBeforeStart { position, .. }
            | PageRangeError::EndBeyondDocument { position, .. }
            | PageRangeError::PageOutOfRange { position, .. } => *position,
        }
    }
}

/// A non-fatal error for a single OCR page.
///
/// Stored alongside [`crate::output::PageText`] when a page fails.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum PageError {
    /// The recognition engine failed on this page.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },
}

impl PageError {
    /// Inline marker placed in the assembled text instead of the page's content.
    pub fn marker(&self) -> String {
        match self {
            PageError::RecognitionFailed { page, detail } => {
                format!("[OCR failed on page {page}: {detail}]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_error_names_position_and_bound() {
        let e = PdfOpsError::from(PageRangeError::EndBeyondDocument {
            position: 1,
            end: 14,
            total: 12,
        });
        let msg = e.to_string();
        assert!(msg.contains("Range 1"), "got: {msg}");
        assert!(msg.contains("14"), "got: {msg}");
        assert!(msg.contains("12 pages"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::InvalidPageRange);
    }

    #[test]
    fn no_valid_pages_is_distinct_from_range_error() {
        let e = PdfOpsError::NoValidPages { total: 3 };
        assert!(!matches!(e, PdfOpsError::InvalidPageRange(_)));
        assert_eq!(e.kind(), ErrorKind::InvalidPageRange);
        assert!(e.to_string().contains("3 pages"));
    }

    #[test]
    fn cancelled_kind() {
        assert!(PdfOpsError::Cancelled.is_cancelled());
        assert_eq!(
            PdfOpsError::Cancelled.kind(),
            ErrorKind::ProcessingCancelled
        );
    }

    #[test]
    fn encrypted_display() {
        let e = PdfOpsError::Encrypted {
            name: "secret.pdf".into(),
        };
        assert!(e.to_string().contains("secret.pdf"));
        assert_eq!(e.kind(), ErrorKind::EncryptedDocument);
    }

    #[test]
    fn page_error_marker() {
        let e = PageError::RecognitionFailed {
            page: 4,
            detail: "timeout".into(),
        };
        assert_eq!(e.marker(), "[OCR failed on page 4: timeout]");
        assert_eq!(PageRangeError::StartBelowOne { position: 2, start: 0 }.position(), 2);
    }
}
