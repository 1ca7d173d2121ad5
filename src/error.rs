//! Error types for the pagesnap library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PagesnapError`] — **Fatal**: the run cannot proceed at all (zero pages
//!   captured, invalid configuration, unreadable font file). Returned as
//!   `Err(PagesnapError)` from the top-level `run*` functions.
//!
//! * [`PageError`] — **Non-fatal**: OCR failed on a single page (backend
//!   crash, transient engine error) but all other pages are fine. Stored
//!   inside [`crate::output::PageResult`] so callers can inspect partial
//!   success rather than losing the whole book to one bad page. A failed
//!   page still occupies its slot in both output artifacts, with an empty
//!   text layer.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first page failure, log and continue, or re-run OCR on just the failed
//! pages afterwards.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagesnap library.
///
/// Page-level OCR failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PagesnapError {
    /// The capture source produced no pages at all; there is no valid
    /// document to assemble.
    #[error("No pages were captured — nothing to assemble")]
    NoPagesCaptured,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The capture source failed before yielding a single page.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The TTF font configured for the PDF text layer could not be loaded.
    #[error("Failed to load font '{path}': {detail}")]
    FontLoadFailed { path: PathBuf, detail: String },

    /// Could not write an output artifact to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by a [`crate::capture::CaptureSource`] implementation.
///
/// When a source fails mid-run the pipeline keeps the pages captured so far
/// and assembles a partial document; this error only becomes fatal when no
/// page was captured before the failure.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A capture file or directory could not be read.
    #[error("Failed to read capture '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A capture file exists but is not a decodable image.
    #[error("Failed to decode capture '{path}': {detail}")]
    Decode { path: PathBuf, detail: String },
}

/// An error returned by an [`crate::ocr::OcrBackend`] for one page.
///
/// Deliberately opaque: the pipeline treats every backend failure the same
/// way (retry, then record and continue with zero fragments), so there is
/// nothing to gain from a variant per provider.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// The overall run continues; the page contributes its image and an empty
/// text slot to the outputs.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The OCR backend failed after all retries.
    #[error("Page {page}: OCR failed after {retries} retries: {detail}")]
    BackendFailed {
        page: usize,
        retries: u8,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failed_display() {
        let e = PageError::BackendFailed {
            page: 3,
            retries: 2,
            detail: "engine panicked".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 3"), "got: {msg}");
        assert!(msg.contains("2 retries"), "got: {msg}");
    }

    #[test]
    fn no_pages_display() {
        let msg = PagesnapError::NoPagesCaptured.to_string();
        assert!(msg.contains("No pages"), "got: {msg}");
    }

    #[test]
    fn capture_error_converts_to_fatal() {
        let e = CaptureError::Decode {
            path: PathBuf::from("page_1.png"),
            detail: "truncated".into(),
        };
        let fatal: PagesnapError = e.into();
        assert!(fatal.to_string().contains("page_1.png"));
    }
}
