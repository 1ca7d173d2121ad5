//! Output types: per-page results, run statistics, and the final document.

use serde::{Deserialize, Serialize};

use crate::error::PageError;
use crate::pipeline::reading_order::OrderedPage;

/// The outcome of recognizing and ordering one page.
///
/// Always produced, even when OCR failed — a failed page carries an empty
/// [`OrderedPage`] plus the error, and still occupies its slot in both
/// output artifacts so page indices stay aligned with the capture sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// Index of the captured page, 0-based.
    pub page_index: usize,
    /// Fragments in reading order with their joined text.
    pub ordered: OrderedPage,
    /// Wall-clock OCR + ordering time for this page.
    pub duration_ms: u64,
    /// Number of retries the OCR call needed.
    pub retries: u8,
    /// Set when the backend failed after all retries.
    pub error: Option<PageError>,
}

impl PageResult {
    /// Number of recognized fragments on this page.
    pub fn fragment_count(&self) -> usize {
        self.ordered.fragments.len()
    }
}

/// Statistics about a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages captured (after discarding the end-of-book duplicate).
    pub captured_pages: usize,
    /// Pages whose OCR succeeded.
    pub processed_pages: usize,
    /// Pages whose OCR failed after retries (still present in the output).
    pub failed_pages: usize,
    /// Total recognized fragments across all pages.
    pub total_fragments: usize,
    /// Time spent driving the capture source.
    pub capture_duration_ms: u64,
    /// Time spent in OCR and reading-order reconstruction.
    pub ocr_duration_ms: u64,
    /// Time spent assembling the Markdown and PDF artifacts.
    pub assemble_duration_ms: u64,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
}

/// The two aligned artifacts of a run, plus per-page detail.
///
/// `pages` is in strict page-index order with no gaps; `markdown` and
/// `pdf_bytes` are derived from the same ordered fragments and never
/// diverge in content.
#[derive(Debug, Clone)]
pub struct Document {
    /// One entry per captured page, in page-index order.
    pub pages: Vec<PageResult>,
    /// The assembled Markdown transcript.
    pub markdown: String,
    /// The searchable PDF: page images with an invisible text layer.
    pub pdf_bytes: Vec<u8>,
    /// Run statistics.
    pub stats: RunStats,
}

impl Document {
    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Iterate over pages that failed OCR.
    pub fn failed_pages(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| p.error.is_some())
    }
}
