//! Progress reporting for long-running conversions.

use crate::error::PageError;
use crate::output::RunStats;

/// Callback surface for observing a run.
///
/// All methods have no-op defaults, so implementors override only what
/// they care about. Page events arrive from concurrent workers and are
/// not ordered by page index.
pub trait RunProgressCallback: Send + Sync {
    /// Capture finished; `total_pages` pages are about to be recognized.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// A page's OCR is starting.
    fn on_page_start(&self, page_index: usize) {
        let _ = page_index;
    }

    /// A page finished successfully.
    fn on_page_complete(&self, page_index: usize, fragments: usize, duration_ms: u64) {
        let _ = (page_index, fragments, duration_ms);
    }

    /// A page failed after all retries. The run continues.
    fn on_page_error(&self, page_index: usize, error: &PageError) {
        let _ = (page_index, error);
    }

    /// The run finished and both artifacts are built.
    fn on_run_complete(&self, stats: &RunStats) {
        let _ = stats;
    }
}

/// Callback that reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl RunProgressCallback for NoProgress {}
