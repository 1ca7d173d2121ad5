//! Run orchestration: capture, concurrent OCR, ordering, assembly.
//!
//! Capture is strictly sequential (each screenshot depends on the previous
//! page turn), recognition is concurrent up to the configured limit, and
//! results are re-sorted by page index before assembly so the output order
//! never depends on OCR completion order.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::capture::{self, CaptureSource, CapturedPage};
use crate::config::RunConfig;
use crate::error::{PageError, PagesnapError};
use crate::ocr::{normalize, Fragment, OcrBackend, PageGeometry};
use crate::output::{Document, PageResult, RunStats};
use crate::pipeline::{assemble, detect, pdf, reading_order};

/// Outcome of recognizing one page, before reading-order reconstruction.
struct RecognizedPage {
    page_index: usize,
    fragments: Vec<Fragment>,
    duration_ms: u64,
    retries: u8,
    error: Option<PageError>,
}

/// Run the full pipeline: capture every page, recognize them concurrently,
/// reconstruct reading order, and assemble the Markdown transcript and the
/// searchable PDF.
///
/// Page-level OCR failures are non-fatal: the failed page keeps its slot in
/// both artifacts as an empty page carrying the error. The run only fails
/// outright when nothing was captured, the configuration is invalid, or an
/// artifact cannot be built.
pub async fn run(
    source: &mut dyn CaptureSource,
    backend: Arc<dyn OcrBackend>,
    config: &RunConfig,
) -> Result<Document, PagesnapError> {
    config.validate()?;
    let run_start = Instant::now();

    // Phase 1: sequential capture.
    let capture_start = Instant::now();
    let captured = capture::capture_all(source, config.max_pages)?;
    let capture_duration_ms = capture_start.elapsed().as_millis() as u64;

    if captured.is_empty() {
        return Err(PagesnapError::NoPagesCaptured);
    }
    info!(
        pages = captured.len(),
        backend = backend.name(),
        "Captured pages; starting recognition"
    );
    config.progress.on_run_start(captured.len());

    let captured: Vec<Arc<CapturedPage>> = captured.into_iter().map(Arc::new).collect();

    // Phase 2: concurrent OCR, bounded by the configured concurrency.
    let ocr_start = Instant::now();
    let mut recognized: Vec<RecognizedPage> = stream::iter(captured.iter().cloned())
        .map(|page| recognize_page(page, backend.clone(), config))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;
    // Completion order is arbitrary; page order is not.
    recognized.sort_by_key(|r| r.page_index);
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // Phase 3: resolve the typesetting direction and order every page.
    let assemble_start = Instant::now();
    let layout = match config.layout.forced() {
        Some(layout) => layout,
        None => {
            let sample = recognized
                .iter()
                .find(|r| !r.fragments.is_empty())
                .map(|r| r.fragments.as_slice())
                .unwrap_or(&[]);
            let (detected, confidence) = detect::detect_layout(sample);
            info!(?detected, confidence, "Auto-detected typesetting direction");
            detected
        }
    };

    let pages: Vec<PageResult> = recognized
        .into_iter()
        .map(|r| {
            let ordered = if r.fragments.is_empty() {
                reading_order::OrderedPage::empty(r.page_index)
            } else {
                reading_order::reconstruct(r.page_index, r.fragments, layout, &config.tolerances)
            };
            PageResult {
                page_index: r.page_index,
                ordered,
                duration_ms: r.duration_ms,
                retries: r.retries,
                error: r.error,
            }
        })
        .collect();

    // Phase 4: assemble both artifacts from the same ordered fragments.
    let markdown = assemble::assemble_markdown(&pages, &config.page_separator, config.merge_paragraphs);

    let pdf_options = pdf::PdfOptions {
        dpi: config.pdf_dpi,
        font_path: config.font_path.clone(),
        title: config.title.clone(),
    };
    let pdf_input = captured.clone();
    let (pages, pdf_bytes) = tokio::task::spawn_blocking(move || {
        let bytes = pdf::build_pdf(&pdf_input, &pages, &pdf_options);
        (pages, bytes)
    })
    .await
    .map_err(|err| PagesnapError::Internal(format!("PDF task panicked: {err}")))?;
    let pdf_bytes = pdf_bytes?;
    let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

    let stats = RunStats {
        captured_pages: captured.len(),
        processed_pages: pages.iter().filter(|p| p.error.is_none()).count(),
        failed_pages: pages.iter().filter(|p| p.error.is_some()).count(),
        total_fragments: pages.iter().map(PageResult::fragment_count).sum(),
        capture_duration_ms,
        ocr_duration_ms,
        assemble_duration_ms,
        total_duration_ms: run_start.elapsed().as_millis() as u64,
    };
    info!(
        pages = stats.captured_pages,
        failed = stats.failed_pages,
        fragments = stats.total_fragments,
        elapsed_ms = stats.total_duration_ms,
        "Run complete"
    );
    config.progress.on_run_complete(&stats);

    Ok(Document {
        pages,
        markdown,
        pdf_bytes,
        stats,
    })
}

/// Recognize one page with retries, returning normalized fragments.
///
/// The backend call runs on a blocking worker thread. Failures back off
/// exponentially from the configured base; when every attempt fails the
/// page is reported with zero fragments and the error attached.
async fn recognize_page(
    page: Arc<CapturedPage>,
    backend: Arc<dyn OcrBackend>,
    config: &RunConfig,
) -> RecognizedPage {
    let page_index = page.index;
    let start = Instant::now();
    config.progress.on_page_start(page_index);

    let mut last_error = String::new();
    let mut retries: u8 = 0;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            retries = attempt;
            let backoff = retry_backoff_ms(config.retry_backoff_ms, attempt);
            debug!(page = page_index, attempt, backoff_ms = backoff, "Retrying OCR");
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        let task_page = page.clone();
        let task_backend = backend.clone();
        let frame = backend.coord_frame();
        let outcome = tokio::task::spawn_blocking(move || {
            let geometry = PageGeometry::of(&task_page);
            task_backend
                .recognize(&task_page)
                .map(|raw| normalize::normalize(raw, frame, &geometry))
        })
        .await;

        match outcome {
            Ok(Ok(fragments)) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                debug!(
                    page = page_index,
                    fragments = fragments.len(),
                    duration_ms,
                    "Page recognized"
                );
                config
                    .progress
                    .on_page_complete(page_index, fragments.len(), duration_ms);
                return RecognizedPage {
                    page_index,
                    fragments,
                    duration_ms,
                    retries,
                    error: None,
                };
            }
            Ok(Err(err)) => {
                warn!(page = page_index, attempt, "OCR failed: {err}");
                last_error = err.to_string();
            }
            Err(join_err) => {
                warn!(page = page_index, attempt, "OCR task panicked: {join_err}");
                last_error = format!("recognition task panicked: {join_err}");
            }
        }
    }

    let error = PageError::BackendFailed {
        page: page_index,
        retries,
        detail: last_error,
    };
    warn!(page = page_index, "Page failed after all retries; keeping empty slot");
    config.progress.on_page_error(page_index, &error);
    RecognizedPage {
        page_index,
        fragments: Vec::new(),
        duration_ms: start.elapsed().as_millis() as u64,
        retries,
        error: Some(error),
    }
}

/// Backoff before retry `attempt` (1-based): the base doubled per attempt,
/// with the exponent capped so large retry counts saturate instead of
/// overflowing the shift.
fn retry_backoff_ms(base_ms: u64, attempt: u8) -> u64 {
    let exp = u32::from(attempt.saturating_sub(1)).min(u64::BITS - 1);
    base_ms.saturating_mul(1u64 << exp)
}

/// Run the pipeline and write both artifacts to disk.
///
/// Each file is written to a `.tmp` sibling first and renamed into place,
/// so a crash never leaves a half-written transcript or PDF at the final
/// path.
pub async fn run_to_files(
    source: &mut dyn CaptureSource,
    backend: Arc<dyn OcrBackend>,
    config: &RunConfig,
    markdown_path: &Path,
    pdf_path: &Path,
) -> Result<Document, PagesnapError> {
    let document = run(source, backend, config).await?;
    write_atomic(markdown_path, document.markdown.as_bytes()).await?;
    write_atomic(pdf_path, &document.pdf_bytes).await?;
    info!(
        markdown = %markdown_path.display(),
        pdf = %pdf_path.display(),
        "Artifacts written"
    );
    Ok(document)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PagesnapError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    let write = async {
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await
    };
    write.await.map_err(|source| PagesnapError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Blocking wrapper around [`run`] for callers without an async runtime.
pub fn run_sync(
    source: &mut dyn CaptureSource,
    backend: Arc<dyn OcrBackend>,
    config: &RunConfig,
) -> Result<Document, PagesnapError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|err| PagesnapError::Internal(format!("failed to start runtime: {err}")))?;
    runtime.block_on(run(source, backend, config))
}

#[cfg(test)]
mod tests {
    use super::retry_backoff_ms;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(retry_backoff_ms(250, 1), 250);
        assert_eq!(retry_backoff_ms(250, 2), 500);
        assert_eq!(retry_backoff_ms(250, 3), 1000);
    }

    #[test]
    fn backoff_saturates_for_large_retry_counts() {
        // Shift exponent is capped; no overflow panic, just saturation.
        assert_eq!(retry_backoff_ms(250, u8::MAX), u64::MAX);
        assert_eq!(retry_backoff_ms(0, u8::MAX), 0);
    }
}
