//! # pagesnap
//!
//! Turn a sequence of e-reader page captures into a Markdown transcript
//! and a searchable PDF.
//!
//! The pipeline runs in four phases:
//!
//! ```text
//! capture (sequential, duplicate-detected)
//!     → OCR (concurrent, pluggable backends, per-page retries)
//!     → reading order (horizontal lines or vertical right-to-left columns)
//!     → assembly (Markdown transcript + PDF with invisible text layer)
//! ```
//!
//! Capture stops automatically when two consecutive pages show identical
//! content — the page-turn had no effect, so the book has ended. OCR
//! backends plug in behind [`ocr::OcrBackend`] and may speak any coordinate
//! convention; results are normalized to pixel top-left coordinates before
//! ordering. Both output artifacts derive from the same ordered fragments,
//! so the transcript and the PDF text layer never disagree.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pagesnap::capture::{DirectoryCaptureSource, PageRegion};
//! use pagesnap::config::RunConfig;
//! use pagesnap::ocr::sidecar::SidecarBackend;
//!
//! # async fn demo() -> Result<(), pagesnap::error::PagesnapError> {
//! let mut source = DirectoryCaptureSource::new("captures/", PageRegion::Full)?;
//! let backend = Arc::new(SidecarBackend::new());
//! let config = RunConfig::default();
//!
//! let document = pagesnap::run(&mut source, backend, &config).await?;
//! println!("{} pages, {} fragments", document.page_count(), document.stats.total_fragments);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod convert;
pub mod error;
pub mod ocr;
pub mod output;
pub mod pipeline;
pub mod progress;

pub use capture::{CaptureSource, CapturedPage, DirectoryCaptureSource, PageRegion};
pub use config::{LayoutMode, RunConfig, RunConfigBuilder};
pub use convert::{run, run_sync, run_to_files};
pub use error::{PageError, PagesnapError};
pub use ocr::{Fragment, OcrBackend};
pub use output::{Document, PageResult, RunStats};
pub use pipeline::assemble::PageSeparator;
pub use pipeline::reading_order::{ResolvedLayout, Tolerances};
pub use progress::RunProgressCallback;
