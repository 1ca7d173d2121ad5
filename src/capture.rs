//! Page capture model: captured pages, fingerprints, and the end-of-book
//! detector.
//!
//! The actual screen capture (activating the reader application, pressing
//! the page-turn key, invoking the OS screenshot utility) is an external
//! collaborator, modeled by the [`CaptureSource`] trait. What lives here is
//! everything the pipeline needs to reason about captured pages:
//!
//! * [`CapturedPage`] — one page image plus its content fingerprint.
//! * [`should_stop`] — the duplicate detector that decides when the book
//!   has ended: an e-reader shows the same content twice in a row exactly
//!   when the page-turn input had no further effect.
//! * [`capture_all`] — the strictly sequential capture loop that drives a
//!   source, applies the detector, and discards the final duplicate.
//! * [`DirectoryCaptureSource`] — a ready-made source over a directory of
//!   previously captured `page_N.png` files.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::CaptureError;

/// Which part of the reader window a page was cropped from.
///
/// Dual-page reader layouts are captured one half at a time; `Full` captures
/// the whole content area. The region only affects cropping upstream, but it
/// is carried on every page so the duplicate detector can refuse to compare
/// pages captured under different settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageRegion {
    Left,
    Right,
    #[default]
    Full,
}

/// One captured e-reader page. Immutable once produced.
///
/// `index` values are assigned by the capture source and must be contiguous
/// from 0. The fingerprint is computed at construction so the detector never
/// re-hashes an image.
#[derive(Debug, Clone)]
pub struct CapturedPage {
    /// Ordinal of this page within the run, starting at 0.
    pub index: usize,
    /// The cropped page image at native capture resolution.
    pub image: DynamicImage,
    /// Crop region this page was captured with.
    pub region: PageRegion,
    /// Content digest of the image pixels (lowercase hex).
    pub fingerprint: String,
    /// File the image was loaded from, when the source is file-backed.
    /// Sidecar OCR backends use this to locate per-page fixtures.
    pub source: Option<PathBuf>,
}

impl CapturedPage {
    pub fn new(index: usize, image: DynamicImage, region: PageRegion) -> Self {
        let fingerprint = fingerprint_image(&image);
        Self {
            index,
            image,
            region,
            fingerprint,
            source: None,
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Compute the content fingerprint of a page image.
///
/// SHA-256 over the raw RGB8 bytes, prefixed with the pixel dimensions so
/// images whose buffers happen to coincide at different shapes cannot
/// collide. Deterministic for identical input bytes; capture noise is not
/// tolerated — e-reader screenshots of the same page are byte-identical
/// because the content is rendered, not photographed.
pub fn fingerprint_image(image: &DynamicImage) -> String {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut hasher = Sha256::new();
    hasher.update(width.to_le_bytes());
    hasher.update(height.to_le_bytes());
    hasher.update(rgb.as_raw());
    hex::encode(hasher.finalize())
}

/// Decide whether page capture has reached the end of the book.
///
/// Returns `true` iff `previous` exists and shows the same content as
/// `current`: the page-turn input had no further effect, so the last page
/// has been reached. Pure comparison, no side effects — the capture loop is
/// responsible for discarding the duplicate.
///
/// A geometry or region mismatch between the two pages (the capture
/// configuration changed mid-run) is treated as "not equal" rather than an
/// error: never stopping is the safe answer to a caller mistake.
///
/// Known limitation: a book whose last two pages are genuinely identical is
/// indistinguishable from the true end and stops one page early.
pub fn should_stop(previous: Option<&CapturedPage>, current: &CapturedPage) -> bool {
    let Some(prev) = previous else {
        return false;
    };
    if prev.region != current.region
        || prev.width() != current.width()
        || prev.height() != current.height()
    {
        debug!(
            prev_index = prev.index,
            index = current.index,
            "Capture geometry changed between pages; not treating as duplicate"
        );
        return false;
    }
    prev.fingerprint == current.fingerprint
}

/// A source of captured pages.
///
/// Implementations yield pages with strictly increasing, contiguous indices
/// starting at 0, and return `Ok(None)` when there is no more input (either
/// the natural end of the directory, or an explicit abort upstream).
pub trait CaptureSource {
    fn next_page(&mut self) -> Result<Option<CapturedPage>, CaptureError>;
}

/// Drive a capture source to completion, applying the end-of-book detector.
///
/// Capture is strictly sequential: each screenshot causally depends on the
/// previous page-turn action, so there is nothing to parallelise here.
///
/// Exactly one page — the final duplicate — is discarded when the detector
/// fires; it is never OCR'd or assembled. The loop also stops at `max_pages`
/// (runaway protection when a book never produces a duplicate) and when the
/// source signals exhaustion.
///
/// A source error after at least one successful page is demoted to a
/// warning: the pages captured so far still form a valid partial run.
pub fn capture_all(
    source: &mut dyn CaptureSource,
    max_pages: usize,
) -> Result<Vec<CapturedPage>, CaptureError> {
    let mut pages: Vec<CapturedPage> = Vec::new();

    loop {
        let page = match source.next_page() {
            Ok(Some(page)) => page,
            Ok(None) => break,
            Err(err) => {
                if pages.is_empty() {
                    return Err(err);
                }
                warn!(pages = pages.len(), "Capture aborted: {err}; assembling partial run");
                break;
            }
        };

        if should_stop(pages.last(), &page) {
            info!(index = page.index, "Reached the last page; discarding duplicate capture");
            break;
        }

        pages.push(page);

        if pages.len() >= max_pages {
            warn!(max_pages, "Reached the page cap without detecting the end of the book");
            break;
        }
    }

    Ok(pages)
}

// ── Directory source ─────────────────────────────────────────────────────

static RE_PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").unwrap());

/// Capture source over a directory of already-captured page images.
///
/// Mirrors the "resume from screenshots" mode of interactive capture tools:
/// `page_1.png`, `page_2.png`, … are sorted by their embedded number (then
/// by name, for files without one) and re-indexed contiguously from 0. The
/// duplicate detector still applies, so a directory that ends with two
/// identical captures assembles without the trailing duplicate.
pub struct DirectoryCaptureSource {
    files: VecDeque<PathBuf>,
    region: PageRegion,
    next_index: usize,
}

impl DirectoryCaptureSource {
    pub fn new(dir: impl AsRef<Path>, region: PageRegion) -> Result<Self, CaptureError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| CaptureError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("png") | Some("jpg") | Some("jpeg")
                )
            })
            .collect();

        files.sort_by_key(|path| (page_number_of(path), path.clone()));
        debug!(dir = %dir.display(), count = files.len(), "Scanned capture directory");

        Ok(Self {
            files: files.into(),
            region,
            next_index: 0,
        })
    }

    /// Number of image files remaining in the source.
    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

/// Extract the page number embedded in a capture filename (`page_12.png`
/// → 12). Files without a number sort first, among themselves by name.
fn page_number_of(path: &Path) -> u64 {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    RE_PAGE_NUMBER
        .captures(stem)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

impl CaptureSource for DirectoryCaptureSource {
    fn next_page(&mut self) -> Result<Option<CapturedPage>, CaptureError> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };

        let image = image::open(&path).map_err(|err| CaptureError::Decode {
            path: path.clone(),
            detail: err.to_string(),
        })?;

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(
            CapturedPage::new(index, image, self.region).with_source(path),
        ))
    }
}
