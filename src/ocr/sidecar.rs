//! Sidecar backend: pre-computed OCR results stored next to each capture.
//!
//! For every `page_N.png` the backend reads `page_N.json`, a JSON array of
//! [`RawFragment`]s:
//!
//! ```json
//! [
//!   { "text": "吾輩は猫である", "bbox": [812.0, 40.0, 28.0, 420.0], "confidence": 0.98 },
//!   { "text": "名前はまだ無い", "bbox": [770.0, 40.0, 28.0, 390.0] }
//! ]
//! ```
//!
//! This keeps the pipeline fully testable without any OCR engine installed,
//! and lets a run whose recognition was done by an external tool (a cloud
//! API, a platform OCR service) be re-assembled offline.

use std::path::Path;

use tracing::debug;

use super::{CoordFrame, OcrBackend, RawFragment};
use crate::capture::CapturedPage;
use crate::error::BackendError;

/// OCR backend that loads recognition results from JSON sidecar files.
pub struct SidecarBackend {
    frame: CoordFrame,
}

impl SidecarBackend {
    /// Sidecars holding pixel, top-left-origin boxes (the canonical frame,
    /// and what most OCR export tools produce).
    pub fn new() -> Self {
        Self {
            frame: CoordFrame::PIXEL_TOP_LEFT,
        }
    }

    /// Sidecars exported from an engine with a different native frame.
    pub fn with_frame(frame: CoordFrame) -> Self {
        Self { frame }
    }

    fn sidecar_path(page: &CapturedPage) -> Result<std::path::PathBuf, BackendError> {
        let source: &Path = page.source.as_deref().ok_or_else(|| {
            BackendError::new(format!(
                "page {} has no source path; sidecar backend requires file-backed captures",
                page.index
            ))
        })?;
        Ok(source.with_extension("json"))
    }
}

impl Default for SidecarBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for SidecarBackend {
    fn recognize(&self, page: &CapturedPage) -> Result<Vec<RawFragment>, BackendError> {
        let path = Self::sidecar_path(page)?;
        let data = std::fs::read_to_string(&path).map_err(|err| {
            BackendError::new(format!("cannot read sidecar '{}': {err}", path.display()))
        })?;
        let fragments: Vec<RawFragment> = serde_json::from_str(&data).map_err(|err| {
            BackendError::new(format!("malformed sidecar '{}': {err}", path.display()))
        })?;
        debug!(
            page = page.index,
            fragments = fragments.len(),
            sidecar = %path.display(),
            "Loaded sidecar recognition results"
        );
        Ok(fragments)
    }

    fn coord_frame(&self) -> CoordFrame {
        self.frame
    }

    fn name(&self) -> &str {
        "sidecar"
    }
}
