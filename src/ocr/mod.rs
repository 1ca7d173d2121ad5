//! OCR backend abstraction and the canonical recognition result model.
//!
//! Multiple OCR providers sit behind one call surface: every backend
//! implements [`OcrBackend`] and reports its native coordinate convention
//! via a [`CoordFrame`]. Backends return [`RawFragment`]s in whatever frame
//! their engine speaks; [`normalize`](normalize::normalize) maps them into
//! the one canonical representation ([`Fragment`]: pixel units, top-left
//! origin) that every later pipeline stage consumes. The reading-order
//! reconstructor and the document assembler never learn which provider
//! produced a fragment.
//!
//! Shipped backends:
//!
//! * [`sidecar::SidecarBackend`] — reads pre-computed recognition results
//!   from JSON files next to each capture. Used for fixtures, tests, and
//!   re-assembling a run whose OCR was done elsewhere.
//! * `OcrsBackend` (behind the `ocrs-backend` feature) — pure-Rust neural
//!   OCR via the `ocrs` engine.

pub mod normalize;
pub mod sidecar;

#[cfg(feature = "ocrs-backend")]
pub mod ocrs;

use serde::{Deserialize, Serialize};

use crate::capture::{CapturedPage, PageRegion};
use crate::error::BackendError;

/// An axis-aligned box in canonical page coordinates: pixels, origin at the
/// top-left of the page image, `y` growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Horizontal centre of the box.
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Vertical centre of the box.
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// One recognized text span in canonical coordinates. Read-only after
/// normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Recognized text. Never empty or whitespace-only after normalization.
    pub text: String,
    /// Position of the span in page-image pixel coordinates.
    pub bbox: BoundingBox,
    /// Backend confidence in [0, 1], when the provider reports one.
    pub confidence: Option<f32>,
}

/// A recognition result as emitted by a backend, in the backend's native
/// coordinate frame. `bbox` is `[x, y, width, height]` interpreted according
/// to the backend's [`CoordFrame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFragment {
    pub text: String,
    pub bbox: [f32; 4],
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Where a coordinate frame anchors its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordOrigin {
    /// Origin at the top-left corner, `y` grows downward (most engines).
    TopLeft,
    /// Origin at the bottom-left corner, `y` grows upward (Vision-style
    /// engines); `bbox[1]` names the bottom edge of the box.
    BottomLeft,
}

/// Units a coordinate frame measures in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordUnits {
    /// Absolute pixels of the page image.
    Pixels,
    /// Fractions of the page dimensions in [0, 1].
    Normalized,
}

/// A backend's native coordinate convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordFrame {
    pub origin: CoordOrigin,
    pub units: CoordUnits,
}

impl CoordFrame {
    /// The canonical frame: pixel units, top-left origin.
    pub const PIXEL_TOP_LEFT: CoordFrame = CoordFrame {
        origin: CoordOrigin::TopLeft,
        units: CoordUnits::Pixels,
    };

    /// Normalized [0, 1] units anchored at the bottom-left, as reported by
    /// LiveText/Vision-style engines.
    pub const NORMALIZED_BOTTOM_LEFT: CoordFrame = CoordFrame {
        origin: CoordOrigin::BottomLeft,
        units: CoordUnits::Normalized,
    };
}

/// Pixel dimensions of one page image, plus the crop region it was captured
/// with. This is all the geometry normalization needs; the region rides
/// along so diagnostics can name the capture configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub region: PageRegion,
}

impl PageGeometry {
    pub fn of(page: &CapturedPage) -> Self {
        Self {
            width: page.width() as f32,
            height: page.height() as f32,
            region: page.region,
        }
    }
}

/// Capability surface of an OCR provider.
///
/// `recognize` runs on a blocking worker thread (engines are CPU-bound or
/// do their own I/O), so implementations are free to block. A per-page
/// failure is recovered by the pipeline as zero fragments for that page —
/// implementations should return an error rather than panic.
pub trait OcrBackend: Send + Sync {
    /// Recognize all text spans on one captured page, in the backend's
    /// native coordinate frame.
    fn recognize(&self, page: &CapturedPage) -> Result<Vec<RawFragment>, BackendError>;

    /// The coordinate convention `recognize` emits boxes in.
    fn coord_frame(&self) -> CoordFrame;

    /// Short provider name for logs and diagnostics.
    fn name(&self) -> &str;
}
