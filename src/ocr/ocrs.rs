//! Pure-Rust OCR backend built on the `ocrs` engine.
//!
//! Only available behind the `ocrs-backend` feature. The engine needs two
//! ONNX model files:
//!
//! * `text-detection.rten` — locates text regions in the image
//! * `text-recognition.rten` — decodes characters from detected regions
//!
//! Models are cached at `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`)
//! and can be obtained by running the `ocrs-cli` tool once:
//!
//! ```sh
//! cargo install ocrs-cli
//! ocrs some-image.png   # downloads models on first use
//! ```
//!
//! Engine construction is the expensive step; build one backend and reuse
//! it across all pages of a run. `ocrs` and `rten` must be compiled in
//! release mode — debug builds are 10-100x slower.

use std::path::{Path, PathBuf};

use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use tracing::{debug, info};

use super::{CoordFrame, OcrBackend, RawFragment};
use crate::capture::CapturedPage;
use crate::error::BackendError;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Default directory for cached OCR model files, following the XDG Base
/// Directory convention.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Model file locations for constructing an [`OcrsBackend`].
#[derive(Debug, Clone)]
pub struct OcrsConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrsConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrsConfig {
    /// Expects `dir` to contain `text-detection.rten` and
    /// `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    fn validate(&self) -> Result<(), BackendError> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(BackendError::new(format!(
                    "OCR model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// OCR backend wrapping the `ocrs` neural engine.
///
/// Emits one fragment per recognized text line, with pixel, top-left-origin
/// bounding boxes — already the canonical frame, so normalization only
/// clamps and cleans.
pub struct OcrsBackend {
    engine: OcrEngine,
}

impl OcrsBackend {
    pub fn new(config: OcrsConfig) -> Result<Self, BackendError> {
        config.validate()?;

        info!("Loading OCR detection model");
        let detection_model = Model::load_file(&config.detection_model_path).map_err(|err| {
            BackendError::new(format!(
                "failed to load detection model from {}: {err}",
                config.detection_model_path.display()
            ))
        })?;

        info!("Loading OCR recognition model");
        let recognition_model =
            Model::load_file(&config.recognition_model_path).map_err(|err| {
                BackendError::new(format!(
                    "failed to load recognition model from {}: {err}",
                    config.recognition_model_path.display()
                ))
            })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| BackendError::new(format!("failed to initialise OCR engine: {err}")))?;

        Ok(Self { engine })
    }

    /// Load models from the default cache directory.
    pub fn with_defaults() -> Result<Self, BackendError> {
        Self::new(OcrsConfig::default())
    }

    /// Load models from a specific directory.
    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self, BackendError> {
        Self::new(OcrsConfig::from_dir(dir))
    }
}

impl OcrBackend for OcrsBackend {
    fn recognize(&self, page: &CapturedPage) -> Result<Vec<RawFragment>, BackendError> {
        let rgb = page.image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            BackendError::new(format!("failed to create image source ({width}x{height}): {err}"))
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| BackendError::new(format!("OCR preprocessing failed: {err}")))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| BackendError::new(format!("word detection failed: {err}")))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| BackendError::new(format!("line recognition failed: {err}")))?;

        let mut fragments = Vec::with_capacity(lines.len());
        for line in lines.iter().flatten() {
            let text = line.to_string();
            if text.trim().is_empty() {
                continue;
            }
            let rect = line.bounding_rect();
            fragments.push(RawFragment {
                text,
                bbox: [
                    rect.left() as f32,
                    rect.top() as f32,
                    rect.width() as f32,
                    rect.height() as f32,
                ],
                confidence: None,
            });
        }

        debug!(
            page = page.index,
            fragments = fragments.len(),
            "ocrs recognition complete"
        );
        Ok(fragments)
    }

    fn coord_frame(&self) -> CoordFrame {
        CoordFrame::PIXEL_TOP_LEFT
    }

    fn name(&self) -> &str {
        "ocrs"
    }
}
