//! Automatic typesetting-direction detection.
//!
//! When the caller does not know whether a book is set horizontally or in
//! vertical right-to-left columns, the first recognized page can tell us.
//! Two geometric signals are combined:
//!
//! 1. **x-coordinate trend** — reading a vertical book top-to-bottom, the
//!    columns march right-to-left, so sorting fragments by their vertical
//!    position shows a falling x trend. Weight 0.6.
//! 2. **Aspect ratio** — vertical text lines are recognized as tall,
//!    narrow boxes. The share of fragments taller than 1.2× their width.
//!    Weight 0.4.
//!
//! The combined score is compared against 0.5. This is a heuristic and is
//! reported with a confidence so callers can prompt the user when unsure.

use crate::ocr::Fragment;
use crate::pipeline::reading_order::ResolvedLayout;

/// Combined score above which a page is classified as vertical.
const VERTICAL_THRESHOLD: f32 = 0.5;
/// A fragment counts as "tall" when height > width × this ratio.
const ASPECT_RATIO_THRESHOLD: f32 = 1.2;
const X_TREND_WEIGHT: f32 = 0.6;
const ASPECT_RATIO_WEIGHT: f32 = 0.4;
/// Below this many fragments the signals are noise.
const MIN_FRAGMENTS_FOR_DETECTION: usize = 3;

/// Classify one page's typesetting direction from fragment geometry.
///
/// Returns the detected layout and a confidence in [0, 1]. Pages with too
/// few fragments default to horizontal at zero confidence.
pub fn detect_layout(fragments: &[Fragment]) -> (ResolvedLayout, f32) {
    if fragments.len() < MIN_FRAGMENTS_FOR_DETECTION {
        return (ResolvedLayout::Horizontal, 0.0);
    }

    // Signal 1: x descent across the top-to-bottom sequence.
    let mut by_y: Vec<&Fragment> = fragments.iter().collect();
    by_y.sort_by(|a, b| a.bbox.y.total_cmp(&b.bbox.y));
    let xs: Vec<f32> = by_y.iter().map(|f| f.bbox.x).collect();
    let decreasing = xs.windows(2).filter(|w| w[0] > w[1]).count();
    let decreasing_ratio = decreasing as f32 / (xs.len() - 1) as f32;

    // Signal 2: share of tall, narrow boxes.
    let tall = fragments
        .iter()
        .filter(|f| f.bbox.height > f.bbox.width * ASPECT_RATIO_THRESHOLD)
        .count();
    let tall_ratio = tall as f32 / fragments.len() as f32;

    let score = decreasing_ratio * X_TREND_WEIGHT + tall_ratio * ASPECT_RATIO_WEIGHT;
    if score > VERTICAL_THRESHOLD {
        (ResolvedLayout::Vertical, score)
    } else {
        (ResolvedLayout::Horizontal, 1.0 - score)
    }
}
