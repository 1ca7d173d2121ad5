//! Coordinate normalization: backend-native fragments → canonical fragments.
//!
//! Every provider speaks its own geometry dialect — normalized [0, 1]
//! fractions, bottom-left origins, raw pixels. This stage maps them all
//! into one convention (pixels, top-left origin) so the reading-order
//! reconstructor never branches on provider identity.
//!
//! Pure transformation, no I/O, no reordering: emission order is preserved
//! exactly, because the reconstructor uses it as the stable tie-break.

use tracing::debug;

use super::{BoundingBox, CoordFrame, CoordOrigin, CoordUnits, Fragment, PageGeometry, RawFragment};
use crate::pipeline::postprocess::remove_japanese_spaces;

/// Convert backend-native fragments into canonical [`Fragment`]s.
///
/// * Empty and whitespace-only texts are dropped — they carry no content
///   and would only pollute line grouping.
/// * Malformed geometry (negative extents, boxes outside the page) is
///   clamped to the page bounds rather than rejected: losing text silently
///   is worse than placing it approximately.
/// * Spurious spaces between Japanese characters — an artifact of engines
///   that treat each glyph as a word — are removed here, so the transcript
///   and the PDF text layer agree on the cleaned text.
pub fn normalize(
    raw: Vec<RawFragment>,
    frame: CoordFrame,
    geometry: &PageGeometry,
) -> Vec<Fragment> {
    let input_count = raw.len();
    let fragments: Vec<Fragment> = raw
        .into_iter()
        .filter(|fragment| !fragment.text.trim().is_empty())
        .map(|fragment| {
            let bbox = to_canonical(fragment.bbox, frame, geometry);
            Fragment {
                text: remove_japanese_spaces(&fragment.text),
                bbox,
                confidence: fragment.confidence.map(|c| c.clamp(0.0, 1.0)),
            }
        })
        .collect();

    if fragments.len() < input_count {
        debug!(
            dropped = input_count - fragments.len(),
            kept = fragments.len(),
            "Dropped blank fragments during normalization"
        );
    }
    fragments
}

/// Map one native box into pixel-space, top-left-origin coordinates,
/// clamped to the page bounds.
fn to_canonical(bbox: [f32; 4], frame: CoordFrame, geometry: &PageGeometry) -> BoundingBox {
    let [mut x, mut y, mut width, mut height] = bbox;

    if frame.units == CoordUnits::Normalized {
        x *= geometry.width;
        width *= geometry.width;
        y *= geometry.height;
        height *= geometry.height;
    }

    // Negative extents mean the provider named the opposite corner; flip
    // the box around so width/height are positive before clamping.
    if width < 0.0 {
        x += width;
        width = -width;
    }
    if height < 0.0 {
        y += height;
        height = -height;
    }

    // In a bottom-left frame, y names the bottom edge of the box.
    if frame.origin == CoordOrigin::BottomLeft {
        y = geometry.height - y - height;
    }

    let x = x.clamp(0.0, geometry.width);
    let y = y.clamp(0.0, geometry.height);
    let width = width.min(geometry.width - x);
    let height = height.min(geometry.height - y);

    BoundingBox::new(x, y, width, height)
}
