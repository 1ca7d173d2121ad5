//! Reading-order reconstruction: from an unordered bag of fragments to the
//! sequence a human would read.
//!
//! OCR engines emit fragments in detection order, which follows image
//! processing internals rather than text flow. This stage imposes a
//! deterministic total order from geometry alone:
//!
//! * **Horizontal** — fragments are grouped into lines (vertical centres
//!   within a tolerance band derived from the median fragment height),
//!   lines read top-to-bottom, fragments within a line left-to-right.
//! * **Vertical** — right-to-left, top-to-bottom column layout, as in
//!   Japanese typesetting: fragments sharing a horizontal centre within a
//!   tolerance band form a column, columns read right-to-left, fragments
//!   within a column top-to-bottom.
//!
//! The tolerance bands are fractions of the median fragment extent and are
//! deliberately tunable: no single constant is right for every font size.
//! A wrong value assigns a fragment to a neighbouring line or column —
//! degraded output, never an error.
//!
//! The output is always a permutation of the input. Exact coordinate ties
//! fall back to emission order (all sorts here are stable).

use serde::{Deserialize, Serialize};

use crate::ocr::Fragment;

/// The typesetting direction reconstruction orders fragments by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedLayout {
    /// Left-to-right lines, read top-to-bottom.
    Horizontal,
    /// Top-to-bottom columns, read right-to-left.
    Vertical,
}

/// Grouping tolerances as fractions of the median fragment extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Fraction of the median fragment height within which two vertical
    /// centres count as the same line.
    pub line: f32,
    /// Fraction of the median fragment width within which two horizontal
    /// centres count as the same column.
    pub column: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            line: 0.5,
            column: 0.5,
        }
    }
}

/// One page's fragments in final reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedPage {
    /// Index of the captured page this was reconstructed from.
    pub page_index: usize,
    /// Fragments in reading order — a permutation of the input.
    pub fragments: Vec<Fragment>,
    /// Fragment texts concatenated in reading order, one line or column
    /// per output line.
    pub joined_text: String,
}

impl OrderedPage {
    /// A valid page that OCR found nothing on.
    pub fn empty(page_index: usize) -> Self {
        Self {
            page_index,
            fragments: Vec::new(),
            joined_text: String::new(),
        }
    }
}

/// Order a page's fragments according to the layout direction.
///
/// Deterministic for a given input sequence and idempotent: re-running on
/// an already-ordered sequence yields the same order.
pub fn reconstruct(
    page_index: usize,
    fragments: Vec<Fragment>,
    layout: ResolvedLayout,
    tolerances: &Tolerances,
) -> OrderedPage {
    if fragments.is_empty() {
        return OrderedPage::empty(page_index);
    }

    let groups = match layout {
        ResolvedLayout::Horizontal => group_lines(&fragments, tolerances.line),
        ResolvedLayout::Vertical => group_columns(&fragments, tolerances.column),
    };

    let joined_text = groups
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|&i| fragments[i].text.as_str())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n");

    let order: Vec<usize> = groups.into_iter().flatten().collect();
    let mut slots: Vec<Option<Fragment>> = fragments.into_iter().map(Some).collect();
    let sorted = order
        .into_iter()
        .map(|i| slots[i].take().expect("each fragment placed exactly once"))
        .collect();

    OrderedPage {
        page_index,
        fragments: sorted,
        joined_text,
    }
}

/// Group fragment indices into lines: cluster by vertical centre, order
/// lines top-to-bottom, fragments within a line left-to-right.
fn group_lines(fragments: &[Fragment], tolerance: f32) -> Vec<Vec<usize>> {
    let band = tolerance_band(fragments.iter().map(|f| f.bbox.height), tolerance);

    let mut by_y: Vec<usize> = (0..fragments.len()).collect();
    by_y.sort_by(|&a, &b| {
        fragments[a]
            .bbox
            .center_y()
            .total_cmp(&fragments[b].bbox.center_y())
    });

    let mut lines = cluster(&by_y, band, |i| fragments[i].bbox.center_y());
    for line in &mut lines {
        line.sort_by(|&a, &b| fragments[a].bbox.x.total_cmp(&fragments[b].bbox.x));
    }
    lines
}

/// Group fragment indices into columns: cluster by horizontal centre,
/// order columns right-to-left, fragments within a column top-to-bottom.
fn group_columns(fragments: &[Fragment], tolerance: f32) -> Vec<Vec<usize>> {
    let band = tolerance_band(fragments.iter().map(|f| f.bbox.width), tolerance);

    let mut by_x: Vec<usize> = (0..fragments.len()).collect();
    // Descending centre-x: the rightmost column is read first.
    by_x.sort_by(|&a, &b| {
        fragments[b]
            .bbox
            .center_x()
            .total_cmp(&fragments[a].bbox.center_x())
    });

    let mut columns = cluster(&by_x, band, |i| fragments[i].bbox.center_x());
    for column in &mut columns {
        column.sort_by(|&a, &b| fragments[a].bbox.y.total_cmp(&fragments[b].bbox.y));
    }
    columns
}

/// Walk indices already sorted by the grouping coordinate and split them
/// into clusters wherever the coordinate moves more than `band` away from
/// the cluster's first member. Anchoring on the first member (rather than
/// a running mean) keeps the grouping deterministic and order-stable.
fn cluster(sorted: &[usize], band: f32, coord: impl Fn(usize) -> f32) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut anchor = f32::NAN;

    for &i in sorted {
        let c = coord(i);
        if groups.is_empty() || (c - anchor).abs() > band {
            groups.push(vec![i]);
            anchor = c;
        } else {
            groups.last_mut().expect("group exists").push(i);
        }
    }
    groups
}

/// Tolerance band in pixels: `fraction × median extent`, floored at one
/// pixel so degenerate zero-height boxes still group.
fn tolerance_band(extents: impl Iterator<Item = f32>, fraction: f32) -> f32 {
    let mut values: Vec<f32> = extents.collect();
    values.sort_by(f32::total_cmp);
    let median = values[values.len() / 2];
    (fraction * median).max(1.0)
}
