//! Searchable-PDF construction: page images with an invisible text layer.
//!
//! Each captured page becomes one PDF page sized to the image's native
//! resolution, with the image as the visible background and every
//! recognized fragment overlaid as an invisible text run
//! (`TextRenderingMode::Invisible`) at its bounding box. The text is
//! selectable and searchable but never visible, so the PDF looks exactly
//! like the capture while behaving like a born-digital document.
//!
//! Font sizing is a heuristic, not typography: the size is chosen so the
//! glyph run approximately spans the box width (clamped to the box
//! height), which is close enough for selection highlighting to land on
//! the right words.

use std::sync::Arc;

use printpdf::{
    BuiltinFont, FontId, Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg,
    Point, Pt, RawImage, RawImageData, RawImageFormat, TextItem, TextRenderingMode,
    XObjectTransform,
};
use tracing::{debug, info};

use crate::capture::CapturedPage;
use crate::error::PagesnapError;
use crate::ocr::{BoundingBox, Fragment};
use crate::output::PageResult;

/// Options for PDF construction.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Resolution the captured pixels are mapped to the page at. 96 DPI
    /// reproduces typical screen captures at a natural physical size.
    pub dpi: f32,
    /// TTF font embedded for the text layer. Without one the built-in
    /// Helvetica is used, which covers Latin text; CJK text needs an
    /// embedded font to be searchable in most viewers.
    pub font_path: Option<std::path::PathBuf>,
    /// Title metadata embedded in the PDF.
    pub title: Option<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            font_path: None,
            title: None,
        }
    }
}

/// The font the text layer is written with.
enum LayerFont {
    Builtin(BuiltinFont),
    Embedded(FontId),
}

/// Build the searchable PDF from captured pages and their ordered text.
///
/// `captured` and `pages` are parallel, both in page-index order. Every
/// page contributes exactly one PDF page; a page with zero fragments is
/// image-only.
pub fn build_pdf(
    captured: &[Arc<CapturedPage>],
    pages: &[PageResult],
    options: &PdfOptions,
) -> Result<Vec<u8>, PagesnapError> {
    if captured.len() != pages.len() {
        return Err(PagesnapError::Internal(format!(
            "page count mismatch: {} captures vs {} results",
            captured.len(),
            pages.len()
        )));
    }

    let title = options.title.as_deref().unwrap_or("Captured book");
    let mut doc = PdfDocument::new(title);

    let font = match &options.font_path {
        Some(path) => {
            let bytes = std::fs::read(path).map_err(|err| PagesnapError::FontLoadFailed {
                path: path.clone(),
                detail: err.to_string(),
            })?;
            let mut warnings: Vec<PdfWarnMsg> = Vec::new();
            let parsed = ParsedFont::from_bytes(&bytes, 0, &mut warnings).ok_or_else(|| {
                PagesnapError::FontLoadFailed {
                    path: path.clone(),
                    detail: "not a parseable TTF/OTF font".into(),
                }
            })?;
            info!(font = %path.display(), "Embedding text-layer font");
            LayerFont::Embedded(doc.add_font(&parsed))
        }
        None => LayerFont::Builtin(BuiltinFont::Helvetica),
    };

    let px_to_pt = 72.0 / options.dpi;
    let px_to_mm = 25.4 / options.dpi;
    let mut pdf_pages: Vec<PdfPage> = Vec::with_capacity(captured.len());

    for (page, result) in captured.iter().zip(pages) {
        let rgb = page.image.to_rgb8();
        let (w_px, h_px) = rgb.dimensions();
        let page_w = Mm(w_px as f32 * px_to_mm);
        let page_h = Mm(h_px as f32 * px_to_mm);
        let page_h_pt = h_px as f32 * px_to_pt;

        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: w_px as usize,
            height: h_px as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let image_id = doc.add_image(&raw);

        let mut ops = vec![Op::UseXobject {
            id: image_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: None,
                scale_y: None,
                dpi: Some(options.dpi),
                rotate: None,
            },
        }];
        ops.extend(text_layer_ops(
            &result.ordered.fragments,
            page_h_pt,
            px_to_pt,
            &font,
        ));

        debug!(
            page = page.index,
            fragments = result.ordered.fragments.len(),
            "Placed page image and text layer"
        );
        pdf_pages.push(PdfPage::new(page_w, page_h, ops));
    }

    doc.with_pages(pdf_pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(count = warnings.len(), "PDF serialisation warnings");
    }
    Ok(bytes)
}

/// Operations for one page's invisible text layer: one positioned text
/// run per fragment, in reading order.
fn text_layer_ops(
    fragments: &[Fragment],
    page_h_pt: f32,
    px_to_pt: f32,
    font: &LayerFont,
) -> Vec<Op> {
    let mut ops = Vec::with_capacity(fragments.len() * 6);

    for fragment in fragments {
        let size = Pt(layer_font_size(&fragment.bbox, &fragment.text, px_to_pt));
        // PDF origin is bottom-left; anchor the baseline at the bottom
        // edge of the fragment's box.
        let pos = Point {
            x: Pt(fragment.bbox.x * px_to_pt),
            y: Pt(page_h_pt - fragment.bbox.bottom() * px_to_pt),
        };

        ops.push(Op::StartTextSection);
        ops.push(Op::SetTextRenderingMode {
            mode: TextRenderingMode::Invisible,
        });
        ops.push(Op::SetTextCursor { pos });
        match font {
            LayerFont::Builtin(builtin) => {
                ops.push(Op::SetFontSizeBuiltinFont {
                    size,
                    font: *builtin,
                });
                ops.push(Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(fragment.text.clone())],
                    font: *builtin,
                });
            }
            LayerFont::Embedded(id) => {
                ops.push(Op::SetFontSize {
                    size,
                    font: id.clone(),
                });
                ops.push(Op::WriteText {
                    items: vec![TextItem::Text(fragment.text.clone())],
                    font: id.clone(),
                });
            }
        }
        ops.push(Op::EndTextSection);
    }
    ops
}

/// Average glyph advance as a fraction of the font size, a Helvetica-like
/// approximation used to stretch the run across its box.
const AVG_GLYPH_WIDTH_FRACTION: f32 = 0.5;
/// Floor so degenerate boxes still produce a findable run.
const MIN_FONT_SIZE_PT: f32 = 2.0;

/// Choose a font size so the glyph run approximately spans the box width.
///
/// Tall, narrow boxes are vertical text columns: there each glyph spans
/// the column width, so the size follows the width directly instead of
/// dividing it across the character count.
fn layer_font_size(bbox: &BoundingBox, text: &str, px_to_pt: f32) -> f32 {
    let box_w_pt = bbox.width * px_to_pt;
    let box_h_pt = bbox.height * px_to_pt;
    let chars = text.chars().count().max(1) as f32;

    let size = if box_h_pt > box_w_pt * 1.2 {
        box_w_pt
    } else {
        box_w_pt / (AVG_GLYPH_WIDTH_FRACTION * chars)
    };
    size.clamp(MIN_FONT_SIZE_PT, box_h_pt.max(MIN_FONT_SIZE_PT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, x: f32, y: f32, w: f32, h: f32) -> Fragment {
        Fragment {
            text: text.into(),
            bbox: BoundingBox::new(x, y, w, h),
            confidence: None,
        }
    }

    fn written_text(ops: &[Op]) -> String {
        let mut out = String::new();
        for op in ops {
            let items = match op {
                Op::WriteTextBuiltinFont { items, .. } => items,
                Op::WriteText { items, .. } => items,
                _ => continue,
            };
            for item in items {
                if let TextItem::Text(s) = item {
                    out.push_str(s);
                }
            }
        }
        out
    }

    #[test]
    fn one_text_run_per_fragment() {
        let fragments = vec![
            frag("one", 0.0, 0.0, 30.0, 10.0),
            frag("two", 0.0, 20.0, 30.0, 10.0),
            frag("three", 0.0, 40.0, 30.0, 10.0),
        ];
        let font = LayerFont::Builtin(BuiltinFont::Helvetica);
        let ops = text_layer_ops(&fragments, 100.0, 0.75, &font);

        let sections = ops
            .iter()
            .filter(|op| matches!(op, Op::StartTextSection))
            .count();
        assert_eq!(sections, fragments.len());
    }

    #[test]
    fn run_concatenation_matches_fragment_order() {
        let fragments = vec![
            frag("読み", 100.0, 0.0, 10.0, 40.0),
            frag("順序", 50.0, 0.0, 10.0, 40.0),
        ];
        let font = LayerFont::Builtin(BuiltinFont::Helvetica);
        let ops = text_layer_ops(&fragments, 100.0, 0.75, &font);
        assert_eq!(written_text(&ops), "読み順序");
    }

    #[test]
    fn every_run_is_invisible() {
        let fragments = vec![frag("a", 0.0, 0.0, 10.0, 10.0)];
        let font = LayerFont::Builtin(BuiltinFont::Helvetica);
        let ops = text_layer_ops(&fragments, 100.0, 0.75, &font);
        assert!(ops.iter().any(|op| matches!(
            op,
            Op::SetTextRenderingMode {
                mode: TextRenderingMode::Invisible
            }
        )));
    }

    #[test]
    fn zero_fragments_produce_no_ops() {
        let font = LayerFont::Builtin(BuiltinFont::Helvetica);
        let ops = text_layer_ops(&[], 100.0, 0.75, &font);
        assert!(ops.is_empty());
    }

    #[test]
    fn wide_box_size_spans_width() {
        // 40pt-wide box, 4 chars: 40 / (0.5 * 4) = 20pt, capped by the
        // 10pt box height.
        let b = BoundingBox::new(0.0, 0.0, 40.0, 10.0);
        assert_eq!(layer_font_size(&b, "word", 1.0), 10.0);
    }

    #[test]
    fn tall_box_size_follows_column_width() {
        let b = BoundingBox::new(0.0, 0.0, 20.0, 400.0);
        assert_eq!(layer_font_size(&b, "縦書きの列", 1.0), 20.0);
    }

    #[test]
    fn degenerate_box_gets_minimum_size() {
        let b = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
        assert_eq!(layer_font_size(&b, "x", 1.0), MIN_FONT_SIZE_PT);
    }
}
