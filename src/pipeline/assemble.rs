//! Markdown assembly: ordered pages → one transcript.
//!
//! The transcript is the pages' joined text concatenated in page-index
//! order with a configurable separator between pages. Every captured page
//! contributes a slot — a page whose OCR found nothing (or failed) appears
//! as an empty slot rather than vanishing, so the transcript's page
//! structure always matches the capture sequence and the PDF.

use serde::{Deserialize, Serialize};

use crate::output::PageResult;
use crate::pipeline::postprocess;

/// How to separate pages in the assembled transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Blank line between pages. (default)
    #[default]
    Blank,
    /// Horizontal rule: `---`.
    HorizontalRule,
    /// HTML comment naming the page: `<!-- page N -->`.
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator preceding the page with the given 0-based index.
    fn render(&self, page_index: usize) -> String {
        match self {
            PageSeparator::Blank => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_index + 1),
            PageSeparator::Custom(s) => format!("\n\n{s}\n\n"),
        }
    }
}

/// Concatenate the pages' joined text into the final Markdown transcript.
///
/// `pages` must already be in page-index order. All pages are included,
/// empty ones as empty slots: each page's text is cleaned individually and
/// only then joined, so an empty page leaves its two surrounding separators
/// intact instead of collapsing into its neighbours.
pub fn assemble_markdown(
    pages: &[PageResult],
    separator: &PageSeparator,
    merge_paragraphs: bool,
) -> String {
    let mut out = String::new();

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push_str(&separator.render(page.page_index));
        }
        out.push_str(&postprocess::clean_page_text(
            &page.ordered.joined_text,
            merge_paragraphs,
        ));
    }

    let trimmed = out.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::reading_order::OrderedPage;

    fn page_with_text(index: usize, text: &str) -> PageResult {
        PageResult {
            page_index: index,
            ordered: OrderedPage {
                page_index: index,
                fragments: Vec::new(),
                joined_text: text.to_string(),
            },
            duration_ms: 0,
            retries: 0,
            error: None,
        }
    }

    #[test]
    fn pages_joined_with_blank_separator() {
        let pages = vec![page_with_text(0, "first"), page_with_text(1, "second")];
        let md = assemble_markdown(&pages, &PageSeparator::Blank, false);
        assert_eq!(md, "first\n\nsecond\n");
    }

    #[test]
    fn horizontal_rule_separator() {
        let pages = vec![page_with_text(0, "a"), page_with_text(1, "b")];
        let md = assemble_markdown(&pages, &PageSeparator::HorizontalRule, false);
        assert_eq!(md, "a\n\n---\n\nb\n");
    }

    #[test]
    fn comment_separator_names_the_page() {
        let pages = vec![page_with_text(0, "a"), page_with_text(1, "b")];
        let md = assemble_markdown(&pages, &PageSeparator::Comment, false);
        assert!(md.contains("<!-- page 2 -->"), "got: {md}");
    }

    #[test]
    fn empty_page_slot_survives_blank_separator() {
        let with_gap = vec![
            page_with_text(0, "before"),
            page_with_text(1, ""),
            page_with_text(2, "after"),
        ];
        let without_gap = vec![page_with_text(0, "before"), page_with_text(1, "after")];

        let md_gap = assemble_markdown(&with_gap, &PageSeparator::Blank, false);
        let md_plain = assemble_markdown(&without_gap, &PageSeparator::Blank, false);

        // The empty page keeps both of its surrounding separators.
        assert_eq!(md_gap, "before\n\n\n\nafter\n");
        assert_ne!(md_gap, md_plain);
    }

    #[test]
    fn blank_runs_inside_a_page_still_collapse() {
        let pages = vec![
            page_with_text(0, "top\n\n\n\nbottom"),
            page_with_text(1, "next"),
        ];
        let md = assemble_markdown(&pages, &PageSeparator::Blank, false);
        assert_eq!(md, "top\n\nbottom\n\nnext\n");
    }

    #[test]
    fn empty_pages_keep_their_slot() {
        let pages = vec![
            page_with_text(0, "before"),
            page_with_text(1, ""),
            page_with_text(2, "after"),
        ];
        let md = assemble_markdown(&pages, &PageSeparator::Comment, false);
        // Both separators survive even though the middle page is empty.
        assert!(md.contains("<!-- page 2 -->"), "got: {md}");
        assert!(md.contains("<!-- page 3 -->"), "got: {md}");
    }

    #[test]
    fn single_page_has_no_separator() {
        let pages = vec![page_with_text(0, "only")];
        let md = assemble_markdown(&pages, &PageSeparator::HorizontalRule, false);
        assert_eq!(md, "only\n");
    }
}
