//! Transcript cleanup: deterministic text rules applied to OCR output.
//!
//! OCR engines introduce artifacts that are recognition-correct but
//! reading-hostile: spaces wedged between Japanese characters (engines
//! that segment per glyph), hard line breaks at the page's visual line
//! width, stray CRLF endings. The rules here are cheap, pure string
//! transformations, each independently testable.
//!
//! [`remove_japanese_spaces`] runs during normalization so the Markdown
//! transcript and the PDF text layer agree on the cleaned fragment text.
//! The remaining rules run per page, before the transcript is joined.

use once_cell::sync::Lazy;
use regex::Regex;

/// Whether a character belongs to the Japanese scripts (hiragana, katakana,
/// CJK ideographs and extensions, fullwidth forms, CJK punctuation).
fn is_japanese(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'   // hiragana
        | '\u{30A0}'..='\u{30FF}' // katakana
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{FF00}'..='\u{FFEF}' // fullwidth forms
        | '\u{3000}'..='\u{303F}' // CJK symbols and punctuation
    )
}

/// Remove whitespace wedged between two Japanese characters.
///
/// `"わ た し"` → `"わたし"`, while `"Hello World"` is untouched. Spaces
/// adjacent to Latin text are kept, so mixed-script lines keep their
/// word boundaries.
pub fn remove_japanese_spaces(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() && c != '\n' {
            // Find the whitespace run and look at both neighbours.
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() && chars[j] != '\n' {
                j += 1;
            }
            let prev_jp = i > 0 && is_japanese(chars[i - 1]);
            let next_jp = j < chars.len() && is_japanese(chars[j]);
            if !(prev_jp && next_jp) {
                out.extend(&chars[i..j]);
            }
            i = j;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Characters that legitimately end a sentence or clause, so the line
/// break after them is kept during paragraph merging.
fn ends_sentence(line: &str) -> bool {
    matches!(
        line.chars().last(),
        Some('。') | Some('．') | Some('！') | Some('？') | Some('.') | Some('!') | Some('?')
            | Some(':') | Some('」') | Some('』') | Some('"')
    )
}

/// Merge lines broken by the page's visual layout back into paragraphs.
///
/// A line that does not end in sentence-final punctuation flows into the
/// next; blank lines are paragraph breaks and survive. Japanese text joins
/// without a space, Latin text with one.
pub fn merge_paragraph_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        let line = line.trim_end();
        out.push_str(line);

        let next_nonblank = lines.peek().map(|n| !n.trim().is_empty()).unwrap_or(false);
        let flows = !line.is_empty() && !ends_sentence(line) && next_nonblank;

        if flows {
            let last = line.chars().last();
            let first = lines.peek().and_then(|n| n.trim_start().chars().next());
            let japanese_join = matches!(last, Some(c) if is_japanese(c))
                || matches!(first, Some(c) if is_japanese(c));
            if !japanese_join {
                out.push(' ');
            }
        } else {
            out.push('\n');
        }
    }
    out
}

static RE_EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Cleanup over one page's joined text before assembly.
///
/// Normalises line endings, trims trailing whitespace per line, collapses
/// runs of blank lines down to one, strips leading/trailing blank lines,
/// and optionally merges layout-broken lines into paragraphs. Returns text
/// without a final newline.
///
/// This runs per page, never over the assembled transcript: the blank runs
/// that separators form around an empty page are that page's slot and must
/// survive.
pub fn clean_page_text(input: &str, merge_paragraphs: bool) -> String {
    let s = input.replace("\r\n", "\n").replace('\r', "\n");
    let s = s
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    let s = if merge_paragraphs {
        merge_paragraph_lines(&s)
    } else {
        s
    };
    let s = RE_EXCESS_BLANK_LINES.replace_all(&s, "\n\n");
    s.trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn japanese_spaces_removed() {
        assert_eq!(remove_japanese_spaces("わ た し"), "わたし");
        assert_eq!(remove_japanese_spaces("猫 で ある"), "猫である");
    }

    #[test]
    fn latin_spaces_kept() {
        assert_eq!(remove_japanese_spaces("Hello World"), "Hello World");
    }

    #[test]
    fn mixed_script_boundaries_kept() {
        // Space between Latin and Japanese is a real boundary.
        assert_eq!(remove_japanese_spaces("Rust 入門"), "Rust 入門");
        assert_eq!(remove_japanese_spaces("入門 Rust"), "入門 Rust");
    }

    #[test]
    fn merge_joins_unterminated_lines() {
        let text = "The quick brown\nfox jumps.\nDone.";
        assert_eq!(
            merge_paragraph_lines(text),
            "The quick brown fox jumps.\nDone.\n"
        );
    }

    #[test]
    fn merge_joins_japanese_without_space() {
        let text = "吾輩は猫で\nある。";
        assert_eq!(merge_paragraph_lines(text), "吾輩は猫である。\n");
    }

    #[test]
    fn merge_preserves_paragraph_breaks() {
        let text = "First paragraph.\n\nSecond paragraph.";
        assert_eq!(
            merge_paragraph_lines(text),
            "First paragraph.\n\nSecond paragraph.\n"
        );
    }

    #[test]
    fn clean_normalises_line_endings() {
        let out = clean_page_text("a\r\nb  \r\nc", false);
        assert_eq!(out, "a\nb\nc");
    }

    #[test]
    fn clean_collapses_blank_runs_within_a_page() {
        let out = clean_page_text("a\n\n\n\n\nb", false);
        assert_eq!(out, "a\n\nb");
    }

    #[test]
    fn clean_of_blank_input_is_empty() {
        assert_eq!(clean_page_text("", false), "");
        assert_eq!(clean_page_text("   \n  \n", false), "");
    }

    #[test]
    fn clean_with_merge() {
        let out = clean_page_text("ページを\nまたぐ。", true);
        assert_eq!(out, "ページをまたぐ。");
    }
}
