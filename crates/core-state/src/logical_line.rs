//! Builds logical lines (viewport-width-wrapped chunks) from the physical
//! lines stored in [`crate::line_store::LineStore`].
//!
//! A logical line is either a view into its source physical line (no new
//! allocation, the common case for a line that fits in one viewport width) or
//! an owned, regenerated string (for a chunk that had to be spliced out of
//! the middle of a physical line after an escape sequence boundary). See the
//! design note on this split in SPEC_FULL §9 — it avoids an `unsafe`
//! raw-pointer aliasing trick some pagers use for the same zero-copy-by-
//! -default shape.

use core_text::color::{ColorAttr, LayoutState};
use core_text::vt::{inject_match_markers, measure};

use crate::line_store::PhysicalLine;

/// The text backing a logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineText {
    /// Exactly the `[start_char, end_char)` character range of the physical
    /// line's text, unmodified.
    Borrowed { start_char: usize, end_char: usize },
    /// A chunk that needed reconstruction (currently: none do, but the slot
    /// exists so a future chunk that must inject a carried escape sequence
    /// doesn't have to change this enum's shape).
    Owned(String),
}

impl LineText {
    pub fn resolve<'a>(&'a self, physical_text: &'a str, chars: &[char]) -> std::borrow::Cow<'a, str> {
        match self {
            LineText::Borrowed { start_char, end_char } => {
                if *start_char == 0 && *end_char == chars.len() {
                    std::borrow::Cow::Borrowed(physical_text)
                } else {
                    std::borrow::Cow::Owned(chars[*start_char..*end_char].iter().collect())
                }
            }
            LineText::Owned(s) => std::borrow::Cow::Borrowed(s),
        }
    }
}

/// One wrapped chunk of a physical line, ready to paint into exactly one
/// viewport row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub physical_line: u64,
    pub text: LineText,
    /// Color state active at the start of this chunk.
    pub start_state: LayoutState,
    /// True when this is the trailing chunk of its physical line — lets a
    /// caller walking forward know whether the next logical line starts a
    /// new physical line without re-deriving it from chunk indices.
    pub is_last_chunk_of_physical: bool,
}

/// Wrap one physical line into its logical-line chunks at `viewport_width`
/// display cells each.
pub fn generate(physical: &PhysicalLine, viewport_width: u16) -> Vec<LogicalLine> {
    let chars: Vec<char> = physical.text.chars().collect();
    if chars.is_empty() {
        return vec![LogicalLine {
            physical_line: physical.line_number,
            text: LineText::Borrowed { start_char: 0, end_char: 0 },
            start_state: LayoutState::initial(physical.initial_color),
            is_last_chunk_of_physical: true,
        }];
    }

    let mut chunks = Vec::new();
    let mut state = LayoutState::initial(physical.initial_color);
    let mut char_idx = 0usize;

    while char_idx < chars.len() {
        let remaining: String = chars[char_idx..].iter().collect();
        let result = measure(&remaining, viewport_width, state, true);
        let consumed = result.chars_consumed.max(1); // guarantee forward progress
        let end_char = char_idx + consumed;
        chunks.push(LogicalLine {
            physical_line: physical.line_number,
            text: LineText::Borrowed { start_char: char_idx, end_char },
            start_state: state,
            is_last_chunk_of_physical: end_char >= chars.len(),
        });
        if let Some(end_state) = result.end_state {
            state = end_state;
        }
        char_idx = end_char;
    }

    chunks
}

/// Wrap one physical line into its logical-line chunks at `viewport_width`,
/// first injecting search-match markers around every occurrence of `pattern`
/// so the affected chunks paint in reverse video. `pattern` being `None` or
/// empty behaves exactly like [`generate`] (and is just as cheap: no marker
/// injection, no extra allocation beyond what `generate` already does).
///
/// Matched chunks come back as `LineText::Owned` rather than `Borrowed`,
/// since their char offsets index into the marker-injected text, not the
/// physical line's stored text `Borrowed` would otherwise slice from.
pub fn generate_with_search(
    physical: &PhysicalLine,
    viewport_width: u16,
    pattern: Option<&str>,
) -> Vec<LogicalLine> {
    let pattern = match pattern {
        Some(p) if !p.is_empty() => p,
        _ => return generate(physical, viewport_width),
    };

    let marked = inject_match_markers(&physical.text, pattern);
    if marked == physical.text {
        return generate(physical, viewport_width);
    }

    let chars: Vec<char> = marked.chars().collect();
    if chars.is_empty() {
        return vec![LogicalLine {
            physical_line: physical.line_number,
            text: LineText::Owned(String::new()),
            start_state: LayoutState::initial(physical.initial_color),
            is_last_chunk_of_physical: true,
        }];
    }

    let mut chunks = Vec::new();
    let mut state = LayoutState::initial(physical.initial_color);
    let mut char_idx = 0usize;

    while char_idx < chars.len() {
        let remaining: String = chars[char_idx..].iter().collect();
        let result = measure(&remaining, viewport_width, state, true);
        let consumed = result.chars_consumed.max(1);
        let end_char = char_idx + consumed;
        let chunk_text: String = chars[char_idx..end_char].iter().collect();
        chunks.push(LogicalLine {
            physical_line: physical.line_number,
            text: LineText::Owned(chunk_text),
            start_state: state,
            is_last_chunk_of_physical: end_char >= chars.len(),
        });
        if let Some(end_state) = result.end_state {
            state = end_state;
        }
        char_idx = end_char;
    }

    chunks
}

/// Count the logical-line chunks a physical line would produce at
/// `viewport_width`, without allocating any chunk text — used by the
/// viewport manager to answer "how many lines total" without materializing
/// the whole document.
pub fn count_logical_lines(physical: &PhysicalLine, viewport_width: u16) -> u64 {
    let chars: Vec<char> = physical.text.chars().collect();
    if chars.is_empty() {
        return 1;
    }
    let mut state = LayoutState::initial(physical.initial_color);
    let mut char_idx = 0usize;
    let mut count = 0u64;
    while char_idx < chars.len() {
        let remaining: String = chars[char_idx..].iter().collect();
        let result = measure(&remaining, viewport_width, state, true);
        let consumed = result.chars_consumed.max(1);
        char_idx += consumed;
        if let Some(end_state) = result.end_state {
            state = end_state;
        }
        count += 1;
    }
    count
}

/// `ColorAttr` re-export convenience for callers that only need the default
/// attribute when constructing the first physical line of a fresh document.
pub fn default_color() -> ColorAttr {
    ColorAttr::default_attr()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phys(n: u64, text: &str) -> PhysicalLine {
        PhysicalLine {
            line_number: n,
            initial_color: ColorAttr::default_attr(),
            text: text.to_string(),
        }
    }

    #[test]
    fn short_line_is_a_single_borrowed_chunk() {
        let p = phys(0, "hello");
        let chunks = generate(&p, 80);
        assert_eq!(chunks.len(), 1);
        match &chunks[0].text {
            LineText::Borrowed { start_char, end_char } => {
                assert_eq!(*start_char, 0);
                assert_eq!(*end_char, 5);
            }
            LineText::Owned(_) => panic!("expected borrowed chunk"),
        }
    }

    #[test]
    fn empty_line_produces_one_empty_chunk() {
        let p = phys(0, "");
        let chunks = generate(&p, 80);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn long_line_wraps_into_multiple_chunks() {
        let p = phys(0, &"x".repeat(25));
        let chunks = generate(&p, 10);
        assert_eq!(chunks.len(), 3); // 10 + 10 + 5
        assert_eq!(count_logical_lines(&p, 10), 3);
    }

    #[test]
    fn wrapping_is_consistent_between_generate_and_count() {
        let p = phys(0, "the quick brown fox jumps over the lazy dog");
        for width in [1u16, 5, 20, 200] {
            assert_eq!(generate(&p, width).len() as u64, count_logical_lines(&p, width));
        }
    }

    #[test]
    fn color_escape_sequences_do_not_consume_viewport_width() {
        let p = phys(0, "\x1b[31mred\x1b[0m text");
        let chunks = generate(&p, 80);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn generate_with_search_none_matches_plain_generate() {
        let p = phys(0, "the quick brown fox");
        assert_eq!(generate_with_search(&p, 80, None), generate(&p, 80));
        assert_eq!(generate_with_search(&p, 80, Some("")), generate(&p, 80));
    }

    #[test]
    fn generate_with_search_without_a_match_matches_plain_generate() {
        let p = phys(0, "the quick brown fox");
        assert_eq!(generate_with_search(&p, 80, Some("zzz")), generate(&p, 80));
    }

    #[test]
    fn generate_with_search_produces_owned_chunks_with_reverse_video_match() {
        let p = phys(0, "the quick brown fox");
        let chunks = generate_with_search(&p, 80, Some("brown"));
        assert_eq!(chunks.len(), 1);
        match &chunks[0].text {
            LineText::Owned(s) => assert_eq!(s, "the quick \u{1}brown\u{2} fox"),
            LineText::Borrowed { .. } => panic!("expected owned chunk once markers are injected"),
        }
    }

    #[test]
    fn generate_with_search_match_straddling_a_wrap_boundary_carries_reverse_state() {
        // 50 repetitions of "abc " = 200 chars. "bc ab" recurs at offsets
        // 1 + 8k; at width 35 the occurrence at offset 33..=37 straddles the
        // wrap boundary between visible chars 34 and 35.
        let p = phys(0, &"abc ".repeat(50));
        let chunks = generate_with_search(&p, 35, Some("bc ab"));
        assert!(chunks.len() >= 2);
        let boundary_idx = chunks
            .iter()
            .position(|c| matches!(&c.text, LineText::Owned(s) if s.contains('\u{1}') && !s.contains('\u{2}')))
            .expect("one chunk should end mid-match");
        let next = &chunks[boundary_idx + 1];
        match &next.text {
            LineText::Owned(s) => assert!(s.contains('\u{2}')),
            LineText::Borrowed { .. } => panic!("expected owned chunk on the carried side too"),
        }
    }
}
