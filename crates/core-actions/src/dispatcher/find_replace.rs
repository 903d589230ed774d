//! Plain-text find/replace over the active buffer.
//!
//! Grounded on `core_render::pager_viewport::PagerViewport::search_pattern`
//! (the pager's own plain-substring search) for the "no regular expressions"
//! policy (an explicit Non-goal), generalized here to a mutating editor-side
//! find/replace that also edits the buffer rather than only highlighting
//! matches in a read-only view.
//!
//! Matches never span a line break: a pattern containing `\n` will simply
//! never match, the same simplification the pager's search makes.

use core_state::EditorState;
use core_text::{Buffer, Position};

/// A located match: `[start, end)` within a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: Position,
    pub end: Position,
}

/// Find the next occurrence of `pattern` at or after `from`, wrapping past
/// the end of the document back to its start if necessary. Returns `None`
/// if `pattern` is empty or does not occur anywhere in the buffer.
pub fn find_next(buffer: &Buffer, from: Position, pattern: &str) -> Option<MatchSpan> {
    if pattern.is_empty() {
        return None;
    }
    if let Some(m) = find_forward(buffer, from, pattern) {
        return Some(m);
    }
    // Wrap: scan lines before `from.line`, then the prefix of `from.line`
    // itself (the part we hadn't searched in the forward pass).
    for line_idx in 0..from.line {
        if let Some(m) = find_in_line(buffer, line_idx, 0, pattern) {
            return Some(m);
        }
    }
    find_in_line(buffer, from.line, 0, pattern).filter(|m| m.start.byte < from.byte)
}

/// Find the previous occurrence of `pattern` at or before `from`, wrapping
/// past the start of the document back to its end if necessary.
pub fn find_prev(buffer: &Buffer, from: Position, pattern: &str) -> Option<MatchSpan> {
    if pattern.is_empty() {
        return None;
    }
    if let Some(m) = find_in_line_before(buffer, from.line, from.byte, pattern) {
        return Some(m);
    }
    for line_idx in (0..from.line).rev() {
        if let Some(m) = find_in_line_before(buffer, line_idx, usize::MAX, pattern) {
            return Some(m);
        }
    }
    let line_count = buffer.line_count();
    for line_idx in ((from.line + 1)..line_count).rev() {
        if let Some(m) = find_in_line_before(buffer, line_idx, usize::MAX, pattern) {
            return Some(m);
        }
    }
    find_in_line_before(buffer, from.line, usize::MAX, pattern).filter(|m| m.start.byte >= from.byte)
}

/// Replace the text spanned by `m` with `replacement`, pushing its own undo
/// snapshot (each replacement undoes individually, matching `DeleteUnder`'s
/// discrete-edit convention). Returns the cursor position immediately after
/// the inserted replacement.
pub fn replace_match(state: &mut EditorState, m: MatchSpan, replacement: &str) -> Position {
    state.push_discrete_edit_snapshot(m.start);
    let mut cursor = m.start;
    {
        let buffer = state.active_buffer_mut();
        let abs_start = absolute_byte(buffer, m.start);
        let abs_end = absolute_byte(buffer, m.end);
        buffer.delete_bytes(abs_start, abs_end);
    }
    let buffer = state.active_buffer_mut();
    for g in Buffer::iter(replacement) {
        buffer.insert_grapheme(&mut cursor, g);
    }
    if !state.dirty {
        state.dirty = true;
    }
    cursor
}

/// Replace every occurrence of `pattern` with `replacement`, scanning
/// forward from the document start without wrapping (so a replacement that
/// re-introduces `pattern` is never revisited). Returns the number of
/// replacements made.
pub fn replace_all(state: &mut EditorState, pattern: &str, replacement: &str) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    let mut count = 0usize;
    let mut cursor = Position::origin();
    loop {
        let next_match = find_forward(state.active_buffer(), cursor, pattern);
        let Some(m) = next_match else {
            break;
        };
        cursor = replace_match(state, m, replacement);
        count += 1;
    }
    count
}

fn find_forward(buffer: &Buffer, from: Position, pattern: &str) -> Option<MatchSpan> {
    let line_count = buffer.line_count();
    for line_idx in from.line..line_count {
        let search_from = if line_idx == from.line { from.byte } else { 0 };
        if let Some(m) = find_in_line(buffer, line_idx, search_from, pattern) {
            return Some(m);
        }
    }
    None
}

fn find_in_line(buffer: &Buffer, line_idx: usize, search_from: usize, pattern: &str) -> Option<MatchSpan> {
    let line = buffer.line(line_idx)?;
    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    if search_from > trimmed.len() {
        return None;
    }
    let rel = trimmed[search_from..].find(pattern)?;
    let start_byte = search_from + rel;
    Some(MatchSpan {
        start: Position::new(line_idx, start_byte),
        end: Position::new(line_idx, start_byte + pattern.len()),
    })
}

fn find_in_line_before(
    buffer: &Buffer,
    line_idx: usize,
    before_byte: usize,
    pattern: &str,
) -> Option<MatchSpan> {
    let line = buffer.line(line_idx)?;
    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    let limit = before_byte.min(trimmed.len());
    let rel = trimmed[..limit].rfind(pattern)?;
    Some(MatchSpan {
        start: Position::new(line_idx, rel),
        end: Position::new(line_idx, rel + pattern.len()),
    })
}

/// Sum of byte lengths of lines before `pos.line` (each including its own
/// line-ending byte, mirroring `core_state::SelectionSpan`'s absolute-offset
/// computation) plus `pos.byte`.
fn absolute_byte(buffer: &Buffer, pos: Position) -> usize {
    let mut total = 0usize;
    for line in 0..pos.line {
        total += buffer.line_byte_len(line);
        if let Some(l) = buffer.line(line)
            && l.ends_with('\n')
        {
            total += 1;
        }
    }
    total + pos.byte
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::EditorState;

    fn fresh_state(content: &str) -> EditorState {
        EditorState::new(Buffer::from_str("buf", content).unwrap())
    }

    #[test]
    fn find_next_locates_first_match_after_cursor() {
        let state = fresh_state("foo bar foo\nbaz foo\n");
        let m = find_next(state.active_buffer(), Position::new(0, 4), "foo").unwrap();
        assert_eq!(m.start, Position::new(0, 8));
    }

    #[test]
    fn find_next_wraps_past_end_of_document() {
        let state = fresh_state("foo bar\nbaz\n");
        let m = find_next(state.active_buffer(), Position::new(1, 0), "foo").unwrap();
        assert_eq!(m.start, Position::new(0, 0));
    }

    #[test]
    fn find_next_returns_none_when_absent() {
        let state = fresh_state("foo bar\n");
        assert!(find_next(state.active_buffer(), Position::origin(), "qux").is_none());
    }

    #[test]
    fn find_prev_locates_match_before_cursor() {
        let state = fresh_state("foo bar foo\n");
        let m = find_prev(state.active_buffer(), Position::new(0, 11), "foo").unwrap();
        assert_eq!(m.start, Position::new(0, 8));
    }

    #[test]
    fn replace_match_substitutes_text_and_is_undoable() {
        let mut state = fresh_state("hello world\n");
        let m = find_next(state.active_buffer(), Position::origin(), "world").unwrap();
        let mut cursor = replace_match(&mut state, m, "rust");
        assert_eq!(state.active_buffer().line(0).unwrap(), "hello rust\n");
        assert!(state.undo(&mut cursor));
        assert_eq!(state.active_buffer().line(0).unwrap(), "hello world\n");
    }

    #[test]
    fn replace_all_substitutes_every_occurrence_without_reprocessing_output() {
        let mut state = fresh_state("foo foo foo\n");
        let count = replace_all(&mut state, "foo", "foofoo");
        assert_eq!(count, 3);
        assert_eq!(
            state.active_buffer().line(0).unwrap(),
            "foofoo foofoo foofoo\n"
        );
    }

    #[test]
    fn replace_all_on_absent_pattern_is_a_noop() {
        let mut state = fresh_state("hello\n");
        assert_eq!(replace_all(&mut state, "xyz", "abc"), 0);
        assert_eq!(state.active_buffer().line(0).unwrap(), "hello\n");
    }
}
