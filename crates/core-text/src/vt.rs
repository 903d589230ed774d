//! Pure VT/ANSI measurement walker.
//!
//! `measure` walks a logical-line substring one extended grapheme cluster at
//! a time (SPEC_FULL §4.1), threading color state across calls so a caller
//! can lay out one physical-line worth of cells at a time without
//! re-parsing escape sequences already consumed by an earlier call. It
//! never allocates a rendered buffer itself; callers own that.
//!
//! Recognized input:
//! - CSI sequences (`ESC [ params final`). Only SGR (`m`) affects color;
//!   other finals are consumed and otherwise ignored. These are scanned one
//!   `char` at a time (they're a lexical protocol, not text) and always form
//!   their own grapheme-cluster boundary, so they never get folded into a
//!   neighboring cluster.
//! - `SOH` (0x01) / `STX` (0x02) bracket a search-match run, swapping the
//!   active display color to the reverse of the current user color for the
//!   run's duration.
//! - Everything else is a displayable grapheme cluster (combining marks, ZWJ
//!   emoji sequences, regional-indicator flag pairs, keycap sequences, or a
//!   lone codepoint) consuming `egc_width` cells as a single, indivisible
//!   unit — never split across a wrap boundary.

use crate::color::{ColorAttr, LayoutState};
use crate::egc_width;
use unicode_segmentation::UnicodeSegmentation;

const MATCH_START: char = '\u{0001}';
const MATCH_END: char = '\u{0002}';

/// Result of a single [`measure`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureResult {
    /// Number of `char`s consumed from the input (escape sequences and match
    /// markers count as consumed even though they occupy zero cells). A
    /// displayable grapheme cluster spanning several `char`s is always
    /// consumed in full — this never stops mid-cluster.
    pub chars_consumed: usize,
    /// Color/match state after the consumed prefix, present only when the
    /// caller asked for it via `want_end_ctx` (computing it is free either way
    /// but callers that discard a line don't need to carry it forward).
    pub end_state: Option<LayoutState>,
}

/// Walk `text`, consuming at most `max_cells` display cells worth of visible
/// grapheme clusters (escape sequences and match markers are free), starting
/// from `state`. Returns how many `char`s were consumed and, if requested,
/// the resulting [`LayoutState`] to carry into the next call (e.g. the next
/// physical line produced by wrapping the same logical line).
///
/// `max_cells == 0` consumes only escapes/markers and stops before the first
/// visible cluster. An unterminated CSI sequence running off the end of
/// `text` is consumed in full with no color effect (the sequence is assumed
/// to continue, or to have been truncated upstream; either way we must not
/// panic or misparse the remainder of the line).
///
/// A cluster wider than `max_cells` itself (e.g. a width-2 cluster against a
/// width-1 budget) is still consumed whole rather than split or dropped, so
/// callers that chunk a whole line by repeated `measure` calls always make
/// forward progress without ever slicing a cluster in half.
pub fn measure(text: &str, max_cells: u16, mut state: LayoutState, want_end_ctx: bool) -> MeasureResult {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let offsets = byte_offsets(&chars);
    let mut idx = 0usize;
    let mut cells_used: u16 = 0;

    while idx < n {
        if consume_escape_or_marker(&chars, &mut idx, &mut state) {
            continue;
        }

        let (cluster, cluster_chars) = cluster_at(text, &offsets, idx);
        let w = egc_width(cluster);
        if cells_used + w > max_cells {
            if cells_used == 0 && max_cells > 0 {
                idx += cluster_chars;
            }
            break;
        }
        cells_used += w;
        idx += cluster_chars;
    }

    MeasureResult {
        chars_consumed: idx,
        end_state: if want_end_ctx { Some(state) } else { None },
    }
}

/// One contiguous run of visible text sharing a single display color, as
/// produced by [`carve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRun {
    pub color: ColorAttr,
    pub text: String,
}

/// Skip `skip_cells` display cells (escapes/markers free as in [`measure`]),
/// then collect up to `take_cells` more display cells of visible text as
/// color-grouped runs, dropping all escape sequences and match markers from
/// the collected text itself.
///
/// Grounded in SPEC_FULL §4.6 step 3: "uses the VT layout engine to skip
/// `left_col` cells (preserving color state) and then measure
/// `right_col − left_col + 1` cells to carve the selected span; stores the
/// initial colors ... for each span" — `carve` is that two-phase skip/take
/// walk, built on the same per-char escape/marker handling as `measure`.
pub fn carve(text: &str, skip_cells: u16, take_cells: u16, mut state: LayoutState) -> Vec<ColorRun> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let offsets = byte_offsets(&chars);
    let mut idx = 0usize;
    let mut cells_skipped: u16 = 0;
    let mut cells_taken: u16 = 0;
    let mut runs: Vec<ColorRun> = Vec::new();

    while idx < n && cells_skipped < skip_cells {
        if consume_escape_or_marker(&chars, &mut idx, &mut state) {
            continue;
        }
        let (cluster, cluster_chars) = cluster_at(text, &offsets, idx);
        cells_skipped += egc_width(cluster);
        idx += cluster_chars;
    }

    while idx < n && cells_taken < take_cells {
        if consume_escape_or_marker(&chars, &mut idx, &mut state) {
            continue;
        }
        let (cluster, cluster_chars) = cluster_at(text, &offsets, idx);
        let w = egc_width(cluster);
        if cells_taken + w > take_cells {
            break;
        }
        cells_taken += w;
        push_run_cluster(&mut runs, state.display_color, cluster);
        idx += cluster_chars;
    }

    runs
}

fn push_run_cluster(runs: &mut Vec<ColorRun>, color: ColorAttr, cluster: &str) {
    match runs.last_mut() {
        Some(run) if run.color == color => run.text.push_str(cluster),
        _ => runs.push(ColorRun {
            color,
            text: cluster.to_string(),
        }),
    }
}

/// Byte offset of each `char` in `chars` within the source string, plus a
/// trailing entry for the string's total length — lets [`cluster_at`] slice
/// straight into the original `&str` instead of rebuilding one per cluster.
fn byte_offsets(chars: &[char]) -> Vec<usize> {
    let mut out = Vec::with_capacity(chars.len() + 1);
    let mut b = 0usize;
    for c in chars {
        out.push(b);
        b += c.len_utf8();
    }
    out.push(b);
    out
}

/// The extended grapheme cluster starting at `chars[idx]` and its length in
/// `char`s. Callers must first rule out `chars[idx]` being an escape or
/// match-marker byte via [`consume_escape_or_marker`] — those are always
/// their own cluster boundary (Control category forces a break), so this
/// never folds one in. Satisfies `egc_width`'s precondition that its input
/// already be a single cluster.
fn cluster_at<'a>(text: &'a str, offsets: &[usize], idx: usize) -> (&'a str, usize) {
    let cluster = text[offsets[idx]..].graphemes(true).next().unwrap_or("");
    (cluster, cluster.chars().count().max(1))
}

/// Advance `idx` past one escape sequence or match marker at `chars[*idx]`,
/// updating `state` accordingly, and return `true` if it did. Returns
/// `false` (leaving `idx` untouched) when `chars[*idx]` is an ordinary
/// displayable character the caller must account for itself.
fn consume_escape_or_marker(chars: &[char], idx: &mut usize, state: &mut LayoutState) -> bool {
    let n = chars.len();
    let c = chars[*idx];

    if c == '\u{1b}' && *idx + 1 < n && chars[*idx + 1] == '[' {
        let mut j = *idx + 2;
        while j < n && !is_csi_final(chars[j]) {
            j += 1;
        }
        if j >= n {
            // Unterminated CSI: swallow the rest of the input, no effect.
            *idx = n;
            return true;
        }
        let final_byte = chars[j];
        if final_byte == 'm' {
            let params: String = chars[*idx + 2..j].iter().collect();
            state.display_color = apply_sgr(state.display_color, &params);
            if state.chars_remaining_in_match == 0 {
                state.user_color = state.display_color;
            }
        }
        *idx = j + 1;
        return true;
    }

    if c == MATCH_START {
        state.display_color = reverse(state.user_color);
        state.chars_remaining_in_match = usize::MAX;
        *idx += 1;
        return true;
    }

    if c == MATCH_END {
        state.display_color = state.user_color;
        state.chars_remaining_in_match = 0;
        *idx += 1;
        return true;
    }

    false
}

/// Wrap each non-overlapping occurrence of `pattern` in `text`'s *visible*
/// content with `MATCH_START`/`MATCH_END` markers, leaving existing escape
/// sequences and any already-present markers untouched elsewhere. Matching is
/// byte-for-byte (case-sensitive) against the plain text with escapes
/// stripped out, mirroring the substring search the pager runtime performs to
/// locate matching physical lines in the first place.
///
/// Returns `text` unchanged (no allocation beyond the initial clone) when
/// `pattern` is empty or has no occurrence.
pub fn inject_match_markers(text: &str, pattern: &str) -> String {
    if pattern.is_empty() {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut scratch = LayoutState::initial(ColorAttr::default_attr());
    let mut idx = 0usize;
    let mut plain_chars: Vec<char> = Vec::new();
    let mut plain_raw_idx: Vec<usize> = Vec::new();

    while idx < n {
        if consume_escape_or_marker(&chars, &mut idx, &mut scratch) {
            continue;
        }
        plain_raw_idx.push(idx);
        plain_chars.push(chars[idx]);
        idx += 1;
    }
    plain_raw_idx.push(n);

    let pattern_chars: Vec<char> = pattern.chars().collect();
    let plen = pattern_chars.len();
    if plen == 0 || plen > plain_chars.len() {
        return text.to_string();
    }

    let mut matches: Vec<(usize, usize)> = Vec::new();
    let mut i = 0usize;
    while i + plen <= plain_chars.len() {
        if plain_chars[i..i + plen] == pattern_chars[..] {
            matches.push((i, i + plen));
            i += plen;
        } else {
            i += 1;
        }
    }
    if matches.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + matches.len() * 2);
    let mut raw_cursor = 0usize;
    for (match_start, match_end) in matches {
        let raw_start = plain_raw_idx[match_start];
        let raw_end = plain_raw_idx[match_end];
        out.extend(&chars[raw_cursor..raw_start]);
        out.push(MATCH_START);
        out.extend(&chars[raw_start..raw_end]);
        out.push(MATCH_END);
        raw_cursor = raw_end;
    }
    out.extend(&chars[raw_cursor..]);
    out
}

fn is_csi_final(c: char) -> bool {
    matches!(c, '@'..='~')
}

fn reverse(attr: ColorAttr) -> ColorAttr {
    attr.with_foreground(attr.background()).with_background(attr.foreground())
}

fn apply_sgr(mut attr: ColorAttr, params: &str) -> ColorAttr {
    if params.is_empty() {
        return ColorAttr::default_attr();
    }
    for p in params.split(';') {
        match p.parse::<u16>() {
            Ok(0) => attr = ColorAttr::default_attr(),
            Ok(1) => attr = attr.with_intensity(true),
            Ok(7) => attr = attr.with_reverse(true),
            Ok(n) if (30..=37).contains(&n) => attr = attr.with_foreground((n - 30) as u8),
            Ok(n) if (40..=47).contains(&n) => attr = attr.with_background((n - 40) as u8),
            Ok(39) => attr = attr.with_foreground(ColorAttr::default_attr().foreground()),
            Ok(49) => attr = attr.with_background(ColorAttr::default_attr().background()),
            _ => {}
        }
    }
    attr
}
