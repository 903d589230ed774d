//! Pager mouse handling: selection begin/extend/clear, periodic auto-scroll
//! overshoot, copy-on-right-click, and double-click word selection
//! (SPEC_FULL §4.5 "Mouse handling").
//!
//! Grounded on `core_render::selection::RectSelection` for the selection
//! state itself; this module only derives selection transitions and a
//! scroll-overshoot hint from a raw `core_events::MouseEvent` stream, mostly
//! stateless aside from the double-click timing window.

use std::time::{Duration, Instant};

use core_events::{MouseButton, MouseEvent, MouseEventKind};
use core_render::selection::RectSelection;
use core_text::Buffer;

const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

/// What a mouse event asks the pager runtime to do. Selection mutation
/// itself happens here (the caller owns the `Option<RectSelection>` slot);
/// actions needing data this module doesn't have (clipboard export, the
/// viewport's current row→physical-line mapping for scroll) are reported
/// back for the runtime to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEffect {
    None,
    /// Selection changed (began, extended, or was cleared); redraw the
    /// highlight if `core_render::selection::redraw_needed` says to.
    SelectionChanged,
    /// Left button released: stop any periodic auto-scroll.
    StopAutoScroll,
    /// Right button down with an active selection: copy it, then clear it.
    CopyAndClear,
    /// Left button double-clicked at `(row, col)`: the caller resolves the
    /// clicked row's text and calls `word_bounds_at` to replace the
    /// single-cell selection `handle` already started with the word span.
    DoubleClick { row: u64, col: usize },
}

/// Tracks just enough mouse state across calls to resolve double-clicks and
/// drag-scroll overshoot; owned by the pager runtime alongside its
/// `Option<RectSelection>`.
#[derive(Debug, Default)]
pub struct MouseState {
    last_left_down: Option<(u16, u16, Instant)>,
    /// Rows of overshoot past the viewport edge during a drag, signed by
    /// direction (negative = above, positive = below); `0` when not
    /// overshooting.
    pub scroll_overshoot_rows: i32,
}

impl MouseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one mouse event against `selection`, returning the effect the
    /// caller should act on. `viewport_rows` bounds the visible window so a
    /// drag past either edge can report overshoot for periodic scroll.
    pub fn handle(
        &mut self,
        event: &MouseEvent,
        selection: &mut Option<RectSelection>,
        viewport_rows: u16,
    ) -> MouseEffect {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let now = Instant::now();
                let is_double = self
                    .last_left_down
                    .map(|(c, r, at)| {
                        c == event.column && r == event.row && now.duration_since(at) <= DOUBLE_CLICK_WINDOW
                    })
                    .unwrap_or(false);
                self.last_left_down = Some((event.column, event.row, now));
                self.scroll_overshoot_rows = 0;
                *selection = Some(RectSelection::start(event.row as u64, event.column as usize));

                if is_double {
                    // Word-boundary selection is resolved by the caller: it
                    // needs the clicked row's text, which this module
                    // doesn't have.
                    MouseEffect::DoubleClick {
                        row: event.row as u64,
                        col: event.column as usize,
                    }
                } else {
                    MouseEffect::SelectionChanged
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(sel) = selection {
                    sel.extend_to(event.row as u64, event.column as usize);
                }
                self.scroll_overshoot_rows = if event.row == 0 {
                    -1
                } else if event.row + 1 >= viewport_rows {
                    1
                } else {
                    0
                };
                MouseEffect::SelectionChanged
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.scroll_overshoot_rows = 0;
                MouseEffect::StopAutoScroll
            }
            MouseEventKind::Down(MouseButton::Right) => {
                if selection.is_some() {
                    *selection = None;
                    MouseEffect::CopyAndClear
                } else {
                    MouseEffect::None
                }
            }
            _ => MouseEffect::None,
        }
    }
}

/// Find the word (per `Buffer::is_word`'s grapheme classification) at byte
/// offset `col_byte` in `line_text`, returning its `[start, end)` byte range.
/// Used to resolve double-click selections once the caller has the clicked
/// row's text in hand.
pub fn word_bounds_at(line_text: &str, col_byte: usize) -> (usize, usize) {
    let graphemes: Vec<&str> = Buffer::iter(line_text).collect();
    let mut offsets = Vec::with_capacity(graphemes.len() + 1);
    let mut acc = 0usize;
    for g in &graphemes {
        offsets.push(acc);
        acc += g.len();
    }
    offsets.push(acc);

    let clicked = offsets
        .iter()
        .rposition(|&o| o <= col_byte)
        .unwrap_or(0)
        .min(graphemes.len().saturating_sub(1));
    if graphemes.is_empty() {
        return (0, 0);
    }
    if !Buffer::is_word(graphemes[clicked]) {
        return (offsets[clicked], offsets[clicked + 1]);
    }

    let mut start = clicked;
    while start > 0 && Buffer::is_word(graphemes[start - 1]) {
        start -= 1;
    }
    let mut end = clicked;
    while end + 1 < graphemes.len() && Buffer::is_word(graphemes[end + 1]) {
        end += 1;
    }
    (offsets[start], offsets[end + 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::ModMask;

    fn mouse(kind: MouseEventKind, col: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column: col,
            row,
            mods: ModMask::empty(),
        }
    }

    #[test]
    fn left_down_begins_a_selection() {
        let mut state = MouseState::new();
        let mut selection = None;
        let effect = state.handle(&mouse(MouseEventKind::Down(MouseButton::Left), 3, 2), &mut selection, 10);
        assert_eq!(effect, MouseEffect::SelectionChanged);
        assert!(selection.is_some());
    }

    #[test]
    fn drag_extends_and_reports_bottom_overshoot() {
        let mut state = MouseState::new();
        let mut selection = Some(RectSelection::start(0, 0));
        let effect = state.handle(&mouse(MouseEventKind::Drag(MouseButton::Left), 1, 9), &mut selection, 10);
        assert_eq!(effect, MouseEffect::SelectionChanged);
        assert_eq!(state.scroll_overshoot_rows, 1);
        assert_eq!(selection.unwrap().cursor_row, 9);
    }

    #[test]
    fn left_up_stops_auto_scroll() {
        let mut state = MouseState::new();
        state.scroll_overshoot_rows = 1;
        let mut selection = Some(RectSelection::start(0, 0));
        let effect = state.handle(&mouse(MouseEventKind::Up(MouseButton::Left), 1, 1), &mut selection, 10);
        assert_eq!(effect, MouseEffect::StopAutoScroll);
        assert_eq!(state.scroll_overshoot_rows, 0);
    }

    #[test]
    fn right_down_with_active_selection_copies_and_clears() {
        let mut state = MouseState::new();
        let mut selection = Some(RectSelection::start(0, 0));
        let effect = state.handle(&mouse(MouseEventKind::Down(MouseButton::Right), 1, 1), &mut selection, 10);
        assert_eq!(effect, MouseEffect::CopyAndClear);
        assert!(selection.is_none());
    }

    #[test]
    fn right_down_without_selection_is_a_noop() {
        let mut state = MouseState::new();
        let mut selection = None;
        let effect = state.handle(&mouse(MouseEventKind::Down(MouseButton::Right), 1, 1), &mut selection, 10);
        assert_eq!(effect, MouseEffect::None);
    }

    #[test]
    fn second_click_within_window_reports_double_click() {
        let mut state = MouseState::new();
        let mut selection = None;
        state.handle(&mouse(MouseEventKind::Down(MouseButton::Left), 3, 2), &mut selection, 10);
        let effect = state.handle(&mouse(MouseEventKind::Down(MouseButton::Left), 3, 2), &mut selection, 10);
        assert_eq!(effect, MouseEffect::DoubleClick { row: 2, col: 3 });
    }

    #[test]
    fn word_bounds_finds_the_clicked_word() {
        let (start, end) = word_bounds_at("the quick fox", 4);
        assert_eq!(&"the quick fox"[start..end], "quick");
    }

    #[test]
    fn word_bounds_on_whitespace_returns_just_that_grapheme() {
        let (start, end) = word_bounds_at("a b", 1);
        assert_eq!(&"a b"[start..end], " ");
    }
}
