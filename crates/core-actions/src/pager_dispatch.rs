//! Modeless pager actions: the `more`-side counterpart to `dispatcher::dispatch`.
//!
//! Grounded on `core_render::pager_viewport::PagerViewport`'s existing
//! `move_down`/`move_up`/`move_left`/`move_right`/`regenerate` methods — this
//! module only adds the flat key-driven action enum and the thin wiring that
//! picks which of those to call, the same "dispatch is a match, the heavy
//! lifting already lives elsewhere" shape as `dispatcher::dispatch`.

use core_state::LineStore;
use core_render::pager_viewport::PagerViewport;

/// A fully-resolved pager action, the output of `keymap::translate_pager_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerAction {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,
    ScrollLeft,
    ScrollRight,
    OpenSearchForward,
    OpenSearchBackward,
    RepeatSearchForward,
    RepeatSearchBackward,
    Quit,
}

/// Direction for an interactive search, surfaced to the binary-level runtime
/// so it can drive the `/`/`?` prompt; the pattern text itself isn't known
/// at keymap-translation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PagerDispatchResult {
    pub quit: bool,
    pub open_search_dialog: Option<SearchDirection>,
    pub repeat_search: Option<SearchDirection>,
}

const SCROLL_STEP: usize = 4;

/// Dispatch `action` against `viewport`. Opening the search prompt and
/// repeating a previous search both need pattern text/state that lives above
/// this layer (the binary's search-dialog and last-pattern history), so
/// those variants are reported back via `PagerDispatchResult` instead of
/// acted on here.
pub fn dispatch_pager(
    action: PagerAction,
    viewport: &mut PagerViewport,
    store: &LineStore,
) -> PagerDispatchResult {
    match action {
        PagerAction::LineUp => {
            viewport.move_up(1, store);
            PagerDispatchResult::default()
        }
        PagerAction::LineDown => {
            viewport.move_down(1, store);
            PagerDispatchResult::default()
        }
        PagerAction::PageUp => {
            viewport.move_up(viewport.viewport_height(), store);
            PagerDispatchResult::default()
        }
        PagerAction::PageDown => {
            viewport.move_down(viewport.viewport_height(), store);
            PagerDispatchResult::default()
        }
        PagerAction::GoToTop => {
            viewport.regenerate(0, store);
            PagerDispatchResult::default()
        }
        PagerAction::GoToBottom => {
            // Approximate: assumes roughly one logical line per physical
            // line. Exact placement of the final page when long lines wrap
            // would need a backward scan from the end of the store; `more`
            // corrects this on the next `move_up`/`move_down` call since both
            // re-derive chunk boundaries from `store` rather than trusting
            // the jump target.
            let total = store.len();
            let height = viewport.viewport_height() as u64;
            let first = total.saturating_sub(height);
            viewport.regenerate(first, store);
            PagerDispatchResult::default()
        }
        PagerAction::ScrollLeft => {
            viewport.move_left(SCROLL_STEP);
            PagerDispatchResult::default()
        }
        PagerAction::ScrollRight => {
            viewport.move_right(SCROLL_STEP);
            PagerDispatchResult::default()
        }
        PagerAction::OpenSearchForward => PagerDispatchResult {
            open_search_dialog: Some(SearchDirection::Forward),
            ..Default::default()
        },
        PagerAction::OpenSearchBackward => PagerDispatchResult {
            open_search_dialog: Some(SearchDirection::Backward),
            ..Default::default()
        },
        PagerAction::RepeatSearchForward => PagerDispatchResult {
            repeat_search: Some(SearchDirection::Forward),
            ..Default::default()
        },
        PagerAction::RepeatSearchBackward => PagerDispatchResult {
            repeat_search: Some(SearchDirection::Backward),
            ..Default::default()
        },
        PagerAction::Quit => PagerDispatchResult {
            quit: true,
            ..Default::default()
        },
    }
}
