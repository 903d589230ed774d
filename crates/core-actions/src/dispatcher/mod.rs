//! Modeless action dispatch: the single entry point that turns an `Action`
//! into a buffer/view mutation.
//!
//! Grounded on the teacher's removed Vim `dispatcher/mod.rs`
//! (`DispatchResult` constructor pattern, `dispatch(action, model, ...)`
//! splitting state/view via `EditorModel::split_state_and_active_view`) with
//! the operator-pending/mode-composition machinery stripped out: every
//! `Action` here is already fully resolved, so dispatch is a flat match
//! instead of a state machine.

pub mod edit;
pub mod find_replace;
pub mod motion;
pub mod undo;

use core_model::EditorModel;
use core_state::{SelectionKind, SelectionSpan};
use core_text::Position;
use std::path::PathBuf;
use tracing::trace;

pub use find_replace::MatchSpan;

/// A fully-resolved editor action, the output of `keymap::translate_editor_key`.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Edit(EditAction),
    Motion(MotionKind),
    /// Move the cursor like `Motion`, but grow (or start) the persistent
    /// selection between the pre-motion anchor and the new cursor instead of
    /// leaving it untouched (Shift+arrow/Home/End/PageUp/PageDown).
    ExtendSelection(MotionKind),
    Undo,
    Redo,
    Cut,
    Copy,
    Paste,
    Save,
    SaveAs(PathBuf),
    Open(PathBuf),
    OpenFindDialog,
    OpenReplaceDialog,
    OpenGoToLineDialog,
    /// Seek the cursor to the next/previous plain-text match (Find dialog
    /// confirm / repeat); does not mutate the buffer.
    FindNext(String),
    FindPrev(String),
    /// Replace the match at or after the cursor (Replace dialog's "Replace"
    /// button); no-op if `pattern` doesn't occur.
    ReplaceOne { pattern: String, replacement: String },
    /// Replace every occurrence in the buffer (Replace dialog's "Replace
    /// All" button).
    ReplaceAll { pattern: String, replacement: String },
    /// Move the cursor to the start of the given 1-based line number
    /// (Go-To-Line dialog confirm); clamps to the document's bounds.
    GoToLine(u64),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    InsertChar(char),
    /// Multi-character insert (paste, IME commit) applied as one coalesced run.
    InsertText(String),
    InsertNewline,
    Backspace,
    DeleteUnder,
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    Left(usize),
    Right(usize),
    Up(usize),
    Down(usize),
    Home,
    End,
    PageUp(usize),
    PageDown(usize),
    DocumentStart,
    DocumentEnd,
}

/// Observes every dispatched action, before and after it mutates the model.
///
/// Mirrors the teacher's hook-style extension points elsewhere in the
/// workspace (`core_events::EventHooks`): default no-op methods so most
/// observers only implement the one hook they care about.
pub trait ActionObserver: Send + Sync {
    fn before_dispatch(&self, _action: &Action) {}
    fn after_dispatch(&self, _action: &Action, _result: &DispatchResult) {}
}

/// Outcome of a single `dispatch()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchResult {
    pub dirty: bool,
    pub quit: bool,
    pub buffer_replaced: bool,
}

impl DispatchResult {
    pub fn clean() -> Self {
        Self::default()
    }
    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }
    pub fn quit() -> Self {
        Self {
            quit: true,
            ..Self::default()
        }
    }
    pub fn buffer_replaced() -> Self {
        Self {
            buffer_replaced: true,
            ..Self::default()
        }
    }
}

/// Dispatch `action` against `model`, notifying `observers` before and after.
///
/// File I/O, dialogs, and clipboard export are intentionally NOT performed
/// here: they need filesystem/dialog/clipboard access that belongs to the
/// binary-level runtime, not this buffer-mutation layer. Those variants
/// return `DispatchResult::clean()` unchanged so the caller can act on them
/// by matching `action` itself.
pub fn dispatch(
    action: &Action,
    model: &mut EditorModel,
    sticky_visual_col: &mut Option<usize>,
    observers: &[Box<dyn ActionObserver>],
) -> DispatchResult {
    for obs in observers {
        obs.before_dispatch(action);
    }

    let (state, view) = model.split_state_and_active_view();
    let result = match action {
        Action::Edit(edit_action) => {
            let changed = edit::handle_edit(state, &mut view.cursor, edit_action);
            *sticky_visual_col = None;
            state.clear_selection();
            if changed {
                state.dirty = true;
                DispatchResult::dirty()
            } else {
                DispatchResult::clean()
            }
        }
        Action::Motion(motion) => {
            motion::handle_motion(state, &mut view.cursor, motion, sticky_visual_col);
            state.clear_selection();
            DispatchResult::clean()
        }
        Action::ExtendSelection(motion) => {
            let anchor = state.selection_mut().anchor.unwrap_or(view.cursor);
            motion::handle_motion(state, &mut view.cursor, motion, sticky_visual_col);
            let span = SelectionSpan::anchored(anchor, view.cursor, SelectionKind::Characterwise);
            let selection = state.selection_mut();
            selection.anchor = Some(anchor);
            selection.set(span);
            DispatchResult::clean()
        }
        Action::Undo => {
            let applied = undo::handle_undo(state, &mut view.cursor);
            *sticky_visual_col = None;
            if applied {
                DispatchResult::dirty()
            } else {
                DispatchResult::clean()
            }
        }
        Action::Redo => {
            let applied = undo::handle_redo(state, &mut view.cursor);
            *sticky_visual_col = None;
            if applied {
                DispatchResult::dirty()
            } else {
                DispatchResult::clean()
            }
        }
        Action::FindNext(pattern) => {
            if let Some(m) = find_replace::find_next(state.active_buffer(), view.cursor, pattern) {
                view.cursor = m.start;
            }
            DispatchResult::clean()
        }
        Action::FindPrev(pattern) => {
            if let Some(m) = find_replace::find_prev(state.active_buffer(), view.cursor, pattern) {
                view.cursor = m.start;
            }
            DispatchResult::clean()
        }
        Action::ReplaceOne {
            pattern,
            replacement,
        } => {
            let found = find_replace::find_next(state.active_buffer(), view.cursor, pattern);
            if let Some(m) = found {
                view.cursor = find_replace::replace_match(state, m, replacement);
                DispatchResult::dirty()
            } else {
                DispatchResult::clean()
            }
        }
        Action::ReplaceAll {
            pattern,
            replacement,
        } => {
            if find_replace::replace_all(state, pattern, replacement) > 0 {
                DispatchResult::dirty()
            } else {
                DispatchResult::clean()
            }
        }
        Action::GoToLine(line) => {
            let target = (*line).saturating_sub(1) as usize;
            let clamped = target.min(state.active_buffer().line_count().saturating_sub(1));
            view.cursor = Position::new(clamped, 0);
            *sticky_visual_col = None;
            DispatchResult::clean()
        }
        Action::Quit => DispatchResult::quit(),
        Action::Cut
        | Action::Copy
        | Action::Paste
        | Action::Save
        | Action::SaveAs(_)
        | Action::Open(_)
        | Action::OpenFindDialog
        | Action::OpenReplaceDialog
        | Action::OpenGoToLineDialog => DispatchResult::clean(),
    };

    trace!(target: "actions.dispatch", ?action, ?result, "dispatched");
    for obs in observers {
        obs.after_dispatch(action, &result);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{EditorModel, View, ViewId};
    use core_state::EditorState;
    use core_text::{Buffer, Position};

    fn fresh_model(content: &str) -> EditorModel {
        let state = EditorState::new(Buffer::from_str("buf", content).unwrap());
        EditorModel::with_view(View::new(ViewId(0), 0, Position::origin(), 0), state)
    }

    #[test]
    fn dispatch_edit_marks_model_dirty() {
        let mut model = fresh_model("");
        let mut sticky = None;
        let result = dispatch(
            &Action::Edit(EditAction::InsertChar('x')),
            &mut model,
            &mut sticky,
            &[],
        );
        assert!(result.dirty);
        assert_eq!(model.active_view().cursor.byte, 1);
        assert!(model.state().dirty);
    }

    #[test]
    fn dispatch_motion_resets_sticky_column() {
        let mut model = fresh_model("abcdef");
        let mut sticky = Some(3);
        let result = dispatch(
            &Action::Motion(MotionKind::Right(1)),
            &mut model,
            &mut sticky,
            &[],
        );
        assert!(!result.dirty);
        assert_eq!(sticky, None);
    }

    #[test]
    fn dispatch_quit_returns_quit_result_without_touching_buffer() {
        let mut model = fresh_model("abc");
        let mut sticky = None;
        let result = dispatch(&Action::Quit, &mut model, &mut sticky, &[]);
        assert!(result.quit);
        assert!(!result.dirty);
    }

    #[test]
    fn dispatch_save_is_a_clean_noop_at_this_layer() {
        let mut model = fresh_model("abc");
        let mut sticky = None;
        let result = dispatch(&Action::Save, &mut model, &mut sticky, &[]);
        assert_eq!(result, DispatchResult::clean());
    }

    struct CountingObserver {
        before: std::sync::Arc<std::sync::atomic::AtomicUsize>,
        after: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ActionObserver for CountingObserver {
        fn before_dispatch(&self, _action: &Action) {
            self.before
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        fn after_dispatch(&self, _action: &Action, _result: &DispatchResult) {
            self.after
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    #[test]
    fn observers_see_both_hooks_exactly_once() {
        let mut model = fresh_model("abc");
        let mut sticky = None;
        let before = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let after = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let observers: Vec<Box<dyn ActionObserver>> = vec![Box::new(CountingObserver {
            before: before.clone(),
            after: after.clone(),
        })];
        dispatch(
            &Action::Motion(MotionKind::Left(1)),
            &mut model,
            &mut sticky,
            &observers,
        );
        assert_eq!(before.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(after.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn dispatch_find_next_moves_cursor_without_dirtying() {
        let mut model = fresh_model("foo bar foo");
        let mut sticky = None;
        let result = dispatch(
            &Action::FindNext("foo".to_string()),
            &mut model,
            &mut sticky,
            &[],
        );
        assert!(!result.dirty);
        assert_eq!(model.active_view().cursor, Position::new(0, 8));
    }

    #[test]
    fn dispatch_replace_all_mutates_and_dirties() {
        let mut model = fresh_model("foo foo");
        let mut sticky = None;
        let result = dispatch(
            &Action::ReplaceAll {
                pattern: "foo".to_string(),
                replacement: "bar".to_string(),
            },
            &mut model,
            &mut sticky,
            &[],
        );
        assert!(result.dirty);
        assert_eq!(model.state().active_buffer().line(0).unwrap(), "bar bar");
    }

    #[test]
    fn dispatch_go_to_line_clamps_to_document_bounds() {
        let mut model = fresh_model("a\nb\nc");
        let mut sticky = None;
        let result = dispatch(&Action::GoToLine(99), &mut model, &mut sticky, &[]);
        assert!(!result.dirty);
        assert_eq!(model.active_view().cursor, Position::new(2, 0));
    }
}
