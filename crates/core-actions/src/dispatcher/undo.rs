//! Undo/redo actions: thin wrappers over `EditorState::{undo,redo}`.
//!
//! Grounded on the teacher's removed `dispatcher/undo.rs`, which was already
//! this small — the actual snapshot/coalescing policy lives in
//! `core_state::undo::UndoEngine`, this module just supplies the cursor slot
//! the engine restores into.

use core_state::EditorState;
use core_text::Position;

/// Pop the most recent undo snapshot, restoring `cursor`. Returns `true` if a
/// snapshot was applied.
pub fn handle_undo(state: &mut EditorState, cursor: &mut Position) -> bool {
    state.undo(cursor)
}

/// Pop the most recent redo snapshot, restoring `cursor`. Returns `true` if a
/// snapshot was applied.
pub fn handle_redo(state: &mut EditorState, cursor: &mut Position) -> bool {
    state.redo(cursor)
}
