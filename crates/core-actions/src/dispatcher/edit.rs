//! Text-mutation actions: insert, backspace, delete-under, tab, newline.
//!
//! Grounded on the teacher's now-removed Vim dispatcher's edit handling
//! (`begin_insert_coalescing`/`note_insert_edit`/`end_insert_coalescing`
//! around `Buffer::insert_grapheme`), generalized to a modeless caller: every
//! edit here begins its own coalescing run rather than relying on a Vim
//! mode transition to open one.
//!
//! `auto_indent` and `expand_tab` read their policy straight off
//! `EditorState` (spec §6's persisted editor defaults); both are per-state
//! fields rather than constants so config and future dialogs can change them
//! at runtime.

use core_state::EditorState;
use core_text::{Buffer, Position};
use tracing::trace;

use super::EditAction;

/// Apply `action` to the active buffer at the view's cursor, advancing the
/// cursor and recording undo history. Returns `true` if the buffer changed.
pub fn handle_edit(state: &mut EditorState, cursor: &mut Position, action: &EditAction) -> bool {
    match action {
        EditAction::InsertChar(c) => {
            let mut g = [0u8; 4];
            insert_text(state, cursor, c.encode_utf8(&mut g));
            clear_provisional_if_here(state, cursor);
            true
        }
        EditAction::InsertText(text) => {
            insert_text(state, cursor, text);
            clear_provisional_if_here(state, cursor);
            true
        }
        EditAction::InsertNewline => {
            state.begin_insert_coalescing(*cursor);
            state.active_buffer_mut().insert_newline(cursor);
            if state.auto_indent {
                let indent = leading_whitespace_of_line(state, cursor.line.saturating_sub(1));
                if !indent.is_empty() {
                    for g in Buffer::iter(&indent) {
                        state.active_buffer_mut().insert_grapheme(cursor, g);
                    }
                }
                state.note_insert_edit();
                state.end_insert_coalescing();
                if indent.is_empty() {
                    state.clear_provisional_indent();
                } else {
                    state.mark_provisional_indent(cursor.line as u64);
                }
            } else {
                state.note_insert_edit();
                state.end_insert_coalescing();
                state.clear_provisional_indent();
            }
            trace!(target: "actions.edit", auto_indent = state.auto_indent, "edit_newline");
            true
        }
        EditAction::Backspace => {
            if cursor.line == 0 && cursor.byte == 0 {
                return false;
            }
            state.begin_insert_coalescing(*cursor);
            state.active_buffer_mut().delete_grapheme_before(cursor);
            state.note_insert_edit();
            clear_provisional_if_here(state, cursor);
            trace!(target: "actions.edit", "edit_backspace");
            true
        }
        EditAction::DeleteUnder => {
            state.push_discrete_edit_snapshot(*cursor);
            state.active_buffer_mut().delete_grapheme_at(cursor);
            clear_provisional_if_here(state, cursor);
            trace!(target: "actions.edit", "edit_delete_under");
            true
        }
        EditAction::Tab => {
            if state.expand_tab {
                let width = state.tab_width.max(1) as usize;
                let line = state.active_buffer().line(cursor.line).unwrap_or_default();
                let trimmed = line.strip_suffix('\n').unwrap_or(&line);
                let col = Buffer::visual_col(trimmed, cursor.byte);
                let spaces = width - (col % width);
                insert_text(state, cursor, &" ".repeat(spaces));
            } else {
                insert_text(state, cursor, "\t");
            }
            clear_provisional_if_here(state, cursor);
            true
        }
    }
}

fn insert_text(state: &mut EditorState, cursor: &mut Position, text: &str) {
    state.begin_insert_coalescing(*cursor);
    for g in Buffer::iter(text) {
        state.active_buffer_mut().insert_grapheme(cursor, g);
    }
    state.note_insert_edit();
    trace!(target: "actions.edit", len = text.len(), "edit_insert");
}

/// Leading run of spaces/tabs on `line_idx`, used to build the auto-indent
/// prefix for a freshly inserted line.
fn leading_whitespace_of_line(state: &EditorState, line_idx: usize) -> String {
    let Some(line) = state.active_buffer().line(line_idx) else {
        return String::new();
    };
    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    trimmed
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// If the cursor currently sits on the line marked as holding provisional
/// auto-indent whitespace, the user just typed real content there — confirm
/// it so save keeps the indent.
fn clear_provisional_if_here(state: &mut EditorState, cursor: &Position) {
    if state.provisional_indent_line() == Some(cursor.line as u64) {
        state.clear_provisional_indent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::EditorState;
    use core_text::Buffer;

    fn fresh_state(content: &str) -> EditorState {
        EditorState::new(Buffer::from_str("buf", content).unwrap())
    }

    #[test]
    fn insert_char_advances_cursor_and_marks_dirty() {
        let mut state = fresh_state("ab");
        let mut cursor = Position::new(0, 1);
        assert!(handle_edit(
            &mut state,
            &mut cursor,
            &EditAction::InsertChar('X')
        ));
        assert_eq!(state.active_buffer().line(0).unwrap(), "aXb");
        assert_eq!(cursor.byte, 2);
    }

    #[test]
    fn backspace_at_origin_is_a_noop() {
        let mut state = fresh_state("ab");
        let mut cursor = Position::new(0, 0);
        assert!(!handle_edit(&mut state, &mut cursor, &EditAction::Backspace));
        assert_eq!(state.active_buffer().line(0).unwrap(), "ab");
    }

    #[test]
    fn delete_under_removes_grapheme_and_is_individually_undoable() {
        let mut state = fresh_state("abc");
        let mut cursor = Position::new(0, 0);
        handle_edit(&mut state, &mut cursor, &EditAction::DeleteUnder);
        assert_eq!(state.active_buffer().line(0).unwrap(), "bc");
        assert!(state.undo(&mut cursor));
        assert_eq!(state.active_buffer().line(0).unwrap(), "abc");
    }

    #[test]
    fn tab_inserts_a_literal_tab_by_default() {
        let mut state = fresh_state("");
        let mut cursor = Position::origin();
        handle_edit(&mut state, &mut cursor, &EditAction::Tab);
        assert_eq!(state.active_buffer().line(0).unwrap(), "\t");
    }

    #[test]
    fn tab_expands_to_next_stop_when_expand_tab_is_set() {
        let mut state = fresh_state("ab");
        state.expand_tab = true;
        state.tab_width = 4;
        let mut cursor = Position::new(0, 2);
        handle_edit(&mut state, &mut cursor, &EditAction::Tab);
        assert_eq!(state.active_buffer().line(0).unwrap(), "ab  ");
        assert_eq!(cursor.byte, 4);
    }

    #[test]
    fn insert_text_inserts_multiple_graphemes_as_one_run() {
        let mut state = fresh_state("");
        let mut cursor = Position::origin();
        handle_edit(
            &mut state,
            &mut cursor,
            &EditAction::InsertText("hello".to_string()),
        );
        assert_eq!(state.active_buffer().line(0).unwrap(), "hello");
        assert_eq!(cursor.byte, 5);
    }

    #[test]
    fn newline_with_auto_indent_copies_leading_whitespace() {
        let mut state = fresh_state("  indented\n");
        state.auto_indent = true;
        let mut cursor = Position::new(0, 10);
        handle_edit(&mut state, &mut cursor, &EditAction::InsertNewline);
        assert_eq!(state.active_buffer().line(1).unwrap(), "  \n");
        assert_eq!(cursor.byte, 2);
        assert_eq!(state.provisional_indent_line(), Some(1));
    }

    #[test]
    fn typing_on_the_auto_indented_line_confirms_it() {
        let mut state = fresh_state("  indented\n");
        state.auto_indent = true;
        let mut cursor = Position::new(0, 10);
        handle_edit(&mut state, &mut cursor, &EditAction::InsertNewline);
        handle_edit(&mut state, &mut cursor, &EditAction::InsertChar('x'));
        assert_eq!(state.provisional_indent_line(), None);
        assert_eq!(state.active_buffer().line(1).unwrap(), "  x\n");
    }

    #[test]
    fn newline_without_auto_indent_has_no_prefix() {
        let mut state = fresh_state("  indented\n");
        state.auto_indent = false;
        let mut cursor = Position::new(0, 10);
        handle_edit(&mut state, &mut cursor, &EditAction::InsertNewline);
        assert_eq!(state.active_buffer().line(1).unwrap(), "\n");
        assert_eq!(state.provisional_indent_line(), None);
    }
}
