//! Property 7 (undo/redo is its own inverse) and scenario S5 (undo/redo).

use core_actions::dispatcher::{Action, EditAction, dispatch};
use core_model::{EditorModel, View, ViewId};
use core_state::EditorState;
use core_text::{Buffer, Position};

fn fresh_model(content: &str) -> EditorModel {
    let state = EditorState::new(Buffer::from_str("buf", content).unwrap());
    EditorModel::with_view(View::new(ViewId(0), 0, Position::origin(), 0), state)
}

fn line0(model: &EditorModel) -> String {
    model.state().active_buffer().line(0).unwrap_or_default()
}

fn type_text(model: &mut EditorModel, sticky: &mut Option<usize>, text: &str) {
    for c in text.chars() {
        dispatch(&Action::Edit(EditAction::InsertChar(c)), model, sticky, &[]);
    }
}

/// S5: buffer "hello", cursor at end, type " world"; undo restores "hello";
/// redo restores "hello world"; a second undo past the beginning is a no-op.
#[test]
fn s5_undo_redo_round_trip() {
    let mut model = fresh_model("hello");
    model.active_view_mut().cursor = Position::new(0, 5);
    let mut sticky = None;

    type_text(&mut model, &mut sticky, " world");
    assert_eq!(line0(&model), "hello world");

    dispatch(&Action::Undo, &mut model, &mut sticky, &[]);
    assert_eq!(line0(&model), "hello");

    dispatch(&Action::Redo, &mut model, &mut sticky, &[]);
    assert_eq!(line0(&model), "hello world");

    dispatch(&Action::Undo, &mut model, &mut sticky, &[]);
    assert_eq!(line0(&model), "hello");
    dispatch(&Action::Undo, &mut model, &mut sticky, &[]);
    assert_eq!(line0(&model), "hello", "a second undo past the beginning is a no-op");
}

/// Property 7: N undos followed by N redos is the identity, for several N.
///
/// `InsertChar` only opens a coalescing run (`begin_insert_coalescing`); only
/// `InsertNewline` closes one (`end_insert_coalescing`). So consecutive
/// `InsertChar` dispatches with no newline between them — which is what
/// every `type_text` call below produces — all land in the same run and
/// collapse to a single undo snapshot, however many separate `type_text`
/// calls or outer-loop iterations produced them. That still leaves this
/// property intact: undo calls beyond the single snapshot, and redo calls
/// beyond the single redo entry, are no-ops, so "N undos" always bottoms out
/// at "start" and "N redos" always lands back on `after_typing` for every N.
#[test]
fn n_undos_then_n_redos_is_identity_for_several_n() {
    for n in [1usize, 2, 3, 5] {
        let mut model = fresh_model("start");
        model.active_view_mut().cursor = Position::new(0, 5);
        let mut sticky = None;

        for i in 0..n {
            type_text(&mut model, &mut sticky, &i.to_string());
        }
        let after_typing = line0(&model);

        for _ in 0..n {
            dispatch(&Action::Undo, &mut model, &mut sticky, &[]);
        }
        assert_eq!(line0(&model), "start", "n={n} undos should fully unwind");

        for _ in 0..n {
            dispatch(&Action::Redo, &mut model, &mut sticky, &[]);
        }
        assert_eq!(line0(&model), after_typing, "n={n} redos should restore the typed content");
    }
}
