//! Cursor motions: the modeless editor's `MotionKind` handling.
//!
//! Grounded on the teacher's removed Vim `dispatcher/motion.rs`, stripped of
//! count-prefix/operator-pending composition (that lived in the dropped NGI
//! layer) and generalized to plain `Up`/`Down`/`Left`/`Right`/paging motions
//! driven straight off a flat key mapping.
//!
//! `EditorState::traditional_navigation` (spec §6) picks between two
//! line-boundary behaviors for `Left`/`Right`: *traditional* stays put at a
//! line boundary rather than crossing it; *modern* wraps to the
//! previous/next line like most contemporary editors. Traditional mode's
//! other half — letting the cursor rest past end-of-line in virtual space —
//! isn't modeled: `Position`'s byte offset is also the insert point handed
//! straight to `Buffer::insert_grapheme`, and that API assumes an in-bounds
//! offset, so an out-of-bounds "virtual column" would corrupt inserts. Both
//! modes clamp to the line's actual length; only the line-crossing behavior
//! differs.

use core_state::EditorState;
use core_text::{Buffer, Position};

use super::MotionKind;

/// Apply `motion` to `cursor` against `state`'s active buffer.
///
/// `sticky_visual_col` threads the "remembered" visual column across
/// consecutive `Up`/`Down` motions so moving through a short line and back
/// into a long one restores the original column, the same convention as
/// most modeless text editors' vertical navigation.
pub fn handle_motion(
    state: &EditorState,
    cursor: &mut Position,
    motion: &MotionKind,
    sticky_visual_col: &mut Option<usize>,
) {
    let buffer = state.active_buffer();
    let traditional = state.traditional_navigation;
    if !matches!(motion, MotionKind::Up(_) | MotionKind::Down(_)) {
        *sticky_visual_col = None;
    }

    match motion {
        MotionKind::Left(n) => {
            for _ in 0..*n {
                move_left(buffer, cursor, traditional);
            }
        }
        MotionKind::Right(n) => {
            for _ in 0..*n {
                move_right(buffer, cursor, traditional);
            }
        }
        MotionKind::Up(n) => move_vertical(buffer, cursor, sticky_visual_col, -(*n as isize)),
        MotionKind::Down(n) => move_vertical(buffer, cursor, sticky_visual_col, *n as isize),
        MotionKind::Home => cursor.byte = 0,
        MotionKind::End => {
            cursor.byte = buffer.line_byte_len(cursor.line);
        }
        MotionKind::PageUp(rows) => {
            move_vertical(buffer, cursor, sticky_visual_col, -(*rows as isize))
        }
        MotionKind::PageDown(rows) => {
            move_vertical(buffer, cursor, sticky_visual_col, *rows as isize)
        }
        MotionKind::DocumentStart => {
            cursor.line = 0;
            cursor.byte = 0;
        }
        MotionKind::DocumentEnd => {
            cursor.line = buffer.line_count().saturating_sub(1);
            cursor.byte = buffer.line_byte_len(cursor.line);
        }
    }
}

fn move_left(buffer: &Buffer, cursor: &mut Position, traditional: bool) {
    if cursor.byte > 0 {
        let line = buffer.line(cursor.line).unwrap_or_default();
        cursor.byte = Buffer::prev_boundary(&line, cursor.byte);
    } else if !traditional && cursor.line > 0 {
        cursor.line -= 1;
        cursor.byte = buffer.line_byte_len(cursor.line);
    }
}

fn move_right(buffer: &Buffer, cursor: &mut Position, traditional: bool) {
    let len = buffer.line_byte_len(cursor.line);
    if cursor.byte < len {
        let line = buffer.line(cursor.line).unwrap_or_default();
        cursor.byte = Buffer::next_boundary(&line, cursor.byte);
    } else if !traditional && cursor.line + 1 < buffer.line_count() {
        cursor.line += 1;
        cursor.byte = 0;
    }
}

fn move_vertical(
    buffer: &Buffer,
    cursor: &mut Position,
    sticky_visual_col: &mut Option<usize>,
    delta: isize,
) {
    let line = buffer.line(cursor.line).unwrap_or_default();
    let want_col = *sticky_visual_col.get_or_insert_with(|| Buffer::visual_col(&line, cursor.byte));

    let last_line = buffer.line_count().saturating_sub(1);
    let target_line = (cursor.line as isize + delta).clamp(0, last_line as isize) as usize;
    cursor.line = target_line;

    let target_text = buffer.line(target_line).unwrap_or_default();
    cursor.byte = byte_for_visual_col(&target_text, want_col);
}

fn byte_for_visual_col(line: &str, want_col: usize) -> usize {
    let mut col = 0usize;
    let mut byte = 0usize;
    for g in Buffer::iter(line) {
        let w = Buffer::cluster_width(g);
        if col + w > want_col {
            break;
        }
        col += w;
        byte += g.len();
    }
    byte
}
