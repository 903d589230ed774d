//! Flat key → action mapping for both runtime modes.
//!
//! Grounded on the teacher's removed `key_translator.rs`, stripped of the
//! pending-context/timeout composition that existed to resolve Vim-style
//! multi-key commands. Every binding here maps directly off the live input
//! task's `KeyEventExt`/`KeyToken` (see `core-input/src/async_service.rs`,
//! which emits `Event::Input(InputEvent::KeyPress(KeyEventExt::with_repeat(..)))`)
//! with no state carried between calls.

use core_events::{KeyEventExt, KeyToken, ModMask, NamedKey};

use crate::dispatcher::{Action, EditAction, MotionKind};
use crate::pager_dispatch::PagerAction;

const PAGE_ROWS_DEFAULT: usize = 20;

/// Translate one keypress into an editor `Action`, or `None` if unbound.
pub fn translate_editor_key(key: &KeyEventExt) -> Option<Action> {
    let mods = key.token_mods();
    let ctrl = mods.contains(ModMask::CTRL);
    let shift = mods.contains(ModMask::SHIFT);
    let base = key.token_base();

    if ctrl {
        return match base {
            KeyToken::Char('s') => Some(Action::Save),
            KeyToken::Char('z') => Some(Action::Undo),
            KeyToken::Char('y') => Some(Action::Redo),
            KeyToken::Char('f') => Some(Action::OpenFindDialog),
            KeyToken::Char('h') => Some(Action::OpenReplaceDialog),
            KeyToken::Char('g') => Some(Action::OpenGoToLineDialog),
            KeyToken::Char('x') => Some(Action::Cut),
            KeyToken::Char('c') => Some(Action::Copy),
            KeyToken::Char('v') => Some(Action::Paste),
            KeyToken::Char('q') => Some(Action::Quit),
            _ => None,
        };
    }

    if shift {
        return match base {
            KeyToken::Named(NamedKey::Left) => {
                Some(Action::ExtendSelection(MotionKind::Left(1)))
            }
            KeyToken::Named(NamedKey::Right) => {
                Some(Action::ExtendSelection(MotionKind::Right(1)))
            }
            KeyToken::Named(NamedKey::Up) => Some(Action::ExtendSelection(MotionKind::Up(1))),
            KeyToken::Named(NamedKey::Down) => Some(Action::ExtendSelection(MotionKind::Down(1))),
            KeyToken::Named(NamedKey::Home) => Some(Action::ExtendSelection(MotionKind::Home)),
            KeyToken::Named(NamedKey::End) => Some(Action::ExtendSelection(MotionKind::End)),
            KeyToken::Named(NamedKey::PageUp) => {
                Some(Action::ExtendSelection(MotionKind::PageUp(PAGE_ROWS_DEFAULT)))
            }
            KeyToken::Named(NamedKey::PageDown) => Some(Action::ExtendSelection(
                MotionKind::PageDown(PAGE_ROWS_DEFAULT),
            )),
            _ => None,
        };
    }

    match base {
        KeyToken::Char(c) => Some(Action::Edit(EditAction::InsertChar(c))),
        KeyToken::Named(NamedKey::Enter) => Some(Action::Edit(EditAction::InsertNewline)),
        KeyToken::Named(NamedKey::Backspace) => Some(Action::Edit(EditAction::Backspace)),
        KeyToken::Named(NamedKey::Delete) => Some(Action::Edit(EditAction::DeleteUnder)),
        KeyToken::Named(NamedKey::Tab) => Some(Action::Edit(EditAction::Tab)),
        KeyToken::Named(NamedKey::Left) => Some(Action::Motion(MotionKind::Left(1))),
        KeyToken::Named(NamedKey::Right) => Some(Action::Motion(MotionKind::Right(1))),
        KeyToken::Named(NamedKey::Up) => Some(Action::Motion(MotionKind::Up(1))),
        KeyToken::Named(NamedKey::Down) => Some(Action::Motion(MotionKind::Down(1))),
        KeyToken::Named(NamedKey::Home) => Some(Action::Motion(MotionKind::Home)),
        KeyToken::Named(NamedKey::End) => Some(Action::Motion(MotionKind::End)),
        KeyToken::Named(NamedKey::PageUp) => {
            Some(Action::Motion(MotionKind::PageUp(PAGE_ROWS_DEFAULT)))
        }
        KeyToken::Named(NamedKey::PageDown) => {
            Some(Action::Motion(MotionKind::PageDown(PAGE_ROWS_DEFAULT)))
        }
        KeyToken::Named(NamedKey::Esc) => None,
        KeyToken::Named(NamedKey::Insert) => None,
        KeyToken::Named(NamedKey::F(_)) => None,
        KeyToken::Chord { .. } => None,
    }
}

/// Translate one keypress into a `PagerAction`, or `None` if unbound.
pub fn translate_pager_key(key: &KeyEventExt) -> Option<PagerAction> {
    let ctrl = key.token_mods().contains(ModMask::CTRL);
    let base = key.token_base();

    if ctrl {
        return match base {
            KeyToken::Char('f') => Some(PagerAction::PageDown),
            KeyToken::Char('b') => Some(PagerAction::PageUp),
            KeyToken::Char('c') | KeyToken::Char('q') => Some(PagerAction::Quit),
            _ => None,
        };
    }

    match base {
        KeyToken::Char('q') | KeyToken::Char('Q') => Some(PagerAction::Quit),
        KeyToken::Named(NamedKey::Esc) => Some(PagerAction::Quit),
        KeyToken::Char('j') => Some(PagerAction::LineDown),
        KeyToken::Char('k') => Some(PagerAction::LineUp),
        KeyToken::Char('f') | KeyToken::Char(' ') => Some(PagerAction::PageDown),
        KeyToken::Char('b') => Some(PagerAction::PageUp),
        KeyToken::Char('g') => Some(PagerAction::GoToTop),
        KeyToken::Char('G') => Some(PagerAction::GoToBottom),
        KeyToken::Char('/') => Some(PagerAction::OpenSearchForward),
        KeyToken::Char('?') => Some(PagerAction::OpenSearchBackward),
        KeyToken::Char('n') => Some(PagerAction::RepeatSearchForward),
        KeyToken::Char('N') => Some(PagerAction::RepeatSearchBackward),
        KeyToken::Named(NamedKey::Down) => Some(PagerAction::LineDown),
        KeyToken::Named(NamedKey::Up) => Some(PagerAction::LineUp),
        KeyToken::Named(NamedKey::Left) => Some(PagerAction::ScrollLeft),
        KeyToken::Named(NamedKey::Right) => Some(PagerAction::ScrollRight),
        KeyToken::Named(NamedKey::PageDown) => Some(PagerAction::PageDown),
        KeyToken::Named(NamedKey::PageUp) => Some(PagerAction::PageUp),
        KeyToken::Named(NamedKey::Home) => Some(PagerAction::GoToTop),
        KeyToken::Named(NamedKey::End) => Some(PagerAction::GoToBottom),
        _ => None,
    }
}

/// Small helpers for peeling modifiers out of `KeyToken::Chord` so every
/// match arm above can key off the plain base token regardless of whether
/// the input task reported a bare key or a chord.
trait KeyEventExtTokenAccess {
    fn token_base(&self) -> KeyToken;
    fn token_mods(&self) -> ModMask;
}

impl KeyEventExtTokenAccess for KeyEventExt {
    fn token_base(&self) -> KeyToken {
        match &self.token {
            KeyToken::Chord { base, .. } => (**base).clone(),
            other => other.clone(),
        }
    }
    fn token_mods(&self) -> ModMask {
        match &self.token {
            KeyToken::Chord { mods, .. } => *mods,
            _ => ModMask::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::KeyEventExt;

    fn chord(base: KeyToken, mods: ModMask) -> KeyEventExt {
        KeyEventExt::new(KeyToken::Chord {
            base: Box::new(base),
            mods,
        })
    }

    fn plain(base: KeyToken) -> KeyEventExt {
        KeyEventExt::new(base)
    }

    #[test]
    fn plain_char_inserts() {
        let action = translate_editor_key(&plain(KeyToken::Char('x')));
        assert_eq!(action, Some(Action::Edit(EditAction::InsertChar('x'))));
    }

    #[test]
    fn ctrl_s_saves() {
        let action = translate_editor_key(&chord(KeyToken::Char('s'), ModMask::CTRL));
        assert_eq!(action, Some(Action::Save));
    }

    #[test]
    fn ctrl_z_undoes_and_ctrl_y_redoes() {
        assert_eq!(
            translate_editor_key(&chord(KeyToken::Char('z'), ModMask::CTRL)),
            Some(Action::Undo)
        );
        assert_eq!(
            translate_editor_key(&chord(KeyToken::Char('y'), ModMask::CTRL)),
            Some(Action::Redo)
        );
    }

    #[test]
    fn arrow_keys_translate_to_motions() {
        assert_eq!(
            translate_editor_key(&plain(KeyToken::Named(NamedKey::Right))),
            Some(Action::Motion(MotionKind::Right(1)))
        );
    }

    #[test]
    fn esc_is_unbound_in_editor_keymap() {
        assert_eq!(
            translate_editor_key(&plain(KeyToken::Named(NamedKey::Esc))),
            None
        );
    }

    #[test]
    fn pager_q_quits_and_space_pages_down() {
        assert_eq!(
            translate_pager_key(&plain(KeyToken::Char('q'))),
            Some(PagerAction::Quit)
        );
        assert_eq!(
            translate_pager_key(&plain(KeyToken::Char(' '))),
            Some(PagerAction::PageDown)
        );
    }

    #[test]
    fn pager_slash_opens_forward_search() {
        assert_eq!(
            translate_pager_key(&plain(KeyToken::Char('/'))),
            Some(PagerAction::OpenSearchForward)
        );
    }

    #[test]
    fn pager_shift_q_and_esc_also_quit() {
        assert_eq!(
            translate_pager_key(&plain(KeyToken::Char('Q'))),
            Some(PagerAction::Quit)
        );
        assert_eq!(
            translate_pager_key(&plain(KeyToken::Named(NamedKey::Esc))),
            Some(PagerAction::Quit)
        );
    }

    #[test]
    fn pager_ctrl_c_quits() {
        assert_eq!(
            translate_pager_key(&chord(KeyToken::Char('c'), ModMask::CTRL)),
            Some(PagerAction::Quit)
        );
    }
}
