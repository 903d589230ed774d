//! Modeless dialog framework (spec §4.8).
//!
//! Open, Save-As, Find, Replace, Go-To-Line, About, and message boxes share
//! this framework: a `Dialog` enum plus a small per-kind state struct owned
//! by the runtime (not a global), mirroring `core_state::CommandLineState`'s
//! existing precedent of a focused, single-purpose input state living
//! alongside the rest of the editor state rather than behind a singleton.
//! The actual widget rendering/event-pump is an external collaborator; this
//! module only tracks *what* is open and the text the user has typed into
//! it. Dialog wait loops are cooperative: pressing ESC cancels them, which
//! callers express by calling `Dialog::cancel`.

/// A single-line text input with an insertion cursor, shared by every dialog
/// kind that needs one (Open/Save-As path, Find/Replace patterns, Go-To-Line
/// digits).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInputState {
    pub value: String,
    /// Byte offset into `value`; always lands on a char boundary.
    pub cursor: usize,
}

impl TextInputState {
    pub fn new(initial: impl Into<String>) -> Self {
        let value = initial.into();
        let cursor = value.len();
        Self { value, cursor }
    }

    pub fn insert_char(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Delete the grapheme before the cursor. Returns `false` at the start
    /// of the input (a no-op).
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev_len = self.value[..self.cursor]
            .chars()
            .next_back()
            .map(char::len_utf8)
            .unwrap_or(0);
        let new_cursor = self.cursor - prev_len;
        self.value.drain(new_cursor..self.cursor);
        self.cursor = new_cursor;
        true
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

/// Which field of the Replace dialog currently has focus; Tab toggles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceField {
    #[default]
    Find,
    Replacement,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaceDialogState {
    pub find: TextInputState,
    pub replacement: TextInputState,
    pub focus: ReplaceField,
}

impl ReplaceDialogState {
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            ReplaceField::Find => ReplaceField::Replacement,
            ReplaceField::Replacement => ReplaceField::Find,
        };
    }

    /// The field currently receiving keystrokes.
    pub fn focused_mut(&mut self) -> &mut TextInputState {
        match self.focus {
            ReplaceField::Find => &mut self.find,
            ReplaceField::Replacement => &mut self.replacement,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDialogState {
    pub title: String,
    pub body: String,
}

/// Which modeless dialog, if any, is currently open.
#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    None,
    Open(TextInputState),
    SaveAs(TextInputState),
    Find(TextInputState),
    Replace(ReplaceDialogState),
    GoToLine(TextInputState),
    About,
    Message(MessageDialogState),
}

impl Default for Dialog {
    fn default() -> Self {
        Dialog::None
    }
}

impl Dialog {
    pub fn open() -> Self {
        Dialog::Open(TextInputState::default())
    }

    pub fn save_as(initial_path: impl Into<String>) -> Self {
        Dialog::SaveAs(TextInputState::new(initial_path))
    }

    pub fn find() -> Self {
        Dialog::Find(TextInputState::default())
    }

    pub fn replace() -> Self {
        Dialog::Replace(ReplaceDialogState::default())
    }

    pub fn go_to_line() -> Self {
        Dialog::GoToLine(TextInputState::default())
    }

    pub fn message(title: impl Into<String>, body: impl Into<String>) -> Self {
        Dialog::Message(MessageDialogState {
            title: title.into(),
            body: body.into(),
        })
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Dialog::None)
    }

    /// Pressing ESC cancels whichever dialog is open; a no-op if none is.
    pub fn cancel(&mut self) {
        *self = Dialog::None;
    }

    /// Rows the dialog occupies when rendered as a bottom overlay, for
    /// `reposition_for_dialog`'s repositioning math. A rough per-kind
    /// footprint (border + label row(s) + input row(s)), not a pixel-exact
    /// layout measurement owned by the external dialog widget.
    pub fn row_span(&self) -> u16 {
        match self {
            Dialog::None => 0,
            Dialog::Open(_) | Dialog::SaveAs(_) | Dialog::Find(_) | Dialog::GoToLine(_) => 3,
            Dialog::Replace(_) => 4,
            Dialog::Message(_) => 3,
            Dialog::About => 6,
        }
    }
}

/// Find/Replace support live repositioning of the viewport so the current
/// match isn't hidden behind the dialog (spec §4.8): after a match is
/// found, if the cursor falls outside the area still visible above the
/// dialog, scroll so the cursor sits mid-area.
///
/// Generalizes `core_model::compute_scroll_intent`'s
/// (first/cursor_line/text_height/margin) → `Option<new_first>` shape: here
/// the "band" is derived from the dialog's footprint rather than a fixed
/// margin, and an out-of-band cursor is centered rather than nudged to the
/// margin edge, matching the spec's "sits mid-area" wording.
pub fn reposition_for_dialog(
    viewport_first_line: usize,
    cursor_line: usize,
    viewport_rows: u16,
    dialog_rows: u16,
) -> Option<usize> {
    let remaining = viewport_rows.saturating_sub(dialog_rows) as usize;
    if remaining == 0 {
        return None;
    }
    let bottom = viewport_first_line + remaining;
    if cursor_line < viewport_first_line || cursor_line >= bottom {
        let mid = remaining / 2;
        let new_first = cursor_line.saturating_sub(mid);
        if new_first != viewport_first_line {
            Some(new_first)
        } else {
            None
        }
    } else {
        None
    }
}
