//! Keyboard shortcut resolution for the canvas editor.
//!
//! | Chord                         | Action |
//! |-------------------------------|--------|
//! | Ctrl/Cmd + Z                  | Undo   |
//! | Ctrl/Cmd + Shift + Z, Ctrl + Y | Redo   |
//! | Ctrl/Cmd + S                  | Save   |

use serde::{Deserialize, Serialize};

/// A key press with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyChord {
    pub key: char,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Cmd on macOS
    pub meta: bool,
}

impl KeyChord {
    pub fn new(key: char) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// Element holding keyboard focus when the chord was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusTarget {
    Canvas,
    TextInput,
    TextArea,
    ContentEditable,
}

impl FocusTarget {
    /// Text-editing targets keep their native undo/redo/save behavior.
    pub fn is_text_entry(&self) -> bool {
        !matches!(self, FocusTarget::Canvas)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutAction {
    Undo,
    Redo,
    Save,
}

/// Maps a key press to an editor action.
pub fn resolve_shortcut(chord: KeyChord, focus: FocusTarget) -> Option<ShortcutAction> {
    if focus.is_text_entry() || chord.alt || !(chord.ctrl || chord.meta) {
        return None;
    }

    match (chord.key.to_ascii_lowercase(), chord.shift) {
        ('z', false) => Some(ShortcutAction::Undo),
        ('z', true) => Some(ShortcutAction::Redo),
        ('y', false) => Some(ShortcutAction::Redo),
        ('s', false) => Some(ShortcutAction::Save),
        _ => None,
    }
}
