//! Shortcut Manager — maps page key events onto reader actions.

use serde::Deserialize;

/// A key event as reported by the page.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyEvent {
    /// Physical key code, e.g. `KeyA`.
    pub code: String,
    pub alt_key: bool,
    pub shift_key: bool,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub repeat: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    ToggleReader,
}

/// Trait defining shortcut lookup.
pub trait ShortcutManagerTrait {
    fn action_for(&self, event: &KeyEvent) -> Option<ShortcutAction>;
    fn describe(&self, action: ShortcutAction) -> &'static str;
}

/// Fixed bindings: Alt+Shift+A toggles the reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShortcutManager;

impl ShortcutManager {
    pub fn new() -> Self {
        Self
    }
}

impl ShortcutManagerTrait for ShortcutManager {
    fn action_for(&self, event: &KeyEvent) -> Option<ShortcutAction> {
        if event.alt_key && event.shift_key && !event.repeat && event.code == "KeyA" {
            return Some(ShortcutAction::ToggleReader);
        }
        None
    }

    fn describe(&self, action: ShortcutAction) -> &'static str {
        match action {
            ShortcutAction::ToggleReader => "Alt+Shift+A",
        }
    }
}
