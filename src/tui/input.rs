//! Key bindings for the dashboard.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a keypress asks the dashboard to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    /// Re-read the terminal size and redraw everything.
    Refresh,
    Sort,
    Clear,
}

/// Map a key event to an action. Unbound keys and key releases give `None`.
pub fn map_key(key: KeyEvent) -> Option<KeyAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Quit)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('r') => Some(KeyAction::Refresh),
        KeyCode::Char('s') => Some(KeyAction::Sort),
        KeyCode::Char('c') => Some(KeyAction::Clear),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn bindings() {
        assert_eq!(map_key(press(KeyCode::Char('q'))), Some(KeyAction::Quit));
        assert_eq!(map_key(press(KeyCode::Esc)), Some(KeyAction::Quit));
        assert_eq!(map_key(press(KeyCode::Char('r'))), Some(KeyAction::Refresh));
        assert_eq!(map_key(press(KeyCode::Char('s'))), Some(KeyAction::Sort));
        assert_eq!(map_key(press(KeyCode::Char('c'))), Some(KeyAction::Clear));
        assert_eq!(map_key(press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn ctrl_c_quits_instead_of_clearing() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(key), Some(KeyAction::Quit));
    }

    #[test]
    fn releases_are_ignored() {
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(key), None);
    }
}
