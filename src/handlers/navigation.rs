// Key handler for browse mode
// Movement keys become navigate actions, the rest become grid commands

use crate::ui::actions::{Action, NavigateAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub struct NavigationHandler {
    /// hjkl and g/G in addition to arrows and Home/End
    vim_mode: bool,
}

impl Default for NavigationHandler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NavigationHandler {
    pub fn new(vim_mode: bool) -> Self {
        NavigationHandler { vim_mode }
    }

    /// Process a key and convert it to an action
    /// Returns Some(Action) if the key was handled, None otherwise
    pub fn handle_key(&self, key: KeyEvent) -> Option<Action> {
        if let Some(navigate) = self.navigation_for(&key) {
            return Some(Action::Navigate(navigate));
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Action::Quit),
                KeyCode::Char('r') => Some(Action::Refresh),
                KeyCode::Char('l') => Some(Action::ToggleLogs),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char('s') => Some(Action::Sort(None)),
            KeyCode::Char(c @ '1'..='9') => Some(Action::Sort(Some(c as usize - '1' as usize))),
            KeyCode::Char('/') => Some(Action::StartFilter),
            KeyCode::Char('f') => Some(Action::StartFind),
            KeyCode::Char('n') => Some(Action::FindNext),
            KeyCode::Char('?') | KeyCode::F(1) => Some(Action::ShowHelp),
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Esc => Some(Action::ClearFilter),
            _ => None,
        }
    }

    fn navigation_for(&self, key: &KeyEvent) -> Option<NavigateAction> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            // Arrow keys
            KeyCode::Up if !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(NavigateAction::Up(1))
            }
            KeyCode::Down if !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(NavigateAction::Down(1))
            }
            KeyCode::Left if !ctrl => Some(NavigateAction::Left(1)),
            KeyCode::Right if !ctrl => Some(NavigateAction::Right(1)),

            // Page navigation
            KeyCode::PageUp => Some(NavigateAction::PageUp),
            KeyCode::PageDown => Some(NavigateAction::PageDown),
            KeyCode::Char('f') if ctrl => Some(NavigateAction::PageDown),
            KeyCode::Char('b') if ctrl => Some(NavigateAction::PageUp),

            KeyCode::Home => Some(NavigateAction::Home),
            KeyCode::End => Some(NavigateAction::End),

            // Vim-style navigation
            KeyCode::Char('j') if self.vim_mode && !ctrl => Some(NavigateAction::Down(1)),
            KeyCode::Char('k') if self.vim_mode && !ctrl => Some(NavigateAction::Up(1)),
            KeyCode::Char('h') if self.vim_mode && !ctrl => Some(NavigateAction::Left(1)),
            KeyCode::Char('l') if self.vim_mode && !ctrl => Some(NavigateAction::Right(1)),
            KeyCode::Char('g') if self.vim_mode && !ctrl => Some(NavigateAction::Home),
            KeyCode::Char('G') if self.vim_mode => Some(NavigateAction::End),

            _ => None,
        }
    }

    /// Check if a key is a navigation key that this handler manages
    pub fn is_navigation_key(&self, key: &KeyEvent) -> bool {
        self.navigation_for(key).is_some()
    }
}
