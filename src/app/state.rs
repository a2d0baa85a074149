//! Application state management
//!
//! Handles screen transitions, navigation logic, and keyboard event processing
//! for the TUI application.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Application screens/states
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AppState {
    /// Test type menu with the usage warning
    #[default]
    Start,
    /// Volume/size selection, disk test progress and results
    DiskTest,
    /// RAM info, allocation sweep progress and chart
    MemoryTest,
}

/// Navigation actions that can be triggered by keyboard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    /// Move selection up (arrow up, k)
    Up,
    /// Move selection down (arrow down, j)
    Down,
    /// Confirm selection (Enter, Space)
    Select,
    /// Go back (Esc, Backspace)
    Back,
    /// Next field (Tab)
    Next,
    /// Stop a running sweep (c)
    Cancel,
    /// Quit application (q, Q, Ctrl+C)
    Quit,
    /// No action
    None,
}

/// Application state manager
#[derive(Debug)]
pub struct StateManager {
    current_state: AppState,
    previous_state: Option<AppState>,
    should_quit: bool,
}

impl StateManager {
    /// Create a new state manager starting at the main menu
    pub fn new() -> Self {
        Self {
            current_state: AppState::Start,
            previous_state: None,
            should_quit: false,
        }
    }

    /// Get the current application state
    pub fn current_state(&self) -> &AppState {
        &self.current_state
    }

    /// Get the previous state if available
    pub fn previous_state(&self) -> Option<&AppState> {
        self.previous_state.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Transition to a new state
    pub fn transition_to(&mut self, new_state: AppState) {
        if new_state != self.current_state {
            self.previous_state = Some(self.current_state.clone());
            self.current_state = new_state;
        }
    }

    /// Go back to the previous state if available, otherwise go to Start
    pub fn go_back(&mut self) {
        self.current_state = self.previous_state.take().unwrap_or(AppState::Start);
    }

    /// Apply the screen-independent part of an action.
    ///
    /// Back on the menu quits; elsewhere it returns to the previous screen.
    pub fn handle_navigation(&mut self, action: &NavigationAction) {
        match action {
            NavigationAction::Quit => self.should_quit = true,
            NavigationAction::Back => match self.current_state {
                AppState::Start => self.should_quit = true,
                _ => self.go_back(),
            },
            _ => {}
        }
    }

    /// Convert keyboard event to navigation action
    pub fn key_to_navigation(key: KeyEvent) -> NavigationAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => NavigationAction::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                NavigationAction::Quit
            }
            KeyCode::Char('c') | KeyCode::Char('C') => NavigationAction::Cancel,

            KeyCode::Up | KeyCode::Char('k') => NavigationAction::Up,
            KeyCode::Down | KeyCode::Char('j') => NavigationAction::Down,

            KeyCode::Enter | KeyCode::Char(' ') => NavigationAction::Select,
            KeyCode::Esc | KeyCode::Backspace => NavigationAction::Back,
            KeyCode::Tab | KeyCode::BackTab => NavigationAction::Next,

            _ => NavigationAction::None,
        }
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_state_manager_creation() {
        let state_manager = StateManager::new();
        assert_eq!(*state_manager.current_state(), AppState::Start);
        assert!(!state_manager.should_quit());
        assert!(state_manager.previous_state().is_none());
    }

    #[test]
    fn test_state_transitions() {
        let mut state_manager = StateManager::new();

        state_manager.transition_to(AppState::DiskTest);
        assert_eq!(*state_manager.current_state(), AppState::DiskTest);
        assert_eq!(state_manager.previous_state(), Some(&AppState::Start));

        // Same state twice keeps the history
        state_manager.transition_to(AppState::DiskTest);
        assert_eq!(state_manager.previous_state(), Some(&AppState::Start));
    }

    #[test]
    fn test_go_back() {
        let mut state_manager = StateManager::new();

        state_manager.transition_to(AppState::MemoryTest);
        state_manager.go_back();
        assert_eq!(*state_manager.current_state(), AppState::Start);
        assert!(state_manager.previous_state().is_none());

        state_manager.go_back();
        assert_eq!(*state_manager.current_state(), AppState::Start);
    }

    #[test]
    fn test_back_navigation() {
        let mut state_manager = StateManager::new();
        state_manager.transition_to(AppState::DiskTest);

        state_manager.handle_navigation(&NavigationAction::Back);
        assert_eq!(*state_manager.current_state(), AppState::Start);
        assert!(!state_manager.should_quit());

        state_manager.handle_navigation(&NavigationAction::Back);
        assert!(state_manager.should_quit());
    }

    #[test]
    fn test_key_to_navigation() {
        assert_eq!(
            StateManager::key_to_navigation(key(KeyCode::Char('q'))),
            NavigationAction::Quit
        );
        assert_eq!(
            StateManager::key_to_navigation(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            )),
            NavigationAction::Quit
        );
        assert_eq!(
            StateManager::key_to_navigation(key(KeyCode::Char('c'))),
            NavigationAction::Cancel
        );
        assert_eq!(
            StateManager::key_to_navigation(key(KeyCode::Char('k'))),
            NavigationAction::Up
        );
        assert_eq!(
            StateManager::key_to_navigation(key(KeyCode::Down)),
            NavigationAction::Down
        );
        assert_eq!(
            StateManager::key_to_navigation(key(KeyCode::Enter)),
            NavigationAction::Select
        );
        assert_eq!(
            StateManager::key_to_navigation(key(KeyCode::Esc)),
            NavigationAction::Back
        );
        assert_eq!(
            StateManager::key_to_navigation(key(KeyCode::Tab)),
            NavigationAction::Next
        );
        assert_eq!(
            StateManager::key_to_navigation(key(KeyCode::Char('5'))),
            NavigationAction::None
        );
    }
}
