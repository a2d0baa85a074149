//! Main application controller
//!
//! Owns the terminal, the screens and the background test tasks, and runs
//! the draw/input loop.

use crate::{
    app::{
        screens::{DiskFocus, DiskScreen, MemoryScreen, MenuItem, StartScreen},
        state::{AppState, NavigationAction, StateManager},
        tui::{Tui, MIN_HEIGHT, MIN_WIDTH},
    },
    bench::{spawn_disk_test, spawn_memory_sweep, DiskTestHandle, MemoryBenchmark, SweepHandle},
    config::AppConfig,
    error::user_friendly_message,
    io::{memory_status, ram_modules, volumes_with_target},
    DiskMemError, Result,
};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Alignment,
    style::{Color, Style},
    widgets::{Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::path::Path;
use tracing::{info, warn};

const BUSY_MESSAGE: &str = "A test is already running.";

/// TUI application controller
pub struct App<B: Backend> {
    tui: Tui<B>,
    state_manager: StateManager,
    config: AppConfig,
    start_screen: StartScreen,
    disk_screen: DiskScreen,
    memory_screen: MemoryScreen,
    disk_task: Option<DiskTestHandle>,
    sweep_task: Option<SweepHandle>,
}

impl App<CrosstermBackend<Stdout>> {
    /// Application drawing to stdout
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_backend(CrosstermBackend::new(io::stdout()), config)
    }
}

fn tui_error(err: io::Error) -> DiskMemError {
    DiskMemError::TuiError(err.to_string())
}

impl<B: Backend> App<B> {
    pub fn with_backend(backend: B, config: AppConfig) -> Result<Self> {
        let disk_screen = DiskScreen::new(
            volumes_with_target(&config.disk.target_path),
            config.disk.size_mb,
        );

        Ok(Self {
            tui: Tui::with_backend(backend).map_err(tui_error)?,
            state_manager: StateManager::new(),
            config,
            start_screen: StartScreen::new(),
            disk_screen,
            memory_screen: MemoryScreen::new(),
            disk_task: None,
            sweep_task: None,
        })
    }

    /// Switch the terminal into TUI mode
    pub fn init(&mut self) -> Result<()> {
        self.tui.init().map_err(tui_error)
    }

    pub fn restore(&mut self) -> Result<()> {
        self.tui.restore().map_err(tui_error)
    }

    pub fn state(&self) -> &AppState {
        self.state_manager.current_state()
    }

    pub fn should_quit(&self) -> bool {
        self.state_manager.should_quit()
    }

    /// Whether a disk test or sweep is in flight
    pub fn is_busy(&self) -> bool {
        self.disk_task.is_some() || self.sweep_task.is_some()
    }

    pub fn disk_screen(&self) -> &DiskScreen {
        &self.disk_screen
    }

    pub fn memory_screen(&self) -> &MemoryScreen {
        &self.memory_screen
    }

    /// Run the main application loop
    pub async fn run(&mut self) -> Result<()> {
        while !self.state_manager.should_quit() {
            self.poll_tasks().await;
            self.draw()?;
            if let Some(key) = self.tui.next_key().map_err(tui_error)? {
                self.handle_key(key);
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Stop the sweep and wait for whatever is still running
    async fn shutdown(&mut self) {
        if let Some(mut sweep) = self.sweep_task.take() {
            sweep.cancel();
            if let Err(e) = sweep.join().await {
                warn!(error = %e, "memory sweep ended with an error");
            }
        }
        if let Some(disk) = self.disk_task.take() {
            if let Err(e) = disk.join().await {
                warn!(error = %e, "disk test ended with an error");
            }
        }
    }

    /// Drain progress channels and collect finished tasks
    pub async fn poll_tasks(&mut self) {
        let disk_finished = match &mut self.disk_task {
            Some(task) => {
                while let Ok(phase) = task.phase_rx.try_recv() {
                    self.disk_screen.set_phase(phase);
                }
                task.is_finished()
            }
            None => false,
        };
        if disk_finished {
            if let Some(task) = self.disk_task.take() {
                match task.join().await {
                    Ok(result) => self.disk_screen.set_result(result),
                    Err(e) => {
                        warn!(error = %e, "disk test failed");
                        self.disk_screen.set_error(&e);
                    }
                }
            }
        }

        let sweep_finished = match &mut self.sweep_task {
            Some(task) => {
                while let Ok(progress) = task.progress_rx.try_recv() {
                    self.memory_screen.update_progress(progress);
                }
                task.is_finished()
            }
            None => false,
        };
        if sweep_finished {
            if let Some(task) = self.sweep_task.take() {
                match task.join().await {
                    Ok(run) => self.memory_screen.finish(run),
                    Err(e) => {
                        warn!(error = %e, "memory sweep failed");
                        self.memory_screen.set_error(user_friendly_message(&e));
                    }
                }
            }
        }
    }

    /// Draw the current screen
    pub fn draw(&mut self) -> Result<()> {
        let adequate = self.tui.is_size_adequate().map_err(tui_error)?;
        let state = self.state_manager.current_state().clone();
        let start_screen = &mut self.start_screen;
        let disk_screen = &mut self.disk_screen;
        let memory_screen = &mut self.memory_screen;

        self.tui
            .draw(|f| {
                if !adequate {
                    let msg = Paragraph::new(format!(
                        "Terminal too small. Resize to at least {}x{}.",
                        MIN_WIDTH, MIN_HEIGHT
                    ))
                    .style(Style::default().fg(Color::Yellow))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                    f.render_widget(msg, f.size());
                    return;
                }

                match state {
                    AppState::Start => start_screen.render(f),
                    AppState::DiskTest => disk_screen.render(f),
                    AppState::MemoryTest => memory_screen.render(f),
                }
            })
            .map_err(tui_error)
    }

    /// Handle one key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        let action = StateManager::key_to_navigation(key);

        if action == NavigationAction::Quit {
            if let Some(sweep) = &mut self.sweep_task {
                sweep.cancel();
            }
            self.state_manager.quit();
            return;
        }

        match self.state_manager.current_state().clone() {
            AppState::Start => self.handle_start_key(action),
            AppState::DiskTest => self.handle_disk_key(key, action),
            AppState::MemoryTest => self.handle_memory_key(action),
        }
    }

    fn handle_start_key(&mut self, action: NavigationAction) {
        match action {
            NavigationAction::Up => self.start_screen.select_previous(),
            NavigationAction::Down => self.start_screen.select_next(),
            NavigationAction::Select => match self.start_screen.selected() {
                MenuItem::MemoryTest => self.enter_memory_screen(),
                MenuItem::DiskTest => self.state_manager.transition_to(AppState::DiskTest),
                MenuItem::Quit => self.state_manager.quit(),
            },
            NavigationAction::Back => self.state_manager.handle_navigation(&action),
            _ => {}
        }
    }

    fn handle_disk_key(&mut self, key: KeyEvent, action: NavigationAction) {
        if self.disk_screen.focus() == DiskFocus::Size {
            match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    self.disk_screen.push_digit(c);
                    return;
                }
                KeyCode::Backspace => {
                    self.disk_screen.pop_digit();
                    return;
                }
                _ => {}
            }
        }

        match action {
            NavigationAction::Up if self.disk_screen.focus() == DiskFocus::Volumes => {
                self.disk_screen.select_previous()
            }
            NavigationAction::Down if self.disk_screen.focus() == DiskFocus::Volumes => {
                self.disk_screen.select_next()
            }
            NavigationAction::Next => self.disk_screen.toggle_focus(),
            NavigationAction::Select => self.start_disk_test(),
            NavigationAction::Back if self.disk_screen.is_running() => {
                self.disk_screen.set_warning("Wait for the test to finish.")
            }
            NavigationAction::Back => self.state_manager.handle_navigation(&action),
            _ => {}
        }
    }

    fn handle_memory_key(&mut self, action: NavigationAction) {
        match action {
            NavigationAction::Select => self.start_memory_sweep(),
            NavigationAction::Cancel => {
                if let Some(sweep) = &mut self.sweep_task {
                    sweep.cancel();
                    self.memory_screen.request_cancel();
                }
            }
            NavigationAction::Back if self.memory_screen.is_running() => {}
            NavigationAction::Back => self.state_manager.handle_navigation(&action),
            _ => {}
        }
    }

    fn enter_memory_screen(&mut self) {
        match memory_status() {
            Ok(status) => {
                let modules = ram_modules().unwrap_or_default();
                let max_gb = self.config.memory.resolve_max_gb(&status);
                self.memory_screen.set_environment(status, modules, max_gb);
            }
            Err(e) => {
                warn!(error = %e, "could not read memory status");
                self.memory_screen.set_error(user_friendly_message(&e));
            }
        }
        self.state_manager.transition_to(AppState::MemoryTest);
    }

    fn start_disk_test(&mut self) {
        if self.is_busy() {
            self.disk_screen.set_warning(BUSY_MESSAGE);
            return;
        }

        let size_mb = match self.disk_screen.requested_size() {
            Ok(size_mb) => size_mb,
            Err(msg) => {
                self.disk_screen.set_warning(msg);
                return;
            }
        };
        let Some(target) = self.disk_screen.selected_target().map(Path::to_path_buf) else {
            self.disk_screen.set_warning("No disk selected.");
            return;
        };

        let disk_config = self
            .config
            .disk
            .clone()
            .with_target_path(target.clone())
            .with_size_mb(size_mb);
        if let Err(e) = disk_config.validate_target() {
            self.disk_screen.set_warning(e.to_string());
            return;
        }

        info!(target = %target.display(), size_mb, "starting disk test from TUI");
        self.disk_screen.start();
        self.disk_task = Some(spawn_disk_test(target, size_mb));
    }

    fn start_memory_sweep(&mut self) {
        if self.is_busy() {
            self.memory_screen.set_error(BUSY_MESSAGE);
            return;
        }

        let max_gb = self.memory_screen.max_gb();
        if max_gb == 0 {
            self.memory_screen
                .set_error("Not enough available memory for a 1 GB step.");
            return;
        }

        info!(max_gb, retention = ?self.config.memory.retention, "starting memory sweep from TUI");
        self.memory_screen.start();
        let allocator = MemoryBenchmark::with_retention(self.config.memory.retention);
        self.sweep_task = Some(spawn_memory_sweep(allocator, max_gb));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::screens::buffer_text;
    use crate::config::DiskTestConfig;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;
    use std::time::Duration;
    use tempfile::tempdir;

    fn press(app: &mut App<TestBackend>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn test_app(target: &Path) -> App<TestBackend> {
        let config = AppConfig {
            disk: DiskTestConfig::default()
                .with_target_path(target)
                .with_size_mb(1),
            ..Default::default()
        };
        App::with_backend(TestBackend::new(100, 36), config).unwrap()
    }

    fn screen_text(app: &mut App<TestBackend>) -> String {
        app.draw().unwrap();
        buffer_text(app.tui.backend().buffer())
    }

    #[test]
    fn test_navigation_between_screens() {
        let temp_dir = tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        assert!(screen_text(&mut app).contains("Select Test Type"));

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(*app.state(), AppState::DiskTest);
        assert!(screen_text(&mut app).contains("Disk Speed Test"));

        press(&mut app, KeyCode::Esc);
        assert_eq!(*app.state(), AppState::Start);

        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit());
    }

    #[test]
    fn test_configured_target_is_listed_first() {
        let temp_dir = tempdir().unwrap();
        let app = test_app(temp_dir.path());
        assert_eq!(app.disk_screen().selected_target(), Some(temp_dir.path()));
    }

    #[test]
    fn test_invalid_size_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('0'));
        press(&mut app, KeyCode::Enter);

        assert!(!app.is_busy());
        assert_eq!(
            app.disk_screen().warning(),
            Some("File size must be a positive number")
        );
        // Backspace edits the field rather than leaving the screen
        assert_eq!(*app.state(), AppState::DiskTest);
    }

    #[tokio::test]
    async fn test_disk_test_runs_to_completion() {
        let temp_dir = tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        assert!(app.is_busy());

        // A second start is refused while the first is in flight
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.disk_screen().warning(), Some(BUSY_MESSAGE));

        for _ in 0..1000 {
            app.poll_tasks().await;
            if !app.is_busy() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!app.is_busy());
        let result = app.disk_screen().result().expect("disk test should succeed");
        assert!(result.read_speed_mb_s > 0.0);
        assert!(screen_text(&mut app).contains("Write Speed:"));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_memory_screen_shows_environment() {
        let temp_dir = tempdir().unwrap();
        let mut app = test_app(temp_dir.path());
        press(&mut app, KeyCode::Enter);

        assert_eq!(*app.state(), AppState::MemoryTest);
        assert!(app.memory_screen().error().is_none());
        assert!(screen_text(&mut app).contains("Total RAM:"));

        // Nothing to cancel yet
        press(&mut app, KeyCode::Char('c'));
        assert!(!app.memory_screen().is_cancel_requested());
    }

    #[test]
    fn test_small_terminal_message() {
        let temp_dir = tempdir().unwrap();
        let mut app = App::with_backend(
            TestBackend::new(60, 20),
            AppConfig {
                disk: DiskTestConfig::default().with_target_path(temp_dir.path()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(screen_text(&mut app).contains("Terminal too small"));
    }
}
