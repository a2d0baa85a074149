//! Terminal management
//!
//! Wraps a ratatui terminal, switches the real terminal into raw mode and
//! the alternate screen, and polls crossterm for key presses.

use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Frame, Terminal,
};
use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};

/// Smallest terminal the screens are laid out for
pub const MIN_WIDTH: u16 = 80;
pub const MIN_HEIGHT: u16 = 24;

const DEFAULT_TICK_RATE: Duration = Duration::from_millis(100);

/// Terminal wrapper
pub struct Tui<B: Backend> {
    terminal: Terminal<B>,
    tick_rate: Duration,
    last_tick: Instant,
    active: bool,
}

impl Tui<CrosstermBackend<Stdout>> {
    /// Terminal on stdout
    pub fn new() -> io::Result<Self> {
        Self::with_backend(CrosstermBackend::new(io::stdout()))
    }
}

impl<B: Backend> Tui<B> {
    pub fn with_backend(backend: B) -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new(backend)?,
            tick_rate: DEFAULT_TICK_RATE,
            last_tick: Instant::now(),
            active: false,
        })
    }

    /// Enter raw mode and the alternate screen
    pub fn init(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        self.active = true;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        Ok(())
    }

    /// Put the terminal back the way we found it
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn size(&self) -> io::Result<Rect> {
        self.terminal.size()
    }

    pub fn is_size_adequate(&self) -> io::Result<bool> {
        let size = self.size()?;
        Ok(size.width >= MIN_WIDTH && size.height >= MIN_HEIGHT)
    }

    pub fn draw<F>(&mut self, f: F) -> io::Result<()>
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal.draw(f)?;
        Ok(())
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    /// Time left until the next tick
    fn poll_timeout(&self) -> Duration {
        self.tick_rate.saturating_sub(self.last_tick.elapsed())
    }

    /// Wait up to one tick for a key press
    pub fn next_key(&mut self) -> io::Result<Option<KeyEvent>> {
        if event::poll(self.poll_timeout())? {
            if let Event::Key(key) = event::read()? {
                // Windows reports releases too
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(key));
                }
            }
        }

        if self.last_tick.elapsed() >= self.tick_rate {
            self.last_tick = Instant::now();
        }

        Ok(None)
    }
}

impl<B: Backend> Drop for Tui<B> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_size_check() {
        let tui = Tui::with_backend(TestBackend::new(100, 30)).unwrap();
        assert!(tui.is_size_adequate().unwrap());

        let small = Tui::with_backend(TestBackend::new(60, 20)).unwrap();
        assert!(!small.is_size_adequate().unwrap());
    }

    #[test]
    fn test_poll_timeout_within_tick() {
        let tui = Tui::with_backend(TestBackend::new(80, 24)).unwrap();
        assert!(tui.poll_timeout() <= DEFAULT_TICK_RATE);
    }

    #[test]
    fn test_restore_without_init_is_noop() {
        let mut tui = Tui::with_backend(TestBackend::new(80, 24)).unwrap();
        assert!(tui.restore().is_ok());
    }
}
