//! Start screen implementation
//!
//! Test type menu with the usage warning.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub const WARNING_TEXT: &str =
    "Warning: Do not run other programs or perform actions that require RAM or disk I/O during the test.";

/// Entries of the start menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    MemoryTest,
    DiskTest,
    Quit,
}

impl MenuItem {
    pub fn all() -> [MenuItem; 3] {
        [MenuItem::MemoryTest, MenuItem::DiskTest, MenuItem::Quit]
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::MemoryTest => "Memory Test",
            MenuItem::DiskTest => "Disk Test",
            MenuItem::Quit => "Quit",
        }
    }
}

/// Start screen component
#[derive(Debug)]
pub struct StartScreen {
    selected_index: usize,
    list_state: ListState,
}

impl StartScreen {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            selected_index: 0,
            list_state,
        }
    }

    pub fn selected(&self) -> MenuItem {
        MenuItem::all()[self.selected_index]
    }

    /// Move selection up, wrapping to the bottom
    pub fn select_previous(&mut self) {
        let len = MenuItem::all().len();
        self.selected_index = (self.selected_index + len - 1) % len;
        self.list_state.select(Some(self.selected_index));
    }

    /// Move selection down, wrapping to the top
    pub fn select_next(&mut self) {
        self.selected_index = (self.selected_index + 1) % MenuItem::all().len();
        self.list_state.select(Some(self.selected_index));
    }

    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // Title and subtitle
                Constraint::Min(5),    // Menu
                Constraint::Length(4), // Warning
                Constraint::Length(3), // Help text
            ])
            .split(f.size());

        self.render_title(f, chunks[0]);
        self.render_menu(f, chunks[1]);
        self.render_warning(f, chunks[2]);
        self.render_help(f, chunks[3]);
    }

    fn render_title(&self, f: &mut Frame, area: Rect) {
        let title_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(2)])
            .split(area);

        let title = Paragraph::new("DISKMEM")
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
        f.render_widget(title, title_chunks[0]);

        let subtitle = Paragraph::new("Disk Speed and Memory Allocation Test")
            .style(Style::default().fg(Color::White))
            .alignment(Alignment::Center);
        f.render_widget(subtitle, title_chunks[1]);
    }

    fn render_menu(&mut self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = MenuItem::all()
            .iter()
            .map(|item| ListItem::new(item.label()))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Select Test Type"),
            )
            .highlight_style(Style::default().bg(Color::Cyan).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_warning(&self, f: &mut Frame, area: Rect) {
        let warning = Paragraph::new(WARNING_TEXT)
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Red)));
        f.render_widget(warning, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let key = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let help_text = Line::from(vec![
            Span::styled("↑↓", key),
            Span::raw(" Navigate  "),
            Span::styled("Enter", key),
            Span::raw(" Select  "),
            Span::styled("Q", key),
            Span::raw(" Quit"),
        ]);

        let help = Paragraph::new(help_text)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            );
        f.render_widget(help, area);
    }
}

impl Default for StartScreen {
    fn default() -> Self {
        Self::new()
    }
}
