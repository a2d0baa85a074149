//! Disk test screen
//!
//! Volume list, test size field, phase gauge and the result table with a
//! read/write bar chart.

use crate::bench::DiskPhase;
use crate::config::validate_size_mb;
use crate::error::{create_fallback_strategy, user_friendly_message};
use crate::io::Volume;
use crate::models::DiskTestResult;
use crate::util::units::{format_gb, format_throughput, parse_size_mb};
use crate::DiskMemError;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame,
};
use std::path::Path;

// Longest accepted size input, enough for the 102400 MB cap
const MAX_SIZE_DIGITS: usize = 6;

/// Which input has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFocus {
    Volumes,
    Size,
}

/// Disk test screen component
#[derive(Debug)]
pub struct DiskScreen {
    volumes: Vec<Volume>,
    list_state: ListState,
    size_input: String,
    focus: DiskFocus,
    phase: Option<DiskPhase>,
    running: bool,
    result: Option<DiskTestResult>,
    error: Option<(String, Option<String>)>,
    warning: Option<String>,
}

impl DiskScreen {
    pub fn new(volumes: Vec<Volume>, default_size_mb: u32) -> Self {
        let mut list_state = ListState::default();
        if !volumes.is_empty() {
            list_state.select(Some(0));
        }
        Self {
            volumes,
            list_state,
            size_input: default_size_mb.to_string(),
            focus: DiskFocus::Volumes,
            phase: None,
            running: false,
            result: None,
            error: None,
            warning: None,
        }
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    pub fn selected_volume(&self) -> Option<&Volume> {
        self.list_state.selected().and_then(|i| self.volumes.get(i))
    }

    /// Mount point of the selected volume
    pub fn selected_target(&self) -> Option<&Path> {
        self.selected_volume().map(|v| v.mount_point.as_path())
    }

    pub fn select_next(&mut self) {
        if self.volumes.is_empty() {
            return;
        }
        let i = self.list_state.selected().map_or(0, |i| (i + 1) % self.volumes.len());
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.volumes.is_empty() {
            return;
        }
        let len = self.volumes.len();
        let i = self.list_state.selected().map_or(0, |i| (i + len - 1) % len);
        self.list_state.select(Some(i));
    }

    pub fn focus(&self) -> DiskFocus {
        self.focus
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            DiskFocus::Volumes => DiskFocus::Size,
            DiskFocus::Size => DiskFocus::Volumes,
        };
    }

    pub fn size_input(&self) -> &str {
        &self.size_input
    }

    /// Append a digit to the size field; anything else is ignored
    pub fn push_digit(&mut self, c: char) {
        if c.is_ascii_digit() && self.size_input.len() < MAX_SIZE_DIGITS {
            self.size_input.push(c);
            self.warning = None;
        }
    }

    pub fn pop_digit(&mut self) {
        self.size_input.pop();
    }

    /// Validated size from the input field
    pub fn requested_size(&self) -> std::result::Result<u32, String> {
        let size_mb = parse_size_mb(&self.size_input)?;
        validate_size_mb(size_mb).map_err(|e| e.to_string())?;
        Ok(size_mb)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_warning(&mut self, warning: impl Into<String>) {
        self.warning = Some(warning.into());
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Reset output for a fresh run
    pub fn start(&mut self) {
        self.running = true;
        self.phase = Some(DiskPhase::Preparing);
        self.result = None;
        self.error = None;
        self.warning = None;
    }

    pub fn set_phase(&mut self, phase: DiskPhase) {
        self.phase = Some(phase);
    }

    pub fn set_result(&mut self, result: DiskTestResult) {
        self.running = false;
        self.phase = Some(DiskPhase::Done);
        self.result = Some(result);
    }

    pub fn set_error(&mut self, error: &DiskMemError) {
        self.running = false;
        self.error = Some((user_friendly_message(error), create_fallback_strategy(error)));
    }

    pub fn result(&self) -> Option<&DiskTestResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|(msg, _)| msg.as_str())
    }

    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(8), // Volumes and size
                Constraint::Length(3), // Progress
                Constraint::Min(8),    // Results
                Constraint::Length(3), // Help
            ])
            .split(f.size());

        let title = Paragraph::new("Disk Speed Test")
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        let inputs = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);
        self.render_volumes(f, inputs[0]);
        self.render_size(f, inputs[1]);

        self.render_progress(f, chunks[2]);
        self.render_output(f, chunks[3]);
        self.render_help(f, chunks[4]);
    }

    fn focus_style(&self, focus: DiskFocus) -> Style {
        if self.focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    }

    fn render_volumes(&mut self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .volumes
            .iter()
            .map(|v| ListItem::new(v.label()))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(self.focus_style(DiskFocus::Volumes))
                    .title("Select Disk"),
            )
            .highlight_style(Style::default().bg(Color::Cyan).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_size(&self, f: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from(vec![
            Span::raw("Size: "),
            Span::styled(
                format!("{}_", self.size_input),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" MB"),
        ])];
        if let Some(warning) = &self.warning {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                warning.as_str(),
                Style::default().fg(Color::Yellow),
            )));
        }

        let size = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.focus_style(DiskFocus::Size))
                .title("Test File Size (MB)"),
        );
        f.render_widget(size, area);
    }

    fn render_progress(&self, f: &mut Frame, area: Rect) {
        let (percent, label) = match self.phase {
            Some(phase) => (phase.percent().min(100), format!("{}% {}", phase.percent(), phase.label())),
            None => (0, "Idle".to_string()),
        };

        let gauge = Gauge::default()
            .block(Block::default().title("Progress").borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Green))
            .percent(percent)
            .label(label);
        f.render_widget(gauge, area);
    }

    fn render_output(&self, f: &mut Frame, area: Rect) {
        if let Some((message, fallback)) = &self.error {
            let mut lines = vec![Line::from(Span::styled(
                message.as_str(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))];
            if let Some(fallback) = fallback {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    fallback.as_str(),
                    Style::default().fg(Color::Yellow),
                )));
            }
            let error = Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Error"));
            f.render_widget(error, area);
            return;
        }

        let Some(result) = &self.result else {
            let hint = if self.running {
                "Test running..."
            } else {
                "Press Enter to run the test."
            };
            let idle = Paragraph::new(hint)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Result"));
            f.render_widget(idle, area);
            return;
        };

        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        let write_speed = format_throughput(result.write_speed_mb_s);
        let read_speed = format_throughput(result.read_speed_mb_s);
        let total = format_gb(result.total_space_gb);
        let free = format_gb(result.free_space_gb);
        let rows = vec![
            Row::new(vec!["Write Speed:", write_speed.as_str()]),
            Row::new(vec!["Read Speed:", read_speed.as_str()]),
            Row::new(vec!["Total Space:", total.as_str()]),
            Row::new(vec!["Free Space:", free.as_str()]),
            Row::new(vec!["Filesystem Type:", result.filesystem_type.as_str()]),
        ];
        let table = Table::new(rows, [Constraint::Length(17), Constraint::Min(12)])
            .block(Block::default().borders(Borders::ALL).title("Result"))
            .column_spacing(1);
        f.render_widget(table, halves[0]);

        let data = [
            ("Read", result.read_speed_mb_s.round() as u64),
            ("Write", result.write_speed_mb_s.round() as u64),
        ];
        let chart = BarChart::default()
            .block(Block::default().borders(Borders::ALL).title("Speed (MB/s)"))
            .data(&data)
            .bar_width(8)
            .bar_gap(3)
            .bar_style(Style::default().fg(Color::Blue))
            .value_style(Style::default().fg(Color::Black).bg(Color::Blue));
        f.render_widget(chart, halves[1]);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let key = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let help = Paragraph::new(Line::from(vec![
            Span::styled("↑↓", key),
            Span::raw(" Disk  "),
            Span::styled("0-9/Bksp", key),
            Span::raw(" Size  "),
            Span::styled("Enter", key),
            Span::raw(" Run  "),
            Span::styled("Esc", key),
            Span::raw(" Back  "),
            Span::styled("Q", key),
            Span::raw(" Quit"),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(help, area);
    }
}
