//! Memory test screen
//!
//! RAM information, sweep progress, per-size timings and a line chart of
//! allocation time against size.

use crate::bench::SweepProgress;
use crate::io::{MemoryStatus, RamModule};
use crate::models::MemoryTestRun;
use crate::util::units::format_gb;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, List, ListItem, Paragraph, Wrap},
    Frame,
};

/// Memory test screen component
#[derive(Debug, Default)]
pub struct MemoryScreen {
    status: Option<MemoryStatus>,
    modules: Vec<RamModule>,
    max_gb: u32,
    progress: Option<SweepProgress>,
    running: bool,
    cancel_requested: bool,
    run: Option<MemoryTestRun>,
    error: Option<String>,
}

impl MemoryScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Machine details shown above the test
    pub fn set_environment(&mut self, status: MemoryStatus, modules: Vec<RamModule>, max_gb: u32) {
        self.status = Some(status);
        self.modules = modules;
        self.max_gb = max_gb;
        self.error = None;
    }

    pub fn max_gb(&self) -> u32 {
        self.max_gb
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
        self.cancel_requested = false;
        self.progress = Some(SweepProgress::new(0, self.max_gb));
        self.run = None;
        self.error = None;
    }

    pub fn update_progress(&mut self, progress: SweepProgress) {
        self.progress = Some(progress);
    }

    pub fn request_cancel(&mut self) {
        if self.running {
            self.cancel_requested = true;
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn finish(&mut self, run: MemoryTestRun) {
        self.running = false;
        self.cancel_requested = false;
        self.run = Some(run);
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.running = false;
        self.error = Some(error.into());
    }

    pub fn run(&self) -> Option<&MemoryTestRun> {
        self.run.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(7), // RAM info
                Constraint::Length(3), // Progress
                Constraint::Min(8),    // Samples and chart
                Constraint::Length(3), // Help
            ])
            .split(f.size());

        let title = Paragraph::new("Memory Allocation Test")
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        self.render_info(f, chunks[1]);
        self.render_progress(f, chunks[2]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[3]);
        self.render_samples(f, bottom[0]);
        self.render_chart(f, bottom[1]);

        self.render_help(f, chunks[4]);
    }

    fn render_info(&self, f: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        if let Some(status) = &self.status {
            lines.push(Line::from(format!(
                "Total RAM: {}   Available RAM: {}",
                format_gb(status.total_gb()),
                format_gb(status.available_gb())
            )));
        }
        for module in &self.modules {
            lines.push(Line::from(module.describe()));
        }
        lines.push(Line::from(format!("Test ceiling: {} GB", self.max_gb)));
        if let Some(error) = &self.error {
            lines.push(Line::from(Span::styled(
                error.as_str(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }

        let info = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("RAM Info"));
        f.render_widget(info, area);
    }

    fn render_progress(&self, f: &mut Frame, area: Rect) {
        let (percent, label) = match &self.progress {
            Some(p) if self.cancel_requested => (p.percent.min(100), "Cancelling...".to_string()),
            Some(p) => (
                p.percent.min(100),
                format!("{}% ({}/{} GB)", p.percent, p.completed, p.total),
            ),
            None => (0, "Idle".to_string()),
        };

        let gauge = Gauge::default()
            .block(Block::default().title("Progress").borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Green))
            .percent(percent)
            .label(label);
        f.render_widget(gauge, area);
    }

    fn render_samples(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = match &self.run {
            Some(run) => {
                let mut items: Vec<ListItem> = run
                    .samples
                    .iter()
                    .map(|s| {
                        let style = if s.outcome.is_exhausted() {
                            Style::default().fg(Color::Red)
                        } else {
                            Style::default()
                        };
                        ListItem::new(s.summary()).style(style)
                    })
                    .collect();
                if run.cancelled {
                    items.push(ListItem::new("Cancelled").style(Style::default().fg(Color::Yellow)));
                }
                items
            }
            None if self.running => vec![ListItem::new("Test running...")],
            None => vec![ListItem::new("Press Enter to run the test.")],
        };

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Results"));
        f.render_widget(list, area);
    }

    fn render_chart(&self, f: &mut Frame, area: Rect) {
        let points = self.run.as_ref().map(|r| r.chart_points()).unwrap_or_default();

        let max_x = f64::from(self.max_gb.max(1));
        let max_y = points
            .iter()
            .map(|&(_, y)| y)
            .fold(0.0_f64, f64::max)
            .max(0.1)
            * 1.1;

        let datasets = vec![Dataset::default()
            .name("Allocation time")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&points)];

        let chart = Chart::new(datasets)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Allocation Time vs Size"),
            )
            .x_axis(
                Axis::default()
                    .title("Size (GB)")
                    .bounds([0.0, max_x])
                    .labels(vec![
                        Span::raw("0"),
                        Span::raw(format!("{}", self.max_gb)),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("Time (s)")
                    .bounds([0.0, max_y])
                    .labels(vec![Span::raw("0"), Span::raw(format!("{:.2}", max_y))]),
            );
        f.render_widget(chart, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let key = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let help = Paragraph::new(Line::from(vec![
            Span::styled("Enter", key),
            Span::raw(" Run  "),
            Span::styled("C", key),
            Span::raw(" Cancel  "),
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
