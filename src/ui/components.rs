//! Panels of the loading screen

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Gauge, List, ListItem, Paragraph, Row, Table};
use ratatui::Frame;
use std::time::Duration;

use super::Phase;
use crate::pipeline::{Mode, ModeReport};

/// Phase, current activity and the database being written
pub struct StatusPanel {
    phase: Phase,
    info: String,
    target: String,
}

impl StatusPanel {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            phase: Phase::Checking,
            info: String::new(),
            target: target.into(),
        }
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let color = match self.phase {
            Phase::Complete => Color::Green,
            Phase::Failed => Color::Red,
            _ => Color::Cyan,
        };
        let phase_style = Style::default().fg(color).add_modifier(Modifier::BOLD);

        let indicator = match self.phase {
            Phase::Checking => "◐",
            Phase::Hydrating => "↺",
            Phase::Loading => "⚙",
            Phase::Optimizing => "⤓",
            Phase::Complete => "✓",
            Phase::Failed => "✗",
        };

        let lines = vec![
            Line::from(vec![
                Span::styled(format!(" {} ", indicator), phase_style),
                Span::styled(self.phase.to_string(), phase_style),
            ]),
            Line::from(vec![
                Span::raw("   "),
                Span::styled(&self.info, Style::default().fg(Color::Gray)),
            ]),
            Line::from(vec![
                Span::raw("   → "),
                Span::styled(&self.target, Style::default().fg(Color::DarkGray)),
            ]),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" EVE Echoes static data to SQLite ")
            .border_style(Style::default().fg(Color::Blue));

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModeState {
    Pending,
    Running,
    Done { rows: u64, elapsed: Duration },
    Failed,
}

/// The scheduled modes and how far each got
pub struct ModeTable {
    modes: Vec<(Mode, ModeState)>,
}

impl ModeTable {
    pub fn new() -> Self {
        Self { modes: Vec::new() }
    }

    pub fn schedule(&mut self, modes: &[Mode]) {
        self.modes = modes
            .iter()
            .map(|m| (*m, ModeState::Pending))
            .collect();
    }

    fn set(&mut self, mode: Mode, state: ModeState) {
        if let Some(entry) = self.modes.iter_mut().find(|(m, _)| *m == mode) {
            entry.1 = state;
        }
    }

    pub fn started(&mut self, mode: Mode) {
        self.set(mode, ModeState::Running);
    }

    pub fn finished(&mut self, report: &ModeReport) {
        self.set(
            report.mode,
            ModeState::Done {
                rows: report.rows,
                elapsed: report.elapsed,
            },
        );
    }

    /// Mark the running mode, if any, as failed
    pub fn fail_running(&mut self) {
        for entry in &mut self.modes {
            if entry.1 == ModeState::Running {
                entry.1 = ModeState::Failed;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn done(&self) -> usize {
        self.modes
            .iter()
            .filter(|(_, s)| matches!(s, ModeState::Done { .. }))
            .count()
    }

    pub fn render_gauge(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::LEFT | Borders::RIGHT)
            .border_style(Style::default().fg(Color::Blue));

        let total = self.len();
        let ratio = if total == 0 {
            0.0
        } else {
            self.done() as f64 / total as f64
        };
        let gauge = Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
            .ratio(ratio.min(1.0))
            .label(format!("{}/{} modes", self.done(), total));

        frame.render_widget(gauge, area);
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let rows: Vec<Row> = self
            .modes
            .iter()
            .map(|(mode, state)| {
                let (status, color) = match state {
                    ModeState::Pending => ("pending", Color::DarkGray),
                    ModeState::Running => ("running", Color::Cyan),
                    ModeState::Done { .. } => ("done", Color::Green),
                    ModeState::Failed => ("failed", Color::Red),
                };
                let (rows, elapsed) = match state {
                    ModeState::Done { rows, elapsed } => {
                        (rows.to_string(), format!("{:.1}s", elapsed.as_secs_f64()))
                    }
                    _ => (String::new(), String::new()),
                };
                Row::new(vec![
                    Cell::from(mode.name()),
                    Cell::from(status),
                    Cell::from(rows),
                    Cell::from(elapsed),
                ])
                .style(Style::default().fg(color))
            })
            .collect();

        let widths = [
            Constraint::Length(16),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(8),
        ];
        let table = Table::new(rows, widths)
            .header(
                Row::new(vec!["mode", "status", "rows", "time"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Modes ")
                    .border_style(Style::default().fg(Color::Blue)),
            );

        frame.render_widget(table, area);
    }
}

/// The most recent activity, newest at the bottom
pub struct LogPanel {
    entries: Vec<String>,
    max_entries: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: 200,
        }
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.entries.push(message.into());
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Activity ")
            .border_style(Style::default().fg(Color::Blue));

        let visible = area.height.saturating_sub(2) as usize;
        let start = self.entries.len().saturating_sub(visible);
        let last = self.entries.len().saturating_sub(1);

        let items: Vec<ListItem> = self.entries[start..]
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let color = if start + i == last {
                    Color::White
                } else {
                    Color::DarkGray
                };
                ListItem::new(Span::styled(format!(" {}", entry), Style::default().fg(color)))
            })
            .collect();

        frame.render_widget(List::new(items).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_table_tracks_states() {
        let mut table = ModeTable::new();
        table.schedule(&[Mode::Lang, Mode::Base]);
        table.started(Mode::Lang);
        table.finished(&ModeReport {
            mode: Mode::Lang,
            rows: 10,
            elapsed: Duration::from_millis(5),
        });
        table.started(Mode::Base);
        table.fail_running();

        assert_eq!(table.len(), 2);
        assert_eq!(table.done(), 1);
        assert_eq!(table.modes[1].1, ModeState::Failed);
    }
}
