//! Terminal UI module using ratatui
//!
//! Shows the run as it goes: the current phase, a gauge over the scheduled
//! modes, a table with the state of each mode, and an activity log.

mod components;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Duration;

use crate::pipeline::{Mode, ModeReport};
use components::{LogPanel, ModeTable, StatusPanel};

/// Stages of a run shown in the status panel
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Checking,
    Hydrating,
    Loading,
    Optimizing,
    Complete,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Checking => write!(f, "Checking prerequisites"),
            Phase::Hydrating => write!(f, "Reading loaded data"),
            Phase::Loading => write!(f, "Loading modes"),
            Phase::Optimizing => write!(f, "Optimizing database"),
            Phase::Complete => write!(f, "Complete"),
            Phase::Failed => write!(f, "Failed"),
        }
    }
}

/// Progress reporting of a pipeline run; the terminal UI and a silent one
pub trait Ui {
    fn set_phase(&mut self, phase: Phase);
    fn set_info(&mut self, info: impl Into<String>);
    /// The modes about to run, in order
    fn schedule(&mut self, modes: &[Mode]);
    fn mode_started(&mut self, mode: Mode);
    fn mode_finished(&mut self, report: &ModeReport);
    fn log(&mut self, message: impl Into<String>);
}

/// Full-screen loading view
pub struct UiApp {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    status: StatusPanel,
    modes: ModeTable,
    log: LogPanel,
}

impl UiApp {
    /// Enter the alternate screen; `target` names the database being written
    pub fn new(target: impl Into<String>) -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        Ok(Self {
            terminal,
            status: StatusPanel::new(target),
            modes: ModeTable::new(),
            log: LogPanel::new(),
        })
    }

    fn draw(&mut self) -> Result<()> {
        let status = &self.status;
        let modes = &self.modes;
        let log = &self.log;

        self.terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(5),
                    Constraint::Length(1),
                    Constraint::Length(modes.len() as u16 + 3),
                    Constraint::Min(5),
                ])
                .split(frame.area());

            status.render(frame, chunks[0]);
            modes.render_gauge(frame, chunks[1]);
            modes.render(frame, chunks[2]);
            log.render(frame, chunks[3]);
        })?;

        Ok(())
    }

    /// Show the outcome, wait for a key and restore the terminal
    pub fn finish(mut self, phase: Phase, summary: &str) -> Result<()> {
        if phase == Phase::Failed {
            self.modes.fail_running();
        }
        self.set_phase(phase);
        for line in summary.lines() {
            self.log.add(line);
        }
        self.log("Press any key to exit...");

        loop {
            if event::poll(Duration::from_millis(100))? {
                if let CrosstermEvent::Key(_) = event::read()? {
                    break;
                }
            }
        }

        self.restore()
    }

    /// Restore the terminal without waiting
    pub fn restore(mut self) -> Result<()> {
        terminal::disable_raw_mode()?;
        self.terminal.backend_mut().execute(LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Ui for UiApp {
    fn set_phase(&mut self, phase: Phase) {
        self.status.set_phase(phase);
        self.draw().ok();
    }

    fn set_info(&mut self, info: impl Into<String>) {
        self.status.set_info(info);
        self.draw().ok();
    }

    fn schedule(&mut self, modes: &[Mode]) {
        self.modes.schedule(modes);
        self.draw().ok();
    }

    fn mode_started(&mut self, mode: Mode) {
        self.modes.started(mode);
        self.status.set_info(mode.description());
        self.draw().ok();
    }

    fn mode_finished(&mut self, report: &ModeReport) {
        self.modes.finished(report);
        let line = format!("{}: {} rows", report.mode, report.rows);
        self.log.add(line);
        self.draw().ok();
    }

    fn log(&mut self, message: impl Into<String>) {
        self.log.add(message);
        self.draw().ok();
    }
}

impl Drop for UiApp {
    fn drop(&mut self) {
        terminal::disable_raw_mode().ok();
        self.terminal
            .backend_mut()
            .execute(LeaveAlternateScreen)
            .ok();
        self.terminal.show_cursor().ok();
    }
}

/// Silent UI implementation for tests and plain terminal runs
#[derive(Default)]
pub struct SilentUi;

impl SilentUi {
    pub fn new() -> Self {
        Self
    }
}

impl Ui for SilentUi {
    fn set_phase(&mut self, _phase: Phase) {}
    fn set_info(&mut self, _info: impl Into<String>) {}
    fn schedule(&mut self, _modes: &[Mode]) {}
    fn mode_started(&mut self, _mode: Mode) {}
    fn mode_finished(&mut self, _report: &ModeReport) {}
    fn log(&mut self, _message: impl Into<String>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Hydrating.to_string(), "Reading loaded data");
        assert_eq!(Phase::Failed.to_string(), "Failed");
    }
}
