//! Where results, status text and alerts go
//!
//! The workflow only talks to a [`Surface`]. The CLI uses
//! [`TerminalSurface`] (table on stdout, everything else on stderr); tests
//! and embedders can use [`MemorySurface`].

use crate::status::{Condition, ResultRow};
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use std::io::{IsTerminal, Write};
use std::time::Duration;

pub trait Surface {
    /// Replace the whole result table
    fn render(&mut self, rows: &[ResultRow]);

    /// Result status line
    fn set_status(&mut self, text: &str);

    /// User-facing notice
    fn alert(&mut self, text: &str);

    /// Show (`Some`) or clear (`None`) a busy indicator
    fn set_busy(&mut self, _label: Option<&str>) {}
}

// ============================================================================
// Terminal
// ============================================================================

pub struct TerminalSurface<W: Write> {
    out: W,
    quiet: bool,
    color: bool,
    rows: Vec<ResultRow>,
    spinner: Option<ProgressBar>,
}

impl TerminalSurface<std::io::Stdout> {
    /// Colored only when stdout is a terminal
    pub fn stdout(quiet: bool) -> Self {
        let out = std::io::stdout();
        let color = out.is_terminal();
        Self::new(out, quiet, color)
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, quiet: bool, color: bool) -> Self {
        Self {
            out,
            quiet,
            color,
            rows: Vec::new(),
            spinner: None,
        }
    }

    /// Rows from the most recent render
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{}{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn write_table(&mut self) -> std::io::Result<()> {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        writeln!(self.out, "{}", "─".repeat(60))?;
        writeln!(self.out, "Results ({}) @ {}", self.rows.len(), stamp)?;
        writeln!(self.out, "{}", "─".repeat(60))?;

        for row in &self.rows {
            let color = match row.badge.condition {
                Condition::Good => "\x1b[32m",    // Green
                Condition::Warn => "\x1b[33m",    // Yellow
                Condition::Bad => "\x1b[31m",     // Red
                Condition::Unknown => "\x1b[90m", // Gray
            };
            let badge = self.paint(color, &format!("{} {}", row.badge.icon, row.badge.label));
            writeln!(self.out, "{:<40}  {}", row.image_id, badge)?;
        }
        self.out.flush()
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn render(&mut self, rows: &[ResultRow]) {
        self.rows = rows.to_vec();
        let result = match self.spinner.take() {
            Some(pb) => {
                let result = pb.suspend(|| self.write_table());
                self.spinner = Some(pb);
                result
            }
            None => self.write_table(),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write result table");
        }
    }

    fn set_status(&mut self, text: &str) {
        if self.quiet {
            return;
        }
        match &self.spinner {
            Some(pb) => pb.set_message(text.to_string()),
            None => eprintln!("{}", self.paint("\x1b[90m", text)),
        }
    }

    fn alert(&mut self, text: &str) {
        let message = self.paint("\x1b[1;31m", text);
        match &self.spinner {
            Some(pb) => pb.suspend(|| eprintln!("\n{}\n", message)),
            None => eprintln!("\n{}\n", message),
        }
    }

    fn set_busy(&mut self, label: Option<&str>) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        if self.quiet {
            return;
        }
        if let Some(label) = label {
            // Also cleared when dropped
            let pb = ProgressBar::new_spinner().with_finish(ProgressFinish::AndClear);
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                pb.set_style(style);
            }
            pb.set_message(label.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            self.spinner = Some(pb);
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Records everything it is shown
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub rows: Vec<ResultRow>,
    pub renders: usize,
    pub status: Option<String>,
    pub alerts: Vec<String>,
    pub busy: Option<String>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for MemorySurface {
    fn render(&mut self, rows: &[ResultRow]) {
        self.rows = rows.to_vec();
        self.renders += 1;
    }

    fn set_status(&mut self, text: &str) {
        self.status = Some(text.to_string());
    }

    fn alert(&mut self, text: &str) {
        self.alerts.push(text.to_string());
    }

    fn set_busy(&mut self, label: Option<&str>) {
        self.busy = label.map(str::to_string);
    }
}
