//! Report sinks
//!
//! Everything the engine has to say goes through a [`ReportSink`]: per-file
//! diff results, per-file read failures and batch lifecycle notices.

use std::io::Write;
use std::sync::{Arc, Mutex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Report {
    BatchStarted { changes: usize },
    Added { file: String, lines: Vec<String> },
    Unchanged { file: String },
    /// First snapshot captured for a file; there was nothing to diff against
    Baseline { file: String },
    ReadFailed { file: String, error: String },
    ScanFailed { file: String, error: String },
    BatchFinished { processed: usize, failed: usize },
}

impl Report {
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Added { file, .. }
            | Self::Unchanged { file }
            | Self::Baseline { file }
            | Self::ReadFailed { file, .. }
            | Self::ScanFailed { file, .. } => Some(file),
            Self::BatchStarted { .. } | Self::BatchFinished { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::ReadFailed { .. } | Self::ScanFailed { .. })
    }
}

pub trait ReportSink: Send + Sync {
    fn report(&self, report: Report);
}

/// Human readable output with a local timestamp per line
pub struct TextSink {
    color: bool,
}

impl TextSink {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{}{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }
}

impl ReportSink for TextSink {
    fn report(&self, report: Report) {
        let time_str = chrono::Local::now().format("%H:%M:%S");
        let stdout = std::io::stdout();
        let mut out = stdout.lock();

        // Broken pipes are not worth failing a flush over
        let _ = match report {
            Report::BatchStarted { changes } => {
                writeln!(out, "[{}] --- batch: {} change(s)", time_str, changes)
            }
            Report::Added { file, lines } => {
                let _ = writeln!(out, "[{}] {} {}", time_str, self.paint("\x1b[33m", "CHANGED"), file);
                lines
                    .iter()
                    .try_for_each(|line| writeln!(out, "  {}", self.paint("\x1b[32m", &format!("+{}", line))))
            }
            Report::Unchanged { file } => {
                writeln!(out, "[{}] {} {} (no content change)", time_str, self.paint("\x1b[34m", "SAME"), file)
            }
            Report::Baseline { file } => {
                writeln!(out, "[{}] {} {} (baseline captured)", time_str, self.paint("\x1b[36m", "NEW"), file)
            }
            Report::ReadFailed { file, error } => {
                writeln!(out, "[{}] {} {}: {}", time_str, self.paint("\x1b[31m", "ERROR"), file, error)
            }
            Report::ScanFailed { file, error } => {
                writeln!(out, "[{}] {} {}: initial read failed: {}", time_str, self.paint("\x1b[31m", "ERROR"), file, error)
            }
            Report::BatchFinished { processed, failed } => {
                writeln!(out, "[{}] --- done: {} processed, {} failed", time_str, processed, failed)
            }
        };
    }
}

/// Single-line-per-report output for scripting
pub struct CompactSink;

impl ReportSink for CompactSink {
    fn report(&self, report: Report) {
        match report {
            Report::Added { file, lines } => println!("+ {} {}", file, lines.len()),
            Report::Unchanged { file } => println!("= {}", file),
            Report::Baseline { file } => println!("* {}", file),
            Report::ReadFailed { file, error } | Report::ScanFailed { file, error } => {
                println!("! {} {}", file, error)
            }
            Report::BatchStarted { .. } | Report::BatchFinished { .. } => {}
        }
    }
}

/// One JSON object per line
pub struct JsonSink;

impl ReportSink for JsonSink {
    fn report(&self, report: Report) {
        match serde_json::to_string(&report) {
            Ok(line) => println!("{}", line),
            Err(err) => tracing::error!("Failed to serialize report: {}", err),
        }
    }
}

/// Collects reports in memory
#[derive(Clone, Default)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Drain everything collected so far
    pub fn take(&self) -> Vec<Report> {
        self.reports
            .lock()
            .map(|mut r| std::mem::take(&mut *r))
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<Report> {
        self.reports().into_iter().filter(Report::is_error).collect()
    }
}

impl ReportSink for MemorySink {
    fn report(&self, report: Report) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}

impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    fn report(&self, report: Report) {
        (**self).report(report)
    }
}
