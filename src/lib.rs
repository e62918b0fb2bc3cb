pub mod cli;
pub mod config;
pub mod core;
pub mod diff;
pub mod report;
pub mod watcher;

pub use crate::core::*;
pub use config::{ConfigError, MonitorConfig};
pub use diff::{diff, DiffAlgorithmType, DiffOutcome};
pub use report::{Report, ReportSink};
pub use watcher::FileWatcher;
