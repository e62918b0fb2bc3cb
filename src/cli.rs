use std::path::{Path, PathBuf};
use std::sync::Arc;
use clap::{Parser, ValueEnum};
use anyhow::{bail, Context, Result};

use crate::config::MonitorConfig;
use crate::diff::DiffAlgorithmType;
use crate::report::{CompactSink, JsonSink, ReportSink, TextSink};

#[derive(Parser)]
#[command(name = "watchbatch")]
#[command(author, version)]
#[command(about = "Watches a fixed set of text files and reports batched added-line diffs")]
#[command(long_about = "watchbatch monitors the files named in its configuration, coalesces bursts of change notifications and, once per flush interval, prints the lines each changed file gained since the previous report.")]
pub struct Cli {
    /// Configuration document (JSON, or TOML by extension)
    #[arg(short, long, default_value = "config.json", help = "Path to the configuration file")]
    pub config: PathBuf,

    /// Override the watch directory
    #[arg(long, help = "Directory containing the watched files")]
    pub path: Option<PathBuf>,

    /// Override the watched file list
    #[arg(long, value_delimiter = ',', help = "Watched file names (e.g., file1.txt,file2.txt)")]
    pub files: Option<Vec<String>>,

    /// Flush interval in milliseconds
    #[arg(long, help = "Time between reports in ms")]
    pub interval_ms: Option<u64>,

    /// Diff algorithm used for reports
    #[arg(long, help = "Added-lines diff algorithm")]
    pub algorithm: Option<DiffAlgorithmType>,

    /// Output format
    #[arg(long, default_value = "text", help = "Output format")]
    pub output: OutputFormat,

    /// Create the watch directory and empty watched files when missing
    #[arg(long, help = "Create missing watch directory and files")]
    pub create_missing: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Disable colors in output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Timestamped human readable lines (default)
    Text,
    /// Compact single-line format
    Compact,
    /// JSON output for scripting
    Json,
}

impl Cli {
    /// Build the effective configuration: config file, then environment,
    /// then command line flags.
    pub fn resolve_config(&self) -> Result<MonitorConfig> {
        let mut config = if self.config.exists() {
            MonitorConfig::load(&self.config)
                .with_context(|| format!("Failed to load {}", self.config.display()))?
        } else {
            match (&self.path, &self.files) {
                (Some(path), Some(files)) => MonitorConfig::new(path.clone(), files.clone()),
                _ => bail!(
                    "Config file {} not found; pass --path and --files instead",
                    self.config.display()
                ),
            }
        };

        config = config.apply_env();

        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        if let Some(files) = &self.files {
            config.files = files.clone();
        }
        if let Some(ms) = self.interval_ms {
            config.flush_interval_ms = ms;
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn sink(&self) -> Arc<dyn ReportSink> {
        match self.output {
            OutputFormat::Text => Arc::new(TextSink::new(!self.no_color)),
            OutputFormat::Compact => Arc::new(CompactSink),
            OutputFormat::Json => Arc::new(JsonSink),
        }
    }

    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Create the watch directory and any missing watched file as empty
pub fn create_missing(config: &MonitorConfig) -> Result<()> {
    ensure_dir(&config.path)?;

    for file in &config.files {
        let path = config.path.join(file);
        if !path.exists() {
            std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            tracing::info!("Created {}", path.display());
        }
    }

    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        tracing::info!("Created {}", path.display());
    }
    Ok(())
}

/// Make sure the watch path is usable before monitoring starts
pub fn validate_watch_path(config: &MonitorConfig) -> Result<()> {
    if !config.path.exists() {
        bail!("Path does not exist: {}", config.path.display());
    }

    if !config.path.is_dir() {
        bail!("Path is not a directory: {}", config.path.display());
    }

    Ok(())
}
