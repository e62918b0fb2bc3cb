use clap::Parser;
use anyhow::{Context, Result};
use std::sync::mpsc;
use std::sync::Arc;

use watchbatch::{
    cli::{self, Cli},
    core::{BatchEngine, Flusher},
    watcher::FileWatcher,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.setup_logging();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    };

    if cli.create_missing {
        cli::create_missing(&config)?;
    }
    cli::validate_watch_path(&config)?;

    let engine = Arc::new(BatchEngine::from_config(&config, cli.sink()));
    tracing::info!(
        "Starting watchbatch on {} ({} files)",
        config.path.display(),
        engine.files().len()
    );
    tracing::info!("Diff algorithm: {} ({})", engine.algorithm_name(), engine.algorithm_description());

    engine.scan_initial();

    let watcher = FileWatcher::new(Arc::clone(&engine))?;
    let flusher = Flusher::start(Arc::clone(&engine), config.flush_interval())?;

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("Failed to install Ctrl+C handler")?;

    eprintln!("Watching {}, press Ctrl+C to quit", watcher.root().display());
    let _ = stop_rx.recv();

    tracing::info!("Shutting down");
    drop(watcher);
    flusher.stop();

    Ok(())
}
