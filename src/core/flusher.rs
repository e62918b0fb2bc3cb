use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use anyhow::{Context, Result};

use super::engine::{BatchEngine, FlushOutcome};

/// Periodic flush driver.
///
/// Runs on its own thread: flushes once immediately, then once per interval.
/// Stopping waits for an in-flight flush to finish before returning.
pub struct Flusher {
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    pub fn start(engine: Arc<BatchEngine>, interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("flusher".to_string())
            .spawn(move || {
                loop {
                    match engine.flush() {
                        FlushOutcome::Flushed { processed, failed } => {
                            tracing::debug!("Flushed batch: {} processed, {} failed", processed, failed);
                        }
                        FlushOutcome::Skipped => tracing::debug!("Skipped tick, flush still running"),
                        FlushOutcome::Empty => {}
                    }

                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        // Explicit stop or the Flusher was dropped
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("Flusher stopped");
            })
            .context("Failed to spawn flusher thread")?;

        tracing::info!("Flushing changes every {:?}", interval);

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Signal the flush thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Flusher thread panicked");
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
