//! Change-batching engine
//!
//! Owns the pending batch and the content store behind a single lock.
//! Watch adapters feed it through [`BatchEngine::collect`]; a flusher drains
//! it through [`BatchEngine::flush`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use crate::config::MonitorConfig;
use crate::diff::{diff_with, DiffAlgorithm, DiffAlgorithmType, DiffOutcome};
use crate::report::{Report, ReportSink};
use super::batch::Batch;
use super::error::{read_text, ReadError};
use super::events::{ChangeKind, PendingChange};
use super::store::ContentStore;

/// Result of a single flush attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Another flush was still running; nothing was touched
    Skipped,
    /// Nothing was pending
    Empty,
    Flushed { processed: usize, failed: usize },
}

#[derive(Default)]
struct EngineState {
    batch: Batch,
    store: ContentStore,
}

pub struct BatchEngine {
    root: PathBuf,
    files: Vec<String>,
    watched: HashSet<String>,
    algorithm: Box<dyn DiffAlgorithm>,
    sink: Arc<dyn ReportSink>,
    state: Mutex<EngineState>,
    flushing: AtomicBool,
}

// Clears the in-progress flag even if a sink panics mid-flush.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BatchEngine {
    pub fn new<P, I, S>(root: P, files: I, sink: Arc<dyn ReportSink>) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files: Vec<String> = files.into_iter().map(Into::into).collect();
        let watched = files.iter().cloned().collect();

        Self {
            root: root.into(),
            files,
            watched,
            algorithm: DiffAlgorithmType::default().create(),
            sink,
            state: Mutex::new(EngineState::default()),
            flushing: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &MonitorConfig, sink: Arc<dyn ReportSink>) -> Self {
        Self::new(config.path.clone(), config.files.iter().cloned(), sink)
            .with_algorithm(config.algorithm)
    }

    pub fn with_algorithm(mut self, algorithm: DiffAlgorithmType) -> Self {
        self.algorithm = algorithm.create();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn algorithm_name(&self) -> &str {
        self.algorithm.name()
    }

    pub fn algorithm_description(&self) -> &str {
        self.algorithm.description()
    }

    pub fn is_watched(&self, file: &str) -> bool {
        self.watched.contains(file)
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        // A panicking sink must not take the collector down with it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a change notification.
    ///
    /// Unwatched names and repeats of an already queued (file, kind) pair are
    /// dropped. Returns `true` when the change was queued.
    pub fn collect(&self, file: &str, kind: ChangeKind, detected_at: SystemTime) -> bool {
        if !self.is_watched(file) {
            return false;
        }

        let queued = self.state().batch.push(PendingChange::new(file, kind, detected_at));
        if queued {
            tracing::debug!("Queued {} change for {}", kind, file);
        } else {
            tracing::debug!("Absorbed duplicate {} change for {}", kind, file);
        }
        queued
    }

    pub fn collect_now(&self, file: &str, kind: ChangeKind) -> bool {
        self.collect(file, kind, SystemTime::now())
    }

    /// Record a baseline snapshot without diffing
    pub fn seed(&self, file: impl Into<String>, text: impl Into<String>) {
        self.state().store.set(file, text);
    }

    /// Seed the store from every watched file currently on disk.
    ///
    /// Missing files are skipped silently, unreadable ones are reported.
    /// Returns the number of files seeded.
    pub fn scan_initial(&self) -> usize {
        let mut seeded = 0;

        for file in &self.files {
            match read_text(self.root.join(file)) {
                Ok(text) => {
                    self.seed(file.clone(), text);
                    seeded += 1;
                }
                Err(err) if err.is_missing() => {
                    tracing::debug!("{} does not exist yet, no baseline", file);
                }
                Err(err) => {
                    tracing::warn!("{}", err);
                    self.sink.report(Report::ScanFailed {
                        file: file.clone(),
                        error: err.source.to_string(),
                    });
                }
            }
        }

        tracing::info!("Captured initial content of {}/{} watched files", seeded, self.files.len());
        seeded
    }

    pub fn snapshot(&self, file: &str) -> Option<String> {
        self.state().store.get(file).map(str::to_owned)
    }

    pub fn pending_len(&self) -> usize {
        self.state().batch.len()
    }

    pub fn dedup_len(&self) -> usize {
        self.state().batch.dedup_len()
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    /// Drain the pending batch and report a diff for every change in it.
    ///
    /// Overlapping calls are skipped, not queued: the second caller returns
    /// [`FlushOutcome::Skipped`] and its changes wait for the next flush.
    pub fn flush(&self) -> FlushOutcome {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Flush already in progress, skipping tick");
            return FlushOutcome::Skipped;
        }
        let _guard = FlushGuard(&self.flushing);

        let batch = self.state().batch.take();
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }

        self.sink.report(Report::BatchStarted { changes: batch.len() });

        let mut processed = 0;
        let mut failed = 0;
        for change in batch.into_changes() {
            match self.flush_change(&change) {
                Ok(()) => processed += 1,
                Err(err) => {
                    failed += 1;
                    tracing::warn!("{} ({})", err, change.kind);
                    self.sink.report(Report::ReadFailed {
                        file: change.file,
                        error: err.source.to_string(),
                    });
                }
            }
        }

        self.sink.report(Report::BatchFinished { processed, failed });
        FlushOutcome::Flushed { processed, failed }
    }

    // Read, diff and store one file. The lock is only held for the store
    // lookups, never across the read or the diff.
    fn flush_change(&self, change: &PendingChange) -> Result<(), ReadError> {
        let current = read_text(self.root.join(&change.file))?;
        let previous = self.snapshot(&change.file).filter(|text| !text.is_empty());

        let report = match previous {
            Some(previous) => match diff_with(&*self.algorithm, &previous, &current) {
                DiffOutcome::Added(lines) => Report::Added {
                    file: change.file.clone(),
                    lines,
                },
                DiffOutcome::Unchanged => Report::Unchanged {
                    file: change.file.clone(),
                },
            },
            None => Report::Baseline {
                file: change.file.clone(),
            },
        };
        self.sink.report(report);

        self.state().store.set(change.file.clone(), current);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemorySink;
    use std::fs;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn engine(dir: &TempDir, sink: &MemorySink) -> BatchEngine {
        BatchEngine::new(dir.path(), ["file1.txt", "file2.txt"], Arc::new(sink.clone()))
    }

    #[test]
    fn test_collect_filters_unwatched_files() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);

        assert!(!engine.collect_now("other.txt", ChangeKind::Modified));
        assert!(!engine.collect_now("sub/file1.txt", ChangeKind::Modified));
        assert_eq!(engine.pending_len(), 0);
        assert_eq!(engine.dedup_len(), 0);
    }

    #[test]
    fn test_algorithm_selection() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();

        let greedy = engine(&dir, &sink);
        assert_eq!(greedy.algorithm_name(), "Greedy");

        let myers = engine(&dir, &sink).with_algorithm(DiffAlgorithmType::Myers);
        assert_eq!(myers.algorithm_name(), "Myers");
        assert!(myers.algorithm_description().contains("inserted lines only"));
    }

    #[test]
    fn test_collect_dedups_same_kind() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);

        assert!(engine.collect_now("file1.txt", ChangeKind::Modified));
        assert!(!engine.collect_now("file1.txt", ChangeKind::Modified));
        assert!(engine.collect_now("file1.txt", ChangeKind::Created));

        assert_eq!(engine.pending_len(), 2);
    }

    #[test]
    fn test_flush_reports_appended_line() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);
        let path = dir.path().join("file1.txt");

        fs::write(&path, "a\nb").unwrap();
        assert_eq!(engine.scan_initial(), 1);

        fs::write(&path, "a\nb\nc").unwrap();
        engine.collect_now("file1.txt", ChangeKind::Modified);

        assert_eq!(engine.flush(), FlushOutcome::Flushed { processed: 1, failed: 0 });
        assert_eq!(
            sink.reports(),
            vec![
                Report::BatchStarted { changes: 1 },
                Report::Added { file: "file1.txt".to_string(), lines: vec!["c".to_string()] },
                Report::BatchFinished { processed: 1, failed: 0 },
            ]
        );
        assert_eq!(engine.snapshot("file1.txt").as_deref(), Some("a\nb\nc"));
        assert_eq!(engine.pending_len(), 0);
        assert_eq!(engine.dedup_len(), 0);
    }

    #[test]
    fn test_empty_flush_is_silent() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);
        engine.seed("file1.txt", "a");

        assert_eq!(engine.flush(), FlushOutcome::Empty);
        assert!(sink.reports().is_empty());
        assert_eq!(engine.snapshot("file1.txt").as_deref(), Some("a"));
    }

    #[test]
    fn test_flush_without_baseline_seeds_store() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);

        fs::write(dir.path().join("file2.txt"), "x\ny").unwrap();
        engine.collect_now("file2.txt", ChangeKind::Created);
        engine.flush();

        assert!(sink.reports().contains(&Report::Baseline { file: "file2.txt".to_string() }));
        assert_eq!(engine.snapshot("file2.txt").as_deref(), Some("x\ny"));

        // The next change diffs against the captured baseline
        sink.take();
        fs::write(dir.path().join("file2.txt"), "x\ny\nz").unwrap();
        engine.collect_now("file2.txt", ChangeKind::Modified);
        engine.flush();

        assert!(sink.reports().contains(&Report::Added {
            file: "file2.txt".to_string(),
            lines: vec!["z".to_string()],
        }));
    }

    #[test]
    fn test_empty_snapshot_is_not_diffed() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);
        engine.seed("file1.txt", "");

        fs::write(dir.path().join("file1.txt"), "first").unwrap();
        engine.collect_now("file1.txt", ChangeKind::Modified);
        engine.flush();

        assert!(sink.reports().contains(&Report::Baseline { file: "file1.txt".to_string() }));
        assert_eq!(engine.snapshot("file1.txt").as_deref(), Some("first"));
    }

    #[test]
    fn test_unchanged_content_is_reported() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);

        fs::write(dir.path().join("file1.txt"), "a\nb").unwrap();
        engine.scan_initial();
        engine.collect_now("file1.txt", ChangeKind::Modified);
        engine.flush();

        assert!(sink.reports().contains(&Report::Unchanged { file: "file1.txt".to_string() }));
    }

    #[test]
    fn test_missing_file_keeps_stale_snapshot() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);

        fs::write(dir.path().join("file2.txt"), "one").unwrap();
        engine.seed("file1.txt", "stale");
        engine.collect_now("file1.txt", ChangeKind::Deleted);
        engine.collect_now("file2.txt", ChangeKind::Modified);

        assert_eq!(engine.flush(), FlushOutcome::Flushed { processed: 1, failed: 1 });

        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file(), Some("file1.txt"));
        assert_eq!(engine.snapshot("file1.txt").as_deref(), Some("stale"));
        assert_eq!(engine.snapshot("file2.txt").as_deref(), Some("one"));
    }

    #[test]
    fn test_scan_initial_skips_missing_files() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);

        fs::write(dir.path().join("file1.txt"), "a").unwrap();

        assert_eq!(engine.scan_initial(), 1);
        assert!(engine.snapshot("file2.txt").is_none());
        assert!(sink.errors().is_empty());
    }

    #[test]
    fn test_scan_initial_reports_unreadable_file() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);

        // A directory under a watched name exists but cannot be read as text
        fs::create_dir(dir.path().join("file1.txt")).unwrap();

        assert_eq!(engine.scan_initial(), 0);
        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], Report::ScanFailed { file, .. } if file == "file1.txt"));
    }

    #[test]
    fn test_non_utf8_file_is_diffed() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let engine = engine(&dir, &sink);
        let path = dir.path().join("file1.txt");

        fs::write(&path, b"caf\xe9\n").unwrap();
        assert_eq!(engine.scan_initial(), 1);

        fs::write(&path, b"caf\xe9\nth\xc3\xa9\n").unwrap();
        engine.collect_now("file1.txt", ChangeKind::Modified);

        assert_eq!(engine.flush(), FlushOutcome::Flushed { processed: 1, failed: 0 });
        assert!(sink.errors().is_empty());
        assert!(sink.reports().contains(&Report::Added {
            file: "file1.txt".to_string(),
            lines: vec!["thé".to_string()],
        }));
    }

    /// Sink that parks the flushing thread on `BatchStarted` until released
    struct GateSink {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
        inner: MemorySink,
    }

    impl ReportSink for GateSink {
        fn report(&self, report: Report) {
            let gate = matches!(report, Report::BatchStarted { .. });
            self.inner.report(report);
            if gate {
                let _ = self.entered.lock().unwrap().send(());
                let _ = self.release.lock().unwrap().recv_timeout(Duration::from_secs(5));
            }
        }
    }

    #[test]
    fn test_overlapping_flush_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file1.txt"), "a").unwrap();
        fs::write(dir.path().join("file2.txt"), "b").unwrap();

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let inner = MemorySink::new();
        let sink = Arc::new(GateSink {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
            inner: inner.clone(),
        });
        let engine = Arc::new(BatchEngine::new(dir.path(), ["file1.txt", "file2.txt"], sink));

        engine.collect_now("file1.txt", ChangeKind::Modified);

        let running = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.flush())
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(engine.is_flushing());

        // Collection keeps working while the flush holds its detached batch
        assert!(engine.collect_now("file2.txt", ChangeKind::Modified));
        assert!(engine.collect_now("file1.txt", ChangeKind::Modified));
        assert_eq!(engine.flush(), FlushOutcome::Skipped);
        assert_eq!(engine.pending_len(), 2);

        release_tx.send(()).unwrap();
        assert_eq!(running.join().unwrap(), FlushOutcome::Flushed { processed: 1, failed: 0 });
        assert!(!engine.is_flushing());

        release_tx.send(()).unwrap();
        assert_eq!(engine.flush(), FlushOutcome::Flushed { processed: 2, failed: 0 });
        assert_eq!(engine.pending_len(), 0);
    }

    #[test]
    fn test_concurrent_collection_loses_nothing() {
        let dir = TempDir::new().unwrap();
        let sink = MemorySink::new();
        let files: Vec<String> = (0..8).map(|i| format!("f{}.txt", i)).collect();
        let engine = Arc::new(BatchEngine::new(dir.path(), files.clone(), Arc::new(sink.clone())));

        let handles: Vec<_> = files
            .iter()
            .cloned()
            .map(|file| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for _ in 0..50 {
                        engine.collect_now(&file, ChangeKind::Modified);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.pending_len(), files.len());
        assert_eq!(engine.dedup_len(), files.len());
    }
}
