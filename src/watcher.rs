use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use anyhow::{Context, Result};
use crate::core::{BatchEngine, ChangeKind};

/// OS change notifications for the watch root, fed straight into the engine.
///
/// Notify callbacks run on the watcher's own thread; the engine's collector is
/// cheap and lock-protected so nothing else is needed between the two.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    pub fn new(engine: Arc<BatchEngine>) -> Result<Self> {
        // Event paths come back absolute, compare against the resolved root
        let root = engine
            .root()
            .canonicalize()
            .with_context(|| format!("Failed to resolve watch path {}", engine.root().display()))?;

        let callback_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    let Some(kind) = change_kind(&event.kind) else {
                        return;
                    };
                    let now = SystemTime::now();

                    for path in &event.paths {
                        if let Some(file) = file_identity(&callback_root, path) {
                            engine.collect(&file, kind, now);
                        }
                    }
                }
                Err(err) => {
                    tracing::error!("File watcher error: {}", err);
                }
            }
        })
        .context("Failed to create file system watcher")?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .context("Failed to start watching directory")?;

        tracing::info!("Watching {}", root.display());

        Ok(Self {
            _watcher: watcher,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map a notify event kind onto the change kinds the engine tracks
pub fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

/// File name of `path` relative to `root`, if it sits directly inside it
pub fn file_identity(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let name = components.next()?;
    if components.next().is_some() {
        return None;
    }
    name.as_os_str().to_str().map(str::to_owned)
}
