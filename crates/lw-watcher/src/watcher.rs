//! File watcher with async event streaming.
//!
//! This module provides the [`FileWatcher`] type that bridges the synchronous
//! `notify` watcher to the async tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌───────────────────┐    ┌────────────┐    ┌────────────────┐  │
//! │  │ RecommendedWatcher│ -> │ classify   │ -> │ FileFilter     │  │
//! │  │ (notify, recursive)│   │ (kind)     │    │ (kind + ext)   │  │
//! │  └───────────────────┘    └────────────┘    └───────┬────────┘  │
//! └─────────────────────────────────────────────────────│───────────┘
//!                                                       │
//!                                         blocking_send │
//!                                                       ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐                     │
//! │  │ FileWatcher      │    │ mpsc::Receiver │ -> ChangeWatcher    │
//! │  │ (shutdown ctrl)  │    │ (events)       │                     │
//! │  └──────────────────┘    └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are not debounced: every qualifying event is delivered.

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::error::WatchError;
use crate::events::{FileEvent, classify};
use crate::filter::FileFilter;

/// Default channel capacity for file events.
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// A recursive file watcher that streams filtered events to async code.
///
/// # Lifecycle
///
/// 1. **Creation**: [`FileWatcher::new`] validates the path, spawns a
///    blocking task running the notify watcher and waits until the watch
///    is registered, so startup failures surface as errors.
/// 2. **Event Reception**: [`recv`](Self::recv) or [`events`](Self::events).
///    Events are already filtered.
/// 3. **Shutdown**: [`shutdown`](Self::shutdown), or drop the watcher.
///
/// # Examples
///
/// ```no_run
/// use lw_watcher::{ExtensionFilter, FileWatcher};
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), lw_watcher::WatchError> {
/// let mut watcher = FileWatcher::new(
///     Utf8Path::new("./styles"),
///     ExtensionFilter::new([".less"]),
/// ).await?;
///
/// while let Some(event) = watcher.recv().await {
///     println!("{} {}", event.kind, event.path);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// Signals the blocking task to stop. `None` once shutdown started.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking watcher task.
    task_handle: Option<JoinHandle<()>>,

    /// Event receiver for async consumption.
    event_rx: mpsc::Receiver<FileEvent>,

    /// The canonical path being watched.
    watch_path: Utf8PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watch_path", &self.watch_path)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Starts watching `path` recursively.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::MissingRoot`] if the path doesn't exist,
    /// [`WatchError::Resolve`] if it cannot be canonicalized and
    /// [`WatchError::Backend`] if the watch cannot be registered.
    pub async fn new<F: FileFilter>(path: &Utf8Path, filter: F) -> Result<Self, WatchError> {
        Self::with_capacity(path, filter, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Starts watching with a custom event channel capacity.
    ///
    /// When the channel is full the watcher thread blocks, so events are
    /// delayed rather than dropped.
    ///
    /// # Errors
    ///
    /// Same as [`FileWatcher::new`].
    pub async fn with_capacity<F: FileFilter>(
        path: &Utf8Path,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::MissingRoot(path.to_owned()));
        }
        let watch_path = path
            .canonicalize_utf8()
            .map_err(|source| WatchError::Resolve {
                path: path.to_owned(),
                source,
            })?;

        let (event_tx, event_rx) = mpsc::channel(channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task_path = watch_path.clone();
        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(&task_path, event_tx, shutdown_rx, ready_tx, filter)
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(error),
            Err(_closed) => return Err(WatchError::TaskLost),
        }

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            watch_path,
        })
    }

    /// Receives the next file event.
    ///
    /// Returns `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.event_rx.recv().await
    }

    /// Returns a mutable reference to the event receiver, for use with
    /// `tokio::select!`.
    pub fn events(&mut self) -> &mut mpsc::Receiver<FileEvent> {
        &mut self.event_rx
    }

    /// Returns the canonical path being watched.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` if the watcher task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher and waits for its task to finish.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::TaskLost`] if the watcher task panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        // Unblocks a watcher thread waiting on a full channel.
        self.event_rx.close();

        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already be gone.
            let _ = tx.send(());
        }

        if let Some(handle) = self.task_handle.take() {
            handle.await.map_err(|_join_error| WatchError::TaskLost)?;
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        // Drop is sync; the task stops on its own once signalled.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Runs the notify watcher until shutdown. Called from `spawn_blocking`.
fn run_watcher_loop<F: FileFilter>(
    path: &Utf8Path,
    event_tx: mpsc::Sender<FileEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    ready_tx: oneshot::Sender<Result<(), WatchError>>,
    filter: F,
) {
    let started = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
        Ok(event) => forward(&event, &filter, &event_tx),
        Err(error) => report(&WatchError::Backend(error)),
    })
    .and_then(|mut watcher: RecommendedWatcher| {
        watcher.watch(path.as_std_path(), RecursiveMode::Recursive)?;
        Ok(watcher)
    });

    let watcher = match started {
        Ok(watcher) => watcher,
        Err(error) => {
            let _ = ready_tx.send(Err(WatchError::Backend(error)));
            return;
        }
    };

    info!(path = %path, "File watcher started");
    let _ = ready_tx.send(Ok(()));

    let _ = shutdown_rx.blocking_recv();

    drop(watcher);
    info!(path = %path, "File watcher stopped");
}

/// Converts one notify event into filtered [`FileEvent`]s and sends them.
fn forward<F: FileFilter>(event: &notify::Event, filter: &F, tx: &mpsc::Sender<FileEvent>) {
    let Some(kind) = classify(&event.kind) else {
        trace!(kind = ?event.kind, "Ignoring non-mutating event");
        return;
    };

    for path in &event.paths {
        let path = match Utf8PathBuf::try_from(path.clone()) {
            Ok(p) => p,
            Err(e) => {
                report(&WatchError::NonUtf8Path(e.into_path_buf()));
                continue;
            }
        };

        let file_event = FileEvent::new(path, kind);
        if !filter.should_process(&file_event) {
            trace!(path = %file_event.path, kind = %kind, "Filtered out file event");
            continue;
        }

        if tx.blocking_send(file_event).is_err() {
            debug!("Event channel closed, dropping file events");
            return;
        }
    }
}

/// Logs a failure raised while the watch is running.
fn report(error: &WatchError) {
    if error.is_per_event() {
        warn!(%error, "Skipping file event");
    } else {
        error!(%error, "Watcher backend failed, changes may be missed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptAllFilter, ExtensionFilter};
    use lw_core::WatchEventKind;
    use notify::event::{CreateKind, EventKind};
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_temp_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp directory")
    }

    #[tokio::test]
    async fn test_watcher_creation() {
        let temp_dir = create_temp_dir();
        let path = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        let watcher = FileWatcher::new(path, AcceptAllFilter)
            .await
            .expect("Watcher should be created");

        assert!(watcher.is_running());
        assert!(watcher.watch_path().is_absolute());
    }

    #[tokio::test]
    async fn test_watcher_path_not_found() {
        let path = Utf8Path::new("/nonexistent/path/that/does/not/exist");

        let result = FileWatcher::new(path, AcceptAllFilter).await;

        match result {
            Err(WatchError::MissingRoot(p)) => assert_eq!(p, path),
            other => panic!("Expected MissingRoot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_watcher_shutdown() {
        let temp_dir = create_temp_dir();
        let path = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        let watcher = FileWatcher::with_capacity(path, AcceptAllFilter, 8)
            .await
            .expect("Failed to create watcher");

        assert!(watcher.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_watcher_receives_filtered_events() {
        let temp_dir = create_temp_dir();
        let path = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        let mut watcher = FileWatcher::new(path, ExtensionFilter::new([".less"]))
            .await
            .expect("Failed to create watcher");

        fs::write(temp_dir.path().join("ignored.css"), "a{}").expect("Failed to write file");
        fs::write(temp_dir.path().join("main.less"), "a{}").expect("Failed to write file");

        let event = tokio::time::timeout(Duration::from_secs(2), watcher.recv()).await;
        watcher.shutdown().await.expect("Shutdown failed");

        // Timing-dependent; may not arrive in CI.
        if let Ok(Some(event)) = event {
            assert_eq!(event.extension(), Some("less"));
            assert!(event.path.as_str().ends_with("main.less"));
        }
    }

    #[test]
    fn test_forward_filters_and_splits_paths() {
        let (tx, mut rx) = mpsc::channel(8);
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/s/a.less"))
            .add_path(PathBuf::from("/s/b.css"))
            .add_path(PathBuf::from("/s/c.less"));

        forward(&event, &ExtensionFilter::new([".less"]), &tx);
        drop(tx);

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            received.push(event);
        }
        let paths: Vec<_> = received.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/s/a.less", "/s/c.less"]);
        assert!(received.iter().all(|e| e.kind == WatchEventKind::Created));
    }

    #[test]
    fn test_forward_ignores_access_events() {
        let (tx, mut rx) = mpsc::channel(8);
        let event = notify::Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/s/a.less"));

        forward(&event, &AcceptAllFilter, &tx);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forward_stops_on_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/s/a.less"));

        // Must not block or panic.
        forward(&event, &AcceptAllFilter, &tx);
    }

    #[cfg(unix)]
    #[test]
    fn test_forward_skips_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (tx, mut rx) = mpsc::channel(8);
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from(OsStr::from_bytes(b"/s/caf\xe9.less")))
            .add_path(PathBuf::from("/s/main.less"));

        forward(&event, &AcceptAllFilter, &tx);
        drop(tx);

        let received = rx.try_recv().expect("UTF-8 path should be forwarded");
        assert_eq!(received.path.as_str(), "/s/main.less");
        assert!(rx.try_recv().is_err());
    }
}
