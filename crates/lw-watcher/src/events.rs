//! Event types for file change notifications.
//!
//! # Event Flow
//!
//! ```text
//! notify::Event (one or more paths)
//!        │ classify(kind): Create/Modify/Remove, else dropped
//!        ▼
//!   FileEvent per UTF-8 path
//!        │ FileFilter (event kind + extension)
//!        ▼
//!   Sent via channel to the ChangeWatcher
//! ```

use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use lw_core::WatchEventKind;
use notify::EventKind;

/// A filesystem change to one path.
///
/// # Examples
///
/// ```
/// use lw_watcher::FileEvent;
/// use lw_core::WatchEventKind;
///
/// let event = FileEvent::new("styles/main.less", WatchEventKind::Changed);
/// assert_eq!(event.extension(), Some("less"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// The affected path, absolute when produced by the watcher.
    pub path: Utf8PathBuf,

    /// What happened to the path.
    pub kind: WatchEventKind,

    /// When the event was received.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates an event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Returns the path's extension, without the dot.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Returns the file name component of the path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }

    /// Returns the affected path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Maps a notify event kind onto the kinds the watcher reacts to.
///
/// Access events and backend-specific `Any`/`Other` kinds are ignored.
/// Renames are reported by notify as modifications and count as changes.
#[must_use]
pub fn classify(kind: &EventKind) -> Option<WatchEventKind> {
    match kind {
        EventKind::Create(_) => Some(WatchEventKind::Created),
        EventKind::Modify(_) => Some(WatchEventKind::Changed),
        EventKind::Remove(_) => Some(WatchEventKind::Removed),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}
