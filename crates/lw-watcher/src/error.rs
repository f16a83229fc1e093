//! Error types for the lw-watcher crate.
//!
//! Startup failures end the program. Once the watch is registered, failures
//! concern single events and are logged by the watcher thread; see
//! [`WatchError::is_per_event`].

use std::io;
use std::path::PathBuf;

use camino::Utf8PathBuf;

/// Errors raised while starting, running or stopping the styles watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The notify backend failed, either registering the watch or while
    /// delivering events.
    #[error("watcher backend error: {0}")]
    Backend(#[from] notify::Error),

    /// The styles directory does not exist.
    #[error("styles directory does not exist: {0}")]
    MissingRoot(Utf8PathBuf),

    /// The styles directory exists but could not be resolved to an
    /// absolute path.
    #[error("cannot resolve styles directory {path}: {source}")]
    Resolve {
        /// The directory as given.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },

    /// The watcher task ended before reporting back, or panicked.
    #[error("watcher task ended unexpectedly")]
    TaskLost,

    /// A changed path is not valid UTF-8.
    #[error("event path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(PathBuf),
}

impl WatchError {
    /// Returns `true` if the error concerns a single event, so watching
    /// carries on and only that event is lost.
    ///
    /// Backend errors about a vanished path are per-event; exhausted watch
    /// limits and invalid backend configuration are not, since later changes
    /// may go unseen.
    #[must_use]
    pub fn is_per_event(&self) -> bool {
        match self {
            Self::NonUtf8Path(_) => true,
            Self::Backend(error) => matches!(
                error.kind,
                notify::ErrorKind::PathNotFound
                    | notify::ErrorKind::WatchNotFound
                    | notify::ErrorKind::Generic(_)
                    | notify::ErrorKind::Io(_)
            ),
            Self::MissingRoot(_) | Self::Resolve { .. } | Self::TaskLost => false,
        }
    }
}
