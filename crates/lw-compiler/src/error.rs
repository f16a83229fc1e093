//! Error types for the lw-compiler crate.
//!
//! # Error Recovery Strategy
//!
//! - **Materialize errors** ([`MaterializeError`]): Fatal - raised once at
//!   startup, before the first compile; the process must stop
//! - **Compile errors** ([`CompileError`]): Per mapping - logged, the mapping
//!   is skipped, the rest of the pass and the watcher keep running
//! - **Render errors** ([`RenderError`]): Surface as [`CompileError::Compile`]

use std::time::Duration;

use camino::Utf8PathBuf;

/// A failure reported by a style engine.
///
/// Engines are opaque; all they report is a message, typically the
/// compiler's syntax or reference error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Creates an engine error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the engine's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors produced by the compiler adapter.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The engine rejected the source.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine returned a result shape the adapter does not understand.
    #[error("unexpected compiler result shape: {0}")]
    UnrecognizedResult(&'static str),

    /// The engine did not finish within the configured timeout.
    #[error("compiler did not finish within {0:?}")]
    TimedOut(Duration),

    /// The engine task panicked or was cancelled.
    #[error("compiler task aborted")]
    Aborted,
}

/// Which step of a compile failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The source file could not be read.
    Read,
    /// The compiler rejected the source or returned an unusable result.
    Compile,
    /// The output file could not be written.
    Write,
}

/// A per-mapping compile failure.
///
/// # Examples
///
/// ```
/// use lw_compiler::{CompileError, FailureKind};
/// use camino::Utf8PathBuf;
/// use std::io;
///
/// let err = CompileError::Read {
///     path: Utf8PathBuf::from("/styles/main.less"),
///     source: io::Error::new(io::ErrorKind::NotFound, "missing"),
/// };
/// assert_eq!(err.kind(), FailureKind::Read);
/// assert_eq!(err.path().as_str(), "/styles/main.less");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Failed to read the source file.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The source file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to compile the source file.
    #[error("failed to compile {path}: {source}")]
    Compile {
        /// The source file.
        path: Utf8PathBuf,
        /// The adapter's error.
        #[source]
        source: RenderError,
    },

    /// Failed to write the output file.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The output file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Returns which step failed.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Read { .. } => FailureKind::Read,
            Self::Compile { .. } => FailureKind::Compile,
            Self::Write { .. } => FailureKind::Write,
        }
    }

    /// Returns the file the failure is about.
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::Read { path, .. } | Self::Compile { path, .. } | Self::Write { path, .. } => path,
        }
    }
}

/// Errors raised while creating output directories.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// An ancestor of an output path exists but is not a directory.
    ///
    /// Requires user intervention: rename or remove the entry.
    #[error("output path {path} exists but is not a directory; rename or remove it first")]
    PathConflict {
        /// The conflicting entry.
        path: Utf8PathBuf,
    },

    /// Inspecting or creating a directory failed.
    #[error("failed to create output directory {path}: {source}")]
    Io {
        /// The directory being inspected or created.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl MaterializeError {
    /// Returns the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::PathConflict { path } | Self::Io { path, .. } => path,
        }
    }
}
