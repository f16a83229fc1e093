//! File watching and recompile triggering for less-watcher.
//!
//! This crate observes the styles directory with the `notify` crate,
//! bridges the events into tokio, and turns each qualifying event into one
//! recompilation pass of the [`lw_compiler::Orchestrator`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  RecommendedWatcher ─► classify ─► FileFilter ─► blocking_send  │
//! └───────────────────────────────────────────────────────│─────────┘
//!                                                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  FileWatcher (mpsc::Receiver) ─► ChangeWatcher ─► run_all()     │
//! │                                    ▲                (JoinSet)   │
//! │                      CancellationToken (Ctrl-C / SIGTERM)       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! lw-cli ──► lw-watcher ──► lw-compiler ──► lw-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use lw_compiler::Orchestrator;
//! use lw_core::Config;
//! use lw_watcher::{style_filter, ChangeWatcher, FileWatcher};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default().validate()?;
//!     let orchestrator = Arc::new(Orchestrator::from_config(&config));
//!     orchestrator.run_all().await;
//!
//!     let watcher = FileWatcher::new(&config.root_dir, style_filter(&config)).await?;
//!     let token = CancellationToken::new();
//!     ChangeWatcher::new(orchestrator).run(watcher, token).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! [`WatchError`] covers watcher startup and shutdown. Once running, the
//! loop never stops on its own because of a failure: backend errors and
//! non-UTF-8 paths are logged by the watcher thread, at `warn` when only one
//! event is lost ([`WatchError::is_per_event`]) and at `error` otherwise.
//! Compile failures stay inside the orchestrator's per-mapping reports.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod trigger;
pub mod watcher;

// Re-export error types
pub use error::WatchError;

// Re-export event types
pub use events::{FileEvent, classify};

// Re-export filter types
pub use filter::{
    AcceptAllFilter, CompositeFilter, EventKindFilter, ExtensionFilter, FileFilter, style_filter,
};

// Re-export watcher types
pub use trigger::{ChangeWatcher, WatchReport, WatcherState};
pub use watcher::FileWatcher;
