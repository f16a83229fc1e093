//! Compile pipeline for less-watcher.
//!
//! This crate turns a validated [`lw_core::WatchConfig`] into compiled
//! stylesheets on disk.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Orchestrator::run_all        (generation += 1, one per trigger) │
//! │                                                                 │
//! │   slot(out/a.css)        slot(out/b.css)        slot(...)       │
//! │   Idle/Running{rerun}    Idle/Running{rerun}                    │
//! │        │ tokio::spawn          │ tokio::spawn                   │
//! └────────│───────────────────────│────────────────────────────────┘
//!          ▼                       ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ TaskRunner::run   read ──► CompilerAdapter ──► write            │
//! │                              │ spawn_blocking                   │
//! │                              ▼                                  │
//! │                         StyleEngine (CommandEngine: lessc)      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`materialize_output_dirs`] runs once before the first pass so every
//! output directory exists.
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
//! use lw_compiler::{materialize_output_dirs, Orchestrator};
//! use lw_core::Config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default().validate()?;
//! materialize_output_dirs(&config.root_dir, &config.mappings)?;
//!
//! let orchestrator = Orchestrator::from_config(&config);
//! let summary = orchestrator.run_all().await;
//! println!(
//!     "generation {}: {} ok, {} failed",
//!     summary.generation,
//!     summary.succeeded(),
//!     summary.failed()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Only [`MaterializeError`] is meant to stop the process. Per-mapping
//! failures surface as [`CompileOutcome`] variants carrying a
//! [`CompileError`]; they are logged and never abort a pass.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod adapter;
pub mod engine;
pub mod error;
pub mod materialize;
pub mod orchestrator;
pub mod outcome;
pub mod runner;

// Re-export adapter types
pub use adapter::{CompilerAdapter, RawRender, RenderOptions, StyleEngine};
pub use engine::CommandEngine;

// Re-export error types
pub use error::{CompileError, EngineError, FailureKind, MaterializeError, RenderError};

// Re-export pipeline types
pub use materialize::materialize_output_dirs;
pub use orchestrator::Orchestrator;
pub use outcome::{CompileOutcome, MappingReport, PassSummary};
pub use runner::TaskRunner;
