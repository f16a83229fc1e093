//! Domain types for the less-watcher tool.
//!
//! # Module Organization
//!
//! - [`mapping`] - Source-to-output compilation units
//! - [`event_kind`] - Filesystem event kinds that can trigger a recompile
//! - [`generation`] - The compile-generation counter used for log correlation
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use lw_core::{CompileMapping, WatchEventKind};
//! use lw_core::types::GenerationCounter;
//! ```

mod event_kind;
mod generation;
mod mapping;

pub use event_kind::{EventKindSet, WatchEventKind};
pub use generation::{CompileGeneration, GenerationCounter};
pub use mapping::CompileMapping;
