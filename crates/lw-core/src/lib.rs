//! Core types, configuration, and errors for the less-watcher tool.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`Config`] and [`ConfigOverrides`] for the raw, user-facing settings
//!   (JSON file plus command-line overrides)
//! - [`WatchConfig`], the validated configuration handed to the compile
//!   pipeline and the watcher
//! - Domain types ([`CompileMapping`], [`WatchEventKind`], [`EventKindSet`],
//!   [`CompileGeneration`], [`GenerationCounter`])
//! - [`ConfigError`] for configuration loading and validation failures

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    CompilerConfig, Config, ConfigOverrides, ConfigSource, DEFAULT_CONFIG_FILE, OutputFormat,
    WatchConfig,
};
pub use error::ConfigError;
pub use types::{
    CompileGeneration, CompileMapping, EventKindSet, GenerationCounter, WatchEventKind,
};
