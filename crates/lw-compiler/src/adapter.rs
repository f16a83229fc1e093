//! The compiler adapter.
//!
//! The style compiler is an external dependency. [`StyleEngine`] is the raw
//! boundary to it; engines have historically returned either a plain string
//! or a structured object carrying the stylesheet in a `css` field.
//! [`CompilerAdapter`] is the only thing the rest of the pipeline talks to:
//! it runs the engine off the async runtime, applies the optional timeout,
//! and normalizes whatever shape comes back into a plain `String`.
//!
//! ```text
//! TaskRunner ──► CompilerAdapter::render ──► spawn_blocking ──► StyleEngine
//!                        │                                          │
//!                        └──────────── normalize(RawRender) ◄───────┘
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde_json::Value;

use crate::error::{EngineError, RenderError};

/// Options passed to the engine for one compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Directories searched for `@import`s.
    pub search_paths: Vec<Utf8PathBuf>,

    /// Request minified output.
    pub minify: bool,

    /// Point after which the engine should stop and clean up. Set by the
    /// adapter from its timeout.
    pub deadline: Option<Instant>,
}

/// A result as returned by an engine, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRender {
    /// The stylesheet itself.
    Text(String),

    /// A structured result, expected to carry the stylesheet in `css`.
    Structured(Value),
}

/// A style-language compiler.
///
/// Implementations block; the adapter calls them from tokio's blocking pool.
///
/// # Examples
///
/// ```
/// use lw_compiler::{EngineError, RawRender, RenderOptions, StyleEngine};
///
/// struct Passthrough;
///
/// impl StyleEngine for Passthrough {
///     fn render(&self, source: &str, _options: &RenderOptions) -> Result<RawRender, EngineError> {
///         Ok(RawRender::Text(source.to_owned()))
///     }
/// }
/// ```
pub trait StyleEngine: Send + Sync + 'static {
    /// Compiles `source`.
    fn render(&self, source: &str, options: &RenderOptions) -> Result<RawRender, EngineError>;
}

impl<E: StyleEngine + ?Sized> StyleEngine for Arc<E> {
    fn render(&self, source: &str, options: &RenderOptions) -> Result<RawRender, EngineError> {
        (**self).render(source, options)
    }
}

/// The normalizing shim in front of a [`StyleEngine`].
///
/// Cheap to clone; clones share the engine.
#[derive(Clone)]
pub struct CompilerAdapter {
    engine: Arc<dyn StyleEngine>,
    timeout: Option<Duration>,
}

impl fmt::Debug for CompilerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerAdapter")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CompilerAdapter {
    /// Wraps an engine with no timeout.
    pub fn new(engine: impl StyleEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            timeout: None,
        }
    }

    /// Bounds every compile by `timeout`. `None` removes the bound.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the configured timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Compiles `source` and returns the generated stylesheet.
    ///
    /// With a timeout, the engine also receives a [`RenderOptions::deadline`].
    /// Engines that honor it (such as [`CommandEngine`](crate::CommandEngine))
    /// stop their work; others are abandoned and their late result is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Engine`] when the engine rejects the source,
    /// [`RenderError::UnrecognizedResult`] for an unknown result shape,
    /// [`RenderError::TimedOut`] when the timeout elapses and
    /// [`RenderError::Aborted`] if the engine panicked.
    pub async fn render(&self, source: String, mut options: RenderOptions) -> Result<String, RenderError> {
        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        options.deadline = deadline;

        let engine = Arc::clone(&self.engine);
        let task = tokio::task::spawn_blocking(move || engine.render(&source, &options));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_elapsed| RenderError::TimedOut(limit))?,
            None => task.await,
        };

        let raw = joined
            .map_err(|_join_error| RenderError::Aborted)?
            .map_err(|error| match (self.timeout, deadline) {
                (Some(limit), Some(at)) if Instant::now() >= at => RenderError::TimedOut(limit),
                _ => RenderError::Engine(error),
            })?;
        normalize(raw)
    }
}

/// Extracts the stylesheet from any known result shape.
fn normalize(raw: RawRender) -> Result<String, RenderError> {
    match raw {
        RawRender::Text(css) | RawRender::Structured(Value::String(css)) => Ok(css),
        RawRender::Structured(Value::Object(mut map)) => match map.remove("css") {
            Some(Value::String(css)) => Ok(css),
            _ => Err(RenderError::UnrecognizedResult(
                "object without a string `css` field",
            )),
        },
        RawRender::Structured(other) => Err(RenderError::UnrecognizedResult(describe(&other))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
