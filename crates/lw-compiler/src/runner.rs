//! The compile task runner.
//!
//! Compiles exactly one [`CompileMapping`]:
//!
//! ```text
//! read <root>/<input> ──► CompilerAdapter::render ──► write <root>/<output>
//!        │                        │                          │
//!   ReadFailure             CompileFailure              WriteFailure
//! ```
//!
//! The source is decoded lossily, so only a missing or unreadable file is a
//! read failure. A failed step ends the task; nothing is written after a read or compile
//! failure, so the previous output stays in place. Failures are logged and
//! returned as a [`CompileOutcome`], never raised.

use camino::Utf8PathBuf;
use lw_core::{CompileGeneration, CompileMapping};
use tracing::{debug, info, warn};

use crate::adapter::{CompilerAdapter, RenderOptions};
use crate::error::CompileError;
use crate::outcome::CompileOutcome;

/// Runs single-mapping compiles against a root directory.
///
/// Cheap to clone; clones share the adapter.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    root: Utf8PathBuf,
    adapter: CompilerAdapter,
    minify: bool,
}

impl TaskRunner {
    /// Creates a runner for sources under `root`.
    pub fn new(root: impl Into<Utf8PathBuf>, adapter: CompilerAdapter, minify: bool) -> Self {
        Self {
            root: root.into(),
            adapter,
            minify,
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8PathBuf {
        &self.root
    }

    /// Compiles `mapping` and logs the result under `generation`.
    pub async fn run(&self, mapping: &CompileMapping, generation: CompileGeneration) -> CompileOutcome {
        debug!(
            generation = generation.get(),
            input = %mapping.input,
            output = %mapping.output,
            "Compiling"
        );
        match self.compile(mapping).await {
            Ok((output, bytes)) => {
                info!(
                    generation = generation.get(),
                    input = %mapping.input,
                    output = %mapping.output,
                    bytes,
                    "Compiled"
                );
                CompileOutcome::Success { output, bytes }
            }
            Err(error) => {
                warn!(
                    generation = generation.get(),
                    input = %mapping.input,
                    output = %mapping.output,
                    kind = ?error.kind(),
                    %error,
                    "Compile failed"
                );
                CompileOutcome::from(error)
            }
        }
    }

    async fn compile(&self, mapping: &CompileMapping) -> Result<(Utf8PathBuf, usize), CompileError> {
        let source_path = mapping.source_in(&self.root);
        let bytes = tokio::fs::read(&source_path)
            .await
            .map_err(|source| CompileError::Read {
                path: source_path.clone(),
                source,
            })?;
        // Stray non-UTF-8 bytes (legacy encodings in comments) are replaced.
        let source = String::from_utf8_lossy(&bytes).into_owned();

        // Imports resolve relative to the file being compiled.
        let search_dir = source_path
            .parent()
            .map_or_else(|| self.root.clone(), ToOwned::to_owned);
        let options = RenderOptions {
            search_paths: vec![search_dir],
            minify: self.minify,
            deadline: None,
        };

        let css = self
            .adapter
            .render(source, options)
            .await
            .map_err(|source| CompileError::Compile {
                path: source_path,
                source,
            })?;

        let output = mapping.output_in(&self.root);
        tokio::fs::write(&output, css.as_bytes())
            .await
            .map_err(|source| CompileError::Write {
                path: output.clone(),
                source,
            })?;

        Ok((output, css.len()))
    }
}
