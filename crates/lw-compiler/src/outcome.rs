//! Results of compile tasks and recompilation passes.

use camino::Utf8PathBuf;
use lw_core::{CompileGeneration, CompileMapping};

use crate::error::{CompileError, FailureKind};

/// The result of compiling one mapping.
#[derive(Debug)]
pub enum CompileOutcome {
    /// The output file was written.
    Success {
        /// The resolved output path.
        output: Utf8PathBuf,
        /// Number of bytes written.
        bytes: usize,
    },

    /// The source file could not be read; nothing was written.
    ReadFailure(CompileError),

    /// The compiler rejected the source; the previous output is untouched.
    CompileFailure(CompileError),

    /// Writing the output failed.
    WriteFailure(CompileError),
}

impl CompileOutcome {
    /// Returns `true` for [`CompileOutcome::Success`].
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&CompileError> {
        match self {
            Self::Success { .. } => None,
            Self::ReadFailure(e) | Self::CompileFailure(e) | Self::WriteFailure(e) => Some(e),
        }
    }

    /// Returns which step failed, if any.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error().map(CompileError::kind)
    }
}

impl From<CompileError> for CompileOutcome {
    fn from(error: CompileError) -> Self {
        match error.kind() {
            FailureKind::Read => Self::ReadFailure(error),
            FailureKind::Compile => Self::CompileFailure(error),
            FailureKind::Write => Self::WriteFailure(error),
        }
    }
}

/// One mapping's result within a pass.
#[derive(Debug)]
pub struct MappingReport {
    /// The generation the compile ran under.
    pub generation: CompileGeneration,
    /// The mapping that was compiled.
    pub mapping: CompileMapping,
    /// What happened.
    pub outcome: CompileOutcome,
}

/// Summary of one `run_all` call.
///
/// `reports` holds one entry per compile actually performed by this call,
/// in completion order. Re-runs performed on behalf of a coalesced trigger
/// appear here under that trigger's generation. Outputs that were already
/// being written when the pass started are counted in `coalesced` instead.
#[derive(Debug)]
pub struct PassSummary {
    /// The generation this pass started.
    pub generation: CompileGeneration,
    /// Per-compile results.
    pub reports: Vec<MappingReport>,
    /// Outputs handed over to an in-flight compile.
    pub coalesced: usize,
}

impl PassSummary {
    /// Number of successful compiles.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Number of failed compiles.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    /// Iterates over the failed compiles.
    pub fn failures(&self) -> impl Iterator<Item = &MappingReport> {
        self.reports.iter().filter(|r| !r.outcome.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn report(outcome: CompileOutcome) -> MappingReport {
        MappingReport {
            generation: CompileGeneration::new(1),
            mapping: CompileMapping::default(),
            outcome,
        }
    }

    #[test]
    fn test_outcome_from_error() {
        let outcome = CompileOutcome::from(CompileError::Write {
            path: Utf8PathBuf::from("out.css"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        });
        assert!(matches!(outcome, CompileOutcome::WriteFailure(_)));
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Write));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_pass_summary_counts() {
        let summary = PassSummary {
            generation: CompileGeneration::new(1),
            reports: vec![
                report(CompileOutcome::Success {
                    output: Utf8PathBuf::from("a.css"),
                    bytes: 3,
                }),
                report(CompileOutcome::from(CompileError::Read {
                    path: Utf8PathBuf::from("b.less"),
                    source: io::Error::new(io::ErrorKind::NotFound, "missing"),
                })),
            ],
            coalesced: 0,
        };

        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(
            summary.failures().next().and_then(|r| r.outcome.failure_kind()),
            Some(FailureKind::Read)
        );
    }
}
