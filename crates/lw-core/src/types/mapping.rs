//! Compile mappings.
//!
//! A [`CompileMapping`] pairs one style source file with the artifact it
//! compiles to. The ordered list of mappings forms the compile plan.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// One source-to-output compilation unit.
///
/// Both paths are relative to the configured root directory. The JSON keys
/// `input_less` and `output_css` are accepted as aliases for `input` and
/// `output`.
///
/// # Examples
///
/// ```
/// use lw_core::CompileMapping;
///
/// let mapping: CompileMapping = "main.less:css/main.css".parse().unwrap();
/// assert_eq!(mapping.input.as_str(), "main.less");
/// assert_eq!(mapping.output.as_str(), "css/main.css");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompileMapping {
    /// Path of the style source, relative to the root directory.
    #[serde(alias = "input_less")]
    pub input: Utf8PathBuf,

    /// Path of the generated artifact, relative to the root directory.
    #[serde(alias = "output_css")]
    pub output: Utf8PathBuf,
}

impl CompileMapping {
    /// Creates a mapping from an input and an output path.
    #[must_use]
    pub fn new(input: impl Into<Utf8PathBuf>, output: impl Into<Utf8PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Resolves the source path against `root`.
    #[inline]
    #[must_use]
    pub fn source_in(&self, root: &Utf8Path) -> Utf8PathBuf {
        root.join(&self.input)
    }

    /// Resolves the output path against `root`.
    #[inline]
    #[must_use]
    pub fn output_in(&self, root: &Utf8Path) -> Utf8PathBuf {
        root.join(&self.output)
    }
}

impl Default for CompileMapping {
    fn default() -> Self {
        Self::new("main.less", "compiled_styles.css")
    }
}

impl fmt::Display for CompileMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.input, self.output)
    }
}

/// Parses the `input:output` form used on the command line.
impl FromStr for CompileMapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(input), Some(output), None) if !input.is_empty() && !output.is_empty() => {
                Ok(Self::new(input, output))
            }
            _ => Err(format!("expected '<input>:<output>', got '{s}'")),
        }
    }
}
