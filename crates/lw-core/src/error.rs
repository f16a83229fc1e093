//! Error types for the lw-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration loading
//! and validation failures. All of them are fatal at startup: they are
//! surfaced before any compilation is attempted.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use lw_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("./styles"));
/// assert!(error.to_string().contains("./styles"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist or is a directory.
    #[error("config file {0} does not exist")]
    ConfigFileNotFound(Utf8PathBuf),

    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// The styles directory does not exist.
    #[error("styles directory {0} does not exist")]
    MissingDirectory(Utf8PathBuf),

    /// The styles path exists but is not a directory.
    #[error("styles path {0} is not a directory")]
    NotADirectory(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// A compile mapping is unusable.
    #[error("invalid compile mapping '{mapping}': {reason}")]
    InvalidMapping {
        /// The mapping, rendered as `input -> output`.
        mapping: String,
        /// Explanation of why the mapping is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}
