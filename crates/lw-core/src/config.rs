//! Configuration structures for the less-watcher tool.
//!
//! Configuration is layered: built-in defaults, then an optional JSON file,
//! then command-line overrides. The merged [`Config`] is validated once at
//! startup into a [`WatchConfig`], which the compile pipeline and the
//! watcher own for their lifetime and never mutate.
//!
//! - [`Config`] - Raw settings as written in `less-watcher.config.json`
//! - [`ConfigOverrides`] - Values supplied on the command line
//! - [`CompilerConfig`] - How the external style compiler is invoked
//! - [`WatchConfig`] - The validated, finalized configuration
//!
//! # Examples
//!
//! ```
//! use lw_core::Config;
//!
//! let json = r#"{"path": "./assets", "extensions": [".less", ".lesscss"]}"#;
//! let config: Config = serde_json::from_str(json).unwrap();
//! assert_eq!(config.path, "./assets");
//! assert!(config.compress); // defaults fill the rest
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ConfigError;
use crate::types::{CompileMapping, EventKindSet, WatchEventKind};

/// Name of the config file looked up in the working directory when no
/// explicit config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "less-watcher.config.json";

/// Shape of the compiler's standard output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Standard output is the generated stylesheet.
    #[default]
    Text,

    /// Standard output is a JSON document carrying the stylesheet in `css`.
    Json,
}

/// Settings for the external style compiler.
///
/// # Examples
///
/// ```
/// use lw_core::{CompilerConfig, OutputFormat};
///
/// let config = CompilerConfig::default();
/// assert_eq!(config.program, "lessc");
/// assert_eq!(config.format, OutputFormat::Text);
/// assert!(config.timeout().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Program to run, looked up on `PATH` when not a path.
    pub program: String,

    /// Extra arguments placed before the generated ones.
    pub args: Vec<String>,

    /// How to interpret the program's standard output.
    pub format: OutputFormat,

    /// Upper bound for a single compile, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl CompilerConfig {
    /// Returns the compile timeout, if one is configured.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "lessc".to_owned(),
            args: Vec::new(),
            format: OutputFormat::Text,
            timeout_ms: None,
        }
    }
}

/// Where the settings were loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Settings came from this JSON file.
    File(Utf8PathBuf),

    /// No config file was found; built-in defaults were used.
    Defaults,
}

/// Raw, unvalidated settings.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to change.
///
/// # Examples
///
/// ```
/// use lw_core::Config;
///
/// let config = Config::default();
/// assert_eq!(config.path, "./styles/");
/// assert_eq!(config.to_compile.len(), 1);
/// assert_eq!(config.events.len(), 3);
/// assert_eq!(config.extensions, vec![".less"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory of the style sources.
    pub path: Utf8PathBuf,

    /// Ordered compile plan.
    pub to_compile: Vec<CompileMapping>,

    /// Ask the compiler for minified output.
    pub compress: bool,

    /// Emit change and compile log messages.
    pub debug: bool,

    /// Filesystem event kinds that trigger a recompile.
    pub events: Vec<WatchEventKind>,

    /// File extensions (with leading dot) that qualify an event.
    pub extensions: Vec<String>,

    /// External compiler settings.
    pub compiler: CompilerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from("./styles/"),
            to_compile: vec![CompileMapping::default()],
            compress: true,
            debug: true,
            events: WatchEventKind::ALL.to_vec(),
            extensions: vec![".less".to_owned()],
            compiler: CompilerConfig::default(),
        }
    }
}

/// Values supplied on the command line. `None` leaves the setting untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replaces [`Config::path`].
    pub path: Option<Utf8PathBuf>,
    /// Replaces [`Config::to_compile`].
    pub to_compile: Option<Vec<CompileMapping>>,
    /// Replaces [`Config::compress`].
    pub compress: Option<bool>,
    /// Replaces [`Config::debug`].
    pub debug: Option<bool>,
    /// Replaces [`Config::events`].
    pub events: Option<Vec<WatchEventKind>>,
    /// Replaces [`Config::extensions`].
    pub extensions: Option<Vec<String>>,
}

impl Config {
    /// Loads settings from a JSON file, filling missing keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigFileNotFound`] if `path` is missing or is
    /// a directory, [`ConfigError::Io`] if it cannot be read and
    /// [`ConfigError::Parse`] if it is not valid JSON of the right shape.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::ConfigFileNotFound(path.to_owned()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Finds and loads the settings.
    ///
    /// An `explicit` path must exist. Without one, `fallback` is loaded when
    /// it is an existing file, otherwise the built-in defaults are returned.
    pub fn discover(
        explicit: Option<&Utf8Path>,
        fallback: &Utf8Path,
    ) -> Result<(Self, ConfigSource), ConfigError> {
        match explicit {
            Some(path) => Ok((Self::from_file(path)?, ConfigSource::File(path.to_owned()))),
            None if fallback.is_file() => Ok((
                Self::from_file(fallback)?,
                ConfigSource::File(fallback.to_owned()),
            )),
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// Applies command-line overrides on top of the loaded settings.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            path,
            to_compile,
            compress,
            debug,
            events,
            extensions,
        } = overrides;

        if let Some(path) = path {
            self.path = path;
        }
        if let Some(to_compile) = to_compile {
            self.to_compile = to_compile;
        }
        if let Some(compress) = compress {
            self.compress = compress;
        }
        if let Some(debug) = debug {
            self.debug = debug;
        }
        if let Some(events) = events {
            self.events = events;
        }
        if let Some(extensions) = extensions {
            self.extensions = extensions;
        }
    }

    /// Validates the settings and produces the finalized [`WatchConfig`].
    ///
    /// The root directory is canonicalized, so it is absolute in the result.
    /// Duplicate extensions and events are collapsed.
    ///
    /// # Errors
    ///
    /// Returns the first problem found; see [`ConfigError`].
    pub fn validate(&self) -> Result<WatchConfig, ConfigError> {
        let root_dir = validate_root(&self.path)?;

        for mapping in &self.to_compile {
            validate_mapping(mapping)?;
        }

        if self.events.is_empty() {
            return Err(ConfigError::invalid_option(
                "events",
                "at least one event kind is required",
            ));
        }

        if self.extensions.is_empty() {
            return Err(ConfigError::invalid_option(
                "extensions",
                "at least one extension is required",
            ));
        }
        let mut extensions: SmallVec<[String; 4]> = SmallVec::new();
        for ext in &self.extensions {
            // Events match on the last extension only, so `.min.less` could never fire.
            let valid = ext
                .strip_prefix('.')
                .is_some_and(|rest| !rest.is_empty() && !rest.contains(['.', '/', '\\']));
            if !valid {
                return Err(ConfigError::invalid_option(
                    "extensions",
                    format!("'{ext}' must be a single leading-dot extension such as '.less'"),
                ));
            }
            if !extensions.contains(ext) {
                extensions.push(ext.clone());
            }
        }

        if self.compiler.program.trim().is_empty() {
            return Err(ConfigError::invalid_option(
                "compiler.program",
                "must not be empty",
            ));
        }
        if self.compiler.timeout_ms == Some(0) {
            return Err(ConfigError::invalid_option(
                "compiler.timeout_ms",
                "must be greater than zero",
            ));
        }

        Ok(WatchConfig {
            root_dir,
            mappings: self.to_compile.clone(),
            minify: self.compress,
            extensions,
            watch_events: self.events.iter().copied().collect(),
            debug: self.debug,
            compiler: self.compiler.clone(),
        })
    }
}

fn validate_root(path: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    if path.as_str().is_empty() {
        return Err(ConfigError::InvalidPath {
            path: path.to_owned(),
            reason: "path is empty".to_owned(),
        });
    }
    if !path.exists() {
        return Err(ConfigError::MissingDirectory(path.to_owned()));
    }
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory(path.to_owned()));
    }
    path.canonicalize_utf8()
        .map_err(|e| ConfigError::InvalidPath {
            path: path.to_owned(),
            reason: e.to_string(),
        })
}

fn validate_mapping(mapping: &CompileMapping) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidMapping {
        mapping: mapping.to_string(),
        reason: reason.to_owned(),
    };

    if mapping.input.as_str().is_empty() || mapping.output.as_str().is_empty() {
        return Err(invalid("input and output must not be empty"));
    }
    if mapping.input.is_absolute() || mapping.output.is_absolute() {
        return Err(invalid("paths must be relative to the styles directory"));
    }
    if mapping.output.file_name().is_none() {
        return Err(invalid("output must name a file"));
    }
    Ok(())
}

/// The validated configuration handed to the compile pipeline and watcher.
///
/// Built by [`Config::validate`]; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Absolute root directory of the style sources.
    pub root_dir: Utf8PathBuf,

    /// Ordered compile plan.
    pub mappings: Vec<CompileMapping>,

    /// Request minified output from the compiler.
    pub minify: bool,

    /// Leading-dot extensions that qualify an event, without duplicates.
    pub extensions: SmallVec<[String; 4]>,

    /// Event kinds that trigger a recompile.
    pub watch_events: EventKindSet,

    /// Emit change and compile log messages.
    pub debug: bool,

    /// External compiler settings.
    pub compiler: CompilerConfig,
}

impl WatchConfig {
    /// Returns the extensions joined for display, e.g. `.less, .lesscss`.
    #[must_use]
    pub fn extension_list(&self) -> String {
        self.extensions.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        (dir, path)
    }

    fn config_at(path: &Utf8Path) -> Config {
        Config {
            path: path.to_owned(),
            ..Config::default()
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.path, "./styles/");
        assert_eq!(
            config.to_compile,
            vec![CompileMapping::new("main.less", "compiled_styles.css")]
        );
        assert!(config.compress);
        assert!(config.debug);
        assert_eq!(
            config.events,
            vec![
                WatchEventKind::Created,
                WatchEventKind::Changed,
                WatchEventKind::Removed
            ]
        );
        assert_eq!(config.extensions, vec![".less"]);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{
            "path": "./assets",
            "to_compile": [{"input_less": "site.less", "output_css": "css/site.css"}],
            "debug": false
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.path, "./assets");
        assert_eq!(
            config.to_compile,
            vec![CompileMapping::new("site.less", "css/site.css")]
        );
        assert!(!config.debug);
        assert!(config.compress);
        assert_eq!(config.compiler, CompilerConfig::default());
    }

    #[test]
    fn test_config_deserialize_rejects_unknown_event() {
        let json = r#"{"events": ["created", "renamed"]}"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_compiler_config_deserialize() {
        let json = r#"{"program": "node", "args": ["render.js"], "format": "json", "timeout_ms": 5000}"#;
        let config: CompilerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.program, "node");
        assert_eq!(config.args, vec!["render.js"]);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply(ConfigOverrides {
            path: Some(Utf8PathBuf::from("./other")),
            compress: Some(false),
            extensions: Some(vec![".lesscss".to_owned()]),
            ..ConfigOverrides::default()
        });

        assert_eq!(config.path, "./other");
        assert!(!config.compress);
        assert_eq!(config.extensions, vec![".lesscss"]);
        // Untouched settings keep their values
        assert!(config.debug);
        assert_eq!(config.to_compile.len(), 1);
    }

    #[test]
    fn test_discover_uses_defaults_without_file() {
        let (_dir, root) = temp_root();
        let (config, source) = Config::discover(None, &root.join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_discover_loads_fallback_file() {
        let (_dir, root) = temp_root();
        let file = root.join(DEFAULT_CONFIG_FILE);
        fs::write(&file, r#"{"compress": false}"#).unwrap();

        let (config, source) = Config::discover(None, &file).unwrap();
        assert_eq!(source, ConfigSource::File(file));
        assert!(!config.compress);
    }

    #[test]
    fn test_discover_explicit_missing_file_fails() {
        let (_dir, root) = temp_root();
        let missing = root.join("nope.json");
        let result = Config::discover(Some(&missing), &root.join(DEFAULT_CONFIG_FILE));
        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound(p)) if p == missing));
    }

    #[test]
    fn test_from_file_rejects_directory() {
        let (_dir, root) = temp_root();
        assert!(matches!(
            Config::from_file(&root),
            Err(ConfigError::ConfigFileNotFound(_))
        ));
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let (_dir, root) = temp_root();
        let file = root.join("broken.json");
        fs::write(&file, "{ not json").unwrap();
        assert!(matches!(Config::from_file(&file), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_produces_absolute_root() {
        let (_dir, root) = temp_root();
        let config = config_at(&root).validate().unwrap();

        assert!(config.root_dir.is_absolute());
        assert!(config.minify);
        assert!(config.debug);
        assert_eq!(config.watch_events, EventKindSet::all());
        assert_eq!(config.extension_list(), ".less");
    }

    #[test]
    fn test_validate_missing_directory() {
        let (_dir, root) = temp_root();
        let missing = root.join("styles");
        assert!(matches!(
            config_at(&missing).validate(),
            Err(ConfigError::MissingDirectory(p)) if p == missing
        ));
    }

    #[test]
    fn test_validate_not_a_directory() {
        let (_dir, root) = temp_root();
        let file = root.join("styles");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            config_at(&file).validate(),
            Err(ConfigError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_validate_empty_path() {
        assert!(matches!(
            config_at(Utf8Path::new("")).validate(),
            Err(ConfigError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_extension_without_dot() {
        let (_dir, root) = temp_root();
        let mut config = config_at(&root);
        config.extensions = vec!["less".to_owned()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { option, .. }) if option == "extensions"
        ));
    }

    #[test]
    fn test_validate_rejects_multi_part_extension() {
        let (_dir, root) = temp_root();
        for ext in [".min.less", ".", "./less", ".less."] {
            let mut config = config_at(&root);
            config.extensions = vec![".less".to_owned(), ext.to_owned()];
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidOption { option, .. }) if option == "extensions"
                ),
                "{ext}"
            );
        }
    }

    #[test]
    fn test_validate_dedups_extensions_and_events() {
        let (_dir, root) = temp_root();
        let mut config = config_at(&root);
        config.extensions = vec![".less".to_owned(), ".lesscss".to_owned(), ".less".to_owned()];
        config.events = vec![WatchEventKind::Changed, WatchEventKind::Changed];

        let validated = config.validate().unwrap();
        assert_eq!(validated.extension_list(), ".less, .lesscss");
        assert_eq!(validated.watch_events.len(), 1);
        assert!(validated.watch_events.contains(WatchEventKind::Changed));
    }

    #[test]
    fn test_validate_rejects_empty_events() {
        let (_dir, root) = temp_root();
        let mut config = config_at(&root);
        config.events.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { option, .. }) if option == "events"
        ));
    }

    #[test]
    fn test_validate_rejects_absolute_mapping() {
        let (_dir, root) = temp_root();
        let mut config = config_at(&root);
        config.to_compile = vec![CompileMapping::new("main.less", "/tmp/out.css")];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMapping { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let (_dir, root) = temp_root();
        let mut config = config_at(&root);
        config.compiler.timeout_ms = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { option, .. }) if option == "compiler.timeout_ms"
        ));
    }

    #[test]
    fn test_validate_allows_empty_plan() {
        let (_dir, root) = temp_root();
        let mut config = config_at(&root);
        config.to_compile.clear();
        assert!(config.validate().unwrap().mappings.is_empty());
    }
}
