//! CLI entry point for less-watcher.
//!
//! Compiles the configured `.less` sources once, then watches the styles
//! directory and recompiles on every qualifying change.
//!
//! # Usage
//!
//! ```bash
//! # Watch ./styles/ using less-watcher.config.json if present
//! less-watcher
//!
//! # Explicit plan, unminified output
//! less-watcher --path=./assets --to-compile=main.less:main.css,header.less:header.css --compress=no
//!
//! # Compile once and exit
//! less-watcher --just-compile
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use color_eyre::eyre::WrapErr;
use lw_compiler::{Orchestrator, materialize_output_dirs};
use lw_core::{
    CompileMapping, Config, ConfigOverrides, ConfigSource, DEFAULT_CONFIG_FILE, WatchConfig,
    WatchEventKind,
};
use lw_watcher::{ChangeWatcher, FileWatcher, style_filter};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Watches a directory of LESS styles and recompiles them on change.
///
/// Settings come from the JSON config file, then from these flags.
#[derive(Debug, Parser)]
#[command(name = "less-watcher", version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file.
    ///
    /// Must exist when given. Defaults to `less-watcher.config.json` in the
    /// working directory, if present.
    #[arg(long, env = "LESS_WATCHER_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Directory of .less style files [default: ./styles/].
    #[arg(long)]
    path: Option<Utf8PathBuf>,

    /// Files to compile, as `input:output` pairs.
    ///
    /// Example: --to-compile=main.less:main.css,header.less:header.css
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    to_compile: Option<Vec<CompileMapping>>,

    /// Minify compiled output [default: yes].
    #[arg(
        long,
        value_name = "yes|no",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "yes",
        value_parser = parse_switch
    )]
    compress: Option<bool>,

    /// Log detected changes and compiles [default: yes].
    #[arg(
        long,
        value_name = "yes|no",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "yes",
        value_parser = parse_switch
    )]
    debug: Option<bool>,

    /// Event kinds that trigger a recompile [default: created,changed,removed].
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    events: Option<Vec<WatchEventKind>>,

    /// File extensions to watch [default: .less].
    ///
    /// Example: --extensions=.less,.lesscss
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Compile once and exit without watching.
    #[arg(long)]
    just_compile: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            path: self.path.clone(),
            to_compile: self.to_compile.clone(),
            compress: self.compress,
            debug: self.debug,
            events: self.events.clone(),
            extensions: self.extensions.clone(),
        }
    }
}

/// Parses a yes/no switch value, case-insensitively.
fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "y" | "yes" | "1" | "true" => Ok(true),
        "n" | "no" | "0" | "false" => Ok(false),
        "" => Err("empty value".to_owned()),
        other => Err(format!("expected yes or no, got '{other}'")),
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` if set. Otherwise `debug = false` keeps only errors,
/// and `debug = true` logs at `info`, or `debug` with `--verbose`.
fn init_tracing(debug: bool, verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match (debug, verbose) {
            (false, _) => "error",
            (true, false) => "info",
            (true, true) => "debug",
        };
        EnvFilter::new(format!("{level},notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Loads, merges and validates the configuration.
fn build_config(cli: &Cli) -> color_eyre::Result<(WatchConfig, ConfigSource)> {
    let (mut config, source) =
        Config::discover(cli.config.as_deref(), Utf8Path::new(DEFAULT_CONFIG_FILE))?;
    config.apply(cli.overrides());
    let validated = config.validate()?;
    Ok((validated, source))
}

/// Cancels `token` on Ctrl-C, or SIGTERM on unix.
async fn stop_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(error) => {
                warn!(%error, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received Ctrl-C, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C, shutting down");
    }

    token.cancel();
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments and settle the configuration
    let cli = Cli::parse();
    let (config, source) = build_config(&cli)?;

    // 3. Initialize tracing (the debug switch gates regular output)
    init_tracing(config.debug, cli.verbose, cli.no_color);
    match &source {
        ConfigSource::File(path) => info!(config = %path, "Loaded configuration"),
        ConfigSource::Defaults => warn!(
            file = DEFAULT_CONFIG_FILE,
            "Config file not found, using defaults"
        ),
    }

    // 4. Make sure every output directory exists
    materialize_output_dirs(&config.root_dir, &config.mappings)
        .wrap_err("cannot prepare output directories")?;

    // 5. Initial compile, so output is fresh before any change
    let orchestrator = Arc::new(Orchestrator::from_config(&config));
    let summary = orchestrator.run_all().await;
    info!(
        generation = summary.generation.get(),
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        "Initial compile finished"
    );

    if cli.just_compile {
        return Ok(());
    }

    // 6. Watch until stopped
    let watcher = FileWatcher::new(&config.root_dir, style_filter(&config))
        .await
        .wrap_err("cannot start watcher")?;
    info!(
        extensions = %config.extension_list(),
        events = %config.watch_events,
        path = %config.root_dir,
        "Started watcher"
    );

    let token = CancellationToken::new();
    tokio::spawn(stop_on_signal(token.clone()));

    let report = ChangeWatcher::new(orchestrator).run(watcher, token).await?;
    info!(
        events = report.events,
        passes = report.passes_completed,
        failed_compiles = report.failed_compiles,
        "Watcher stopped"
    );

    Ok(())
}
