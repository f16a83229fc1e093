//! The change watcher trigger loop.
//!
//! [`ChangeWatcher`] turns every qualifying [`FileEvent`] into exactly one
//! [`Orchestrator::run_all`] call. Passes are not serialized or debounced
//! here: a burst of N events starts N passes, and the orchestrator's
//! per-output slots coalesce the overlapping work.
//!
//! ```text
//!            event                         all passes reaped
//!   ┌──────┐ ────────────► ┌────────────┐ ──────────────────► ┌──────┐
//!   │ Idle │               │ Triggering │                     │ Idle │
//!   └──────┘               └────────────┘                     └──────┘
//!                             │  ▲ event (another pass)
//!                             └──┘
//! ```
//!
//! On cancellation the loop stops reading events and waits for passes
//! already started; a started pass always runs to completion.

use std::sync::Arc;

use lw_compiler::{Orchestrator, PassSummary};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::FileEvent;
use crate::watcher::FileWatcher;

/// Whether a recompile pass is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatcherState {
    /// Waiting for the next event.
    #[default]
    Idle,
    /// At least one pass is running.
    Triggering,
}

/// Counters reported when the trigger loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchReport {
    /// Qualifying events received.
    pub events: u64,
    /// Passes that ran to completion.
    pub passes_completed: u64,
    /// Failed compiles across all completed passes.
    pub failed_compiles: u64,
}

/// Drives the orchestrator from file events.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use lw_compiler::Orchestrator;
/// use lw_core::Config;
/// use lw_watcher::{style_filter, ChangeWatcher, FileWatcher};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default().validate()?;
/// let orchestrator = Arc::new(Orchestrator::from_config(&config));
/// let watcher = FileWatcher::new(&config.root_dir, style_filter(&config)).await?;
///
/// let token = CancellationToken::new();
/// let report = ChangeWatcher::new(orchestrator).run(watcher, token).await?;
/// println!("{} events", report.events);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChangeWatcher {
    orchestrator: Arc<Orchestrator>,
    passes: JoinSet<PassSummary>,
    state: WatcherState,
    report: WatchReport,
}

impl ChangeWatcher {
    /// Creates a trigger loop for `orchestrator`.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            passes: JoinSet::new(),
            state: WatcherState::Idle,
            report: WatchReport::default(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Returns the counters so far.
    #[must_use]
    pub fn report(&self) -> WatchReport {
        self.report
    }

    /// Runs the loop over a live [`FileWatcher`] until `token` is cancelled
    /// or the watcher stops, then shuts the watcher down.
    ///
    /// # Errors
    ///
    /// Returns the watcher's shutdown error, if any.
    pub async fn run(
        mut self,
        mut watcher: FileWatcher,
        token: CancellationToken,
    ) -> Result<WatchReport, crate::WatchError> {
        let report = self.drive(watcher.events(), &token).await;
        watcher.shutdown().await?;
        Ok(report)
    }

    /// Triggers one pass per received event until `token` is cancelled or
    /// the channel closes, then waits for in-flight passes.
    pub async fn drive(
        &mut self,
        events: &mut mpsc::Receiver<FileEvent>,
        token: &CancellationToken,
    ) -> WatchReport {
        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!("Stop requested");
                    break;
                }
                Some(joined) = self.passes.join_next(), if !self.passes.is_empty() => {
                    self.reap(joined);
                }
                event = events.recv() => match event {
                    Some(event) => self.trigger(&event),
                    None => {
                        warn!("File event stream ended");
                        break;
                    }
                },
            }
        }

        if !self.passes.is_empty() {
            info!(in_flight = self.passes.len(), "Waiting for running compiles");
        }
        while let Some(joined) = self.passes.join_next().await {
            self.reap(joined);
        }

        self.report
    }

    fn trigger(&mut self, event: &FileEvent) {
        self.report.events += 1;
        info!(path = %event.path, kind = %event.kind, "Change detected");

        let orchestrator = Arc::clone(&self.orchestrator);
        self.passes.spawn(async move { orchestrator.run_all().await });
        self.state = WatcherState::Triggering;
    }

    fn reap(&mut self, joined: Result<PassSummary, tokio::task::JoinError>) {
        match joined {
            Ok(summary) => {
                self.report.passes_completed += 1;
                self.report.failed_compiles += summary.failed() as u64;
                debug!(
                    generation = summary.generation.get(),
                    succeeded = summary.succeeded(),
                    failed = summary.failed(),
                    coalesced = summary.coalesced,
                    "Pass finished"
                );
            }
            Err(e) => error!(error = %e, "Recompile pass aborted"),
        }
        if self.passes.is_empty() {
            self.state = WatcherState::Idle;
        }
    }
}
