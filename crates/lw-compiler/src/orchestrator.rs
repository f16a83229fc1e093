//! The recompile orchestrator.
//!
//! [`Orchestrator::run_all`] starts a new [`CompileGeneration`] and compiles
//! every configured mapping. Mappings are grouped into *slots* by resolved
//! output path; slots run concurrently, and mappings within one slot run in
//! configuration order.
//!
//! # Per-output serialization
//!
//! Each slot is a serialization token:
//!
//! ```text
//!                 claim() ─ Start
//!        ┌──────────────────────────────┐
//!        │                              ▼
//!     ┌──────┐                    ┌───────────────────┐  claim() ─ Coalesced
//!     │ Idle │                    │ Running { rerun } │◄──────── (rerun = newest)
//!     └──────┘                    └───────────────────┘
//!        ▲                              │
//!        └──────────────────────────────┘
//!              finish() with no rerun
//! ```
//!
//! A trigger that finds its slot running records its generation as the
//! pending rerun and returns. The worker that owns the slot does one more
//! run for the newest pending generation before going idle, so two writes
//! to the same output never overlap and the last source state always gets
//! compiled.

use std::sync::Arc;

use camino::Utf8PathBuf;
use futures_util::future::join_all;
use lw_core::{CompileGeneration, CompileMapping, GenerationCounter, WatchConfig};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, error, trace};

use crate::adapter::CompilerAdapter;
use crate::engine::CommandEngine;
use crate::outcome::{MappingReport, PassSummary};
use crate::runner::TaskRunner;

#[derive(Debug)]
enum SlotState {
    Idle,
    Running { rerun: Option<CompileGeneration> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Start,
    Coalesced,
}

/// The mappings that write one output path.
#[derive(Debug)]
struct OutputSlot {
    output: Utf8PathBuf,
    mappings: SmallVec<[CompileMapping; 1]>,
    state: Mutex<SlotState>,
}

impl OutputSlot {
    fn claim(&self, generation: CompileGeneration) -> Claim {
        let mut state = self.state.lock();
        match &mut *state {
            SlotState::Idle => {
                *state = SlotState::Running { rerun: None };
                Claim::Start
            }
            SlotState::Running { rerun } => {
                *rerun = Some(generation);
                Claim::Coalesced
            }
        }
    }

    /// Ends one run. Returns the generation to run again for, if a trigger
    /// was coalesced meanwhile; otherwise the slot goes idle.
    fn finish(&self) -> Option<CompileGeneration> {
        let mut state = self.state.lock();
        let next = match &mut *state {
            SlotState::Running { rerun } => rerun.take(),
            SlotState::Idle => None,
        };
        if next.is_none() {
            *state = SlotState::Idle;
        }
        next
    }
}

/// Compiles the full mapping plan once per trigger.
///
/// Owns the generation counter. Shared behind an `Arc` between the startup
/// pass and the change watcher.
#[derive(Debug)]
pub struct Orchestrator {
    runner: TaskRunner,
    slots: Vec<Arc<OutputSlot>>,
    generation: GenerationCounter,
}

impl Orchestrator {
    /// Creates an orchestrator for `mappings` under the runner's root.
    ///
    /// Mappings that resolve to the same output path share a slot.
    #[must_use]
    pub fn new(runner: TaskRunner, mappings: &[CompileMapping]) -> Self {
        let mut slots: Vec<OutputSlot> = Vec::new();
        let mut by_output: FxHashMap<Utf8PathBuf, usize> = FxHashMap::default();

        for mapping in mappings {
            let output = mapping.output_in(runner.root());
            match by_output.get(&output) {
                Some(&index) => slots[index].mappings.push(mapping.clone()),
                None => {
                    by_output.insert(output.clone(), slots.len());
                    slots.push(OutputSlot {
                        output,
                        mappings: smallvec::smallvec![mapping.clone()],
                        state: Mutex::new(SlotState::Idle),
                    });
                }
            }
        }

        Self {
            runner,
            slots: slots.into_iter().map(Arc::new).collect(),
            generation: GenerationCounter::new(),
        }
    }

    /// Creates an orchestrator backed by the configured compiler command.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        let adapter = CompilerAdapter::new(CommandEngine::from_config(&config.compiler))
            .with_timeout(config.compiler.timeout());
        let runner = TaskRunner::new(config.root_dir.clone(), adapter, config.minify);
        Self::new(runner, &config.mappings)
    }

    /// Returns the most recently started generation.
    #[must_use]
    pub fn generation(&self) -> CompileGeneration {
        self.generation.current()
    }

    /// Returns the number of configured mappings.
    #[must_use]
    pub fn mapping_count(&self) -> usize {
        self.slots.iter().map(|slot| slot.mappings.len()).sum()
    }

    /// Returns the number of distinct output paths.
    #[must_use]
    pub fn output_count(&self) -> usize {
        self.slots.len()
    }

    /// Starts a new generation and compiles every mapping.
    ///
    /// Failures are isolated per mapping and reported in the summary; this
    /// never fails as a whole. Slot work runs on spawned tasks, so it
    /// completes even if the returned future is dropped.
    pub async fn run_all(&self) -> PassSummary {
        let generation = self.generation.advance();
        debug!(generation = generation.get(), outputs = self.slots.len(), "Starting pass");

        let mut coalesced = 0;
        let mut workers = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            match slot.claim(generation) {
                Claim::Start => {
                    workers.push(tokio::spawn(drive_slot(
                        self.runner.clone(),
                        Arc::clone(slot),
                        generation,
                    )));
                }
                Claim::Coalesced => {
                    trace!(
                        generation = generation.get(),
                        output = %slot.output,
                        "Output busy, coalesced into running compile"
                    );
                    coalesced += 1;
                }
            }
        }

        let mut reports = Vec::with_capacity(self.mapping_count());
        for joined in join_all(workers).await {
            match joined {
                Ok(slot_reports) => reports.extend(slot_reports),
                Err(e) => error!(generation = generation.get(), error = %e, "Compile task aborted"),
            }
        }

        PassSummary {
            generation,
            reports,
            coalesced,
        }
    }
}

async fn drive_slot(
    runner: TaskRunner,
    slot: Arc<OutputSlot>,
    mut generation: CompileGeneration,
) -> Vec<MappingReport> {
    let mut reports = Vec::with_capacity(slot.mappings.len());
    loop {
        for mapping in &slot.mappings {
            let outcome = runner.run(mapping, generation).await;
            reports.push(MappingReport {
                generation,
                mapping: mapping.clone(),
                outcome,
            });
        }
        match slot.finish() {
            Some(next) => {
                debug!(
                    generation = next.get(),
                    output = %slot.output,
                    "Recompiling for coalesced trigger"
                );
                generation = next;
            }
            None => break,
        }
    }
    reports
}
