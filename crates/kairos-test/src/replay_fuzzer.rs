//! Replay Fuzzer - Randomized cross-checking of the replay paths
//!
//! Checks, for a random calendar with random removals:
//! - Cursor walk, sequential range replay, phase-parallel replay and state
//!   reconstruction all produce the same state
//! - All replay paths apply the same number of events
//! - Per-timepoint counts add up to the number of live events
//! - Every removed event was destroyed exactly once

use kairos_core::{Phase, Timepoint};
use kairos_history::{EventHandle, History};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::{Accumulator, DestroyTracker, Increment, Multiply};

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Timepoints drawn from `[0, timepoints)`
    pub timepoints: Timepoint,
    /// Phases drawn from `[0, phases)`
    pub phases: Phase,
    /// Number of events to schedule
    pub event_count: usize,
    /// Probability of unscheduling an event individually (0.0 - 1.0)
    pub unschedule_prob: f64,
    /// Probability of one additional range unschedule
    pub range_unschedule_prob: f64,
    /// Probability of an event being inert
    pub inert_prob: f64,
    /// Worker width for the parallel replay
    pub max_concurrency: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            timepoints: 50,
            phases: 4,
            event_count: 500,
            unschedule_prob: 0.1,
            range_unschedule_prob: 0.5,
            inert_prob: 0.05,
            max_concurrency: 4,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            timepoints: 10,
            phases: 3,
            event_count: 60,
            unschedule_prob: 0.1,
            range_unschedule_prob: 0.5,
            inert_prob: 0.1,
            max_concurrency: 2,
            seed: 42,
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            timepoints: 500,
            phases: 8,
            event_count: 10_000,
            unschedule_prob: 0.2,
            range_unschedule_prob: 0.8,
            inert_prob: 0.05,
            max_concurrency: 8,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Outcome of one fuzz run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FuzzReport {
    pub scheduled: usize,
    pub unscheduled: usize,
    pub live: usize,
    pub counted: usize,
    pub destroyed: usize,
    pub cursor_value: i64,
    pub sequential_value: i64,
    pub parallel_value: i64,
    pub reconstructed_value: i64,
    pub cursor_applied: usize,
    pub sequential_applied: usize,
    pub parallel_applied: usize,
}

impl FuzzReport {
    /// Check all replay paths agree and bookkeeping adds up
    pub fn is_consistent(&self) -> bool {
        self.cursor_value == self.sequential_value
            && self.sequential_value == self.parallel_value
            && self.parallel_value == self.reconstructed_value
            && self.cursor_applied == self.sequential_applied
            && self.sequential_applied == self.parallel_applied
            && self.counted == self.live
            && self.live + self.unscheduled == self.scheduled
            && self.destroyed == self.unscheduled
    }
}

/// Replay fuzzer
pub struct ReplayFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
    tracker: DestroyTracker,
    history: History<Accumulator>,
    handles: Vec<EventHandle>,
    unscheduled: usize,
}

impl ReplayFuzzer {
    /// Create a new fuzzer
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        ReplayFuzzer {
            config,
            rng,
            tracker: DestroyTracker::new(),
            history: History::new(),
            handles: Vec::new(),
            unscheduled: 0,
        }
    }

    /// Get the history under test
    pub fn history(&self) -> &History<Accumulator> {
        &self.history
    }

    /// Get the destroy tracker for scheduled events
    pub fn tracker(&self) -> &DestroyTracker {
        &self.tracker
    }

    /// Fill the calendar with random events
    ///
    /// Even phases only add and odd phases only multiply, so the events of a
    /// phase commute and parallel replay must match sequential replay exactly.
    pub fn populate(&mut self) {
        for _ in 0..self.config.event_count {
            let timepoint = self.rng.gen_range(0..self.config.timepoints.max(1));
            let phase = self.rng.gen_range(0..self.config.phases.max(1));

            let scheduled = if self.rng.gen_bool(self.config.inert_prob) {
                self.history.schedule(timepoint, phase, self.tracker.lifeline())
            } else if phase % 2 == 0 {
                let amount = self.rng.gen_range(-100..=100);
                self.history
                    .schedule(timepoint, phase, self.tracker.track(Increment(amount)))
            } else {
                let by = self.rng.gen_range(-3..=3);
                self.history
                    .schedule(timepoint, phase, self.tracker.track(Multiply(by)))
            };

            if let Ok(handle) = scheduled {
                self.handles.push(handle);
            }
        }
    }

    /// Randomly unschedule events individually and by range
    pub fn prune(&mut self) {
        let mut kept = Vec::with_capacity(self.handles.len());
        for handle in std::mem::take(&mut self.handles) {
            if self.rng.gen_bool(self.config.unschedule_prob) {
                self.history.unschedule(handle);
                self.unscheduled += 1;
            } else {
                kept.push(handle);
            }
        }

        if self.rng.gen_bool(self.config.range_unschedule_prob) {
            let upper = self.config.timepoints.max(1);
            let a = self.rng.gen_range(0..upper);
            let b = self.rng.gen_range(0..upper);
            let removed = self.history.unschedule_all(a.min(b), a.max(b));
            self.unscheduled += removed;
            kept.retain(|h| self.history.is_scheduled(h));
        }

        self.handles = kept;
    }

    /// Replay the calendar through every path and compare
    pub fn replay(&mut self, initial: i64) -> FuzzReport {
        let last = self.history.last_timepoint().unwrap_or(0);
        let baseline = Accumulator::new(initial);

        self.history.rewind();
        let walked = baseline.clone();
        let mut cursor_applied = 0;
        while self.history.current_timepoint() < last {
            cursor_applied += self.history.forwards(Some(&walked));
        }

        let sequential = baseline.clone();
        let sequential_applied = self.history.apply_range(0, last, &sequential);

        let parallel = baseline.clone();
        let parallel_applied =
            self.history
                .state_delta(0, last, &parallel, self.config.max_concurrency);

        let reconstructed = self.history.reconstruct_state(&baseline);

        let counted = (0..=last).map(|tp| self.history.count_events(tp)).sum();

        let report = FuzzReport {
            scheduled: self.handles.len() + self.unscheduled,
            unscheduled: self.unscheduled,
            live: self.history.len(),
            counted,
            destroyed: self.tracker.destroyed(),
            cursor_value: walked.value(),
            sequential_value: sequential.value(),
            parallel_value: parallel.value(),
            reconstructed_value: reconstructed.value(),
            cursor_applied,
            sequential_applied,
            parallel_applied,
        };
        debug!(seed = self.config.seed, ?report, "replay fuzz run");
        report
    }

    /// Populate, prune and replay
    pub fn run(&mut self, initial: i64) -> FuzzReport {
        self.populate();
        self.prune();
        self.replay(initial)
    }
}
