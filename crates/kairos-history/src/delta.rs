//! Delta engine - folds calendar events into a state
//!
//! Replay order:
//! 1. Timepoints ascending (only materialized ones are visited)
//! 2. Phases ascending within a timepoint
//! 3. Records of one phase: insertion order when sequential, unordered when
//!    dispatched to workers
//!
//! In phase-parallel mode each phase batch runs inside its own fork-join
//! scope, so phase k has fully completed before phase k+1 is dispatched.

use std::sync::Arc;

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace, warn};

use kairos_core::{Event, HistoryConfig, HistoryError, HistoryResult, TimeRange};

use crate::{Calendar, CalendarEntry};

/// Delta engine with a cache of worker pools keyed by width
pub struct DeltaEngine {
    config: HistoryConfig,
    /// (width, pool), least recently built first
    pools: Mutex<Vec<(usize, Arc<ThreadPool>)>>,
}

impl DeltaEngine {
    pub fn new(config: HistoryConfig) -> Self {
        DeltaEngine {
            config,
            pools: Mutex::new(Vec::new()),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Apply every runnable record of one entry on the calling thread
    pub fn apply_entry<S>(entry: &CalendarEntry<S>, state: &S) -> usize {
        let mut applied = 0;
        for record in entry.iter().filter(|r| r.is_runnable()) {
            record.event().apply(state);
            applied += 1;
        }
        applied
    }

    /// Sequential replay over a closed range
    pub fn apply_sequential<S>(calendar: &Calendar<S>, range: TimeRange, state: &S) -> usize {
        calendar
            .range(range)
            .map(|(_, entry)| Self::apply_entry(entry, state))
            .sum()
    }

    /// Replay over a closed range, dispatching each phase batch onto at most
    /// `max_concurrency` workers. Zero means sequential.
    ///
    /// The pool is sized to the widest runnable phase batch in the range, so
    /// a range whose batches hold at most one runnable record never starts
    /// worker threads.
    pub fn apply<S: Sync>(
        &self,
        calendar: &Calendar<S>,
        range: TimeRange,
        state: &S,
        max_concurrency: usize,
    ) -> usize {
        // No more workers than the widest batch can keep busy
        let width = max_concurrency.min(Self::widest_batch(calendar, range));
        if width <= 1 {
            return Self::apply_sequential(calendar, range, state);
        }

        let pool = match self.pool(width) {
            Ok(pool) => pool,
            Err(err) => {
                warn!(%err, width, "falling back to sequential replay");
                return Self::apply_sequential(calendar, range, state);
            }
        };

        let mut applied = 0;
        for (timepoint, entry) in calendar.range(range) {
            for (phase, batch) in entry.phase_batches() {
                let runnable: Vec<&dyn Event<S>> = batch
                    .iter()
                    .filter(|r| r.is_runnable())
                    .map(|r| r.event())
                    .collect();

                match runnable.as_slice() {
                    [] => continue,
                    [single] => single.apply(state),
                    events => pool.scope(|scope| {
                        for &event in events {
                            scope.spawn(move |_| event.apply(state));
                        }
                    }),
                }

                trace!(timepoint, phase, events = runnable.len(), "phase batch applied");
                applied += runnable.len();
            }
        }
        applied
    }

    /// Largest number of runnable records sharing one phase within `range`
    pub fn widest_batch<S>(calendar: &Calendar<S>, range: TimeRange) -> usize {
        calendar
            .range(range)
            .flat_map(|(_, entry)| entry.phase_batches())
            .map(|(_, batch)| batch.iter().filter(|r| r.is_runnable()).count())
            .max()
            .unwrap_or(0)
    }

    /// Get or build the pool for a given width
    fn pool(&self, width: usize) -> HistoryResult<Arc<ThreadPool>> {
        let mut pools = self.pools.lock();
        if let Some(pos) = pools.iter().position(|(w, _)| *w == width) {
            return Ok(pools[pos].1.clone());
        }

        let config = self.config.clone();
        let mut builder = ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(move |index| config.worker_thread_name(index));
        if let Some(stack_size) = self.config.worker_stack_size {
            builder = builder.stack_size(stack_size);
        }
        let pool = Arc::new(
            builder
                .build()
                .map_err(|e| HistoryError::WorkerPool(e.to_string()))?,
        );

        if pools.len() >= self.config.max_cached_pools.max(1) {
            let (evicted, _) = pools.remove(0);
            debug!(width = evicted, "phase worker pool evicted");
        }
        pools.push((width, pool.clone()));
        debug!(width, "phase worker pool started");
        Ok(pool)
    }

    /// Number of worker pools currently cached
    pub fn cached_pools(&self) -> usize {
        self.pools.lock().len()
    }

    /// Thread counts of the cached pools, least recently built first
    pub fn cached_pool_widths(&self) -> Vec<usize> {
        self.pools
            .lock()
            .iter()
            .map(|(_, pool)| pool.current_num_threads())
            .collect()
    }
}

impl Default for DeltaEngine {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl std::fmt::Debug for DeltaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaEngine")
            .field("config", &self.config)
            .field("cached_pools", &self.cached_pools())
            .finish()
    }
}
