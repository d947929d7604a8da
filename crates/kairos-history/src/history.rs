//! History - owner of the calendar, its handles and the replay cursor

use std::fmt;

use tracing::debug;

use kairos_core::{
    is_timepoint_valid, Event, EventId, HistoryConfig, HistoryError, HistoryId, HistoryResult,
    Phase, TimeRange, Timepoint,
};

use crate::{Calendar, DeltaEngine, EventHandle, HandleRegistry, HistoryCursor};

/// Event calendar for a state of type `S`
///
/// Every scheduled event is owned by the history until it is unscheduled,
/// removed by a range unschedule, or the history is dropped. In all three
/// cases its `destroy` hook runs exactly once.
pub struct History<S> {
    id: HistoryId,
    calendar: Calendar<S>,
    registry: HandleRegistry,
    cursor: HistoryCursor,
    delta: DeltaEngine,
}

impl<S> History<S> {
    /// Create an empty history with default configuration
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// Create an empty history with custom configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        let id = HistoryId::next();
        History {
            id,
            calendar: Calendar::new(),
            registry: HandleRegistry::new(id),
            cursor: HistoryCursor::new(),
            delta: DeltaEngine::new(config),
        }
    }

    #[inline]
    pub fn id(&self) -> HistoryId {
        self.id
    }

    /// Get configuration
    pub fn config(&self) -> &HistoryConfig {
        self.delta.config()
    }

    /// Get read access to the calendar
    pub fn calendar(&self) -> &Calendar<S> {
        &self.calendar
    }

    // ---------------------------------------------------------------------
    // Scheduling
    // ---------------------------------------------------------------------

    /// Schedule an event at `timepoint`, ordered by `phase` within it
    ///
    /// A negative timepoint is rejected and the event is dropped without its
    /// destroy hook running, since it was never scheduled.
    pub fn schedule<E>(
        &mut self,
        timepoint: Timepoint,
        phase: Phase,
        event: E,
    ) -> HistoryResult<EventHandle>
    where
        E: Event<S> + 'static,
    {
        self.schedule_boxed(timepoint, phase, Box::new(event))
    }

    /// Schedule an already boxed event
    pub fn schedule_boxed(
        &mut self,
        timepoint: Timepoint,
        phase: Phase,
        event: Box<dyn Event<S>>,
    ) -> HistoryResult<EventHandle> {
        if !is_timepoint_valid(timepoint) {
            return Err(HistoryError::InvalidTimepoint(timepoint));
        }

        let handle = self.registry.issue(timepoint);
        debug!(
            history = %self.id,
            timepoint,
            phase,
            event = %handle.event_id(),
            kind = event.name(),
            "event scheduled"
        );
        self.calendar.insert(
            timepoint,
            crate::EventRecord::new(handle.event_id(), phase, event),
        );
        Ok(handle)
    }

    /// Unschedule an event, running its destroy hook
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by another history or its event was
    /// already removed by [`History::unschedule_all`]. Presenting such a
    /// handle is a programming error.
    pub fn unschedule(&mut self, handle: EventHandle) {
        if let Err(err) = self.try_unschedule(handle) {
            panic!("invalid event handle: {err}");
        }
    }

    /// Unschedule an event, reporting an invalid handle as an error
    pub fn try_unschedule(&mut self, handle: EventHandle) -> HistoryResult<()> {
        self.registry.validate(&handle)?;

        let (timepoint, event) = (handle.timepoint(), handle.event_id());
        self.registry.release(handle);
        self.destroy_record(timepoint, event);
        debug!(history = %self.id, timepoint, %event, "event unscheduled");
        Ok(())
    }

    /// Unschedule every event in the closed range `[from, to]`
    ///
    /// Returns the number of events removed; zero for negative bounds or
    /// `to < from`. Handles of removed events become stale.
    pub fn unschedule_all(&mut self, from: Timepoint, to: Timepoint) -> usize {
        let Some(range) = TimeRange::checked(from, to) else {
            return 0;
        };

        let doomed = self.registry.take_range(range);
        for (event, timepoint) in &doomed {
            self.destroy_record(*timepoint, *event);
        }
        debug!(history = %self.id, %range, count = doomed.len(), "range unscheduled");
        doomed.len()
    }

    fn destroy_record(&mut self, timepoint: Timepoint, event: EventId) {
        let record = self.calendar.remove(timepoint, event);
        debug_assert!(record.is_some(), "registry and calendar out of sync");
        if let Some(record) = record {
            record.destroy();
        }
    }

    /// Check if a handle still names a live event of this history
    pub fn is_scheduled(&self, handle: &EventHandle) -> bool {
        self.registry.validate(handle).is_ok()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Number of events at a timepoint, inert ones included
    pub fn count_events(&self, timepoint: Timepoint) -> usize {
        if !is_timepoint_valid(timepoint) {
            return 0;
        }
        self.calendar.count(timepoint)
    }

    /// Iterate the events at a timepoint in phase order
    pub fn events(&self, timepoint: Timepoint) -> impl Iterator<Item = &dyn Event<S>> + '_ {
        self.calendar
            .entry(timepoint)
            .into_iter()
            .flat_map(|entry| entry.iter().map(|r| r.event()))
    }

    /// Append the events at a timepoint to `out` in phase order
    ///
    /// Returns the number appended, which equals `count_events(timepoint)`.
    pub fn get_events<'a>(&'a self, timepoint: Timepoint, out: &mut Vec<&'a dyn Event<S>>) -> usize {
        let before = out.len();
        out.extend(self.events(timepoint));
        out.len() - before
    }

    /// Total number of scheduled events
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check if nothing is scheduled
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Number of timepoints holding at least one event
    pub fn timepoint_count(&self) -> usize {
        self.calendar.timepoint_count()
    }

    /// Iterate timepoints holding events, ascending
    pub fn timepoints(&self) -> impl Iterator<Item = Timepoint> + '_ {
        self.calendar.timepoints()
    }

    pub fn first_timepoint(&self) -> Option<Timepoint> {
        self.calendar.first_timepoint()
    }

    pub fn last_timepoint(&self) -> Option<Timepoint> {
        self.calendar.last_timepoint()
    }

    // ---------------------------------------------------------------------
    // Replay
    // ---------------------------------------------------------------------

    /// Sequentially apply every event in `[from, to]` to `state`
    ///
    /// Returns the number of events applied; zero for negative bounds or
    /// `to < from`.
    pub fn apply_range(&self, from: Timepoint, to: Timepoint, state: &S) -> usize {
        match TimeRange::checked(from, to) {
            Some(range) => DeltaEngine::apply_sequential(&self.calendar, range, state),
            None => 0,
        }
    }

    // ---------------------------------------------------------------------
    // Cursor
    // ---------------------------------------------------------------------

    /// Current cursor position, `INVALID_TIMEPOINT` before the first step
    pub fn current_timepoint(&self) -> Timepoint {
        self.cursor.current()
    }

    pub fn is_timepoint_valid(&self, timepoint: Timepoint) -> bool {
        is_timepoint_valid(timepoint)
    }

    /// Advance the cursor by one timepoint and apply its events to `state`
    ///
    /// With `None` the cursor still moves but nothing is applied. Returns the
    /// number of events applied.
    pub fn forwards(&mut self, state: Option<&S>) -> usize {
        let timepoint = self.cursor.advance();
        let applied = match (state, self.calendar.entry(timepoint)) {
            (Some(state), Some(entry)) => DeltaEngine::apply_entry(entry, state),
            _ => 0,
        };
        debug!(history = %self.id, timepoint, applied, "cursor forwards");
        applied
    }

    /// Move the cursor back by one timepoint without touching any state
    pub fn backwards(&mut self) -> Timepoint {
        let timepoint = self.cursor.retreat();
        debug!(history = %self.id, timepoint, "cursor backwards");
        timepoint
    }

    /// Return the cursor to before the first timepoint
    pub fn rewind(&mut self) {
        self.cursor.reset();
    }
}

impl<S: Sync> History<S> {
    /// Apply every event in `[from, to]` to `state`
    ///
    /// With `max_concurrency == 0` events run one at a time on the calling
    /// thread. Otherwise the events of each phase are dispatched onto up to
    /// `max_concurrency` worker threads, and a phase starts only after the
    /// previous one has fully completed. Events sharing a phase then run
    /// concurrently, so their `apply` must synchronize access to `state`.
    ///
    /// Returns the number of events applied; inert events are not counted.
    /// Zero for negative bounds or `to < from`.
    pub fn state_delta(
        &self,
        from: Timepoint,
        to: Timepoint,
        state: &S,
        max_concurrency: usize,
    ) -> usize {
        match TimeRange::checked(from, to) {
            Some(range) => self.delta.apply(&self.calendar, range, state, max_concurrency),
            None => 0,
        }
    }
}

impl<S: Clone> History<S> {
    /// Rebuild the state at the cursor by replaying `[0, current]` onto a
    /// copy of `initial`
    ///
    /// Equivalent to calling [`History::forwards`] from the start up to the
    /// current position. Before the first step this is a plain copy.
    pub fn reconstruct_state(&self, initial: &S) -> S {
        let state = initial.clone();
        if let Some(range) = TimeRange::checked(0, self.cursor.current()) {
            DeltaEngine::apply_sequential(&self.calendar, range, &state);
        }
        state
    }
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Drop for History<S> {
    fn drop(&mut self) {
        let remaining = self.registry.take_all();
        for (event, timepoint) in &remaining {
            self.destroy_record(*timepoint, *event);
        }
        debug!(history = %self.id, destroyed = remaining.len(), "history dropped");
    }
}

impl<S> fmt::Debug for History<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("id", &self.id)
            .field("events", &self.registry.len())
            .field("timepoints", &self.calendar.timepoint_count())
            .field("cursor", &self.cursor.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::{event_fn, Inert, INVALID_TIMEPOINT};
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Inert event that counts how often it was destroyed
    struct Lifeline {
        destroyed: Arc<AtomicUsize>,
    }

    impl<S> Event<S> for Lifeline {
        fn apply(&self, _state: &S) {}

        fn is_inert(&self) -> bool {
            true
        }

        fn destroy(self: Box<Self>) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Thin address of an event, for identity checks
    fn addr<T: ?Sized>(event: &T) -> *const () {
        event as *const T as *const ()
    }

    fn add(amount: f32) -> impl Event<Mutex<f32>> {
        event_fn(move |s: &Mutex<f32>| *s.lock() += amount)
    }

    fn mul(by: f32) -> impl Event<Mutex<f32>> {
        event_fn(move |s: &Mutex<f32>| *s.lock() *= by)
    }

    #[test]
    fn test_negative_timepoint_rejected() {
        let mut history: History<Mutex<f32>> = History::new();

        let err = history.schedule(-1, 0, add(1.0)).unwrap_err();
        assert_eq!(err, HistoryError::InvalidTimepoint(-1));
        assert_eq!(history.count_events(-1), 0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_events_added_and_removed() {
        let mut history: History<()> = History::new();

        let h0 = history.schedule(0, 0, Inert::new(0u64)).unwrap();
        let h1 = history.schedule(1, 0, Inert::new(1u64)).unwrap();
        let h11 = history.schedule(1, 0, Inert::new(11u64)).unwrap();

        assert_eq!(history.count_events(0), 1);
        assert_eq!(history.count_events(1), 2);
        assert_eq!(history.len(), 3);

        history.unschedule(h0);
        history.unschedule(h1);
        history.unschedule(h11);

        assert_eq!(history.count_events(0), 0);
        assert_eq!(history.count_events(1), 0);
        assert_eq!(history.timepoint_count(), 0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_unschedule_runs_destroy() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let mut history: History<()> = History::new();

        let h0 = history.schedule(0, 0, Lifeline { destroyed: destroyed.clone() }).unwrap();
        let h1 = history.schedule(1, 0, Lifeline { destroyed: destroyed.clone() }).unwrap();

        history.unschedule(h0);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        history.unschedule(h1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 2);

        drop(history);
        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_destroys_remaining_once() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let mut history: History<()> = History::new();

        let kept = history.schedule(0, 0, Lifeline { destroyed: destroyed.clone() }).unwrap();
        history.schedule(1, 0, Lifeline { destroyed: destroyed.clone() }).unwrap();
        history.schedule(1, 3, Lifeline { destroyed: destroyed.clone() }).unwrap();
        history.unschedule(kept);

        drop(history);
        assert_eq!(destroyed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_no_delta_without_events() {
        let history: History<Mutex<f32>> = History::new();
        let state = Mutex::new(123.0);

        assert_eq!(history.state_delta(0, 100, &state, 0), 0);
        assert_eq!(*state.lock(), 123.0);
    }

    #[test]
    fn test_delta_across_timepoints() {
        let mut history: History<Mutex<f32>> = History::new();
        history.schedule(0, 0, add(70.0)).unwrap();
        history.schedule(2, 0, add(7.0)).unwrap();
        history.schedule(3, 0, add(-100.0)).unwrap();

        let state = Mutex::new(123.0);
        assert_eq!(history.state_delta(0, 10, &state, 0), 3);
        assert_eq!(*state.lock(), 100.0);
    }

    #[test]
    fn test_delta_rejects_bad_range() {
        let mut history: History<Mutex<f32>> = History::new();
        history.schedule(0, 0, add(1.0)).unwrap();
        let state = Mutex::new(0.0);

        assert_eq!(history.state_delta(-1, 5, &state, 0), 0);
        assert_eq!(history.state_delta(0, -5, &state, 2), 0);
        assert_eq!(history.state_delta(5, 0, &state, 0), 0);
        assert_eq!(history.apply_range(3, 1, &state), 0);
        assert_eq!(*state.lock(), 0.0);
    }

    #[test]
    fn test_events_applied_by_phases() {
        const MUL_PHASE: Phase = 0;
        const ADD_PHASE: Phase = 1;

        let mut history: History<Mutex<f32>> = History::new();
        history.schedule(0, ADD_PHASE, add(1.0)).unwrap();
        history.schedule(0, MUL_PHASE, mul(1.0)).unwrap();
        history.schedule(0, ADD_PHASE, add(2.0)).unwrap();
        history.schedule(0, MUL_PHASE, mul(2.0)).unwrap();

        // Multiplies first: (s * 1 * 2) + 1 + 2
        let state = Mutex::new(0.0);
        history.state_delta(0, 0, &state, 0);
        assert_eq!(*state.lock(), 3.0);

        let state = Mutex::new(1.0);
        history.state_delta(0, 0, &state, 0);
        assert_eq!(*state.lock(), 5.0);

        let state = Mutex::new(1.0);
        history.state_delta(0, 0, &state, 4);
        assert_eq!(*state.lock(), 5.0);
    }

    #[test]
    fn test_apply_range_with_cell_state() {
        let mut history: History<Cell<f32>> = History::new();
        history.schedule(0, 1, event_fn(|s: &Cell<f32>| s.set(s.get() + 1.0))).unwrap();
        history.schedule(0, 0, event_fn(|s: &Cell<f32>| s.set(s.get() * 2.0))).unwrap();

        let state = Cell::new(1.0);
        assert_eq!(history.apply_range(0, 0, &state), 2);
        assert_eq!(state.get(), 3.0);
    }

    #[test]
    fn test_multithreaded_phases_lose_no_updates() {
        let mut history: History<Mutex<f32>> = History::new();
        for _ in 0..100 {
            history
                .schedule(
                    0,
                    0,
                    event_fn(|s: &Mutex<f32>| {
                        std::hint::black_box((0..1000).sum::<u32>());
                        *s.lock() += 1.0;
                    }),
                )
                .unwrap();
        }

        let state = Mutex::new(0.0);
        assert_eq!(history.state_delta(0, 1, &state, 10), 100);
        assert_eq!(*state.lock(), 100.0);
    }

    /// State recording whether any phase-1 event saw phase 0 unfinished
    #[derive(Default)]
    struct PhaseProbe {
        phase0_done: AtomicUsize,
        violations: AtomicUsize,
    }

    #[test]
    fn test_phases_never_overlap() {
        const WIDTH: usize = 8;
        let mut history: History<PhaseProbe> = History::new();
        for _ in 0..WIDTH {
            history
                .schedule(
                    0,
                    0,
                    event_fn(|s: &PhaseProbe| {
                        std::thread::sleep(Duration::from_millis(5));
                        s.phase0_done.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
            history
                .schedule(
                    0,
                    1,
                    event_fn(|s: &PhaseProbe| {
                        if s.phase0_done.load(Ordering::SeqCst) != WIDTH {
                            s.violations.fetch_add(1, Ordering::SeqCst);
                        }
                    }),
                )
                .unwrap();
        }

        let probe = PhaseProbe::default();
        assert_eq!(history.state_delta(0, 0, &probe, 3), 2 * WIDTH);
        assert_eq!(probe.phase0_done.load(Ordering::SeqCst), WIDTH);
        assert_eq!(probe.violations.load(Ordering::SeqCst), 0);
    }

    /// State tracking how many events run at once
    #[derive(Default)]
    struct Occupancy {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        workers: Mutex<HashSet<std::thread::ThreadId>>,
    }

    #[test]
    fn test_concurrency_bounded_by_width() {
        const WIDTH: usize = 4;
        let mut history: History<Occupancy> = History::new();
        for _ in 0..32 {
            history
                .schedule(
                    0,
                    0,
                    event_fn(|s: &Occupancy| {
                        let now = s.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        s.max_in_flight.fetch_max(now, Ordering::SeqCst);
                        s.workers.lock().insert(std::thread::current().id());
                        std::thread::sleep(Duration::from_millis(2));
                        s.in_flight.fetch_sub(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
        }

        let occupancy = Occupancy::default();
        assert_eq!(history.state_delta(0, 0, &occupancy, WIDTH), 32);

        let max = occupancy.max_in_flight.load(Ordering::SeqCst);
        assert!((1..=WIDTH).contains(&max), "max in flight {max}");
        assert!(occupancy.workers.lock().len() <= WIDTH);
        assert_eq!(occupancy.in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_narrow_calendar_keeps_pool_narrow() {
        let mut history: History<Mutex<f32>> = History::new();
        history.schedule(0, 0, add(1.0)).unwrap();
        history.schedule(0, 0, add(2.0)).unwrap();
        history.schedule(5, 0, add(4.0)).unwrap();

        let state = Mutex::new(0.0);
        assert_eq!(history.state_delta(0, 5, &state, 2000), 3);
        assert_eq!(*state.lock(), 7.0);
        assert_eq!(history.delta.cached_pool_widths(), vec![2]);
    }

    #[test]
    fn test_get_events_order_and_identity() {
        let mut history: History<()> = History::new();
        let mut expected = Vec::new();
        for i in 0..10usize {
            let event: Box<dyn Event<()>> = Box::new(Inert::new(i));
            expected.push(addr(&*event));
            history.schedule_boxed(100, 0, event).unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(history.count_events(100), 10);
        assert_eq!(history.get_events(100, &mut out), 10);

        let actual: Vec<*const ()> = out
            .iter()
            .map(|e| addr(*e))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_get_events_phase_sorted() {
        let mut history: History<()> = History::new();
        let late: Box<dyn Event<()>> = Box::new(Inert::new(1usize));
        let early: Box<dyn Event<()>> = Box::new(Inert::new(2usize));
        let late_ptr = addr(&*late);
        let early_ptr = addr(&*early);

        history.schedule_boxed(4, 9, late).unwrap();
        history.schedule_boxed(4, -2, early).unwrap();

        let order: Vec<*const ()> = history
            .events(4)
            .map(addr)
            .collect();
        assert_eq!(order, vec![early_ptr, late_ptr]);
    }

    #[test]
    fn test_queries_idempotent() {
        let mut history: History<()> = History::new();
        for i in 0..5u64 {
            history.schedule(7, (i % 2) as Phase, Inert::new(i)).unwrap();
        }

        let mut first = Vec::new();
        let mut second = Vec::new();
        let n1 = history.get_events(7, &mut first);
        let n2 = history.get_events(7, &mut second);

        assert_eq!(n1, n2);
        assert_eq!(history.count_events(7), history.count_events(7));
        let a: Vec<*const ()> = first.iter().map(|e| addr(*e)).collect();
        let b: Vec<*const ()> = second.iter().map(|e| addr(*e)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unschedule_all_in_range() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let mut history: History<()> = History::new();
        let handles: Vec<EventHandle> = (0..10)
            .map(|tp| {
                history
                    .schedule(tp, 0, Lifeline { destroyed: destroyed.clone() })
                    .unwrap()
            })
            .collect();

        assert_eq!(history.unschedule_all(3, 6), 4);
        assert_eq!(destroyed.load(Ordering::SeqCst), 4);
        assert_eq!(history.len(), 6);

        for handle in &handles {
            let inside = (3..=6).contains(&handle.timepoint());
            assert_eq!(history.is_scheduled(handle), !inside);
        }

        for handle in handles {
            let inside = (3..=6).contains(&handle.timepoint());
            let result = history.try_unschedule(handle);
            if inside {
                assert!(matches!(result, Err(HistoryError::StaleHandle { .. })));
            } else {
                assert!(result.is_ok());
            }
        }
        assert_eq!(destroyed.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_unschedule_all_rejects_bad_range() {
        let mut history: History<()> = History::new();
        history.schedule(1, 0, Inert::new(1u8)).unwrap();

        assert_eq!(history.unschedule_all(-1, 10), 0);
        assert_eq!(history.unschedule_all(0, -1), 0);
        assert_eq!(history.unschedule_all(5, 0), 0);
        assert_eq!(history.len(), 1);

        assert_eq!(history.unschedule_all(0, 10), 1);
        assert!(history.is_empty());
    }

    #[test]
    #[should_panic(expected = "invalid event handle")]
    fn test_foreign_handle_panics() {
        let mut ours: History<()> = History::new();
        let mut theirs: History<()> = History::new();
        let foreign = theirs.schedule(0, 0, Inert::new(0u8)).unwrap();
        ours.schedule(0, 0, Inert::new(0u8)).unwrap();

        ours.unschedule(foreign);
    }

    #[test]
    #[should_panic(expected = "invalid event handle")]
    fn test_stale_handle_panics() {
        let mut history: History<()> = History::new();
        let handle = history.schedule(2, 0, Inert::new(0u8)).unwrap();
        history.unschedule_all(0, 5);

        history.unschedule(handle);
    }

    #[test]
    fn test_cursor_forwards_and_backwards() {
        let mut history: History<Mutex<f32>> = History::new();
        history.schedule(0, 0, add(1.0)).unwrap();
        history.schedule(1, 0, add(10.0)).unwrap();

        assert_eq!(history.current_timepoint(), INVALID_TIMEPOINT);
        assert!(!history.is_timepoint_valid(history.current_timepoint()));

        let state = Mutex::new(0.0);
        assert_eq!(history.forwards(Some(&state)), 1);
        assert_eq!(history.current_timepoint(), 0);
        assert_eq!(*state.lock(), 1.0);

        assert_eq!(history.forwards(Some(&state)), 1);
        assert_eq!(history.current_timepoint(), 1);
        assert_eq!(*state.lock(), 11.0);

        assert_eq!(history.backwards(), 0);
        assert_eq!(*state.lock(), 11.0);
    }

    #[test]
    fn test_cursor_probe_without_state() {
        let mut history: History<Mutex<f32>> = History::new();
        history.schedule(0, 0, add(1.0)).unwrap();

        assert_eq!(history.forwards(None), 0);
        assert_eq!(history.current_timepoint(), 0);

        history.rewind();
        assert_eq!(history.current_timepoint(), INVALID_TIMEPOINT);
    }

    #[test]
    fn test_reconstruct_state_matches_forwards() {
        let mut history: History<Cell<i64>> = History::new();
        history.schedule(0, 0, event_fn(|s: &Cell<i64>| s.set(s.get() + 3))).unwrap();
        history.schedule(2, 1, event_fn(|s: &Cell<i64>| s.set(s.get() * 5))).unwrap();
        history.schedule(2, 0, event_fn(|s: &Cell<i64>| s.set(s.get() - 1))).unwrap();
        history.schedule(4, 0, event_fn(|s: &Cell<i64>| s.set(s.get() + 100))).unwrap();

        let initial = Cell::new(1);
        assert_eq!(history.reconstruct_state(&initial).get(), 1);

        let walked = initial.clone();
        for _ in 0..3 {
            history.forwards(Some(&walked));
        }
        assert_eq!(history.current_timepoint(), 2);
        assert_eq!(history.reconstruct_state(&initial).get(), walked.get());
        assert_eq!(walked.get(), 15);

        history.backwards();
        assert_eq!(history.reconstruct_state(&initial).get(), 4);
        assert_eq!(initial.get(), 1);
    }

    proptest! {
        #[test]
        fn prop_unschedule_all_removes_exact_range(
            timepoints in prop::collection::vec(0i64..30, 0..60),
            a in 0i64..30,
            b in 0i64..30,
        ) {
            let (from, to) = (a.min(b), a.max(b));
            let mut history: History<()> = History::new();
            let handles: Vec<EventHandle> = timepoints
                .iter()
                .map(|tp| history.schedule(*tp, 0, Inert::new(*tp)).unwrap())
                .collect();

            let expected = timepoints.iter().filter(|tp| (from..=to).contains(*tp)).count();
            prop_assert_eq!(history.unschedule_all(from, to), expected);
            prop_assert_eq!(history.len(), timepoints.len() - expected);

            for tp in from..=to {
                prop_assert_eq!(history.count_events(tp), 0);
            }
            for handle in &handles {
                prop_assert_eq!(
                    history.is_scheduled(handle),
                    !(from..=to).contains(&handle.timepoint())
                );
            }
        }

        #[test]
        fn prop_count_matches_get_events(
            schedule in prop::collection::vec((0i64..8, -2i32..3), 0..50),
        ) {
            let mut history: History<()> = History::new();
            for (i, (tp, phase)) in schedule.iter().enumerate() {
                history.schedule(*tp, *phase, Inert::new(i)).unwrap();
            }

            for tp in 0..8 {
                let mut out = Vec::new();
                let written = history.get_events(tp, &mut out);
                prop_assert_eq!(written, history.count_events(tp));
                prop_assert_eq!(written, out.len());
            }
            prop_assert_eq!(history.timepoint_count(), history.timepoints().count());
        }
    }
}
