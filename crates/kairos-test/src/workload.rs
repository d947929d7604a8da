//! Reference workloads
//!
//! A small accumulator state plus arithmetic events. Arithmetic wraps, so
//! events of the same kind commute exactly and replay results can be compared
//! bit for bit regardless of how a phase batch was scheduled across workers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kairos_core::Event;
use parking_lot::Mutex;

/// Shared integer accumulator, safe for phase-parallel replay
#[derive(Debug, Default)]
pub struct Accumulator {
    value: Mutex<i64>,
}

impl Accumulator {
    pub fn new(value: i64) -> Self {
        Accumulator {
            value: Mutex::new(value),
        }
    }

    /// Get current value
    pub fn value(&self) -> i64 {
        *self.value.lock()
    }

    pub fn add(&self, amount: i64) {
        let mut value = self.value.lock();
        *value = value.wrapping_add(amount);
    }

    pub fn multiply(&self, by: i64) {
        let mut value = self.value.lock();
        *value = value.wrapping_mul(by);
    }
}

impl Clone for Accumulator {
    fn clone(&self) -> Self {
        Accumulator::new(self.value())
    }
}

/// Add a constant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Increment(pub i64);

impl Event<Accumulator> for Increment {
    fn apply(&self, state: &Accumulator) {
        state.add(self.0);
    }
}

/// Multiply by a constant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Multiply(pub i64);

impl Event<Accumulator> for Multiply {
    fn apply(&self, state: &Accumulator) {
        state.multiply(self.0);
    }
}

/// Counts destroy hooks across any number of tracked events
#[derive(Clone, Debug, Default)]
pub struct DestroyTracker {
    destroyed: Arc<AtomicUsize>,
}

impl DestroyTracker {
    pub fn new() -> Self {
        DestroyTracker::default()
    }

    /// Wrap an event so its destroy hook is counted
    pub fn track<E>(&self, event: E) -> Tracked<E> {
        Tracked {
            event,
            destroyed: self.destroyed.clone(),
        }
    }

    /// Inert event whose only effect is being counted on destroy
    pub fn lifeline(&self) -> Tracked<Lifeline> {
        self.track(Lifeline)
    }

    /// Number of destroy hooks run so far
    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

/// Event wrapper reporting its destruction to a [`DestroyTracker`]
#[derive(Debug)]
pub struct Tracked<E> {
    event: E,
    destroyed: Arc<AtomicUsize>,
}

impl<S, E: Event<S>> Event<S> for Tracked<E> {
    fn apply(&self, state: &S) {
        self.event.apply(state)
    }

    fn is_inert(&self) -> bool {
        self.event.is_inert()
    }

    fn destroy(self: Box<Self>) {
        let Tracked { event, destroyed } = *self;
        destroyed.fetch_add(1, Ordering::SeqCst);
        Event::<S>::destroy(Box::new(event));
    }

    fn name(&self) -> &'static str {
        self.event.name()
    }
}

/// Event with no effect
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Lifeline;

impl<S> Event<S> for Lifeline {
    fn apply(&self, _state: &S) {}

    fn is_inert(&self) -> bool {
        true
    }
}
