//! Event capabilities
//!
//! An event is anything that can be folded into a caller-owned state.
//! The engine never looks inside an event: it stores it, orders it by phase,
//! invokes `apply` when the event's timepoint is replayed, and hands ownership
//! to `destroy` exactly once when the event leaves the calendar.

use std::fmt;

/// A schedulable occurrence that mutates a state of type `S`
///
/// `apply` receives a shared reference. During phase-parallel replay several
/// events of the same phase run against the same state at once, so any
/// mutation must go through the state's own synchronization (a mutex, atomics,
/// or `Cell` for single-threaded use).
pub trait Event<S>: Send + Sync {
    /// Fold this event into `state`
    fn apply(&self, state: &S);

    /// Inert events exist on the calendar but are never applied
    fn is_inert(&self) -> bool {
        false
    }

    /// Called exactly once when the event is unscheduled or its history is
    /// dropped. The default just drops the event.
    fn destroy(self: Box<Self>) {}

    /// Human-readable name used in diagnostics
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Event backed by a closure
pub struct FnEvent<F> {
    apply: F,
}

impl<F> FnEvent<F> {
    pub fn new(apply: F) -> Self {
        FnEvent { apply }
    }
}

impl<S, F> Event<S> for FnEvent<F>
where
    F: Fn(&S) + Send + Sync,
{
    #[inline]
    fn apply(&self, state: &S) {
        (self.apply)(state)
    }
}

impl<F> fmt::Debug for FnEvent<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvent").finish_non_exhaustive()
    }
}

/// Build an event from a closure
pub fn event_fn<S, F>(apply: F) -> FnEvent<F>
where
    F: Fn(&S) + Send + Sync,
{
    FnEvent::new(apply)
}

/// Payload that is tracked by the calendar but has no executable effect
///
/// Counted by `count_events` and listed by `get_events`, skipped by replay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inert<T> {
    pub payload: T,
}

impl<T> Inert<T> {
    pub fn new(payload: T) -> Self {
        Inert { payload }
    }
}

impl<S, T> Event<S> for Inert<T>
where
    T: Send + Sync,
{
    fn apply(&self, _state: &S) {}

    fn is_inert(&self) -> bool {
        true
    }
}

/// Event with a custom teardown step
///
/// `on_destroy` receives the inner event by value when it leaves the calendar.
pub struct WithDestroy<E, D> {
    event: E,
    on_destroy: D,
}

impl<E, D> WithDestroy<E, D> {
    pub fn new(event: E, on_destroy: D) -> Self
    where
        D: FnOnce(E),
    {
        WithDestroy { event, on_destroy }
    }

    /// Get the wrapped event
    pub fn inner(&self) -> &E {
        &self.event
    }
}

impl<S, E, D> Event<S> for WithDestroy<E, D>
where
    E: Event<S>,
    D: FnOnce(E) + Send + Sync,
{
    #[inline]
    fn apply(&self, state: &S) {
        self.event.apply(state)
    }

    fn is_inert(&self) -> bool {
        self.event.is_inert()
    }

    fn destroy(self: Box<Self>) {
        let WithDestroy { event, on_destroy } = *self;
        on_destroy(event)
    }

    fn name(&self) -> &'static str {
        self.event.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fn_event_applies() {
        let state = Cell::new(2.0f32);
        let event = event_fn(|s: &Cell<f32>| s.set(s.get() * 3.0));
        event.apply(&state);
        assert_eq!(state.get(), 6.0);
        assert!(!Event::<Cell<f32>>::is_inert(&event));
    }

    #[test]
    fn test_inert_never_mutates() {
        let state = Cell::new(1i32);
        let event = Inert::new(42u32);
        Event::<Cell<i32>>::apply(&event, &state);
        assert_eq!(state.get(), 1);
        assert!(Event::<Cell<i32>>::is_inert(&event));
    }

    #[test]
    fn test_with_destroy_runs_once() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = destroyed.clone();
        let event: Box<dyn Event<Cell<i32>>> = Box::new(WithDestroy::new(
            event_fn(|s: &Cell<i32>| s.set(s.get() + 1)),
            move |_inner| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));

        let state = Cell::new(0);
        event.apply(&state);
        assert_eq!(state.get(), 1);

        event.destroy();
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_destroy_drops() {
        let alive = Arc::new(());
        let held = alive.clone();
        let event: Box<dyn Event<()>> = Box::new(Inert::new(held));
        assert_eq!(Arc::strong_count(&alive), 2);
        event.destroy();
        assert_eq!(Arc::strong_count(&alive), 1);
    }
}
