//! Identity types for Kairos
//!
//! History ids are process-unique; event ids are unique within one history
//! and never reused, so a stale or foreign handle can always be told apart
//! from a live one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HISTORY_ID: AtomicU64 = AtomicU64::new(1);

/// History identity - distinguishes handles issued by different histories
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HistoryId(u64);

impl HistoryId {
    /// Allocate a fresh process-unique id
    pub fn next() -> Self {
        HistoryId(NEXT_HISTORY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "History({})", self.0)
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "history #{}", self.0)
    }
}

/// Event record identity - monotonically increasing within one history
///
/// Ordering by id is scheduling order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EventId(pub u64);

impl EventId {
    pub const ZERO: EventId = EventId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        EventId(id)
    }

    /// The id issued after this one
    #[inline]
    pub fn next(self) -> Self {
        EventId(self.0 + 1)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event #{}", self.0)
    }
}
