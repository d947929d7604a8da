//! Handle registry - the set of live event handles

use std::collections::BTreeMap;
use std::fmt;

use kairos_core::{EventId, HistoryError, HistoryId, HistoryResult, TimeRange, Timepoint};

/// Capability to unschedule one event
///
/// Handles are move-only: unscheduling consumes the handle, so the same
/// handle can never be presented twice. A handle whose event was removed by
/// a range unschedule is stale and is rejected.
///
/// Only a `History` issues handles; registries cannot be built outside it:
///
/// ```compile_fail
/// use kairos_core::HistoryId;
/// use kairos_history::HandleRegistry;
///
/// let mut registry = HandleRegistry::new(HistoryId::next());
/// let _forged = registry.issue(0);
/// ```
#[derive(PartialEq, Eq, Hash)]
pub struct EventHandle {
    history: HistoryId,
    timepoint: Timepoint,
    event: EventId,
}

impl EventHandle {
    /// Timepoint the event was scheduled at
    #[inline]
    pub fn timepoint(&self) -> Timepoint {
        self.timepoint
    }

    #[inline]
    pub fn event_id(&self) -> EventId {
        self.event
    }

    /// History that issued this handle
    #[inline]
    pub fn history_id(&self) -> HistoryId {
        self.history
    }
}

impl fmt::Debug for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:?}@{} in {:?})", self.event, self.timepoint, self.history)
    }
}

/// Live handles of one history, keyed by event id (scheduling order)
#[derive(Debug)]
pub struct HandleRegistry {
    history: HistoryId,
    live: BTreeMap<EventId, Timepoint>,
    last_issued: EventId,
}

impl HandleRegistry {
    pub(crate) fn new(history: HistoryId) -> Self {
        HandleRegistry {
            history,
            live: BTreeMap::new(),
            last_issued: EventId::ZERO,
        }
    }

    /// Issue a handle for a new record at `timepoint`
    pub(crate) fn issue(&mut self, timepoint: Timepoint) -> EventHandle {
        self.last_issued = self.last_issued.next();
        self.live.insert(self.last_issued, timepoint);
        EventHandle {
            history: self.history,
            timepoint,
            event: self.last_issued,
        }
    }

    /// Check that a handle names a live record of this history
    pub fn validate(&self, handle: &EventHandle) -> HistoryResult<()> {
        if handle.history != self.history {
            return Err(HistoryError::ForeignHandle {
                handle_history: handle.history,
                history: self.history,
            });
        }
        match self.live.get(&handle.event) {
            Some(tp) if *tp == handle.timepoint => Ok(()),
            _ => Err(HistoryError::StaleHandle {
                timepoint: handle.timepoint,
                event: handle.event,
            }),
        }
    }

    /// Retire a validated handle
    pub(crate) fn release(&mut self, handle: EventHandle) {
        self.live.remove(&handle.event);
    }

    /// Retire every handle whose timepoint lies in `range`
    ///
    /// Returns `(event, timepoint)` pairs in scheduling order.
    pub(crate) fn take_range(&mut self, range: TimeRange) -> Vec<(EventId, Timepoint)> {
        let taken: Vec<(EventId, Timepoint)> = self
            .live
            .iter()
            .filter(|(_, tp)| range.contains(**tp))
            .map(|(id, tp)| (*id, *tp))
            .collect();
        for (id, _) in &taken {
            self.live.remove(id);
        }
        taken
    }

    /// Retire every handle, in scheduling order
    pub(crate) fn take_all(&mut self) -> Vec<(EventId, Timepoint)> {
        std::mem::take(&mut self.live).into_iter().collect()
    }

    /// Check if an event is live
    pub fn contains(&self, event: EventId) -> bool {
        self.live.contains_key(&event)
    }

    /// Get number of live handles
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
