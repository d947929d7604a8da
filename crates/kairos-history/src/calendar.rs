//! Timepoint calendar - sparse index of phase-ordered event records

use std::collections::BTreeMap;
use std::fmt;

use kairos_core::{Event, EventId, Phase, TimeRange, Timepoint};

/// One scheduled occurrence
pub struct EventRecord<S> {
    id: EventId,
    phase: Phase,
    event: Box<dyn Event<S>>,
}

impl<S> EventRecord<S> {
    pub(crate) fn new(id: EventId, phase: Phase, event: Box<dyn Event<S>>) -> Self {
        EventRecord { id, phase, event }
    }

    #[inline]
    pub fn id(&self) -> EventId {
        self.id
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Get the scheduled event
    #[inline]
    pub fn event(&self) -> &dyn Event<S> {
        self.event.as_ref()
    }

    /// Whether replay will invoke this record
    #[inline]
    pub fn is_runnable(&self) -> bool {
        !self.event.is_inert()
    }

    /// Hand the event to its destroy hook
    pub(crate) fn destroy(self) {
        self.event.destroy()
    }
}

impl<S> fmt::Debug for EventRecord<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("event", &self.event.name())
            .finish()
    }
}

/// All records scheduled at one timepoint
///
/// INVARIANT: records are sorted by phase; equal phases keep insertion order.
pub struct CalendarEntry<S> {
    records: Vec<EventRecord<S>>,
}

impl<S> CalendarEntry<S> {
    fn new() -> Self {
        CalendarEntry {
            records: Vec::new(),
        }
    }

    /// Insert after every record with a phase <= the new record's phase
    fn insert(&mut self, record: EventRecord<S>) {
        let pos = self.records.partition_point(|r| r.phase <= record.phase);
        self.records.insert(pos, record);
    }

    fn remove(&mut self, id: EventId) -> Option<EventRecord<S>> {
        let pos = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(pos))
    }

    /// Get number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if a record is present
    pub fn contains(&self, id: EventId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Iterate records in phase order
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord<S>> {
        self.records.iter()
    }

    /// Iterate consecutive runs of records sharing a phase
    pub fn phase_batches(&self) -> PhaseBatches<'_, S> {
        PhaseBatches {
            rest: &self.records,
        }
    }
}

/// Iterator over `(phase, records)` runs of a calendar entry
pub struct PhaseBatches<'a, S> {
    rest: &'a [EventRecord<S>],
}

impl<'a, S> Iterator for PhaseBatches<'a, S> {
    type Item = (Phase, &'a [EventRecord<S>]);

    fn next(&mut self) -> Option<Self::Item> {
        let phase = self.rest.first()?.phase;
        let len = self.rest.iter().take_while(|r| r.phase == phase).count();
        let (batch, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some((phase, batch))
    }
}

/// Sparse timepoint -> entry index
///
/// Only timepoints holding at least one record are materialized.
pub struct Calendar<S> {
    entries: BTreeMap<Timepoint, CalendarEntry<S>>,
    records: usize,
}

impl<S> Calendar<S> {
    pub fn new() -> Self {
        Calendar {
            entries: BTreeMap::new(),
            records: 0,
        }
    }

    pub(crate) fn insert(&mut self, timepoint: Timepoint, record: EventRecord<S>) {
        self.entries
            .entry(timepoint)
            .or_insert_with(CalendarEntry::new)
            .insert(record);
        self.records += 1;
    }

    /// Remove a record, dropping its entry if it was the last one
    pub(crate) fn remove(&mut self, timepoint: Timepoint, id: EventId) -> Option<EventRecord<S>> {
        let entry = self.entries.get_mut(&timepoint)?;
        let record = entry.remove(id)?;
        if entry.is_empty() {
            self.entries.remove(&timepoint);
        }
        self.records -= 1;
        Some(record)
    }

    /// Get the entry for a timepoint
    pub fn entry(&self, timepoint: Timepoint) -> Option<&CalendarEntry<S>> {
        self.entries.get(&timepoint)
    }

    /// Number of records at a timepoint
    pub fn count(&self, timepoint: Timepoint) -> usize {
        self.entry(timepoint).map_or(0, CalendarEntry::len)
    }

    /// Check if a record is scheduled at a timepoint
    pub fn contains(&self, timepoint: Timepoint, id: EventId) -> bool {
        self.entry(timepoint).is_some_and(|e| e.contains(id))
    }

    /// Iterate materialized entries within a closed range, ascending
    pub fn range(&self, range: TimeRange) -> impl Iterator<Item = (Timepoint, &CalendarEntry<S>)> {
        self.entries.range(range.bounds()).map(|(tp, entry)| (*tp, entry))
    }

    /// Iterate materialized timepoints, ascending
    pub fn timepoints(&self) -> impl Iterator<Item = Timepoint> + '_ {
        self.entries.keys().copied()
    }

    pub fn first_timepoint(&self) -> Option<Timepoint> {
        self.entries.keys().next().copied()
    }

    pub fn last_timepoint(&self) -> Option<Timepoint> {
        self.entries.keys().next_back().copied()
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.records
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Number of materialized timepoints
    pub fn timepoint_count(&self) -> usize {
        self.entries.len()
    }
}

impl<S> Default for Calendar<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Calendar<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calendar")
            .field("timepoints", &self.entries.len())
            .field("records", &self.records)
            .finish()
    }
}
