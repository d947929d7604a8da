//! Logical time primitives
//!
//! Time in Kairos is a logical integer index, not wall-clock time:
//! - Timepoint: a non-negative instant indexing the calendar
//! - Phase: ordered sub-step within one timepoint

use std::fmt;
use std::ops::RangeInclusive;

use crate::{HistoryError, HistoryResult};

/// Logical instant. Valid iff `>= 0`.
pub type Timepoint = i64;

/// Sub-step ordering within one timepoint. Lower phases run first.
pub type Phase = i32;

/// First valid timepoint
pub const FIRST_TIMEPOINT: Timepoint = 0;

/// Cursor sentinel meaning "before the first valid timepoint"
pub const INVALID_TIMEPOINT: Timepoint = -1;

/// Check whether a timepoint may be used with the calendar
#[inline]
pub fn is_timepoint_valid(timepoint: Timepoint) -> bool {
    timepoint >= FIRST_TIMEPOINT
}

/// Closed range of valid timepoints `[start, end]`
///
/// Both bounds are inclusive for every range operation in the engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: Timepoint,
    end: Timepoint,
}

impl TimeRange {
    /// Create a range, rejecting negative bounds and `end < start`
    pub fn new(start: Timepoint, end: Timepoint) -> HistoryResult<Self> {
        Self::checked(start, end).ok_or(HistoryError::InvalidRange {
            from: start,
            to: end,
        })
    }

    /// Create a range, or `None` when the bounds are unusable
    #[inline]
    pub fn checked(start: Timepoint, end: Timepoint) -> Option<Self> {
        if !is_timepoint_valid(start) || !is_timepoint_valid(end) || end < start {
            return None;
        }
        Some(TimeRange { start, end })
    }

    /// Range covering a single timepoint
    #[inline]
    pub fn single(timepoint: Timepoint) -> Option<Self> {
        Self::checked(timepoint, timepoint)
    }

    #[inline]
    pub fn start(self) -> Timepoint {
        self.start
    }

    #[inline]
    pub fn end(self) -> Timepoint {
        self.end
    }

    /// Check if a timepoint lies within the range
    #[inline]
    pub fn contains(self, timepoint: Timepoint) -> bool {
        timepoint >= self.start && timepoint <= self.end
    }

    /// Number of timepoints covered (materialized or not)
    #[inline]
    pub fn span(self) -> u64 {
        self.end.abs_diff(self.start) + 1
    }

    /// Bounds usable with ordered map range queries
    #[inline]
    pub fn bounds(self) -> RangeInclusive<Timepoint> {
        self.start..=self.end
    }
}

impl fmt::Debug for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..={}]", self.start, self.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
