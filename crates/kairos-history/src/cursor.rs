//! History cursor - stepwise position over the calendar
//!
//! The cursor only tracks a position. Moving backwards never un-applies
//! anything; state at an earlier timepoint is rebuilt by replaying from a
//! known baseline.

use kairos_core::{is_timepoint_valid, Timepoint, INVALID_TIMEPOINT};

/// Single current timepoint, starting before the first valid one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryCursor {
    current: Timepoint,
}

impl HistoryCursor {
    pub fn new() -> Self {
        HistoryCursor {
            current: INVALID_TIMEPOINT,
        }
    }

    /// Get current timepoint
    #[inline]
    pub fn current(&self) -> Timepoint {
        self.current
    }

    /// Check if the cursor points at a valid timepoint
    #[inline]
    pub fn is_valid(&self) -> bool {
        is_timepoint_valid(self.current)
    }

    /// Step forward by one timepoint
    pub fn advance(&mut self) -> Timepoint {
        self.current = self.current.saturating_add(1);
        self.current
    }

    /// Step back by one timepoint, stopping at the sentinel
    pub fn retreat(&mut self) -> Timepoint {
        if self.current > INVALID_TIMEPOINT {
            self.current -= 1;
        }
        self.current
    }

    /// Return to the sentinel
    pub fn reset(&mut self) {
        self.current = INVALID_TIMEPOINT;
    }
}

impl Default for HistoryCursor {
    fn default() -> Self {
        Self::new()
    }
}
