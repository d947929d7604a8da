//! Error types for Kairos

use thiserror::Error;

use crate::{EventId, HistoryId, Timepoint};

/// Core Kairos errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    // Argument errors
    #[error("Invalid timepoint: {0} (timepoints must be >= 0)")]
    InvalidTimepoint(Timepoint),

    #[error("Invalid timepoint range: [{from}, {to}]")]
    InvalidRange { from: Timepoint, to: Timepoint },

    // Handle errors
    #[error("Event handle belongs to {handle_history}, not {history}")]
    ForeignHandle {
        handle_history: HistoryId,
        history: HistoryId,
    },

    #[error("Stale event handle: {event} is no longer scheduled at timepoint {timepoint}")]
    StaleHandle { timepoint: Timepoint, event: EventId },

    // Execution errors
    #[error("Worker pool unavailable: {0}")]
    WorkerPool(String),
}

/// Result type for Kairos operations
pub type HistoryResult<T> = Result<T, HistoryError>;
