//! Kairos Core - Fundamental types and primitives
//!
//! This crate defines the types shared by the calendar engine and its harness:
//! - Identifiers (HistoryId, EventId)
//! - Logical time (Timepoint, Phase, TimeRange)
//! - The event capability trait and its adaptors
//! - Engine configuration
//! - Error taxonomy

pub mod id;
pub mod time;
pub mod event;
pub mod config;
pub mod error;

pub use id::*;
pub use time::*;
pub use event::*;
pub use config::*;
pub use error::*;
