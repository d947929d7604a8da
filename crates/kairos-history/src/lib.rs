//! Kairos History - Event calendar and deterministic replay
//!
//! This crate implements the scheduling and delta-application engine:
//! - Timepoint calendar with phase-ordered records
//! - Handle registry for individual and range unscheduling
//! - Delta engine with sequential and phase-parallel replay
//! - History cursor for stepwise forward/backward walking

pub mod calendar;
pub mod registry;
pub mod delta;
pub mod cursor;
pub mod history;

pub use calendar::*;
pub use registry::*;
pub use delta::*;
pub use cursor::*;
pub use history::*;
