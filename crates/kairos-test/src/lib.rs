//! Kairos Test Harness - Replay fuzzing and shared workloads
//!
//! This crate provides:
//! - Reference events and states for exercising the calendar
//! - Seeded replay fuzzing across cursor, sequential and parallel replay
//! - Tracing setup for tests and benchmarks

pub mod workload;
pub mod replay_fuzzer;
pub mod logging;

pub use workload::*;
pub use replay_fuzzer::*;
pub use logging::*;
