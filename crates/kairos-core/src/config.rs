//! History configuration

/// Default name prefix for phase worker threads
pub const DEFAULT_WORKER_NAME: &str = "kairos-phase";

/// History configuration
///
/// Only the phase-parallel delta path reads these settings; sequential replay
/// always runs on the calling thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Name prefix for phase worker threads (suffixed with the worker index)
    pub worker_name: String,
    /// Stack size for phase worker threads, `None` for the platform default
    pub worker_stack_size: Option<usize>,
    /// Maximum number of distinct worker pool widths kept alive at once
    pub max_cached_pools: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            worker_stack_size: None,
            max_cached_pools: 4,
        }
    }
}

impl HistoryConfig {
    /// Configuration for embedding in memory-constrained hosts:
    /// small worker stacks and a single cached pool
    pub fn compact() -> Self {
        HistoryConfig {
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            worker_stack_size: Some(256 * 1024),
            max_cached_pools: 1,
        }
    }

    /// Override the worker thread name prefix
    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    /// Thread name for the worker at `index`
    pub fn worker_thread_name(&self, index: usize) -> String {
        format!("{}-{}", self.worker_name, index)
    }
}
