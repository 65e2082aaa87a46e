//! Bus configuration.

use crate::error::{BusError, Result};

/// Default name prefix for background worker threads.
pub const DEFAULT_WORKER_PREFIX: &str = "eventbus-worker";

/// Event bus configuration.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Capacity of the main context queue (None = unbounded).
    pub main_queue_capacity: Option<usize>,

    /// Thread name prefix for background workers.
    /// Each worker is named `{prefix}-{observer}`.
    pub worker_name_prefix: String,

    /// Stack size for background workers (None = platform default).
    pub worker_stack_size: Option<usize>,

    /// Catch and log handler panics instead of unwinding into the poster
    /// or killing the worker thread.
    pub catch_handler_panics: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            main_queue_capacity: None,
            worker_name_prefix: DEFAULT_WORKER_PREFIX.to_string(),
            worker_stack_size: None,
            catch_handler_panics: true,
        }
    }
}

impl BusConfig {
    /// Check the configuration for values no context can run with.
    pub fn validate(&self) -> Result<()> {
        if self.main_queue_capacity == Some(0) {
            return Err(BusError::InvalidConfig(
                "main_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.worker_name_prefix.is_empty() {
            return Err(BusError::InvalidConfig(
                "worker_name_prefix must not be empty".to_string(),
            ));
        }
        if self.worker_stack_size == Some(0) {
            return Err(BusError::InvalidConfig(
                "worker_stack_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
