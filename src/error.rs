//! Error types for the event bus.

use thiserror::Error;

/// Main error type for bus operations.
///
/// Most bus operations cannot fail: posting with no observers,
/// unsubscribing an unknown subscriber and cancelling a dead handle are
/// all no-ops. These variants cover the execution contexts only.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Failed to spawn background worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Main context is shut down")]
    ContextClosed,

    #[error("Main context queue is full")]
    MainQueueFull,

    #[error("Main context is bound to another thread")]
    MainThreadMismatch,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
