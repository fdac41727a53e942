//! Task error types.

use thiserror::Error;

/// Why a task's handle settled with a failure.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The callback returned an error.
    #[error("task failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The callback panicked. The panic is contained at the run-loop
    /// boundary; the queue keeps draining.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The queue went away before this task ran, so the handle can never
    /// settle with a result.
    #[error("queue dropped before the task ran")]
    Dropped,
}
