//! Sequential task queue.
//!
//! Callers submit async callbacks and get back a [`TaskHandle`] that settles
//! with the callback's result. The queue runs callbacks one at a time, in
//! strict submission order, no matter how many are submitted concurrently or
//! how long each takes. One task's failure settles only its own handle; the
//! queue moves on to the next task. Each time the backlog drains, the queue
//! emits a single idle event.

pub mod error;
pub mod queue;
pub mod task;

pub use error::TaskError;
pub use queue::{SequentialTaskQueue, QUEUE_IDLE};
pub use task::TaskHandle;
