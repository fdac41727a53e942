//! Declared-event publish/subscribe.
//!
//! A minimal in-process event bus over a fixed set of event names declared at
//! construction. Handlers run synchronously, in subscription order. The queue
//! crate uses this to announce drain completion, but the bus itself carries no
//! queue knowledge.

pub mod bus;
pub mod error;

pub use bus::{EventBus, SubscriptionId};
pub use error::EventError;
