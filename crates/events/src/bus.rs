//! In-process event bus with a declared event set.
//!
//! Event names are fixed at construction. Subscribing to or emitting a name
//! that was never declared is an error rather than a silent no-op, so typos
//! surface at the call site instead of as notifications that never arrive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::EventError;

/// Token returned by [`EventBus::subscribe`], used to remove the handler later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn() + Send + Sync>;

/// Publish/subscribe over a fixed set of event names.
///
/// Handlers for an event are invoked synchronously, in subscription order,
/// each time the event is emitted. Emitting a declared event with no
/// subscribers is a successful no-op.
pub struct EventBus {
    /// Declared event name → subscribed handlers, in subscription order.
    handlers: Mutex<HashMap<String, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create a bus that recognizes exactly the given event names.
    pub fn new(events: &[&str]) -> Self {
        let handlers = events
            .iter()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();
        Self {
            handlers: Mutex::new(handlers),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribe a handler to a declared event.
    ///
    /// Returns a token for [`unsubscribe`](Self::unsubscribe), or
    /// [`EventError::Undeclared`] if the name was not declared at construction.
    pub fn subscribe(
        &self,
        event: &str,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> Result<SubscriptionId, EventError> {
        let mut map = self.handlers.lock().unwrap();
        let list = map
            .get_mut(event)
            .ok_or_else(|| EventError::Undeclared(event.to_string()))?;
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        list.push((id, Arc::new(handler)));
        Ok(id)
    }

    /// Remove a previously subscribed handler.
    ///
    /// Returns `Ok(false)` if the token no longer matches a handler.
    pub fn unsubscribe(&self, event: &str, id: SubscriptionId) -> Result<bool, EventError> {
        let mut map = self.handlers.lock().unwrap();
        let list = map
            .get_mut(event)
            .ok_or_else(|| EventError::Undeclared(event.to_string()))?;
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        Ok(list.len() < before)
    }

    /// Emit an event, invoking all of its handlers in subscription order.
    ///
    /// Handlers are snapshotted before invocation, so a handler may subscribe
    /// or unsubscribe without deadlocking; changes take effect on the next
    /// emit. Returns the number of handlers invoked.
    pub fn emit(&self, event: &str) -> Result<usize, EventError> {
        let snapshot: Vec<Handler> = {
            let map = self.handlers.lock().unwrap();
            let list = map
                .get(event)
                .ok_or_else(|| EventError::Undeclared(event.to_string()))?;
            list.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        for handler in &snapshot {
            handler();
        }
        tracing::debug!(event, handlers = snapshot.len(), "event emitted");
        Ok(snapshot.len())
    }

    /// Names declared at construction, sorted.
    pub fn declared_events(&self) -> Vec<String> {
        let map = self.handlers.lock().unwrap();
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn handlers_run_in_subscription_order() {
        let bus = EventBus::new(&["tick"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            bus.subscribe("tick", move || log.lock().unwrap().push(i))
                .unwrap();
        }

        let invoked = bus.emit("tick").unwrap();
        assert_eq!(invoked, 3);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn emit_without_subscribers_is_noop() {
        let bus = EventBus::new(&["tick"]);
        assert_eq!(bus.emit("tick").unwrap(), 0);
    }

    #[test]
    fn undeclared_event_errors() {
        let bus = EventBus::new(&["tick"]);

        let err = bus.subscribe("tock", || {}).unwrap_err();
        assert!(matches!(err, EventError::Undeclared(ref name) if name == "tock"));

        let err = bus.emit("tock").unwrap_err();
        assert!(matches!(err, EventError::Undeclared(_)));
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let bus = EventBus::new(&["tick"]);
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let id = bus
            .subscribe("tick", move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        bus.emit("tick").unwrap();
        assert!(bus.unsubscribe("tick", id).unwrap());
        bus.emit("tick").unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        // Second removal with a stale token.
        assert!(!bus.unsubscribe("tick", id).unwrap());
    }

    #[test]
    fn declared_events_lists_all_names() {
        let bus = EventBus::new(&["b", "a"]);
        assert_eq!(bus.declared_events(), vec!["a".to_string(), "b".to_string()]);
    }
}
