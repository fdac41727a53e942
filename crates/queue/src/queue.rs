//! The sequential task queue and its run-loop.
//!
//! Submission appends to a FIFO backlog and lazily starts a single run-loop
//! that drains it in order, one task at a time. The backlog and the running
//! flag are the only shared state; the lock around them is never held across
//! an await, so submissions stay non-blocking while a task executes.

use std::collections::VecDeque;
use std::error::Error;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serialq_events::{EventBus, SubscriptionId};
use tracing::debug;

use crate::task::{create_task, Task, TaskHandle};

/// Event emitted each time the backlog drains and the run-loop stops.
pub const QUEUE_IDLE: &str = "queue_idle";

struct Inner {
    backlog: VecDeque<Task>,
    running: bool,
}

/// Runs submitted callbacks one at a time, strictly in submission order.
///
/// The next task starts only after the current one has fully settled, so no
/// two callbacks ever overlap. A task's failure settles only its own handle;
/// the loop continues with the next task. When the backlog empties, the loop
/// stops and the [`QUEUE_IDLE`] event fires exactly once; the queue is
/// reusable indefinitely and restarts on the next submission.
///
/// Submission methods never await. They must be called from within a tokio
/// runtime, since the run-loop is spawned onto it.
pub struct SequentialTaskQueue {
    inner: Arc<Mutex<Inner>>,
    events: Arc<EventBus>,
}

impl SequentialTaskQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                backlog: VecDeque::new(),
                running: false,
            })),
            events: Arc::new(EventBus::new(&[QUEUE_IDLE])),
        }
    }

    /// Whether the run-loop is currently active.
    ///
    /// Flips true before [`submit`](Self::submit) returns and back to false
    /// once the backlog drains. The flag is cleared *before* the idle event
    /// dispatches, so idle handlers observe `false` for the completed cycle —
    /// unless a new submission has already restarted the queue by the time
    /// the handler runs.
    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().running
    }

    /// Number of tasks waiting in the backlog, not counting one currently
    /// executing.
    pub fn backlog_len(&self) -> usize {
        self.inner.lock().unwrap().backlog.len()
    }

    /// Submit a callback for sequential execution.
    ///
    /// Appends to the backlog, starts the run-loop if it is not already
    /// active, and returns immediately with the task's handle. The callback
    /// runs after every previously submitted task has settled.
    pub fn submit<F, Fut, T, E>(&self, callback: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let (task, handle) = create_task(callback);
        let start = {
            let mut inner = self.inner.lock().unwrap();
            inner.backlog.push_back(task);
            debug!(backlog_depth = inner.backlog.len(), "task enqueued");
            if inner.running {
                false
            } else {
                inner.running = true;
                true
            }
        };
        if start {
            self.spawn_run_loop();
        }
        handle
    }

    /// Submit several callbacks at once, preserving their relative order.
    ///
    /// All callbacks are appended under one lock acquisition, so a racing
    /// [`submit`](Self::submit) lands either before the whole batch or after
    /// it, never in between. Handles are returned in input order. The
    /// run-loop is ensured once, after all appends.
    pub fn submit_batch<I, F, Fut, T, E>(&self, callbacks: I) -> Vec<TaskHandle<T>>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let mut tasks = Vec::new();
        let mut handles = Vec::new();
        for callback in callbacks {
            let (task, handle) = create_task(callback);
            tasks.push(task);
            handles.push(handle);
        }

        let start = {
            let mut inner = self.inner.lock().unwrap();
            inner.backlog.extend(tasks);
            debug!(
                batch = handles.len(),
                backlog_depth = inner.backlog.len(),
                "batch enqueued"
            );
            if inner.running || inner.backlog.is_empty() {
                false
            } else {
                inner.running = true;
                true
            }
        };
        if start {
            self.spawn_run_loop();
        }
        handles
    }

    /// Register a handler invoked each time the backlog drains.
    pub fn on_idle(&self, handler: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        // QUEUE_IDLE is declared in `new`, so subscribe cannot fail.
        self.events
            .subscribe(QUEUE_IDLE, handler)
            .expect("QUEUE_IDLE is declared")
    }

    /// Remove a previously registered idle handler.
    pub fn remove_idle_handler(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(QUEUE_IDLE, id).unwrap_or(false)
    }

    /// Drain the backlog on a spawned task.
    ///
    /// Only ever called after flipping `running` from false to true, so at
    /// most one loop is active per queue. The loop re-checks the backlog each
    /// iteration, which is how submissions made mid-drain get picked up
    /// without a second loop.
    fn spawn_run_loop(&self) {
        let inner = Arc::clone(&self.inner);
        let events = Arc::clone(&self.events);
        tokio::spawn(async move {
            debug!("run-loop started");
            loop {
                let task = {
                    let mut guard = inner.lock().unwrap();
                    match guard.backlog.pop_front() {
                        Some(task) => task,
                        None => {
                            // Clear the flag before dispatching, so idle
                            // handlers observe a stopped queue.
                            guard.running = false;
                            break;
                        }
                    }
                };
                task.run().await;
            }
            match events.emit(QUEUE_IDLE) {
                Ok(handlers) => debug!(handlers, "backlog drained, queue idle"),
                Err(e) => tracing::warn!(error = %e, "failed to emit idle event"),
            }
        });
    }
}

impl Default for SequentialTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
