//! Microtask Scheduler
//!
//! A per-thread FIFO of deferred tasks. Invalidated computations enqueue a
//! single re-run here instead of running inline; [`flush`] is the microtask
//! checkpoint where the graph actually updates.
//!
//! # Ordering
//!
//! Tasks run in the order they were queued. A task that queues further tasks
//! appends them to the same flush, so cascades converge within one call to
//! [`flush`] without any topological sorting. Each run reads signal values
//! at flush time, never a snapshot from when it was scheduled.
//!
//! # Failures
//!
//! A panicking task is caught and logged, and the flush carries on with the
//! rest of the queue. The failures are reported once the queue is drained.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, trace, warn};

use super::error::{panic_message, ReactiveError};

type Task = Box<dyn FnOnce()>;

/// Per-thread scheduler settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Stop a flush after this many tasks. `None` drains until empty.
    pub max_tasks_per_flush: Option<usize>,
}

impl SchedulerConfig {
    pub fn with_max_tasks_per_flush(mut self, limit: usize) -> Self {
        self.max_tasks_per_flush = Some(limit);
        self
    }
}

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
    static CONFIG: Cell<SchedulerConfig> = Cell::new(SchedulerConfig::default());
}

/// Install the scheduler settings for the current thread.
pub fn configure(config: SchedulerConfig) {
    CONFIG.with(|c| c.set(config));
}

/// The scheduler settings for the current thread.
pub fn config() -> SchedulerConfig {
    CONFIG.with(|c| c.get())
}

/// Defer `task` to the next flush.
pub fn queue_microtask<F>(task: F)
where
    F: FnOnce() + 'static,
{
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Number of tasks waiting for the next flush.
pub fn pending() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Whether a flush is running on this thread.
pub fn is_flushing() -> bool {
    FLUSHING.with(|f| f.get())
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let _ = FLUSHING.try_with(|f| f.set(false));
    }
}

/// Run queued tasks until the queue is empty.
///
/// Returns the number of tasks run. Calling `flush` from inside a task is a
/// no-op returning `Ok(0)`; the outer flush picks up anything newly queued.
pub fn flush() -> Result<usize, ReactiveError> {
    if FLUSHING.with(|f| f.replace(true)) {
        return Ok(0);
    }
    let _guard = FlushGuard;
    let limit = config().max_tasks_per_flush;

    let mut ran = 0;
    let mut failed = 0;
    let mut first_failure: Option<String> = None;

    loop {
        if let Some(limit) = limit {
            if ran >= limit {
                let remaining = pending();
                if remaining > 0 {
                    warn!(limit, remaining, failed, "flush task limit reached");
                    return Err(ReactiveError::FlushLimitExceeded {
                        limit,
                        remaining,
                        failed,
                        first_panic: first_failure,
                    });
                }
            }
        }

        let Some(task) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) else {
            break;
        };
        ran += 1;

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            let message = panic_message(payload.as_ref());
            error!(%message, "microtask panicked");
            failed += 1;
            first_failure.get_or_insert(message);
        }
    }

    trace!(ran, failed, "flush complete");
    match first_failure {
        Some(message) => Err(ReactiveError::TaskPanicked { failed, message }),
        None => Ok(ran),
    }
}
