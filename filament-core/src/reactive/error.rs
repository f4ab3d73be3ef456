//! Errors surfaced by the reactive runtime.
//!
//! Body panics of a first effect run propagate to the caller of `effect`.
//! Everything that fails later, inside the microtask queue, is collected
//! here and reported by [`flush`](super::scheduler::flush).

use std::any::Any;

use thiserror::Error;

/// Failures reported by a microtask flush.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// One or more queued tasks panicked. The flush still ran every other task.
    #[error("{failed} microtask(s) panicked during flush; first panic: {message}")]
    TaskPanicked { failed: usize, message: String },

    /// The configured per-flush task cap was reached before the queue drained.
    /// Panics caught among the tasks that did run are carried along.
    #[error("flush stopped after {limit} tasks with {remaining} still queued ({failed} panicked)")]
    FlushLimitExceeded {
        limit: usize,
        remaining: usize,
        failed: usize,
        first_panic: Option<String>,
    },
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
