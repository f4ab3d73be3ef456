//! Reactive Primitives
//!
//! This module implements the reactive core: signals, effects, computed
//! values and the microtask scheduler that batches their updates.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while a computation is running, that computation subscribes to the
//! signal. When the value changes, every listener is notified synchronously.
//!
//! ## Effects
//!
//! An Effect is a re-runnable computation. A signal change never runs it
//! inline: it is scheduled, and all scheduled effects run at the next
//! [`scheduler::flush`]. Several writes in one synchronous turn are therefore
//! observed as one settled state.
//!
//! ## Computed values
//!
//! A Computed is an effect that writes its result into a private signal and
//! exposes that signal read-only.
//!
//! # Implementation Notes
//!
//! Everything here is single-threaded. The current computation lives in a
//! thread-local slot, and the scheduler queue is thread-local as well.

mod computed;
mod context;
mod effect;
mod error;
pub mod scheduler;
mod signal;
mod subscriber;

pub use computed::{computed, computed_with_equals, memo, Computed};
pub use context::{untrack, ReactiveContext};
pub use effect::{effect, Cleanup, Effect, IntoCleanup};
pub use error::ReactiveError;
pub use scheduler::SchedulerConfig;
pub use signal::{same_rc, EqualsFn, ReadSignal, Signal, SignalId, SignalRead};
pub use subscriber::{SubscriberId, Subscription};
