//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can subscribe the current computation to it.
//!
//! # Implementation
//!
//! A thread-local slot holds the running computation. Entering a context
//! swaps the new computation in and keeps the previous occupant in the
//! returned guard; dropping the guard swaps it back. Nested runs therefore
//! follow a strict stack discipline even though only the top is stored, and
//! the previous occupant is restored even if the computation panics.

use std::cell::RefCell;
use std::rc::Rc;

use super::effect::Computation;
use super::signal::SignalId;
use super::subscriber::{SubscriberId, Subscription};

thread_local! {
    static CURRENT: RefCell<Option<Rc<Computation>>> = const { RefCell::new(None) };
}

/// Guard that restores the previous computation when dropped.
pub struct ReactiveContext {
    previous: Option<Rc<Computation>>,
    entered: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Make `computation` the current one until the guard is dropped.
    pub(crate) fn enter(computation: Rc<Computation>) -> Self {
        let entered = Some(computation.id());
        let previous = CURRENT.with(|slot| slot.replace(Some(computation)));
        Self { previous, entered }
    }

    /// Clear the current computation until the guard is dropped.
    fn suspend() -> Self {
        let previous = CURRENT.with(|slot| slot.replace(None));
        Self {
            previous,
            entered: None,
        }
    }

    /// Check if a computation is currently running.
    pub fn is_active() -> bool {
        CURRENT.with(|slot| slot.borrow().is_some())
    }

    /// Get the ID of the running computation, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CURRENT.with(|slot| slot.borrow().as_ref().map(|c| c.id()))
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let entered = self.entered;
        // The slot may already be gone during thread teardown.
        let _ = CURRENT.try_with(|slot| {
            let popped = slot.replace(previous);
            debug_assert_eq!(
                popped.as_ref().map(|c| c.id()),
                entered,
                "ReactiveContext mismatch"
            );
        });
    }
}

/// Run `f` without a current computation, so none of its reads are tracked.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::suspend();
    f()
}

/// Link the current computation to a signal that is being read.
///
/// No-op without a current computation, for a disposed one, or when the
/// signal is already linked during this run. `subscribe` receives the
/// callback to install; it only schedules the computation, never runs it.
pub(crate) fn track<S>(signal: SignalId, subscribe: S)
where
    S: FnOnce(Rc<dyn Fn()>) -> Subscription,
{
    let current = CURRENT.with(|slot| slot.borrow().clone());
    let Some(computation) = current else {
        return;
    };
    if !computation.is_active() || computation.is_linked(signal) {
        return;
    }

    let target = Rc::clone(&computation);
    let subscription = subscribe(Rc::new(move || {
        if target.is_active() {
            target.schedule();
        }
    }));
    computation.link(signal, subscription);
}
