//! Subscriber types for the reactive system.
//!
//! A subscriber is anything that listens to a signal: a computation's
//! dependency link, a keyed list watching its source, or a plain callback
//! registered by adapter code. Registering a listener yields a
//! [`Subscription`] whose `cancel` removes it again.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Each listener (and each computation) gets a unique ID when created. The
/// ID keys the signal's listener table, which keeps notification in
/// subscription order and makes removal O(1) amortized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// De-registration handle returned by `subscribe`.
///
/// `cancel` removes the listener and is idempotent. Dropping a subscription
/// does not cancel it: a listener stays registered until cancelled or until
/// the signal itself is dropped.
pub struct Subscription {
    id: SubscriberId,
    cancel: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    pub(crate) fn new<F>(id: SubscriberId, cancel: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            id,
            cancel: RefCell::new(Some(Box::new(cancel))),
        }
    }

    /// The ID of the listener this subscription controls.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the listener. Calling this more than once has no effect.
    pub fn cancel(&self) {
        let cancel = self.cancel.borrow_mut().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether `cancel` has already been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.borrow().is_none()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
