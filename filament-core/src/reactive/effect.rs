//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever a signal
//! it read during its previous run changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is scheduled. Scheduling is
//!    idempotent until the next run starts, so several writes in one turn
//!    cause a single re-run at the next microtask flush.
//!
//! 3. Each run first tears down every link from the previous run and runs
//!    the previous cleanup, then tracks fresh links while the body executes.
//!    Signals that are read only conditionally drop out as soon as a run
//!    stops reading them.
//!
//! # Cleanup
//!
//! The body may return a [`Cleanup`]. It runs before the next run and when
//! the effect is disposed. A panicking cleanup is logged and swallowed so it
//! can never block a re-run or a teardown.
//!
//! # Lifetime
//!
//! Dropping an [`Effect`] handle does not stop the effect; the signals it
//! depends on keep it alive. Call [`Effect::dispose`] to stop it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{trace, warn};

use super::context::ReactiveContext;
use super::error::panic_message;
use super::scheduler;
use super::signal::SignalId;
use super::subscriber::{SubscriberId, Subscription};

/// A teardown callback.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self(Box::new(f))
    }

    /// Run the callback, catching and logging a panic instead of propagating it.
    ///
    /// Returns `false` if the callback panicked.
    pub fn run(self) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(self.0)) {
            Ok(()) => true,
            Err(payload) => {
                warn!(message = %panic_message(payload.as_ref()), "cleanup panicked; ignoring");
                false
            }
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Values an effect body may return.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

type Body = Box<dyn FnMut() -> Option<Cleanup>>;

/// The re-runnable unit behind effects and computed values.
pub(crate) struct Computation {
    id: SubscriberId,
    active: Cell<bool>,
    scheduled: Cell<bool>,
    /// Links made during the most recent run, one per signal.
    links: RefCell<IndexMap<SignalId, Subscription>>,
    cleanup: RefCell<Option<Cleanup>>,
    body: RefCell<Body>,
    /// Set when a run is requested while the body is already executing.
    rerun_requested: Cell<bool>,
    run_count: Cell<usize>,
    this: Weak<Computation>,
}

impl Computation {
    pub(crate) fn new<F>(body: F) -> Rc<Self>
    where
        F: FnMut() -> Option<Cleanup> + 'static,
    {
        Rc::new_cyclic(|this| Self {
            id: SubscriberId::new(),
            active: Cell::new(true),
            scheduled: Cell::new(false),
            links: RefCell::new(IndexMap::new()),
            cleanup: RefCell::new(None),
            body: RefCell::new(Box::new(body)),
            rerun_requested: Cell::new(false),
            run_count: Cell::new(0),
            this: this.clone(),
        })
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn is_scheduled(&self) -> bool {
        self.scheduled.get()
    }

    pub(crate) fn is_linked(&self, signal: SignalId) -> bool {
        self.links.borrow().contains_key(&signal)
    }

    pub(crate) fn link(&self, signal: SignalId, subscription: Subscription) {
        self.links.borrow_mut().insert(signal, subscription);
    }

    pub(crate) fn link_count(&self) -> usize {
        self.links.borrow().len()
    }

    pub(crate) fn run_count(&self) -> usize {
        self.run_count.get()
    }

    /// Drop every link and run the pending cleanup.
    fn teardown(&self) {
        let links: Vec<Subscription> = self
            .links
            .borrow_mut()
            .drain(..)
            .map(|(_, subscription)| subscription)
            .collect();
        for subscription in links {
            subscription.cancel();
        }

        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }
    }

    /// Run the body once, re-tracking its dependencies.
    pub(crate) fn run(&self) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let Ok(mut body) = self.body.try_borrow_mut() else {
            // Already executing further up the stack; run again once it returns.
            self.rerun_requested.set(true);
            return;
        };

        self.scheduled.set(false);
        self.teardown();
        trace!(computation = ?self.id, "running");

        let next_cleanup = {
            let _ctx = ReactiveContext::enter(this);
            body()
        };
        drop(body);
        self.run_count.set(self.run_count.get() + 1);

        if let Some(cleanup) = next_cleanup {
            if self.is_active() {
                *self.cleanup.borrow_mut() = Some(cleanup);
            } else {
                // Disposed from inside its own body.
                cleanup.run();
            }
        }

        if self.rerun_requested.replace(false) {
            self.schedule();
        }
    }

    /// Queue a re-run for the next flush. Idempotent until that run starts.
    pub(crate) fn schedule(&self) {
        if self.scheduled.get() || !self.is_active() {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };

        self.scheduled.set(true);
        trace!(computation = ?self.id, "scheduled");
        scheduler::queue_microtask(move || {
            if this.is_active() {
                this.run();
            }
        });
    }

    /// Permanently deactivate and tear down. Idempotent.
    pub(crate) fn dispose(&self) {
        if !self.active.replace(false) {
            return;
        }
        trace!(computation = ?self.id, "disposed");
        self.teardown();
    }
}

/// A side-effecting computation that re-runs when its dependencies change.
///
/// The handle doubles as the effect's disposer.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::{effect, scheduler, Signal};
///
/// let count = Signal::new(0);
///
/// let reader = count.clone();
/// let handle = effect(move || {
///     println!("Count is: {}", reader.get());
/// });
///
/// count.set(5);
/// scheduler::flush().unwrap(); // Prints: "Count is: 5"
/// handle.dispose();
/// ```
#[derive(Clone)]
pub struct Effect {
    computation: Rc<Computation>,
}

impl Effect {
    /// Same as [`effect`].
    pub fn new<F, R>(body: F) -> Self
    where
        F: FnMut() -> R + 'static,
        R: IntoCleanup,
    {
        effect(body)
    }

    /// Get the effect's subscriber ID.
    pub fn id(&self) -> SubscriberId {
        self.computation.id()
    }

    /// Stop the effect: unlink it from every signal and run its cleanup.
    ///
    /// Safe to call repeatedly and from inside the effect's own body.
    pub fn dispose(&self) {
        self.computation.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        !self.computation.is_active()
    }

    /// Whether a re-run is queued for the next flush.
    pub fn is_scheduled(&self) -> bool {
        self.computation.is_scheduled()
    }

    /// Get the number of completed runs.
    pub fn run_count(&self) -> usize {
        self.computation.run_count()
    }

    /// Get the number of signals read during the most recent run.
    pub fn dependency_count(&self) -> usize {
        self.computation.link_count()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Create an effect and run it once immediately.
///
/// A panic in that first run propagates to the caller. Panics in later runs
/// surface from [`scheduler::flush`] instead.
pub fn effect<F, R>(mut body: F) -> Effect
where
    F: FnMut() -> R + 'static,
    R: IntoCleanup,
{
    let computation = Computation::new(move || body().into_cleanup());
    computation.run();
    Effect { computation }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
