//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! notifies listeners when that value changes.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a running computation, the computation
//!    subscribes to the signal. Tracking is a side effect of reading.
//!
//! 2. When a signal's value changes, every listener is invoked synchronously
//!    with the new value, in subscription order.
//!
//! 3. Listeners installed by computations only schedule a re-run; the re-run
//!    itself happens at the next microtask flush.
//!
//! # Equality
//!
//! A write whose value compares equal to the current one is dropped without
//! notifying anyone. `Signal::new` compares with `PartialEq`; use
//! [`Signal::with_equals`] together with [`same_rc`] when values should be
//! compared by reference identity instead.
//!
//! # Threading
//!
//! Signals are single-threaded (`Rc` + `RefCell`). The whole reactive model
//! is cooperative and every notification completes synchronously.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context;
use super::subscriber::{SubscriberId, Subscription};

/// Unique identifier for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u64);

impl SignalId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

type Listener<T> = Rc<dyn Fn(&T)>;

/// Comparator deciding whether a write is a no-op.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Reference-identity comparator for `Rc`-wrapped values.
///
/// Two structurally equal values behind different allocations are distinct.
pub fn same_rc<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::ptr_eq(a, b)
}

struct SignalInner<T> {
    id: SignalId,
    value: RefCell<T>,
    /// Bumped on every stored write; lets a notification pass notice that a
    /// listener wrote the signal again.
    version: Cell<u64>,
    listeners: RefCell<IndexMap<SubscriberId, Listener<T>>>,
    equals: EqualsFn<T>,
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// count.update(|n| n + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new signal that skips writes equal (`==`) to the current value.
    pub fn new(value: T) -> Self {
        Self::with_equals(value, <T as PartialEq>::eq)
    }
}

impl<T> Signal<T>
where
    T: Clone + 'static,
{
    /// Create a new signal with a custom equality check.
    pub fn with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: SignalId::next(),
                value: RefCell::new(value),
                version: Cell::new(0),
                listeners: RefCell::new(IndexMap::new()),
                equals,
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called while a computation is running, that computation starts
    /// depending on this signal.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Get the current value without tracking a dependency.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value (tracked) without cloning it.
    ///
    /// `f` must not write to this same signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Set a new value and notify listeners if it differs from the current one.
    pub fn set(&self, value: T) {
        let unchanged = {
            let current = self.inner.value.borrow();
            (self.inner.equals)(&current, &value)
        };
        if unchanged {
            return;
        }

        *self.inner.value.borrow_mut() = value;
        self.inner.version.set(self.inner.version.get() + 1);
        self.notify();
    }

    /// Update the value from the previous one.
    ///
    /// `f` always sees the value current at the time of the call.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.inner.value.borrow();
            f(&current)
        };
        self.set(next);
    }

    /// Register a listener invoked with the new value after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let id = SubscriberId::new();
        self.inner
            .listeners
            .borrow_mut()
            .insert(id, Rc::new(listener));

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().shift_remove(&id);
            }
        })
    }

    /// Get the number of listeners, including computation links.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// A handle that can read and subscribe but never write.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
        }
    }

    fn track(&self) {
        context::track(self.inner.id, |notify| self.subscribe(move |_| notify()));
    }

    /// Invoke every listener registered when the pass starts.
    ///
    /// Listeners cancelled mid-pass are skipped; each listener receives the
    /// freshest value, so a listener that writes the signal again does not
    /// leave later listeners observing a stale one.
    fn notify(&self) {
        let snapshot: SmallVec<[(SubscriberId, Listener<T>); 4]> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();
        if snapshot.is_empty() {
            return;
        }

        let mut version = self.inner.version.get();
        let mut value = self.inner.value.borrow().clone();
        for (id, listener) in snapshot {
            if !self.inner.listeners.borrow().contains_key(&id) {
                continue;
            }
            if self.inner.version.get() != version {
                version = self.inner.version.get();
                value = self.inner.value.borrow().clone();
            }
            listener(&value);
        }
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Read-only view of a [`Signal`].
pub struct ReadSignal<T: 'static> {
    signal: Signal<T>,
}

impl<T> ReadSignal<T>
where
    T: Clone + 'static,
{
    pub fn id(&self) -> SignalId {
        self.signal.id()
    }

    pub fn get(&self) -> T {
        self.signal.get()
    }

    pub fn get_untracked(&self) -> T {
        self.signal.get_untracked()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.signal.subscribe(listener)
    }
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> Debug for ReadSignal<T>
where
    T: Clone + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.signal).finish()
    }
}

/// Anything that can be read and observed like a signal.
///
/// Implemented by [`Signal`], [`ReadSignal`] and
/// [`Computed`](super::Computed). The keyed reconciler accepts any
/// `SignalRead<Vec<T>>` as its source.
pub trait SignalRead<T> {
    /// Read the value, tracking a dependency.
    fn get(&self) -> T;

    /// Read the value without tracking.
    fn get_untracked(&self) -> T;

    /// Register a change listener.
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static;
}

impl<T: Clone + 'static> SignalRead<T> for Signal<T> {
    fn get(&self) -> T {
        Signal::get(self)
    }

    fn get_untracked(&self) -> T {
        Signal::get_untracked(self)
    }

    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        Signal::subscribe(self, listener)
    }
}

impl<T: Clone + 'static> SignalRead<T> for ReadSignal<T> {
    fn get(&self) -> T {
        ReadSignal::get(self)
    }

    fn get_untracked(&self) -> T {
        ReadSignal::get_untracked(self)
    }

    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        ReadSignal::subscribe(self, listener)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<usize>>, impl Fn(&i32) + 'static) {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        (count, move |_: &i32| count_clone.set(count_clone.get() + 1))
    }

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_notifies_subscribers() {
        let signal = Signal::new(0);
        let (count, listener) = counter();
        let _subscription = signal.subscribe(listener);

        assert_eq!(count.get(), 0);

        signal.set(1);
        assert_eq!(count.get(), 1);

        signal.set(2);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn equal_write_does_not_notify() {
        let signal = Signal::new(7);
        let (count, listener) = counter();
        let _subscription = signal.subscribe(listener);

        signal.set(7);
        signal.update(|v| *v);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn identity_equality_treats_equal_contents_as_distinct() {
        let first = Rc::new(vec![1, 2, 3]);
        let signal = Signal::with_equals(first.clone(), same_rc::<Vec<i32>>);

        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let _subscription = signal.subscribe(move |_| seen_clone.set(seen_clone.get() + 1));

        signal.set(first.clone());
        assert_eq!(seen.get(), 0);

        signal.set(Rc::new(vec![1, 2, 3]));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn listeners_receive_new_value_in_subscription_order() {
        let signal = Signal::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_a = log.clone();
        let _a = signal.subscribe(move |v| log_a.borrow_mut().push(("a", *v)));
        let log_b = log.clone();
        let _b = signal.subscribe(move |v| log_b.borrow_mut().push(("b", *v)));

        signal.set(3);
        assert_eq!(*log.borrow(), vec![("a", 3), ("b", 3)]);
    }

    #[test]
    fn signal_unsubscribe() {
        let signal = Signal::new(0);
        let (count, listener) = counter();
        let subscription = signal.subscribe(listener);

        signal.set(1);
        assert_eq!(count.get(), 1);

        subscription.cancel();
        subscription.cancel();
        signal.set(2);
        assert_eq!(count.get(), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn listener_cancelled_mid_pass_is_skipped() {
        let signal = Signal::new(0);
        let late = Rc::new(RefCell::new(None::<Subscription>));
        let (count, listener) = counter();

        let late_clone = late.clone();
        let _first = signal.subscribe(move |_| {
            if let Some(subscription) = late_clone.borrow().as_ref() {
                subscription.cancel();
            }
        });
        *late.borrow_mut() = Some(signal.subscribe(listener));

        signal.set(1);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn reentrant_write_gives_later_listeners_the_fresh_value() {
        let signal = Signal::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let writer = signal.clone();
        let _first = signal.subscribe(move |v| {
            if *v == 1 {
                writer.set(2);
            }
        });
        let seen_clone = seen.clone();
        let _second = signal.subscribe(move |v| seen_clone.borrow_mut().push(*v));

        signal.set(1);
        // The nested write notifies with 2 first; the outer pass then
        // continues with the fresh value rather than the stale 1.
        assert_eq!(*seen.borrow(), vec![2, 2]);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
    }

    #[test]
    fn read_only_view_tracks_the_source() {
        let signal = Signal::new(String::from("a"));
        let view = signal.read_only();

        signal.set(String::from("b"));
        assert_eq!(view.get(), "b");
        assert_eq!(view.with(|s| s.len()), 1);
        assert_eq!(view.id(), signal.id());
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);
        let s3 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
    }
}
