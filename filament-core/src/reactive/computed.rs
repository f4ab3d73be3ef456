//! Computed Implementation
//!
//! A Computed is a read-only signal whose value is produced by an effect.
//!
//! # How Computed Values Work
//!
//! 1. On creation, the calculation runs once inside an effect and its
//!    result seeds a private backing signal.
//!
//! 2. When a dependency changes, the effect is scheduled like any other and
//!    recomputes at the next flush.
//!
//! 3. The new value is written into the backing signal, which skips the
//!    write (and all downstream notification) if it compares equal.
//!
//! # Eager, Not Lazy
//!
//! Unlike a pull-based memo, a Computed updates during the flush that
//! follows a dependency change, whether or not anyone reads it. Readers
//! always see the value from the most recent flush.

use std::cell::OnceCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::effect::{effect, Effect};
use super::signal::{EqualsFn, Signal, SignalId, SignalRead};
use super::subscriber::Subscription;

/// A cached derived value.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::{computed, scheduler, Signal};
///
/// let a = Signal::new(1);
/// let b = Signal::new(2);
///
/// let (ra, rb) = (a.clone(), b.clone());
/// let sum = computed(move || ra.get() + rb.get());
/// assert_eq!(sum.get(), 3);
///
/// a.set(10);
/// scheduler::flush().unwrap();
/// assert_eq!(sum.get(), 12);
/// ```
pub struct Computed<T: 'static> {
    value: Signal<T>,
    effect: Effect,
}

impl<T> Computed<T>
where
    T: Clone + 'static,
{
    /// ID of the backing signal.
    pub fn id(&self) -> SignalId {
        self.value.id()
    }

    /// Read the value, tracking a dependency.
    pub fn get(&self) -> T {
        self.value.get()
    }

    pub fn get_untracked(&self) -> T {
        self.value.get_untracked()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value.with(f)
    }

    /// Register a listener called whenever the computed value changes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.value.subscribe(listener)
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.effect.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.effect.is_disposed()
    }

    /// Number of times the calculation has run.
    pub fn run_count(&self) -> usize {
        self.effect.run_count()
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &self.value.get_untracked())
            .field("effect", &self.effect)
            .finish()
    }
}

impl<T: Clone + 'static> SignalRead<T> for Computed<T> {
    fn get(&self) -> T {
        Computed::get(self)
    }

    fn get_untracked(&self) -> T {
        Computed::get_untracked(self)
    }

    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        Computed::subscribe(self, listener)
    }
}

/// Create a derived value that only notifies when the result changes (`==`).
pub fn computed<T, F>(calc: F) -> Computed<T>
where
    T: Clone + PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    computed_with_equals(calc, <T as PartialEq>::eq)
}

/// Alias of [`computed`].
pub fn memo<T, F>(calc: F) -> Computed<T>
where
    T: Clone + PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    computed(calc)
}

/// Create a derived value with a custom equality check.
pub fn computed_with_equals<T, F>(mut calc: F, equals: EqualsFn<T>) -> Computed<T>
where
    T: Clone + 'static,
    F: FnMut() -> T + 'static,
{
    let slot: Rc<OnceCell<Signal<T>>> = Rc::new(OnceCell::new());
    let writer = Rc::clone(&slot);

    let effect = effect(move || {
        let next = calc();
        match writer.get() {
            Some(out) => out.set(next),
            None => {
                let _ = writer.set(Signal::with_equals(next, equals));
            }
        }
    });

    let value = slot
        .get()
        .cloned()
        .expect("computed calculation runs during construction");
    Computed { value, effect }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
