//! Filament Core
//!
//! This crate provides the engine behind Filament's fine-grained rendering.
//! It implements:
//!
//! - Reactive primitives (signals, effects, computed values)
//! - A microtask scheduler that coalesces effect re-runs
//! - A host tree abstraction with node-scoped cleanups
//! - A keyed list reconciler that reuses rendered blocks across updates
//!
//! There is no virtual tree: effects write to host nodes directly, and
//! lists are diffed by key only.
//!
//! # Architecture
//!
//! - `reactive`: signals, dependency tracking and the scheduler
//! - `tree`: the [`tree::TreeHost`] trait and an in-memory [`tree::Tree`]
//! - `reconcile`: keyed list rendering on top of any `TreeHost`
//!
//! Everything is single-threaded. Handles are `Rc`-based and the current
//! computation and task queue are thread-local.
//!
//! # Example
//!
//! ```rust
//! use filament_core::reactive::{computed, effect, scheduler, Signal};
//!
//! let count = Signal::new(1);
//!
//! let source = count.clone();
//! let doubled = computed(move || source.get() * 2);
//!
//! let reader = doubled.clone();
//! let log = effect(move || println!("doubled: {}", reader.get()));
//!
//! count.set(5);
//! scheduler::flush().unwrap();
//! assert_eq!(doubled.get(), 10);
//! assert_eq!(log.run_count(), 2);
//! ```

pub mod reactive;
pub mod reconcile;
pub mod tree;
