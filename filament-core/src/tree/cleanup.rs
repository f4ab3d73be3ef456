//! Node-scoped cleanup registry.
//!
//! Adapters attach teardown callbacks to tree positions (event listeners,
//! signal subscriptions, nested lists). The registry guarantees each
//! callback runs at most once, before its node is structurally removed,
//! and that a panicking callback never escapes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use smallvec::SmallVec;

use crate::reactive::Cleanup;

/// Teardown callbacks keyed by node.
pub struct CleanupRegistry<N> {
    entries: RefCell<HashMap<N, SmallVec<[Cleanup; 1]>>>,
}

impl<N> CleanupRegistry<N>
where
    N: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Attach a callback to `node`. Callbacks on one node run in registration order.
    pub fn register<F>(&self, node: &N, f: F)
    where
        F: FnOnce() + 'static,
    {
        self.register_cleanup(node, Cleanup::new(f));
    }

    pub fn register_cleanup(&self, node: &N, cleanup: Cleanup) {
        self.entries
            .borrow_mut()
            .entry(node.clone())
            .or_default()
            .push(cleanup);
    }

    /// Run and forget every callback on `node`. Returns how many ran.
    ///
    /// Callbacks may freely touch the registry (including registering new
    /// callbacks on `node`, which wait for the next `run`).
    pub fn run(&self, node: &N) -> usize {
        let taken = self.entries.borrow_mut().remove(node);
        let Some(cleanups) = taken else {
            return 0;
        };
        let count = cleanups.len();
        for cleanup in cleanups {
            cleanup.run();
        }
        count
    }

    /// Forget the callbacks on `node` without running them.
    pub fn discard(&self, node: &N) -> usize {
        self.entries
            .borrow_mut()
            .remove(node)
            .map_or(0, |cleanups| cleanups.len())
    }

    pub fn has(&self, node: &N) -> bool {
        self.entries.borrow().contains_key(node)
    }

    /// Number of nodes with pending callbacks.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<N> Default for CleanupRegistry<N>
where
    N: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N> fmt::Debug for CleanupRegistry<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupRegistry")
            .field("nodes", &self.entries.borrow().len())
            .finish()
    }
}
