//! The host tree abstraction.

use std::fmt::Debug;
use std::hash::Hash;

use super::cleanup::CleanupRegistry;
use super::error::TreeError;

/// A mutable output tree the reconciler can drive.
///
/// Implementations are cheap-clone handles onto shared state. Only
/// structural primitives are required; moving, destroying and cleanup
/// bookkeeping are built on top of them.
pub trait TreeHost: Clone + 'static {
    /// Handle identifying one node. Equal handles mean the same node.
    type Node: Clone + Eq + Hash + Debug + 'static;

    /// Create a detached, invisible marker node.
    fn create_anchor(&self, label: &str) -> Self::Node;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Insert `node` into `parent` before `reference`, or last when
    /// `reference` is `None`. A node that already has a parent is moved.
    fn insert_before(
        &self,
        parent: &Self::Node,
        node: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), TreeError>;

    /// Remove `node` from its parent. Detaching a parentless node is a no-op.
    fn detach(&self, node: &Self::Node) -> Result<(), TreeError>;

    /// Free the storage of a destroyed node. Hosts with managed node
    /// lifetimes can leave this as a no-op.
    fn release(&self, _node: &Self::Node) {}

    /// The cleanup registry shared by everyone attaching teardown to nodes.
    fn cleanups(&self) -> &CleanupRegistry<Self::Node>;

    /// Insert `node` into `parent` right after `after`.
    fn insert_after(
        &self,
        parent: &Self::Node,
        node: &Self::Node,
        after: &Self::Node,
    ) -> Result<(), TreeError> {
        let reference = self.next_sibling(after);
        if reference.as_ref() == Some(node) {
            return Ok(());
        }
        self.insert_before(parent, node, reference.as_ref())
    }

    /// Attach a teardown callback to `node`.
    fn on_cleanup<F>(&self, node: &Self::Node, f: F)
    where
        F: FnOnce() + 'static,
    {
        self.cleanups().register(node, f);
    }

    /// `node` and all of its descendants in document order.
    fn descendants(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack = vec![node.clone()];
        while let Some(current) = stack.pop() {
            let mut children = self.children(&current);
            children.reverse();
            stack.extend(children);
            out.push(current);
        }
        out
    }

    /// Tear a subtree down: run every cleanup registered inside it in
    /// document order, then detach and release it.
    ///
    /// Cleanups may themselves destroy nodes of the same subtree; each
    /// callback still runs exactly once.
    fn destroy(&self, node: &Self::Node) -> Result<(), TreeError> {
        let nodes = self.descendants(node);
        for current in &nodes {
            self.cleanups().run(current);
        }

        match self.detach(node) {
            Ok(()) | Err(TreeError::UnknownNode(_)) => {}
            Err(err) => return Err(err),
        }
        for current in &nodes {
            self.release(current);
        }
        Ok(())
    }
}
