//! Tree Nodes
//!
//! This module defines the node types that live in the in-memory tree.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Unique identifier for a node in a [`Tree`](super::Tree).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum NodeKind {
    /// A container with a tag name. The only kind that can have children.
    Element(String),

    /// A text leaf.
    Text(String),

    /// An invisible position marker, used for list anchors and empty blocks.
    Anchor(String),
}

impl NodeKind {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element(_))
    }
}

/// Arena storage for one node.
#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A serializable copy of a subtree, for assertions and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn new_node_is_detached_and_empty() {
        let node = NodeData::new(NodeKind::Element("ul".into()));
        assert!(node.kind.is_element());
        assert!(node.parent.is_none());
        assert!(node.children.is_empty());
    }

    #[test]
    fn snapshot_serializes_kind_inline() {
        let snapshot = NodeSnapshot {
            id: NodeId(7),
            kind: NodeKind::Text("hi".into()),
            children: Vec::new(),
        };

        let json = serde_json::to_value(&snapshot).expect("snapshot serializes");
        assert_eq!(
            json,
            serde_json::json!({ "id": 7, "kind": "text", "value": "hi" })
        );
    }
}
