//! In-memory tree.
//!
//! [`Tree`] stores nodes in a hash-indexed arena. It implements
//! [`TreeHost`] and counts structural mutations, which is what the keyed
//! reconciler's tests and benches measure.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::cleanup::CleanupRegistry;
use super::error::TreeError;
use super::host::TreeHost;
use super::node::{NodeData, NodeId, NodeKind, NodeSnapshot};

/// Counters for structural mutations since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
    /// Insertions of parentless nodes.
    pub inserted: usize,
    /// Insertions of nodes that already had a parent.
    pub moved: usize,
    /// Removals from a parent.
    pub detached: usize,
}

#[derive(Debug, Default)]
struct Arena {
    nodes: HashMap<NodeId, NodeData>,
    stats: MutationStats,
}

impl Arena {
    fn get(&self, node: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes.get(&node).ok_or_else(|| TreeError::unknown(&node))
    }

    fn get_mut(&mut self, node: NodeId) -> Result<&mut NodeData, TreeError> {
        self.nodes.get_mut(&node).ok_or_else(|| TreeError::unknown(&node))
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|data| data.parent)
    }

    /// Remove `node` from its parent's child list. Returns whether it had one.
    fn unlink(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.parent_of(node) else {
            return false;
        };
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|child| *child != node);
        }
        if let Some(data) = self.nodes.get_mut(&node) {
            data.parent = None;
        }
        true
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), TreeError> {
        self.get(parent)?;
        self.get(node)?;
        if let Some(reference) = reference {
            if reference == node {
                return Ok(());
            }
            if self.parent_of(reference) != Some(parent) {
                return Err(TreeError::not_a_child(&parent, &reference));
            }
        }

        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == node {
                return Err(TreeError::cycle(&node, &parent));
            }
            ancestor = self.parent_of(current);
        }

        let moved = self.unlink(node);
        let siblings = &mut self.get_mut(parent)?.children;
        let index = reference
            .and_then(|reference| siblings.iter().position(|child| *child == reference))
            .unwrap_or(siblings.len());
        siblings.insert(index, node);
        self.get_mut(node)?.parent = Some(parent);

        if moved {
            self.stats.moved += 1;
        } else {
            self.stats.inserted += 1;
        }
        Ok(())
    }

    fn text_content(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.nodes.get(&node) else {
            return;
        };
        if let NodeKind::Text(text) = &data.kind {
            out.push_str(text);
        }
        for child in &data.children {
            self.text_content(*child, out);
        }
    }

    fn snapshot(&self, node: NodeId) -> Option<NodeSnapshot> {
        let data = self.nodes.get(&node)?;
        Some(NodeSnapshot {
            id: node,
            kind: data.kind.clone(),
            children: data
                .children
                .iter()
                .filter_map(|child| self.snapshot(*child))
                .collect(),
        })
    }
}

/// A shared handle to an in-memory tree.
///
/// # Example
///
/// ```rust
/// use filament_core::tree::{Tree, TreeHost};
///
/// let tree = Tree::new();
/// let list = tree.element("ul");
/// let item = tree.element("li");
/// tree.append_child(list, item).unwrap();
/// tree.append_child(item, tree.text("hello")).unwrap();
///
/// assert_eq!(tree.text_content(list), "hello");
/// tree.destroy(&list).unwrap();
/// assert!(tree.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct Tree {
    arena: Rc<RefCell<Arena>>,
    cleanups: Rc<CleanupRegistry<NodeId>>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self, kind: NodeKind) -> NodeId {
        let id = NodeId::new();
        self.arena.borrow_mut().nodes.insert(id, NodeData::new(kind));
        id
    }

    /// Create a detached element.
    pub fn element(&self, tag: impl Into<String>) -> NodeId {
        self.create(NodeKind::Element(tag.into()))
    }

    /// Create a detached text node.
    pub fn text(&self, content: impl Into<String>) -> NodeId {
        self.create(NodeKind::Text(content.into()))
    }

    /// Create a detached anchor.
    pub fn anchor(&self, label: impl Into<String>) -> NodeId {
        self.create(NodeKind::Anchor(label.into()))
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.arena
            .borrow()
            .nodes
            .get(&node)
            .map(|data| data.kind.clone())
    }

    /// Whether `node` exists (has not been released).
    pub fn contains(&self, node: NodeId) -> bool {
        self.arena.borrow().nodes.contains_key(&node)
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.borrow().nodes.is_empty()
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.arena.borrow_mut().insert_before(parent, child, None)
    }

    /// Destroy every child of `parent` and mount `child` in their place.
    pub fn replace_children(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        for existing in TreeHost::children(self, &parent) {
            self.destroy(&existing)?;
        }
        self.append_child(parent, child)
    }

    /// Replace the content of a text node.
    pub fn set_text(&self, node: NodeId, content: impl Into<String>) -> Result<(), TreeError> {
        let mut arena = self.arena.borrow_mut();
        match &mut arena.get_mut(node)?.kind {
            NodeKind::Text(text) => {
                *text = content.into();
                Ok(())
            }
            _ => Err(TreeError::NotText(format!("{node:?}"))),
        }
    }

    /// Concatenated text of the subtree rooted at `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.arena.borrow().text_content(node, &mut out);
        out
    }

    pub fn stats(&self) -> MutationStats {
        self.arena.borrow().stats
    }

    pub fn reset_stats(&self) {
        self.arena.borrow_mut().stats = MutationStats::default();
    }

    pub fn snapshot(&self, node: NodeId) -> Option<NodeSnapshot> {
        self.arena.borrow().snapshot(node)
    }

    /// The subtree rooted at `node` as JSON.
    pub fn to_json(&self, node: NodeId) -> Result<serde_json::Value, TreeError> {
        let snapshot = self.snapshot(node).ok_or_else(|| TreeError::unknown(&node))?;
        Ok(serde_json::to_value(snapshot)?)
    }
}

impl TreeHost for Tree {
    type Node = NodeId;

    fn create_anchor(&self, label: &str) -> NodeId {
        self.anchor(label)
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.arena.borrow().parent_of(*node)
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let arena = self.arena.borrow();
        let parent = arena.parent_of(*node)?;
        let siblings = &arena.nodes.get(&parent)?.children;
        let index = siblings.iter().position(|child| child == node)?;
        siblings.get(index + 1).copied()
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.arena
            .borrow()
            .nodes
            .get(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn insert_before(
        &self,
        parent: &NodeId,
        node: &NodeId,
        reference: Option<&NodeId>,
    ) -> Result<(), TreeError> {
        self.arena
            .borrow_mut()
            .insert_before(*parent, *node, reference.copied())
    }

    fn detach(&self, node: &NodeId) -> Result<(), TreeError> {
        let mut arena = self.arena.borrow_mut();
        arena.get(*node)?;
        if arena.unlink(*node) {
            arena.stats.detached += 1;
        }
        Ok(())
    }

    fn release(&self, node: &NodeId) {
        {
            let mut arena = self.arena.borrow_mut();
            arena.unlink(*node);
            arena.nodes.remove(node);
        }
        self.cleanups.discard(node);
    }

    fn cleanups(&self) -> &CleanupRegistry<NodeId> {
        &self.cleanups
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena.borrow();
        f.debug_struct("Tree")
            .field("nodes", &arena.nodes.len())
            .field("stats", &arena.stats)
            .field("cleanups", &self.cleanups.len())
            .finish()
    }
}
