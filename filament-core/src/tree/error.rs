//! Tree errors.

use thiserror::Error;

/// Failures of structural tree operations.
///
/// Node handles are rendered with their `Debug` form so the error type is
/// shared by every [`TreeHost`](super::TreeHost) implementation.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The node was never created or has been released.
    #[error("unknown node {0}")]
    UnknownNode(String),

    /// An insertion reference is not a child of the target parent.
    #[error("node {reference} is not a child of {parent}")]
    NotAChild { parent: String, reference: String },

    /// The insertion would place a node inside its own subtree.
    #[error("inserting {node} under {parent} would create a cycle")]
    Cycle { node: String, parent: String },

    /// Text can only be set on text nodes.
    #[error("node {0} is not a text node")]
    NotText(String),

    #[error("failed to serialize tree snapshot")]
    Snapshot(#[from] serde_json::Error),
}

impl TreeError {
    pub fn unknown(node: &impl std::fmt::Debug) -> Self {
        Self::UnknownNode(format!("{node:?}"))
    }

    pub fn not_a_child(parent: &impl std::fmt::Debug, reference: &impl std::fmt::Debug) -> Self {
        Self::NotAChild {
            parent: format!("{parent:?}"),
            reference: format!("{reference:?}"),
        }
    }

    pub fn cycle(node: &impl std::fmt::Debug, parent: &impl std::fmt::Debug) -> Self {
        Self::Cycle {
            node: format!("{node:?}"),
            parent: format!("{parent:?}"),
        }
    }
}
