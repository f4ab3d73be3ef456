//! Output Tree
//!
//! The reconciler never touches a concrete UI surface. It drives an output
//! tree through the [`TreeHost`] trait, which adapters implement over their
//! rendering surface, and relies on a node-scoped [`CleanupRegistry`] to
//! release whatever was attached to nodes it removes.
//!
//! # Overview
//!
//! - `host`: the [`TreeHost`] trait: structural primitives plus `destroy`
//! - `cleanup`: teardown callbacks keyed by node, run exactly once
//! - `arena`: [`Tree`], an in-memory host used by tests, benches and
//!   headless adapters
//! - `node`: node identity, kinds and serializable snapshots
//!
//! # Design Decisions
//!
//! 1. Host methods take `&self`. Hosts are shared between the reconciler,
//!    its subscriptions and adapter code, so they use interior mutability.
//!
//! 2. Moving a node is just `insert_before` on a node that already has a
//!    parent, mirroring how DOM-like trees behave.
//!
//! 3. Cleanups run before a node is detached, never after.

mod arena;
mod cleanup;
mod error;
mod host;
mod node;

pub use arena::{MutationStats, Tree};
pub use cleanup::CleanupRegistry;
pub use error::TreeError;
pub use host::TreeHost;
pub use node::{NodeId, NodeKind, NodeSnapshot};
