//! Keyed Reconciliation
//!
//! Maps an ordered, keyed sequence held in a signal onto contiguous node
//! ranges ("blocks") in a host tree, creating, moving and removing blocks as
//! the sequence changes.
//!
//! # Algorithm
//!
//! One forward pass per update with a cursor starting at the list's anchor:
//!
//! 1. New key: render the item, insert its nodes right after the cursor.
//! 2. Known key: if its block does not already follow the cursor, move the
//!    whole range there. The block keeps its nodes and whatever reactive
//!    state hangs off them.
//! 3. The cursor advances to the end of the block either way.
//! 4. After the pass, blocks whose keys disappeared run their node cleanups
//!    and are removed.
//!
//! The pass is not move-optimal. A full reversal of n items costs n - 1
//! moves, where an LIS-based diff would report the same, but a single item
//! moved from the back to the front costs one move while one moved from the
//! front to the back costs n - 1.

mod block;
mod keyed;

pub use block::Block;
pub use keyed::{repeat, repeat_indexed, repeat_with, KeyedList, KeyedOptions, ReconcileStats};
