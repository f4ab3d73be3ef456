//! A rendered, keyed range of sibling nodes.

use smallvec::SmallVec;

/// The contiguous nodes produced by rendering one item.
///
/// A block is never empty; the reconciler substitutes an anchor for a
/// render that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<N> {
    nodes: SmallVec<[N; 1]>,
}

impl<N> Block<N> {
    pub(crate) fn new(nodes: impl IntoIterator<Item = N>) -> Self {
        let nodes: SmallVec<[N; 1]> = nodes.into_iter().collect();
        debug_assert!(!nodes.is_empty(), "blocks are never empty");
        Self { nodes }
    }

    /// First node of the range.
    pub fn start(&self) -> &N {
        self.nodes.first().expect("blocks are never empty")
    }

    /// Last node of the range.
    pub fn end(&self) -> &N {
        self.nodes.last().expect("blocks are never empty")
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_end_bound_the_range() {
        let block = Block::new([1, 2, 3]);
        assert_eq!(*block.start(), 1);
        assert_eq!(*block.end(), 3);
        assert_eq!(block.nodes(), &[1, 2, 3]);

        let single = Block::new(["only"]);
        assert_eq!(single.start(), single.end());
        assert_eq!(single.len(), 1);
    }
}
