//! Keyed list rendering.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, error, trace, warn};

use super::block::Block;
use crate::reactive::{scheduler, untrack, SignalRead, Subscription};
use crate::tree::{TreeError, TreeHost};

/// Settings for a keyed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedOptions {
    /// Label given to the list's anchor node.
    pub anchor_label: String,
    /// Log a warning when a snapshot repeats a key.
    pub warn_on_duplicate_keys: bool,
}

impl Default for KeyedOptions {
    fn default() -> Self {
        Self {
            anchor_label: "repeat".to_string(),
            warn_on_duplicate_keys: true,
        }
    }
}

/// Block operations performed by reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub moved: usize,
    pub removed: usize,
}

impl ReconcileStats {
    fn add(&mut self, other: ReconcileStats) {
        self.created += other.created;
        self.moved += other.moved;
        self.removed += other.removed;
    }
}

type KeyFn<T, K> = Box<dyn Fn(&T, usize) -> K>;
type RenderFn<T, N> = Box<dyn Fn(&T, usize) -> Vec<N>>;
type Blocks<K, N> = IndexMap<K, Block<N>>;

struct KeyedState<K, N> {
    /// Live blocks in display order.
    blocks: Blocks<K, N>,
    reconciling: bool,
    deferred: bool,
    disposed: bool,
}

struct KeyedInner<H: TreeHost, T, K> {
    host: H,
    anchor: H::Node,
    key_fn: KeyFn<T, K>,
    render: RenderFn<T, H::Node>,
    read_current: Box<dyn Fn() -> Vec<T>>,
    options: KeyedOptions,
    state: RefCell<KeyedState<K, H::Node>>,
    subscription: RefCell<Option<Subscription>>,
    totals: Cell<ReconcileStats>,
    this: Weak<Self>,
}

/// Clears the `reconciling` flag even if a render panics.
struct ReconcilingGuard<'a, K, N>(&'a RefCell<KeyedState<K, N>>);

impl<K, N> Drop for ReconcilingGuard<'_, K, N> {
    fn drop(&mut self) {
        self.0.borrow_mut().reconciling = false;
    }
}

impl<H, T, K> KeyedInner<H, T, K>
where
    H: TreeHost,
    T: 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    fn mount(&self) {
        debug!(anchor = ?self.anchor, "mounting keyed list");
        self.refresh_logged();
    }

    fn refresh(&self) -> Result<ReconcileStats, TreeError> {
        let items = (self.read_current)();
        self.reconcile(&items)
    }

    fn refresh_logged(&self) {
        if let Err(err) = self.refresh() {
            error!(anchor = ?self.anchor, error = %err, "keyed list reconcile failed");
        }
    }

    fn on_change(&self, items: &[T]) {
        if let Err(err) = self.reconcile(items) {
            error!(anchor = ?self.anchor, error = %err, "keyed list reconcile failed");
        }
    }

    fn reconcile(&self, items: &[T]) -> Result<ReconcileStats, TreeError> {
        {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return Ok(ReconcileStats::default());
            }
            if state.reconciling {
                // A render wrote to the source; catch up once this pass ends.
                if !state.deferred {
                    state.deferred = true;
                    if let Some(this) = self.this.upgrade() {
                        scheduler::queue_microtask(move || {
                            this.state.borrow_mut().deferred = false;
                            this.refresh_logged();
                        });
                    }
                }
                return Ok(ReconcileStats::default());
            }
        }

        let Some(parent) = self.host.parent(&self.anchor) else {
            debug!(anchor = ?self.anchor, "anchor is detached; skipping reconcile");
            return Ok(ReconcileStats::default());
        };

        let mut previous = {
            let mut state = self.state.borrow_mut();
            state.reconciling = true;
            mem::take(&mut state.blocks)
        };
        let mut next: Blocks<K, H::Node> = IndexMap::with_capacity(items.len());
        let mut stats = ReconcileStats::default();

        let outcome = {
            let _guard = ReconcilingGuard(&self.state);
            panic::catch_unwind(AssertUnwindSafe(|| {
                untrack(|| self.place(&parent, items, &mut previous, &mut next, &mut stats))
            }))
        };
        let placed = match outcome {
            Ok(placed) => placed,
            Err(payload) => {
                // A key or render callback panicked. Keep every block already
                // in the tree tracked, then let the panic continue.
                next.extend(previous);
                self.store_blocks(next);
                panic::resume_unwind(payload);
            }
        };

        let removed = match placed {
            Ok(()) => self.remove_stale(previous, &mut stats),
            Err(err) => {
                // Keep tracking every block we still own.
                next.extend(previous);
                Err(err)
            }
        };

        self.store_blocks(next);

        let mut totals = self.totals.get();
        totals.add(stats);
        self.totals.set(totals);
        trace!(
            anchor = ?self.anchor,
            created = stats.created,
            moved = stats.moved,
            removed = stats.removed,
            "reconciled keyed list"
        );

        removed.map(|()| stats)
    }

    /// The forward pass: create and move blocks so that `items` appear in order
    /// right after the anchor.
    fn place(
        &self,
        parent: &H::Node,
        items: &[T],
        previous: &mut Blocks<K, H::Node>,
        next: &mut Blocks<K, H::Node>,
        stats: &mut ReconcileStats,
    ) -> Result<(), TreeError> {
        let mut cursor = self.anchor.clone();

        for (index, item) in items.iter().enumerate() {
            let key = (self.key_fn)(item, index);
            if next.contains_key(&key) {
                if self.options.warn_on_duplicate_keys {
                    warn!(key = ?key, "duplicate key in keyed list; later occurrence ignored");
                }
                continue;
            }

            let (block, fresh) = match previous.shift_remove(&key) {
                Some(block) => (block, false),
                None => {
                    let mut nodes = (self.render)(item, index);
                    if nodes.is_empty() {
                        nodes.push(self.host.create_anchor("empty"));
                    }
                    (Block::new(nodes), true)
                }
            };

            let in_place = !fresh && self.host.next_sibling(&cursor).as_ref() == Some(block.start());
            let nodes: SmallVec<[H::Node; 4]> = block.nodes().iter().cloned().collect();
            let end = block.end().clone();
            next.insert(key, block);

            if !in_place {
                for node in &nodes {
                    self.host.insert_after(parent, node, &cursor)?;
                    cursor = node.clone();
                }
                if fresh {
                    stats.created += 1;
                } else {
                    stats.moved += 1;
                }
            }
            cursor = end;
        }
        Ok(())
    }

    /// Destroy blocks whose keys left the sequence. Every block is attempted;
    /// the first failure is returned.
    fn remove_stale(
        &self,
        stale: Blocks<K, H::Node>,
        stats: &mut ReconcileStats,
    ) -> Result<(), TreeError> {
        let mut first_error = None;
        for (key, block) in stale {
            trace!(key = ?key, "removing block");
            for node in block.nodes() {
                if let Err(err) = self.host.destroy(node) {
                    first_error.get_or_insert(err);
                }
            }
            stats.removed += 1;
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Install `blocks` as the live table. If the list was disposed while the
    /// table was out (a render disposing its own list), nothing in `blocks`
    /// may survive.
    fn store_blocks(&self, blocks: Blocks<K, H::Node>) {
        let leftover = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                Some(blocks)
            } else {
                state.blocks = blocks;
                None
            }
        };
        if let Some(blocks) = leftover {
            self.destroy_blocks(blocks);
        }
    }

    fn destroy_blocks(&self, blocks: Blocks<K, H::Node>) {
        for block in blocks.values() {
            for node in block.nodes() {
                if let Err(err) = self.host.destroy(node) {
                    warn!(node = ?node, error = %err, "failed to destroy block node");
                }
            }
        }
    }

    fn dispose(&self) {
        let blocks = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            mem::take(&mut state.blocks)
        };
        debug!(anchor = ?self.anchor, blocks = blocks.len(), "disposing keyed list");

        let subscription = self.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
        self.destroy_blocks(blocks);
        if let Err(err) = self.host.detach(&self.anchor) {
            debug!(anchor = ?self.anchor, error = %err, "anchor already gone");
        }
    }
}

/// A keyed list mounted at an anchor node.
///
/// The list keeps itself up to date through a subscription on its source;
/// the handle is only needed for inspection, manual refreshes and disposal.
/// Dropping it does not stop the list.
pub struct KeyedList<H: TreeHost, T: 'static, K: 'static> {
    inner: Rc<KeyedInner<H, T, K>>,
}

impl<H, T, K> KeyedList<H, T, K>
where
    H: TreeHost,
    T: 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    /// The marker node to attach into the host tree. Blocks are placed
    /// directly after it, in sequence order.
    pub fn anchor(&self) -> H::Node {
        self.inner.anchor.clone()
    }

    /// Keys of the live blocks in display order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.state.borrow().blocks.keys().cloned().collect()
    }

    /// The nodes of the block rendered for `key`.
    pub fn block_nodes(&self, key: &K) -> Option<Vec<H::Node>> {
        self.inner
            .state
            .borrow()
            .blocks
            .get(key)
            .map(|block| block.nodes().to_vec())
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.inner.state.borrow().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cumulative block operations since the list was created.
    pub fn stats(&self) -> ReconcileStats {
        self.inner.totals.get()
    }

    /// Reconcile now against the source's current value.
    pub fn refresh(&self) -> Result<ReconcileStats, TreeError> {
        self.inner.refresh()
    }

    /// Stop following the source and remove every block and the anchor.
    /// Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }
}

impl<H: TreeHost, T: 'static, K: 'static> Clone for KeyedList<H, T, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H, T, K> Debug for KeyedList<H, T, K>
where
    H: TreeHost,
    T: 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedList")
            .field("anchor", &self.inner.anchor)
            .field("keys", &self.keys())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Render `source` as a keyed list with default options.
///
/// See [`repeat_with`].
pub fn repeat<H, S, T, K, KF, RF>(host: H, source: S, key_fn: KF, render: RF) -> KeyedList<H, T, K>
where
    H: TreeHost,
    S: SignalRead<Vec<T>> + Clone + 'static,
    T: 'static,
    K: Clone + Eq + Hash + Debug + 'static,
    KF: Fn(&T) -> K + 'static,
    RF: Fn(&T) -> Vec<H::Node> + 'static,
{
    repeat_with(host, source, key_fn, render, KeyedOptions::default())
}

/// Render `source` as a keyed list.
///
/// `key_fn` must give every item of one snapshot a distinct key; a repeated
/// key keeps its first occurrence and skips the rest. `render` turns a new
/// item into the nodes of its block and is never called again for that key
/// while the key stays in the sequence.
///
/// The list does not render synchronously. Its first reconcile runs at the
/// next microtask flush, against the source value current at that point,
/// once the caller has had the chance to attach [`KeyedList::anchor`] to a
/// live parent. Destroying the anchor through [`TreeHost::destroy`] disposes
/// the list.
pub fn repeat_with<H, S, T, K, KF, RF>(
    host: H,
    source: S,
    key_fn: KF,
    render: RF,
    options: KeyedOptions,
) -> KeyedList<H, T, K>
where
    H: TreeHost,
    S: SignalRead<Vec<T>> + Clone + 'static,
    T: 'static,
    K: Clone + Eq + Hash + Debug + 'static,
    KF: Fn(&T) -> K + 'static,
    RF: Fn(&T) -> Vec<H::Node> + 'static,
{
    build(
        host,
        source,
        Box::new(move |item: &T, _: usize| key_fn(item)),
        Box::new(move |item: &T, _: usize| render(item)),
        options,
    )
}

/// Like [`repeat_with`], but `key_fn` and `render` also receive the item's
/// position in the current snapshot.
///
/// `render` still runs only when a key first appears, so the index it sees
/// is the position at creation time. Keying by index makes blocks follow
/// positions rather than items.
pub fn repeat_indexed<H, S, T, K, KF, RF>(
    host: H,
    source: S,
    key_fn: KF,
    render: RF,
    options: KeyedOptions,
) -> KeyedList<H, T, K>
where
    H: TreeHost,
    S: SignalRead<Vec<T>> + Clone + 'static,
    T: 'static,
    K: Clone + Eq + Hash + Debug + 'static,
    KF: Fn(&T, usize) -> K + 'static,
    RF: Fn(&T, usize) -> Vec<H::Node> + 'static,
{
    build(host, source, Box::new(key_fn), Box::new(render), options)
}

fn build<H, S, T, K>(
    host: H,
    source: S,
    key_fn: KeyFn<T, K>,
    render: RenderFn<T, H::Node>,
    options: KeyedOptions,
) -> KeyedList<H, T, K>
where
    H: TreeHost,
    S: SignalRead<Vec<T>> + Clone + 'static,
    T: 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    let anchor = host.create_anchor(&options.anchor_label);
    let reader = source.clone();

    let inner = Rc::new_cyclic(|this| KeyedInner {
        host,
        anchor,
        key_fn,
        render,
        read_current: Box::new(move || reader.get_untracked()),
        options,
        state: RefCell::new(KeyedState {
            blocks: IndexMap::new(),
            reconciling: false,
            deferred: false,
            disposed: false,
        }),
        subscription: RefCell::new(None),
        totals: Cell::new(ReconcileStats::default()),
        this: this.clone(),
    });

    let listener = Rc::clone(&inner);
    let subscription = source.subscribe(move |items: &Vec<T>| listener.on_change(items));
    *inner.subscription.borrow_mut() = Some(subscription);

    let owner = Rc::downgrade(&inner);
    inner.host.on_cleanup(&inner.anchor, move || {
        if let Some(inner) = owner.upgrade() {
            inner.dispose();
        }
    });

    let mount = Rc::clone(&inner);
    scheduler::queue_microtask(move || mount.mount());

    KeyedList { inner }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{effect, Signal};
    use crate::tree::{NodeId, Tree};

    fn flush() {
        scheduler::flush().expect("flush should succeed");
    }

    fn mounted(
        tree: &Tree,
        items: Vec<&'static str>,
    ) -> (NodeId, Signal<Vec<&'static str>>, KeyedList<Tree, &'static str, &'static str>) {
        let root = tree.element("ul");
        let source = Signal::new(items);
        let host = tree.clone();
        let list = repeat(
            tree.clone(),
            source.clone(),
            |item: &&'static str| *item,
            move |item: &&'static str| vec![host.text(*item)],
        );
        tree.append_child(root, list.anchor()).expect("attach anchor");
        flush();
        (root, source, list)
    }

    #[test]
    fn mount_is_deferred_to_the_next_flush() {
        let tree = Tree::new();
        let root = tree.element("ul");
        let source = Signal::new(vec!["a"]);
        let host = tree.clone();
        let list = repeat(
            tree.clone(),
            source.clone(),
            |s: &&'static str| *s,
            move |s: &&'static str| vec![host.text(*s)],
        );

        // Written before the anchor is attached: nothing renders yet.
        source.set(vec!["a", "b"]);
        tree.append_child(root, list.anchor()).expect("attach anchor");
        assert!(list.is_empty());

        flush();
        assert_eq!(tree.text_content(root), "ab");
        assert_eq!(list.keys(), vec!["a", "b"]);
    }

    #[test]
    fn detached_anchor_defers_rendering() {
        let tree = Tree::new();
        let source = Signal::new(vec!["a"]);
        let host = tree.clone();
        let list = repeat(
            tree.clone(),
            source.clone(),
            |s: &&'static str| *s,
            move |s: &&'static str| vec![host.text(*s)],
        );
        flush();
        assert!(list.is_empty());

        let root = tree.element("ul");
        tree.append_child(root, list.anchor()).expect("attach anchor");
        let stats = list.refresh().expect("refresh");
        assert_eq!(stats.created, 1);
        assert_eq!(tree.text_content(root), "a");
    }

    #[test]
    fn rotation_reuses_blocks_with_one_move() {
        let tree = Tree::new();
        let (root, source, list) = mounted(&tree, vec!["A", "B", "C"]);
        let before: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|k| list.block_nodes(k).expect("block"))
            .collect();

        source.set(vec!["C", "A", "B"]);

        assert_eq!(tree.text_content(root), "CAB");
        assert_eq!(list.block_nodes(&"A"), Some(before[0].clone()));
        assert_eq!(list.block_nodes(&"B"), Some(before[1].clone()));
        assert_eq!(list.block_nodes(&"C"), Some(before[2].clone()));
        assert_eq!(
            list.stats(),
            ReconcileStats {
                created: 3,
                moved: 1,
                removed: 0,
            }
        );
    }

    #[test]
    fn removed_keys_run_cleanups_and_new_keys_render() {
        let tree = Tree::new();
        let (root, source, list) = mounted(&tree, vec!["A", "B", "C"]);
        let cleaned = Rc::new(RefCell::new(Vec::new()));
        for key in ["B", "C"] {
            let node = list.block_nodes(&key).expect("block")[0];
            let cleaned = cleaned.clone();
            tree.on_cleanup(&node, move || cleaned.borrow_mut().push(key));
        }

        source.set(vec!["A", "D"]);

        assert_eq!(tree.text_content(root), "AD");
        assert_eq!(*cleaned.borrow(), vec!["B", "C"]);
        assert_eq!(list.keys(), vec!["A", "D"]);
        assert_eq!(list.stats().created, 4);
        assert_eq!(list.stats().removed, 2);
    }

    #[test]
    fn reversal_moves_every_block_but_the_last() {
        let tree = Tree::new();
        let (root, source, list) = mounted(&tree, vec!["a", "b", "c", "d"]);
        tree.reset_stats();

        source.set(vec!["d", "c", "b", "a"]);

        assert_eq!(tree.text_content(root), "dcba");
        assert_eq!(list.stats().moved, 3);
        assert_eq!(tree.stats().moved, 3);
        assert_eq!(tree.stats().inserted, 0);
    }

    #[test]
    fn unchanged_order_performs_no_mutations() {
        let tree = Tree::new();
        let (_root, source, list) = mounted(&tree, vec!["a", "b"]);
        tree.reset_stats();

        source.set(vec!["a", "b", "c"]);
        assert_eq!(tree.stats().moved, 0);
        assert_eq!(tree.stats().inserted, 1);
        assert_eq!(list.stats().moved, 0);
    }

    #[test]
    fn multi_node_blocks_move_as_a_unit() {
        let tree = Tree::new();
        let root = tree.element("dl");
        let source = Signal::new(vec![1, 2]);
        let host = tree.clone();
        let list = repeat(
            tree.clone(),
            source.clone(),
            |n: &i32| *n,
            move |n: &i32| vec![host.text(format!("<{n}")), host.text(format!("{n}>"))],
        );
        tree.append_child(root, list.anchor()).expect("attach anchor");
        flush();
        assert_eq!(tree.text_content(root), "<11><22>");

        source.set(vec![2, 1]);
        assert_eq!(tree.text_content(root), "<22><11>");
        assert_eq!(list.stats().moved, 1);
    }

    #[test]
    fn empty_render_gets_a_placeholder() {
        let tree = Tree::new();
        let root = tree.element("div");
        let source = Signal::new(vec![1, 2]);
        let host = tree.clone();
        let list = repeat(tree.clone(), source.clone(), |n: &i32| *n, move |n: &i32| {
            if *n == 1 {
                Vec::new()
            } else {
                vec![host.text("two")]
            }
        });
        tree.append_child(root, list.anchor()).expect("attach anchor");
        flush();

        let placeholder = list.block_nodes(&1).expect("block")[0];
        assert!(matches!(tree.kind(placeholder), Some(crate::tree::NodeKind::Anchor(_))));

        source.set(vec![2, 1]);
        assert_eq!(
            TreeHost::children(&tree, &root),
            vec![list.anchor(), list.block_nodes(&2).expect("block")[0], placeholder]
        );
    }

    #[test]
    fn duplicate_keys_keep_the_first_occurrence() {
        let tree = Tree::new();
        let root = tree.element("ul");
        let source = Signal::new(vec![(1, "first"), (2, "two"), (1, "shadowed")]);
        let host = tree.clone();
        let list = repeat(
            tree.clone(),
            source.clone(),
            |item: &(i32, &str)| item.0,
            move |item: &(i32, &str)| vec![host.text(item.1)],
        );
        tree.append_child(root, list.anchor()).expect("attach anchor");
        flush();

        assert_eq!(tree.text_content(root), "firsttwo");
        assert_eq!(list.keys(), vec![1, 2]);
    }

    #[test]
    fn dispose_removes_blocks_and_stops_following() {
        let tree = Tree::new();
        let (root, source, list) = mounted(&tree, vec!["a", "b"]);

        list.dispose();
        list.dispose();
        assert!(list.is_disposed());
        assert!(TreeHost::children(&tree, &root).is_empty());
        assert_eq!(source.subscriber_count(), 0);

        source.set(vec!["c"]);
        assert!(TreeHost::children(&tree, &root).is_empty());
    }

    #[test]
    fn destroying_the_region_disposes_the_list() {
        let tree = Tree::new();
        let (root, source, list) = mounted(&tree, vec!["a", "b"]);

        tree.destroy(&root).expect("destroy");

        assert!(list.is_disposed());
        assert_eq!(source.subscriber_count(), 0);
        assert!(tree.is_empty());
    }

    #[test]
    fn render_reads_are_not_tracked_by_an_enclosing_effect() {
        let tree = Tree::new();
        let (_root, source, _list) = mounted(&tree, vec!["a"]);
        let label = Signal::new(0);

        let host = tree.clone();
        let label_reader = label.clone();
        let nested_root = tree.element("ol");
        let nested_source = Signal::new(vec![1]);
        let nested = repeat(tree.clone(), nested_source.clone(), |n: &i32| *n, move |n: &i32| {
            vec![host.text(format!("{n}:{}", label_reader.get()))]
        });
        tree.append_child(nested_root, nested.anchor()).expect("attach anchor");
        flush();

        let writer = nested_source.clone();
        let outer_source = source.clone();
        let outer = effect(move || {
            outer_source.get();
            writer.set(vec![1, 2]);
        });

        // Rendering item 2 read `label` inside the effect run, untracked.
        assert_eq!(outer.dependency_count(), 1);
        assert_eq!(label.subscriber_count(), 0);
        assert_eq!(tree.text_content(nested_root), "1:02:0");
    }

    #[test]
    fn render_writing_its_source_defers_a_second_pass() {
        let tree = Tree::new();
        let root = tree.element("ul");
        let source = Signal::new(vec![1]);
        let host = tree.clone();
        let writer = source.clone();
        let list = repeat(tree.clone(), source.clone(), |n: &i32| *n, move |n: &i32| {
            if *n == 1 {
                writer.update(|items| {
                    let mut items = items.clone();
                    items.push(2);
                    items
                });
            }
            vec![host.text(n.to_string())]
        });
        tree.append_child(root, list.anchor()).expect("attach anchor");
        flush();

        assert_eq!(tree.text_content(root), "12");
        assert_eq!(list.keys(), vec![1, 2]);
    }

    #[test]
    fn panicking_render_keeps_placed_blocks_tracked() {
        let tree = Tree::new();
        let root = tree.element("ul");
        let source = Signal::new(vec![1, 2]);
        let host = tree.clone();
        let list = repeat(tree.clone(), source.clone(), |n: &i32| *n, move |n: &i32| {
            if *n == 99 {
                panic!("cannot render {n}");
            }
            vec![host.text(n.to_string())]
        });
        tree.append_child(root, list.anchor()).expect("attach anchor");
        flush();

        let failed = std::panic::catch_unwind(AssertUnwindSafe(|| source.set(vec![1, 2, 99])));
        assert!(failed.is_err());
        assert_eq!(list.keys(), vec![1, 2]);
        assert_eq!(tree.text_content(root), "12");

        source.set(vec![1, 2, 3]);
        assert_eq!(tree.text_content(root), "123");
        assert_eq!(list.keys(), vec![1, 2, 3]);
        assert_eq!(TreeHost::children(&tree, &root).len(), 4);
    }

    #[test]
    fn render_disposing_its_own_list_leaves_nothing_behind() {
        let tree = Tree::new();
        let root = tree.element("ul");
        let source = Signal::new(vec![1, 2]);
        let handle: Rc<RefCell<Option<KeyedList<Tree, i32, i32>>>> = Rc::new(RefCell::new(None));
        let rendered = Rc::new(RefCell::new(Vec::new()));

        let host = tree.clone();
        let (me, created) = (handle.clone(), rendered.clone());
        let list = repeat(tree.clone(), source.clone(), |n: &i32| *n, move |n: &i32| {
            if *n == 3 {
                if let Some(list) = me.borrow().as_ref() {
                    list.dispose();
                }
            }
            let node = host.text(n.to_string());
            created.borrow_mut().push(node);
            vec![node]
        });
        *handle.borrow_mut() = Some(list.clone());
        tree.append_child(root, list.anchor()).expect("attach anchor");
        flush();

        source.set(vec![1, 2, 3]);

        assert!(list.is_disposed());
        assert!(list.is_empty());
        assert!(TreeHost::children(&tree, &root).is_empty());
        assert_eq!(rendered.borrow().len(), 3);
        for node in rendered.borrow().iter() {
            assert!(!tree.contains(*node), "{node:?} survived disposal");
        }
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn indexed_callbacks_receive_positions() {
        let tree = Tree::new();
        let root = tree.element("ol");
        let source = Signal::new(vec!["x", "y"]);
        let host = tree.clone();
        let list = repeat_indexed(
            tree.clone(),
            source.clone(),
            |_: &&'static str, index: usize| index,
            move |item: &&'static str, index: usize| vec![host.text(format!("{index}:{item}"))],
            KeyedOptions::default(),
        );
        tree.append_child(root, list.anchor()).expect("attach anchor");
        flush();
        assert_eq!(tree.text_content(root), "0:x1:y");

        source.set(vec!["x", "y", "z"]);
        assert_eq!(tree.text_content(root), "0:x1:y2:z");

        // Blocks follow positions: the first two are kept as rendered.
        source.set(vec!["q", "r"]);
        assert_eq!(list.keys(), vec![0, 1]);
        assert_eq!(tree.text_content(root), "0:x1:y");
        assert_eq!(list.stats().created, 3);
        assert_eq!(list.stats().removed, 1);
    }
}
