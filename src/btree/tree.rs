//! # B-Tree Engine
//!
//! Search, insert, and split over block-resident nodes, plus an iterative
//! in-order cursor. Every node access goes through the [`NodeCache`]; the
//! engine holds nodes only as short-lived copies and writes every mutation
//! back with `put`, so no node reference ever outlives a cache call that
//! could evict it.
//!
//! ## Search
//!
//! Iterative root-to-leaf descent. At each node, a left-to-right scan finds
//! the first key ≥ the search key (at 19 keys per node a linear scan is as
//! good as binary search and simpler). Exact match returns the value; a
//! leaf miss returns `None`. Absence is an expected outcome, not an error.
//!
//! ## Insert
//!
//! Classic top-down preemptive split:
//!
//! 1. Empty tree: allocate a root leaf holding the single entry and persist
//!    it as the root.
//! 2. Full root: allocate a new root, make the old root its sole child,
//!    split, persist the new root id, then continue from the new root.
//! 3. Descend with `insert_not_full`, splitting any full child *before*
//!    stepping into it. The parent is guaranteed non-full by the same rule
//!    one level up, so a split never cascades upward by itself.
//!
//! Duplicate keys are not rejected or merged: inserting an existing key
//! appends a second entry. Search then finds the first equal key on the
//! root-to-leaf path: the shallowest occurrence, which a split may have
//! promoted from a later insertion. The cursor yields every occurrence.
//!
//! ## Split
//!
//! `split_child` moves the upper `T-1` keys of a full node into a freshly
//! allocated sibling, promotes the median into the parent, and, when the
//! split node is internal, moves the upper `T` child pointers across,
//! rewriting each moved child's parent id (one cascaded write per child).
//! All three touched nodes go back through the cache dirty.
//!
//! ## Failure Semantics
//!
//! A block read/write failure aborts the whole operation. There is no
//! rollback of node copies already written into the cache; the format
//! offers no atomicity beyond last-write-wins per block.

use std::path::Path;

use eyre::Result;
use smallvec::SmallVec;
use tracing::{debug, error, trace};

use crate::storage::{BlockFile, NodeCache, DEFAULT_CACHE_CAPACITY};

use super::{Node, BRANCH_FACTOR};

/// A single-file ordered index mapping `i64` keys to `i64` values.
pub struct BTree {
    cache: NodeCache,
}

impl BTree {
    /// Creates a new index file at `path` (failing if it exists) and
    /// initializes it with an empty root leaf.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = BlockFile::create(path)?;
        let mut tree = Self {
            cache: NodeCache::new(file, DEFAULT_CACHE_CAPACITY),
        };

        let root_id = tree.cache.allocate()?;
        tree.cache.put(Node::new(root_id, 0, true), true)?;
        tree.cache.set_root_block(root_id)?;

        Ok(tree)
    }

    /// Opens an existing index file, verifying its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = BlockFile::open(path)?;
        Ok(Self {
            cache: NodeCache::new(file, DEFAULT_CACHE_CAPACITY),
        })
    }

    /// Block id of the current root, 0 if the tree is empty.
    pub fn root_block(&self) -> u64 {
        self.cache.root_block()
    }

    /// Looks up `key`, returning its value or `None` if absent. An empty
    /// tree answers without reading any block beyond the header.
    pub fn search(&mut self, key: i64) -> Result<Option<i64>> {
        let mut current = self.cache.root_block();
        if current == 0 {
            return Ok(None);
        }

        loop {
            let node = self.cache.get(current)?;
            let mut i = 0;
            while i < node.num_keys() && key > node.key(i) {
                i += 1;
            }
            if i < node.num_keys() && key == node.key(i) {
                return Ok(Some(node.value(i)));
            }
            if node.is_leaf() {
                return Ok(None);
            }
            current = node.child(i);
        }
    }

    /// Inserts a `key`/`value` pair. No uniqueness check is performed; a
    /// repeated key gets an additional entry.
    pub fn insert(&mut self, key: i64, value: i64) -> Result<()> {
        trace!(key, value, "insert");

        let root_id = self.cache.root_block();
        if root_id == 0 {
            let id = self.cache.allocate()?;
            let mut root = Node::new(id, 0, true);
            root.insert_entry(0, key, value);
            self.cache.put(root, true)?;
            self.cache.set_root_block(id)?;
            return Ok(());
        }

        let root = self.cache.get(root_id)?;
        if root.is_full() {
            let new_root_id = self.cache.allocate()?;
            let mut new_root = Node::new(new_root_id, 0, false);
            new_root.set_child(0, root_id);

            let mut old_root = root;
            old_root.set_parent_id(new_root_id);
            self.split_child(&mut new_root, 0, &mut old_root)?;

            self.cache.set_root_block(new_root_id)?;
            debug!(root = new_root_id, "tree grew a level");

            self.insert_not_full(new_root, key, value)
        } else {
            self.insert_not_full(root, key, value)
        }
    }

    /// Descends from a node known to be non-full, splitting full children
    /// ahead of the descent. Recursion depth is the tree height.
    fn insert_not_full(&mut self, mut node: Node, key: i64, value: i64) -> Result<()> {
        let mut i = node.num_keys();
        while i > 0 && key < node.key(i - 1) {
            i -= 1;
        }

        if node.is_leaf() {
            node.insert_entry(i, key, value);
            return self.cache.put(node, true);
        }

        let mut child = self.cache.get(node.child(i))?;
        if child.is_full() {
            self.split_child(&mut node, i, &mut child)?;
            if key > node.key(i) {
                i += 1;
            }
            child = self.cache.get(node.child(i))?;
        }
        self.insert_not_full(child, key, value)
    }

    /// Splits the full `child` at `parent`'s child slot `index`: the median
    /// entry is promoted into `parent`, the upper `T-1` entries move into a
    /// new sibling, and, for internal nodes, the upper `T` children move
    /// with their parent pointers rewritten. `parent` must have room for
    /// the promoted entry.
    fn split_child(&mut self, parent: &mut Node, index: usize, child: &mut Node) -> Result<()> {
        let t = BRANCH_FACTOR;

        let sibling_id = self.cache.allocate()?;
        let mut sibling = Node::new(sibling_id, parent.block_id(), child.is_leaf());

        let median_key = child.key(t - 1);
        let median_value = child.value(t - 1);

        for j in 0..t - 1 {
            sibling.insert_entry(j, child.key(j + t), child.value(j + t));
        }

        if !child.is_leaf() {
            for j in 0..t {
                let moved = child.child(j + t);
                sibling.set_child(j, moved);
                if moved != 0 {
                    let mut grandchild = self.cache.get(moved)?;
                    grandchild.set_parent_id(sibling_id);
                    self.cache.put(grandchild, true)?;
                }
            }
        }

        child.truncate_keys(t - 1);
        child.clear_children_from(t);

        let mut j = parent.num_keys();
        while j >= index + 1 {
            let shifted = parent.child(j);
            parent.set_child(j + 1, shifted);
            j -= 1;
        }
        parent.set_child(index + 1, sibling_id);
        parent.insert_entry(index, median_key, median_value);

        self.cache.put(child.clone(), true)?;
        self.cache.put(sibling, true)?;
        self.cache.put(parent.clone(), true)?;

        debug!(
            child = child.block_id(),
            sibling = sibling_id,
            parent = parent.block_id(),
            promoted = median_key,
            "split node"
        );
        Ok(())
    }

    /// An in-order cursor over the whole index. Yields entries in
    /// non-decreasing key order.
    pub fn cursor(&mut self) -> Cursor<'_> {
        let mut stack: FrameStack = SmallVec::new();
        let root = self.cache.root_block();
        if root != 0 {
            stack.push(Frame::start(root));
        }
        Cursor {
            cache: &mut self.cache,
            stack,
        }
    }

    /// Writes all dirty cached nodes back to the file.
    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush()
    }

    /// Flushes and consumes the tree. Prefer this over relying on `Drop`,
    /// which cannot report write failures.
    pub fn close(mut self) -> Result<()> {
        self.cache.flush()
    }
}

impl Drop for BTree {
    fn drop(&mut self) {
        if let Err(e) = self.cache.flush() {
            error!("failed to flush node cache on drop: {e:#}");
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    block: u64,
    /// Next key index to emit in this node.
    index: usize,
    /// Whether the child left of `index` has already been walked.
    descended: bool,
}

impl Frame {
    fn start(block: u64) -> Self {
        Self {
            block,
            index: 0,
            descended: false,
        }
    }
}

type FrameStack = SmallVec<[Frame; 8]>;

/// Explicit-stack in-order traversal. Each `next` call re-reads the top
/// node through the cache, so the cursor never holds node state across
/// evictions; the stack depth is the tree height.
pub struct Cursor<'a> {
    cache: &'a mut NodeCache,
    stack: FrameStack,
}

impl Cursor<'_> {
    /// Returns the next `(key, value)` entry, or `None` once exhausted.
    pub fn next_entry(&mut self) -> Result<Option<(i64, i64)>> {
        loop {
            let (block, index, descended) = match self.stack.last() {
                Some(f) => (f.block, f.index, f.descended),
                None => return Ok(None),
            };

            let node = self.cache.get(block)?;

            if node.is_leaf() {
                if index < node.num_keys() {
                    if let Some(f) = self.stack.last_mut() {
                        f.index += 1;
                    }
                    return Ok(Some((node.key(index), node.value(index))));
                }
                self.stack.pop();
                continue;
            }

            if !descended {
                if let Some(f) = self.stack.last_mut() {
                    f.descended = true;
                }
                self.stack.push(Frame::start(node.child(index)));
                continue;
            }

            if index < node.num_keys() {
                if let Some(f) = self.stack.last_mut() {
                    f.index += 1;
                    f.descended = false;
                }
                return Ok(Some((node.key(index), node.value(index))));
            }
            self.stack.pop();
        }
    }
}
