//! # Write-Back Node Cache
//!
//! A bounded, recency-ordered cache of decoded tree nodes keyed by block id.
//! The tree engine performs every node read and write through this cache;
//! it never touches the [`BlockFile`] directly. That makes the cache a
//! correctness boundary, not a speed knob: with a capacity this small,
//! nearly every multi-level operation forces evictions, and the engine
//! relies on the guarantee that a `get` never returns stale data relative
//! to earlier `put`s in the same session.
//!
//! ## Eviction
//!
//! Strict least-recently-used. Whenever an insertion pushes the resident
//! count over capacity, the coldest entry is dropped; if it is dirty, its
//! 512-byte image is written through to the block file first, otherwise it
//! is discarded with no I/O.
//!
//! ## Ownership Model
//!
//! The cache is the sole owner of decoded node state. `get` returns a
//! *copy* of the resident node and callers hand mutations back via `put`;
//! no caller ever holds a reference into the cache across a call that could
//! evict. `put` on a resident id replaces the entry's content and ORs the
//! dirty bit, so a clean re-put cannot hide an earlier unsaved change.
//!
//! ## Recency Bookkeeping
//!
//! Entries live in a `Vec` ordered coldest-first; both `get` and `put` move
//! the touched entry to the back. With a capacity of a handful of entries
//! the linear scan is the entire lookup cost, and there is nothing to
//! shard or hash.
//!
//! The cache also owns the block file and fronts allocation and root-id
//! access, so the engine has exactly one collaborator.

use eyre::{ensure, Result};
use tracing::{debug, trace};

use crate::btree::Node;

use super::{BlockFile, HEADER_BLOCK};

struct CacheEntry {
    node: Node,
    dirty: bool,
}

pub struct NodeCache {
    file: BlockFile,
    /// Coldest entry first, hottest last.
    entries: Vec<CacheEntry>,
    capacity: usize,
}

impl NodeCache {
    pub fn new(file: BlockFile, capacity: usize) -> Self {
        assert!(capacity > 0, "node cache capacity must be nonzero");
        Self {
            file,
            entries: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Returns the node stored in block `id`, reading and decoding it from
    /// the block file on a miss. The returned node is a copy; mutations
    /// must come back through [`put`](Self::put).
    pub fn get(&mut self, id: u64) -> Result<Node> {
        ensure!(id != HEADER_BLOCK, "block 0 is the header, not a node");

        if let Some(pos) = self.position(id) {
            let entry = self.entries.remove(pos);
            let node = entry.node.clone();
            self.entries.push(entry);
            trace!(block = id, "node cache hit");
            return Ok(node);
        }

        let bytes = self.file.read_block(id)?;
        let node = Node::decode(&bytes)?;
        trace!(block = id, "node cache miss");

        self.entries.push(CacheEntry {
            node: node.clone(),
            dirty: false,
        });
        self.evict_over_capacity()?;

        Ok(node)
    }

    /// Stores `node` under its block id, replacing any resident copy.
    /// `dirty` is ORed into the entry's flag, never cleared by a later
    /// clean put.
    pub fn put(&mut self, node: Node, dirty: bool) -> Result<()> {
        ensure!(
            node.block_id() != HEADER_BLOCK,
            "block 0 is the header, not a node"
        );

        if let Some(pos) = self.position(node.block_id()) {
            let mut entry = self.entries.remove(pos);
            entry.node = node;
            entry.dirty |= dirty;
            self.entries.push(entry);
            return Ok(());
        }

        self.entries.push(CacheEntry { node, dirty });
        self.evict_over_capacity()
    }

    /// Allocates a fresh block in the underlying file. The new block is not
    /// resident until a node for it is `put`.
    pub fn allocate(&mut self) -> Result<u64> {
        self.file.allocate()
    }

    pub fn root_block(&self) -> u64 {
        self.file.root_block()
    }

    pub fn set_root_block(&mut self, id: u64) -> Result<()> {
        self.file.set_root_block(id)
    }

    /// Writes every dirty resident node back to the block file and empties
    /// the cache.
    pub fn flush(&mut self) -> Result<()> {
        let mut written = 0usize;
        for entry in self.entries.drain(..) {
            if entry.dirty {
                self.file
                    .write_block(entry.node.block_id(), &entry.node.encode())?;
                written += 1;
            }
        }
        if written > 0 {
            debug!(nodes = written, "flushed dirty nodes");
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.node.block_id() == id)
    }

    fn evict_over_capacity(&mut self) -> Result<()> {
        while self.entries.len() > self.capacity {
            let entry = self.entries.remove(0);
            if entry.dirty {
                debug!(block = entry.node.block_id(), "evicting dirty node");
                self.file
                    .write_block(entry.node.block_id(), &entry.node.encode())?;
            } else {
                trace!(block = entry.node.block_id(), "evicting clean node");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_cache(capacity: usize) -> (NodeCache, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let file = BlockFile::create(dir.path().join("cache.ord")).unwrap();
        (NodeCache::new(file, capacity), dir)
    }

    fn leaf_with(id: u64, key: i64, value: i64) -> Node {
        let mut node = Node::new(id, 0, true);
        node.insert_entry(0, key, value);
        node
    }

    #[test]
    fn get_after_put_returns_put_content() {
        let (mut cache, _dir) = test_cache(4);

        let id = cache.allocate().unwrap();
        let node = leaf_with(id, 10, 100);
        cache.put(node.clone(), true).unwrap();

        assert_eq!(cache.get(id).unwrap(), node);
    }

    #[test]
    fn get_refuses_header_block() {
        let (mut cache, _dir) = test_cache(4);
        assert!(cache.get(0).is_err());
    }

    #[test]
    fn eviction_writes_dirty_node_back() {
        let (mut cache, _dir) = test_cache(2);

        let first = cache.allocate().unwrap();
        cache.put(leaf_with(first, 1, 11), true).unwrap();

        // Push two more dirty nodes through; `first` is the LRU victim.
        for key in 2..4 {
            let id = cache.allocate().unwrap();
            cache.put(leaf_with(id, key, key * 11), true).unwrap();
        }
        assert_eq!(cache.len(), 2);

        // A fresh get must come from disk and still see the written entry.
        let node = cache.get(first).unwrap();
        assert_eq!(node.key(0), 1);
        assert_eq!(node.value(0), 11);
    }

    #[test]
    fn eviction_of_clean_node_writes_nothing() {
        let (mut cache, _dir) = test_cache(1);

        let id = cache.allocate().unwrap();
        cache.put(leaf_with(id, 1, 11), true).unwrap();
        cache.flush().unwrap();

        // Resident again, then replaced by a clean put. The replacement
        // must die with the eviction, leaving the on-disk version intact.
        cache.get(id).unwrap();
        cache.put(leaf_with(id, 1, 999), false).unwrap();

        let other = cache.allocate().unwrap();
        cache.put(leaf_with(other, 2, 22), true).unwrap();

        assert_eq!(cache.get(id).unwrap().value(0), 11);
    }

    #[test]
    fn put_on_resident_entry_keeps_dirty_bit() {
        let (mut cache, _dir) = test_cache(2);

        let id = cache.allocate().unwrap();
        cache.put(leaf_with(id, 5, 50), true).unwrap();
        // Clean re-put must not launder the earlier dirty write.
        cache.put(leaf_with(id, 5, 51), false).unwrap();

        let other = cache.allocate().unwrap();
        cache.put(leaf_with(other, 6, 60), true).unwrap();
        let third = cache.allocate().unwrap();
        cache.put(leaf_with(third, 7, 70), true).unwrap();

        assert_eq!(cache.get(id).unwrap().value(0), 51);
    }

    #[test]
    fn coherence_under_churn() {
        let (mut cache, _dir) = test_cache(2);

        let mut ids = Vec::new();
        for key in 0..8 {
            let id = cache.allocate().unwrap();
            cache.put(leaf_with(id, key, key * 7), true).unwrap();
            ids.push((id, key));
        }

        for (id, key) in ids {
            let node = cache.get(id).unwrap();
            assert_eq!(node.key(0), key);
            assert_eq!(node.value(0), key * 7);
        }
    }

    #[test]
    fn flush_clears_cache() {
        let (mut cache, _dir) = test_cache(4);

        let id = cache.allocate().unwrap();
        cache.put(leaf_with(id, 1, 2), true).unwrap();
        assert_eq!(cache.len(), 1);

        cache.flush().unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.get(id).unwrap().value(0), 2);
    }
}
