//! # ordex - Single-File Ordered Index
//!
//! ordex stores 64-bit key → 64-bit value pairs in a B-tree laid out in
//! fixed 512-byte blocks inside one file. Point lookups and insertions cost
//! a logarithmic number of block accesses; an iterative cursor walks the
//! whole index in key order for CSV export.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ordex::BTree;
//!
//! let mut tree = BTree::create("./users.ord")?;
//! tree.insert(42, 7)?;
//! assert_eq!(tree.search(42)?, Some(7));
//! tree.close()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │       CLI (create/insert/...)       │
//! ├─────────────────────────────────────┤
//! │   B-Tree Engine (search/insert/     │
//! │      split/cursor)                  │
//! ├─────────────────────────────────────┤
//! │   Node Cache (LRU, write-back)      │
//! ├─────────────────────────────────────┤
//! │   Block Store (512-byte blocks,     │
//! │      header, allocation)            │
//! └─────────────────────────────────────┘
//! ```
//!
//! The engine never touches the block store directly: every node read and
//! write goes through the cache, so resident and on-disk state cannot
//! silently diverge. The cache writes dirty nodes back on eviction and on
//! flush.
//!
//! ## File Layout
//!
//! ```text
//! index_file
//! ├── Block 0             # Header: magic, root block id, next-free id
//! ├── Block 1             # B-tree node (usually the root)
//! └── Block N             # More nodes, allocated monotonically
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: block file, file header, write-back node cache
//! - [`btree`]: node format and codec, tree operations, ordered cursor
//! - [`cli`]: one function per CLI subcommand
//!
//! ## Concurrency
//!
//! Single-threaded and synchronous. One process owns the file for the
//! duration of a session; there is no file locking or multi-writer
//! coordination.

pub mod btree;
pub mod cli;
pub mod storage;

pub use btree::{BTree, Cursor, Node};
pub use storage::{BlockFile, NodeCache, BLOCK_SIZE};
