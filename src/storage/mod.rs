//! # Storage Module
//!
//! This module provides the block-level storage layer for ordex: a single
//! backing file divided into fixed 512-byte blocks, a reserved header block,
//! and a small write-back cache of decoded nodes sitting between the tree
//! engine and the file.
//!
//! ## Block Addressing
//!
//! Blocks are addressed by a monotonically increasing integer id. Block 0 is
//! always the file header and is never a tree node, which makes id 0 safe as
//! the "no child" / "no root" sentinel everywhere above this layer.
//!
//! ```text
//! byte offset = block id * BLOCK_SIZE
//! ```
//!
//! ## Write Path
//!
//! The tree engine hands mutated nodes to the [`NodeCache`] and forgets
//! them. Dirty entries reach the file when they are evicted to make room,
//! or when the cache is flushed at close. The header block is the one
//! exception: allocation and root changes rewrite it synchronously so the
//! allocation boundary is always visible on disk.
//!
//! ## Module Organization
//!
//! - `headers`: file header layout and magic verification
//! - `blockfile`: raw block I/O and allocation over `std::fs::File`
//! - `cache`: bounded LRU node cache with dirty write-back
//!
//! ## Thread Safety
//!
//! None of these types are synchronized. The storage layer assumes exactly
//! one caller per open file; see the crate-level docs.

mod blockfile;
mod cache;
mod headers;

pub use blockfile::BlockFile;
pub use cache::NodeCache;
pub use headers::{FileHeader, MAGIC};

/// Fixed size of every block in the file, header included.
pub const BLOCK_SIZE: usize = 512;

/// Block id of the file header. Never allocated to a node.
pub const HEADER_BLOCK: u64 = 0;

/// Resident-node limit for [`NodeCache`]. Deliberately tiny: the cache is a
/// write-back layer the engine is required to go through, not a performance
/// feature, and a capacity this small keeps eviction churn constant.
pub const DEFAULT_CACHE_CAPACITY: usize = 4;
