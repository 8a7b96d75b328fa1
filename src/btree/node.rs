//! # Node Format and Codec
//!
//! One tree node per 512-byte block. The codec is a fixed-width mapping
//! with no compression and no variable-length fields, so encode/decode is
//! a straight reinterpretation through a zerocopy wire struct.
//!
//! ## Block Layout (512 bytes)
//!
//! ```text
//! Offset  Size   Field      Description
//! ------  ----   ---------  --------------------------------------
//! 0       8      block_id   This node's own block id
//! 8       8      parent_id  Parent block id (advisory, see below)
//! 16      8      key_count  Number of live keys, 0..=19
//! 24      152    keys       19 × i64, slots beyond key_count zero
//! 176     152    values     19 × i64, values[i] belongs to keys[i]
//! 328     160    children   20 × u64 child block ids, 0 = none
//! 488     24     reserved   Zero
//! ```
//!
//! All integers are big-endian. Live keys are strictly increasing.
//!
//! Leaf-ness is derived on decode by scanning the child slots for any
//! nonzero id, never trusted from a stored flag.
//!
//! The parent id is maintained on splits but no read path consults it;
//! it is carried for the format, not for navigation.

use eyre::{ensure, Result};
use zerocopy::big_endian::{I64, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::storage::BLOCK_SIZE;

use super::{MAX_CHILDREN, MAX_KEYS};

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct NodeBlock {
    block_id: U64,
    parent_id: U64,
    key_count: U64,
    keys: [I64; MAX_KEYS],
    values: [I64; MAX_KEYS],
    children: [U64; MAX_CHILDREN],
    reserved: [u8; 24],
}

const _: () = assert!(std::mem::size_of::<NodeBlock>() == BLOCK_SIZE);

/// An in-memory tree node. Fixed-capacity arrays, cheap to clone; the
/// node cache hands out copies of these and takes mutations back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    block_id: u64,
    parent_id: u64,
    num_keys: usize,
    keys: [i64; MAX_KEYS],
    values: [i64; MAX_KEYS],
    children: [u64; MAX_CHILDREN],
    leaf: bool,
}

impl Node {
    pub fn new(block_id: u64, parent_id: u64, leaf: bool) -> Self {
        Self {
            block_id,
            parent_id,
            num_keys: 0,
            keys: [0; MAX_KEYS],
            values: [0; MAX_KEYS],
            children: [0; MAX_CHILDREN],
            leaf,
        }
    }

    pub fn block_id(&self) -> u64 {
        self.block_id
    }

    pub fn parent_id(&self) -> u64 {
        self.parent_id
    }

    pub fn set_parent_id(&mut self, id: u64) {
        self.parent_id = id;
    }

    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn is_full(&self) -> bool {
        self.num_keys == MAX_KEYS
    }

    pub fn key(&self, i: usize) -> i64 {
        self.keys[i]
    }

    pub fn value(&self, i: usize) -> i64 {
        self.values[i]
    }

    pub fn child(&self, i: usize) -> u64 {
        self.children[i]
    }

    pub fn set_child(&mut self, i: usize, id: u64) {
        self.children[i] = id;
    }

    /// Inserts `key`/`value` at position `i`, shifting later entries right.
    /// The node must not be full.
    pub fn insert_entry(&mut self, i: usize, key: i64, value: i64) {
        assert!(self.num_keys < MAX_KEYS, "insert into full node");
        assert!(i <= self.num_keys, "insert position out of range");

        let mut j = self.num_keys;
        while j > i {
            self.keys[j] = self.keys[j - 1];
            self.values[j] = self.values[j - 1];
            j -= 1;
        }
        self.keys[i] = key;
        self.values[i] = value;
        self.num_keys += 1;
    }

    /// Shrinks the node to `n` keys, zeroing the vacated key/value slots.
    /// Child slots are handled separately via [`clear_children_from`].
    ///
    /// [`clear_children_from`]: Self::clear_children_from
    pub fn truncate_keys(&mut self, n: usize) {
        for i in n..MAX_KEYS {
            self.keys[i] = 0;
            self.values[i] = 0;
        }
        self.num_keys = n;
    }

    /// Zeroes every child slot from `i` onward.
    pub fn clear_children_from(&mut self, i: usize) {
        for slot in &mut self.children[i..] {
            *slot = 0;
        }
    }

    /// Encodes the node into its 512-byte block image.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut keys = [I64::new(0); MAX_KEYS];
        let mut values = [I64::new(0); MAX_KEYS];
        let mut children = [U64::new(0); MAX_CHILDREN];
        for i in 0..MAX_KEYS {
            keys[i] = I64::new(self.keys[i]);
            values[i] = I64::new(self.values[i]);
        }
        for i in 0..MAX_CHILDREN {
            children[i] = U64::new(self.children[i]);
        }

        let block = NodeBlock {
            block_id: U64::new(self.block_id),
            parent_id: U64::new(self.parent_id),
            key_count: U64::new(self.num_keys as u64),
            keys,
            values,
            children,
            reserved: [0u8; 24],
        };

        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(block.as_bytes());
        out
    }

    /// Decodes a 512-byte block image, recomputing leaf-ness from the
    /// child slots.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ensure!(
            bytes.len() == BLOCK_SIZE,
            "node image must be exactly {} bytes, got {}",
            BLOCK_SIZE,
            bytes.len()
        );

        let block = NodeBlock::ref_from_bytes(bytes)
            .map_err(|e| eyre::eyre!("failed to parse node block: {:?}", e))?;

        let key_count = block.key_count.get();
        ensure!(
            key_count <= MAX_KEYS as u64,
            "corrupt node block {}: key count {} exceeds {}",
            block.block_id.get(),
            key_count,
            MAX_KEYS
        );

        let mut keys = [0i64; MAX_KEYS];
        let mut values = [0i64; MAX_KEYS];
        let mut children = [0u64; MAX_CHILDREN];
        for i in 0..MAX_KEYS {
            keys[i] = block.keys[i].get();
            values[i] = block.values[i].get();
        }
        for i in 0..MAX_CHILDREN {
            children[i] = block.children[i].get();
        }

        let leaf = children.iter().all(|&c| c == 0);

        Ok(Self {
            block_id: block.block_id.get(),
            parent_id: block.parent_id.get(),
            num_keys: key_count as usize,
            keys,
            values,
            children,
            leaf,
        })
    }
}
