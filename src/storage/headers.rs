//! # File Header Definitions
//!
//! The first block of every ordex file is a header identifying the format
//! and carrying the two pieces of mutable bookkeeping the tree needs across
//! sessions: where the root lives and which block id is handed out next.
//!
//! ## Header Layout (512 bytes, block 0)
//!
//! ```text
//! Offset  Size  Field       Description
//! ------  ----  ----------  ---------------------------------------
//! 0       8     magic       ASCII "ORDEXv01"
//! 8       8     root_block  Root node block id (0 = empty tree)
//! 16      8     next_block  Next block id to allocate
//! 24      488   reserved    Zero
//! ```
//!
//! All integer fields are big-endian. The struct is pinned to exactly
//! [`BLOCK_SIZE`] bytes at compile time, so writing the header is writing
//! block 0, nothing more.
//!
//! ## Zerocopy Safety
//!
//! `FileHeader` derives the zerocopy traits (`FromBytes`, `IntoBytes`,
//! `Immutable`, `KnownLayout`, `Unaligned`) so a block buffer read from
//! disk can be reinterpreted in place, and `as_bytes()` yields the exact
//! image to write back.

use eyre::{ensure, Result};
use zerocopy::big_endian::U64;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::BLOCK_SIZE;

/// Eight ASCII bytes identifying an ordex index file.
pub const MAGIC: &[u8; 8] = b"ORDEXv01";

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FileHeader {
    magic: [u8; 8],
    root_block: U64,
    next_block: U64,
    reserved: [u8; BLOCK_SIZE - 24],
}

const _: () = assert!(std::mem::size_of::<FileHeader>() == BLOCK_SIZE);

impl FileHeader {
    /// Header for a freshly created file: no root yet, block 1 is the next
    /// allocation.
    pub fn new() -> Self {
        Self {
            magic: *MAGIC,
            root_block: U64::new(0),
            next_block: U64::new(1),
            reserved: [0u8; BLOCK_SIZE - 24],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= BLOCK_SIZE,
            "buffer too small for FileHeader: {} < {}",
            bytes.len(),
            BLOCK_SIZE
        );

        let header = Self::ref_from_bytes(&bytes[..BLOCK_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse FileHeader: {:?}", e))?;

        ensure!(
            &header.magic == MAGIC,
            "invalid index file: bad magic bytes"
        );

        Ok(header)
    }

    pub fn root_block(&self) -> u64 {
        self.root_block.get()
    }

    pub fn set_root_block(&mut self, id: u64) {
        self.root_block = U64::new(id);
    }

    pub fn next_block(&self) -> u64 {
        self.next_block.get()
    }

    pub fn set_next_block(&mut self, id: u64) {
        self.next_block = U64::new(id);
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_one_block() {
        assert_eq!(std::mem::size_of::<FileHeader>(), BLOCK_SIZE);
    }

    #[test]
    fn header_roundtrip() {
        let mut header = FileHeader::new();
        header.set_root_block(7);
        header.set_next_block(12);

        let bytes = header.as_bytes();
        let parsed = FileHeader::from_bytes(bytes).unwrap();

        assert_eq!(parsed.root_block(), 7);
        assert_eq!(parsed.next_block(), 12);
    }

    #[test]
    fn new_header_has_no_root() {
        let header = FileHeader::new();
        assert_eq!(header.root_block(), 0);
        assert_eq!(header.next_block(), 1);
    }

    #[test]
    fn header_rejects_invalid_magic() {
        let mut bytes = [0u8; BLOCK_SIZE];
        bytes[..8].copy_from_slice(b"NOTORDEX");

        assert!(FileHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn header_rejects_short_buffer() {
        let bytes = [0u8; 100];
        assert!(FileHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn magic_sits_at_offset_zero_and_counters_are_big_endian() {
        let header = FileHeader::new();
        let bytes = header.as_bytes();
        assert_eq!(&bytes[..8], b"ORDEXv01");
        assert_eq!(&bytes[8..16], &[0; 8]);
        assert_eq!(&bytes[16..24], &[0, 0, 0, 0, 0, 0, 0, 1]);
    }
}
