//! # Block File
//!
//! `BlockFile` owns the single backing file and exposes it as an array of
//! fixed 512-byte blocks plus a header. It is the only component that
//! touches `std::fs::File`; everything above it works in whole blocks.
//!
//! ## Allocation
//!
//! Block ids are handed out monotonically from the `next_block` counter in
//! the header. Every allocation extends the file to cover the new block and
//! rewrites the header block immediately, so a crash can never leave the
//! counter pointing into unwritten space. That costs one extra block write
//! per allocation.
//!
//! ## Error Surface
//!
//! - Opening a file whose header magic does not match fails (not an ordex
//!   file, or not one this version understands).
//! - Reading a block whose byte range lies past the current end of the file
//!   fails (corrupt or truncated index).
//!
//! Writes past the end are not errors: `write_block` extends the file, and
//! allocation pre-extends it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use eyre::{bail, Result, WrapErr};
use tracing::debug;
use zerocopy::IntoBytes;

use super::{FileHeader, BLOCK_SIZE};

#[derive(Debug)]
pub struct BlockFile {
    file: File,
    root_block: u64,
    next_block: u64,
}

impl BlockFile {
    /// Creates a new index file at `path`, failing if one already exists.
    /// The file is left one block long, holding only the header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create index file {:?}", path))?;

        let mut blockfile = Self {
            file,
            root_block: 0,
            next_block: 1,
        };
        blockfile.write_header()?;

        debug!(?path, "created index file");
        Ok(blockfile)
    }

    /// Opens an existing index file, verifying the header magic.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open index file {:?}", path))?;

        let mut buf = [0u8; BLOCK_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut buf)
            .wrap_err_with(|| format!("failed to read header block of {:?}", path))?;

        let header = FileHeader::from_bytes(&buf)
            .wrap_err_with(|| format!("{:?} is not a valid index file", path))?;

        let blockfile = Self {
            root_block: header.root_block(),
            next_block: header.next_block(),
            file,
        };

        debug!(
            ?path,
            root = blockfile.root_block,
            next = blockfile.next_block,
            "opened index file"
        );
        Ok(blockfile)
    }

    /// Reads block `id` in full. Fails if the block lies past the current
    /// end of the file.
    pub fn read_block(&mut self, id: u64) -> Result<[u8; BLOCK_SIZE]> {
        let offset = id * BLOCK_SIZE as u64;
        let len = self.file.metadata()?.len();
        if offset + BLOCK_SIZE as u64 > len {
            bail!(
                "corrupt or truncated index: block {} is past the end of the file ({} bytes)",
                id,
                len
            );
        }

        let mut buf = [0u8; BLOCK_SIZE];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file
            .read_exact(&mut buf)
            .wrap_err_with(|| format!("failed to read block {}", id))?;
        Ok(buf)
    }

    /// Writes block `id` in full, extending the file if necessary.
    pub fn write_block(&mut self, id: u64, data: &[u8; BLOCK_SIZE]) -> Result<()> {
        let offset = id * BLOCK_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file
            .write_all(data)
            .wrap_err_with(|| format!("failed to write block {}", id))?;
        Ok(())
    }

    /// Hands out the next block id, extends the file to cover it, and
    /// persists the advanced counter into the header.
    pub fn allocate(&mut self) -> Result<u64> {
        let id = self.next_block;
        self.next_block += 1;

        let needed = (id + 1) * BLOCK_SIZE as u64;
        if self.file.metadata()?.len() < needed {
            self.file.set_len(needed)?;
        }
        self.write_header()?;

        Ok(id)
    }

    pub fn root_block(&self) -> u64 {
        self.root_block
    }

    /// Points the header at a new root and persists it immediately.
    pub fn set_root_block(&mut self, id: u64) -> Result<()> {
        self.root_block = id;
        self.write_header()?;
        debug!(root = id, "root block updated");
        Ok(())
    }

    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    fn write_header(&mut self) -> Result<()> {
        let mut header = FileHeader::new();
        header.set_root_block(self.root_block);
        header.set_next_block(self.next_block);

        self.file.seek(SeekFrom::Start(0))?;
        self.file
            .write_all(header.as_bytes())
            .wrap_err("failed to write header block")?;
        Ok(())
    }
}
