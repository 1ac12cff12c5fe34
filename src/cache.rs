//! The single block-sized write-back cache shared by the allocator and the
//! iterator. There is exactly one of these per `Filesystem`; it is never a
//! global.

use std::io;

use crate::device::{BlockDevice, BLOCK_SIZE};

/// Sentinel meaning "no block is currently cached."
const NONE: u32 = u32::MAX;

pub struct BlockCache {
    number: u32,
    dirty: bool,
    buffer: [u8; BLOCK_SIZE],
}

impl BlockCache {
    pub fn new() -> Self {
        BlockCache {
            number: NONE,
            dirty: false,
            buffer: [0u8; BLOCK_SIZE],
        }
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn number(&self) -> Option<u32> {
        if self.number == NONE {
            None
        } else {
            Some(self.number)
        }
    }

    pub fn buffer(&self) -> &[u8; BLOCK_SIZE] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [u8; BLOCK_SIZE] {
        &mut self.buffer
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Guarantees the cache holds `block`'s bytes, flushing any dirty block
    /// under a different number first (the iterator's flush-before-evict
    /// rule, spec.md §4.6/§9). Returns whether a device read actually
    /// happened, so callers can track read statistics without double
    /// counting cache hits.
    pub fn ensure<D: BlockDevice>(&mut self, dev: &mut D, block: u32) -> io::Result<bool> {
        if self.number == block {
            return Ok(false);
        }
        if self.dirty {
            self.flush_to(dev)?;
        }
        dev.read_block(block, &mut self.buffer)?;
        self.number = block;
        self.dirty = false;
        Ok(true)
    }

    /// Writes the cached block to `number` (the block it is dirty for) and
    /// invalidates the cache. No-op if nothing is dirty.
    pub fn flush_to<D: BlockDevice>(&mut self, dev: &mut D) -> io::Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        dev.write_block(self.number, &self.buffer)?;
        self.number = NONE;
        self.dirty = false;
        Ok(true)
    }

    /// Sets the cache to hold freshly zeroed bytes for `block` without
    /// reading the device, for when the caller is about to overwrite the
    /// whole block anyway.
    pub fn adopt_blank(&mut self, block: u32) {
        self.buffer = [0u8; BLOCK_SIZE];
        self.number = block;
        self.dirty = false;
    }
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new()
    }
}
