//! In-memory `BlockDevice`, used for tests and the fresh-mount/wipe
//! scenarios of spec.md §8.

use std::io;

use crate::device::{BlockDevice, BLOCK_SIZE};

pub struct MemBlockDevice {
    blocks: Vec<[u8; BLOCK_SIZE]>,
}

impl MemBlockDevice {
    pub fn new(block_count: u32) -> Self {
        MemBlockDevice {
            blocks: vec![[0u8; BLOCK_SIZE]; block_count as usize],
        }
    }

    /// Zeroes a block's bytes after `len` bytes, simulating a power loss
    /// mid `write_block` for the crash-law tests of spec.md §8.
    #[cfg(test)]
    pub fn tear_write(&mut self, block: u32, len: usize) {
        let b = &mut self.blocks[block as usize];
        for byte in b.iter_mut().skip(len) {
            *byte = 0;
        }
    }
}

impl BlockDevice for MemBlockDevice {
    fn read_block(&mut self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        let b = self
            .blocks
            .get(block as usize)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "block out of range"))?;
        buf.copy_from_slice(b);
        Ok(())
    }

    fn write_block(&mut self, block: u32, buf: &[u8; BLOCK_SIZE]) -> io::Result<()> {
        let b = self
            .blocks
            .get_mut(block as usize)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "block out of range"))?;
        b.copy_from_slice(buf);
        Ok(())
    }

    fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }
}
