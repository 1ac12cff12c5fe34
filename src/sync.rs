//! File-backed `BlockDevice`, grounded on the teacher's `SyncDevice` minus
//! its async completion-queue machinery: this filesystem's writer is
//! single-threaded and synchronous (spec.md §5), so a plain
//! seek-then-read/write is the whole implementation.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::device::{BlockDevice, BLOCK_SIZE};

pub struct FileBlockDevice {
    file: File,
    block_count: u32,
}

impl FileBlockDevice {
    /// Opens an existing file and treats its length as the device capacity.
    /// The caller is responsible for having created/sized the file first
    /// (the original firmware's `sd_raw_initialize` is out of scope here).
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len % BLOCK_SIZE as u64 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file length {len} is not a multiple of BLOCK_SIZE {BLOCK_SIZE}"),
            ));
        }
        Ok(FileBlockDevice {
            file,
            block_count: (len / BLOCK_SIZE as u64) as u32,
        })
    }

    /// Creates a new zero-filled file of `block_count` blocks and opens it.
    pub fn create(path: &Path, block_count: u32) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(block_count as u64 * BLOCK_SIZE as u64)?;
        Ok(FileBlockDevice { file, block_count })
    }
}

impl BlockDevice for FileBlockDevice {
    fn read_block(&mut self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        self.file
            .seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))?;
        self.file.read_exact(buf)
    }

    fn write_block(&mut self, block: u32, buf: &[u8; BLOCK_SIZE]) -> io::Result<()> {
        self.file
            .seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))?;
        self.file.write_all(buf)?;
        self.file.sync_data()
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }
}
