//! Line-buffered text logging built on top of `Filesystem::append`.
//!
//! Not one of the five core subsystems (SPEC_FULL.md §6): a thin
//! convenience the original firmware ships alongside fkfs proper
//! (`fkfs_log.cpp`), batching small writes into full block-sized records
//! instead of spending an `Entry` header on every line.

use std::fmt;

use crate::device::{BlockDevice, Clock, RandomSource};
use crate::entry::MAXIMUM_PAYLOAD_SIZE;
use crate::error::FkfsResult;
use crate::fs::Filesystem;

/// Buffers text/binary writes and flushes them as single records on the
/// owning `Filesystem`.
pub struct TextLog<'a, D, C, R> {
    fs: &'a mut Filesystem<D, C, R>,
    file: u8,
    buffer: Vec<u8>,
}

impl<'a, D: BlockDevice, C: Clock, R: RandomSource> TextLog<'a, D, C, R> {
    pub fn new(fs: &'a mut Filesystem<D, C, R>, file: u8) -> Self {
        TextLog { fs, file, buffer: Vec::with_capacity(MAXIMUM_PAYLOAD_SIZE) }
    }

    /// Writes out whatever is buffered as one record, then clears the
    /// buffer. A no-op if nothing is buffered.
    pub fn flush(&mut self) -> FkfsResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.fs.append(self.file, &self.buffer)?;
        self.buffer.clear();
        Ok(())
    }

    /// Appends `data`, splitting across multiple records if `can_split` and
    /// `data` alone exceeds the remaining buffer space. Refuses a single
    /// unsplittable write larger than one record can ever hold.
    pub fn append_binary(&mut self, data: &[u8], can_split: bool) -> FkfsResult<()> {
        if !can_split && MAXIMUM_PAYLOAD_SIZE - self.buffer.len() < data.len() {
            if data.len() >= MAXIMUM_PAYLOAD_SIZE {
                return Err(crate::error::FkfsError::InvalidArgument(
                    "record exceeds MAXIMUM_PAYLOAD_SIZE and cannot be split".into(),
                ));
            }
            self.flush()?;
        }

        let mut remaining = data;
        while !remaining.is_empty() {
            let available = MAXIMUM_PAYLOAD_SIZE - self.buffer.len();
            let copy = remaining.len().min(available);
            self.buffer.extend_from_slice(&remaining[..copy]);
            remaining = &remaining[copy..];

            if self.buffer.len() >= MAXIMUM_PAYLOAD_SIZE {
                self.flush()?;
            }
        }

        Ok(())
    }

    /// Appends a string, splitting across records if needed.
    pub fn append(&mut self, text: &str) -> FkfsResult<()> {
        self.append_binary(text.as_bytes(), true)
    }
}

/// Enables `write!(log, "...")`, the idiomatic replacement for the
/// original's `fkfs_log_printf` varargs entry point.
impl<'a, D: BlockDevice, C: Clock, R: RandomSource> fmt::Write for TextLog<'a, D, C, R> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s).map_err(|_| fmt::Error)
    }
}
