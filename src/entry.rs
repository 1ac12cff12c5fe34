//! The record header that precedes every payload written to a data block.

use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::crc;
use crate::device::BLOCK_SIZE;
use crate::header::FileRecord;

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, KnownLayout, Immutable, FromBytes, IntoBytes)]
pub struct Entry {
    pub file: u8,
    pub size: U16,
    pub available: U16,
    pub crc: U16,
}

pub const ENTRY_SIZE: usize = std::mem::size_of::<Entry>();
const ENTRY_SIZE_MINUS_CRC: usize = ENTRY_SIZE - std::mem::size_of::<U16>();

/// The largest payload that can ever be stored in one block alongside its
/// `Entry` header.
pub const MAXIMUM_PAYLOAD_SIZE: usize = BLOCK_SIZE - ENTRY_SIZE;

impl Entry {
    pub fn compute_crc(&self, version: u16, payload: &[u8]) -> u16 {
        let crc = crc::crc16_update(version, &self.as_bytes()[..ENTRY_SIZE_MINUS_CRC]);
        crc::crc16_update(crc, &payload[..self.size.get() as usize])
    }
}

/// Result of classifying the entry found at some offset in a block.
///
/// Named per spec.md §9's design note: a tagged variant replaces the
/// original integer status code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryStatus {
    /// The entry is intact: its CRC validates against its owning file's
    /// current version.
    Good,
    /// `file`/`size`/`available` are out of range; this offset and
    /// everything after it in the block is uninitialized.
    Size,
    /// Length fields look sane but the CRC doesn't match; the region is
    /// stale or torn and safe to overwrite.
    Crc,
}

/// Classifies the entry at the start of `block[offset..]`.
///
/// `files` is indexed by `Entry::file` and supplies the version each file's
/// records are currently chained against.
pub fn classify_entry(block: &[u8], offset: usize, files: &[FileRecord]) -> EntryStatus {
    if offset + ENTRY_SIZE > block.len() {
        return EntryStatus::Size;
    }

    let entry = match Entry::read_from_bytes(&block[offset..offset + ENTRY_SIZE]) {
        Ok(e) => e,
        Err(_) => return EntryStatus::Size,
    };

    if entry.file as usize >= files.len() {
        return EntryStatus::Size;
    }

    let size = entry.size.get();
    let available = entry.available.get();
    if size == 0 || size as usize >= BLOCK_SIZE || available == 0 || available as usize >= BLOCK_SIZE {
        return EntryStatus::Size;
    }

    let payload_start = offset + ENTRY_SIZE;
    let payload_end = payload_start + size as usize;
    if payload_end > block.len() {
        return EntryStatus::Size;
    }

    let version = files[entry.file as usize].version.get();
    let expected = entry.compute_crc(version, &block[payload_start..payload_end]);
    if entry.crc.get() != expected {
        return EntryStatus::Crc;
    }

    EntryStatus::Good
}
