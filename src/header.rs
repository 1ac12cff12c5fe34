//! The superblock and its embedded per-file records.
//!
//! Persisted twice in block 0 (slot 0 at offset 0, slot 1 immediately after)
//! so that a torn write to one slot never destroys the other. Layout is
//! `#[repr(C, packed)]` with explicit little-endian integer wrappers so the
//! in-memory representation is identical to the on-media bytes on any host,
//! matching the field order and widths spec.md §3 mandates.

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::crc;
use crate::device::{FILES_MAX, FILE_NAME_MAX};

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, KnownLayout, Immutable, FromBytes, IntoBytes)]
pub struct FileRecord {
    pub name: [u8; FILE_NAME_MAX],
    pub version: U16,
    pub start_block: U32,
    pub start_offset: U16,
    pub end_block: U32,
    pub end_offset: U16,
    pub size: U32,
}

impl FileRecord {
    pub fn name_str(&self) -> &str {
        let nul = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..nul]).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = [0u8; FILE_NAME_MAX];
        let bytes = name.as_bytes();
        let n = bytes.len().min(FILE_NAME_MAX - 1);
        self.name[..n].copy_from_slice(&bytes[..n]);
    }

    pub fn is_unused(&self) -> bool {
        self.name[0] == 0
    }
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, KnownLayout, Immutable, FromBytes, IntoBytes)]
pub struct Header {
    pub version: u8,
    pub generation: U32,
    pub block: U32,
    pub offset: U16,
    pub time: U32,
    pub files: [FileRecord; FILES_MAX],
    pub crc: U16,
}

pub const FORMAT_VERSION: u8 = 1;

/// Byte offset of `crc` within `Header`, i.e. how many leading bytes the CRC
/// is computed over.
pub const HEADER_SIZE_MINUS_CRC: usize = std::mem::size_of::<Header>() - std::mem::size_of::<U16>();

impl Header {
    pub fn zeroed() -> Self {
        Header::new_zeroed()
    }

    pub fn crc_valid(&self) -> bool {
        let actual = self.compute_crc();
        u16::from(self.crc) == actual
    }

    pub fn compute_crc(&self) -> u16 {
        crc::crc16_update(crc::HEADER_CRC_SEED, &self.as_bytes()[..HEADER_SIZE_MINUS_CRC])
    }

    pub fn update_crc(&mut self) {
        let actual = self.compute_crc();
        self.crc = actual.into();
    }
}

const _: () = assert!(2 * std::mem::size_of::<Header>() <= crate::device::BLOCK_SIZE);
