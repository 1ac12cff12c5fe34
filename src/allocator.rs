//! The priority-aware slot scan within a single cached block.
//!
//! This is pure and block-local; the block-advance/wrap-around loop that
//! calls it repeatedly lives on `Filesystem::allocate_slot` (fs.rs) since
//! that part needs the device and the cache.

use crate::device::{BLOCK_SIZE, FILES_MAX};
use crate::entry::{classify_entry, Entry, EntryStatus, ENTRY_SIZE};
use crate::header::FileRecord;
use zerocopy::{FromBytes, FromZeros};

/// Scans `block` starting at `from` for a usable offset to place a new
/// record of `required` bytes (entry header + payload), on behalf of a
/// writer with priority `requesting_priority` (0 = highest).
///
/// Returns `Some(offset)` if:
/// - the region is uninitialized (`EntryStatus::Size`),
/// - the region is stale/corrupt (`EntryStatus::Crc`), or
/// - a resident, intact entry belongs to a strictly lower-priority file
///   (numerically greater value) and has `available >= required`.
///
/// Returns `None` if the block runs out of room without finding a slot.
pub fn scan_for_slot(
    block: &[u8; BLOCK_SIZE],
    files: &[FileRecord; FILES_MAX],
    priorities: &[u8; FILES_MAX],
    requesting_priority: u8,
    required: u16,
    from: u16,
) -> Option<u16> {
    let mut offset = from;

    // A do-while shape, matching the original's `fkfs_block_available_offset`:
    // the entry at `from` is always classified at least once before the
    // continuation bound is checked, so an exact-fit slot at the tail of the
    // block is never skipped.
    loop {
        match classify_entry(block, offset as usize, files) {
            EntryStatus::Size | EntryStatus::Crc => return Some(offset),
            EntryStatus::Good => {
                let entry =
                    Entry::read_from_bytes(&block[offset as usize..offset as usize + ENTRY_SIZE])
                        .expect("classify_entry already validated this range");
                let resident_priority = priorities[entry.file as usize];
                let available = entry.available.get();
                if resident_priority > requesting_priority && available >= required {
                    return Some(offset);
                }
                offset = offset.saturating_add(ENTRY_SIZE as u16).saturating_add(available);
            }
        }

        if (offset as usize + required as usize) >= BLOCK_SIZE {
            return None;
        }
    }
}
