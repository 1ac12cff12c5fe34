//! Token types for the resumable, single-file record iterator.
//!
//! The iteration logic itself lives on `Filesystem` (see `fs.rs`) because it
//! needs to share the filesystem's single block cache and device handle —
//! mirroring how the teacher keeps `WalIterator` coupled tightly to `Wal` in
//! one module, just split across two files here for readability given the
//! larger surface (reopen/resume/move_end/manual-next on top of plain
//! forward iteration).

/// A resumable cursor into one file's records. Carries enough state that a
/// caller can persist it (e.g. alongside processed data) and pick back up
/// after a restart with `Filesystem::iterator_resume`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IteratorToken {
    pub file: u8,
    pub block: u32,
    pub offset: u16,
    pub last_block: u32,
    pub last_offset: u16,
    pub size: u32,
}

/// Bounds a single call to `Filesystem::iterate` so that a long scan across
/// many wrapped, mostly-empty blocks can't monopolize the caller's loop.
#[derive(Copy, Clone, Debug)]
pub struct IteratorConfig {
    /// Stop after crossing this many block boundaries (0 = unbounded).
    pub max_blocks: u32,
    /// Stop after this many milliseconds of wall-clock time (0 = unbounded).
    pub max_time: u32,
    /// If true, a delivered entry is not skipped past automatically; the
    /// caller must call `Filesystem::iterate_move` to advance.
    pub manual_next: bool,
}

impl Default for IteratorConfig {
    fn default() -> Self {
        IteratorConfig {
            max_blocks: 0,
            max_time: 0,
            manual_next: false,
        }
    }
}

/// A live iterator over one file's records, plus the most recently
/// delivered slice.
#[derive(Clone, Debug, Default)]
pub struct FileIterator {
    pub(crate) token: IteratorToken,
    pub(crate) current: Vec<u8>,
    /// True once `token` has been seeded by `iterator_create`/`reopen`/`resume`.
    pub(crate) bound: bool,
}

impl FileIterator {
    pub fn new() -> Self {
        FileIterator::default()
    }

    pub fn token(&self) -> IteratorToken {
        self.token
    }

    /// The bytes delivered by the most recent successful `iterate` call.
    pub fn data(&self) -> &[u8] {
        &self.current
    }
}
