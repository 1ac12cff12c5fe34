//! The `Filesystem` aggregate: mount, append, truncate, and iterate.
//!
//! This is the heart of the crate, grounded on the teacher's `Wal` (one
//! struct owning the device, the single cached block, and the write
//! frontier) but generalized from a single append-only stream into
//! `FILES_MAX` priority-tagged, independently truncatable streams sharing
//! one block stream, per spec.md §4.

use log::{debug, info, trace, warn};
use zerocopy::{FromBytes, IntoBytes};

use crate::allocator::scan_for_slot;
use crate::cache::BlockCache;
use crate::device::{BlockDevice, Clock, RandomSource, BLOCK_SIZE, FILES_MAX};
use crate::entry::{classify_entry, Entry, EntryStatus, ENTRY_SIZE};
use crate::error::{FkfsError, FkfsResult};
use crate::header::{Header, FORMAT_VERSION};
use crate::iterator::{FileIterator, IteratorConfig, IteratorToken};

/// Default reserved-partition boundary, matching the original firmware's
/// `FKFS_FIRST_BLOCK`. Block 0 is always the superblock regardless of this
/// value; blocks `1..first_block` are simply never touched.
pub const DEFAULT_FIRST_BLOCK: u32 = 6000;

/// Bound on block advances within a single `append` call before giving up
/// with `NoSpace`.
const SEEK_BLOCKS_MAX: u16 = 5;

/// Per-file settings that are configured by the host and never persisted.
#[derive(Copy, Clone, Debug)]
struct FileRuntime {
    priority: u8,
    sync: bool,
}

impl Default for FileRuntime {
    fn default() -> Self {
        FileRuntime { priority: 255, sync: false }
    }
}

/// A snapshot of one file's persisted state and runtime settings, returned
/// by `Filesystem::get_file`.
#[derive(Clone, Debug)]
pub struct FileInfo {
    pub name: String,
    pub size: u32,
    pub sync: bool,
    pub priority: u8,
    pub version: u16,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Statistics {
    pub block_reads: u32,
    pub block_writes: u32,
    pub iterate_calls: u32,
    pub iterate_time: u32,
    pub write_time: u32,
}

pub struct Filesystem<D, C, R> {
    dev: D,
    clock: C,
    rng: R,

    first_block: u32,
    /// Overrides the wrap-around trigger block for tests exercising
    /// wrap-around without a multi-gigabyte device (spec.md §9, open
    /// question (a); the original firmware's `FKFS_TESTING_LAST_BLOCK`).
    wrap_at_override: Option<u32>,

    header_index: u8,
    header: Header,
    cache: BlockCache,
    files: [FileRuntime; FILES_MAX],
    statistics: Statistics,
}

impl<D: BlockDevice, C: Clock, R: RandomSource> Filesystem<D, C, R> {
    /// Zero-initializes runtime state. Equivalent of the original
    /// `fkfs_create`.
    pub fn create(dev: D, clock: C, rng: R) -> Self {
        Filesystem {
            dev,
            clock,
            rng,
            first_block: DEFAULT_FIRST_BLOCK,
            wrap_at_override: None,
            header_index: 0,
            header: Header::zeroed(),
            cache: BlockCache::new(),
            files: [FileRuntime::default(); FILES_MAX],
            statistics: Statistics::default(),
        }
    }

    /// Overrides the reserved-partition boundary. Must be called before
    /// `initialize`.
    pub fn with_first_block(mut self, first_block: u32) -> Self {
        self.first_block = first_block;
        self
    }

    /// Test/debug hook implementing spec.md §9 open question (a)'s
    /// `FKFS_TESTING_LAST_BLOCK` sentinel without hardcoding `u32::MAX` into
    /// production wrap-around checks.
    pub fn with_wrap_at_override(mut self, block: u32) -> Self {
        self.wrap_at_override = Some(block);
        self
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Registers a file slot before `initialize`. `file` must be `< FILES_MAX`.
    pub fn initialize_file(&mut self, file: u8, priority: u8, sync: bool, name: &str) -> FkfsResult<()> {
        let idx = self.file_index(file)?;
        self.files[idx] = FileRuntime { priority, sync };
        self.header.files[idx].set_name(name);
        Ok(())
    }

    /// Mounts the filesystem: reads block 0, selects the newer valid header
    /// slot (or bootstraps a fresh one), per spec.md §4.2.
    pub fn initialize(&mut self, wipe: bool) -> FkfsResult<()> {
        let mut block0 = [0u8; BLOCK_SIZE];
        self.dev.read_block(0, &mut block0)?;
        self.statistics.block_reads += 1;

        let header_size = std::mem::size_of::<Header>();
        let slot0 = Header::read_from_bytes(&block0[..header_size]).expect("header layout is fixed-size");
        let slot1 =
            Header::read_from_bytes(&block0[header_size..header_size * 2]).expect("header layout is fixed-size");

        if wipe || (!slot0.crc_valid() && !slot1.crc_valid()) {
            info!("fkfs: initialize/wipe");
            self.bootstrap_fresh_header()?;
        } else {
            let chosen_index: u8 = if !slot1.crc_valid() {
                0
            } else if !slot0.crc_valid() {
                1
            } else if slot0.generation.get() > slot1.generation.get() {
                0
            } else {
                1
            };

            let mut loaded = if chosen_index == 0 { slot0 } else { slot1 };
            // Names are static host configuration, not persisted identity:
            // re-project the caller-supplied names set by `initialize_file`
            // over whatever the media says.
            for i in 0..FILES_MAX {
                loaded.files[i].name = self.header.files[i].name;
            }
            self.header_index = chosen_index;
            self.header = loaded;
            debug!(
                "fkfs: mounted slot {} generation {} block {} offset {}",
                self.header_index,
                { self.header.generation.get() },
                { self.header.block.get() },
                { self.header.offset.get() }
            );
        }

        Ok(())
    }

    fn bootstrap_fresh_header(&mut self) -> FkfsResult<()> {
        let names: Vec<[u8; crate::device::FILE_NAME_MAX]> =
            (0..FILES_MAX).map(|i| self.header.files[i].name).collect();

        self.header = Header::zeroed();
        self.header.version = FORMAT_VERSION;
        self.header.block = self.first_block.into();
        self.header.generation = 0u32.into();

        for i in 0..FILES_MAX {
            let file = &mut self.header.files[i];
            file.name = names[i];
            file.version = (self.rng.random(u16::MAX as u32) as u16).into();
            file.start_block = self.first_block.into();
            file.end_block = self.first_block.into();

            trace!(
                "file[{i}] sync={} pri={} start={} version={} '{}'",
                self.files[i].sync,
                self.files[i].priority,
                self.first_block,
                { file.version.get() },
                file.name_str()
            );
        }

        self.header_index = 0;
        self.write_header_slot(true)?;

        self.header.generation = 1u32.into();
        self.header_index = 1;
        self.write_header_slot(false)?;

        Ok(())
    }

    fn write_header_slot(&mut self, wipe: bool) -> FkfsResult<()> {
        let mut block0 = [0u8; BLOCK_SIZE];
        if !wipe {
            self.dev.read_block(0, &mut block0)?;
            self.statistics.block_reads += 1;
        }

        self.header.update_crc();

        let header_size = std::mem::size_of::<Header>();
        let start = self.header_index as usize * header_size;
        block0[start..start + header_size].copy_from_slice(self.header.as_bytes());

        self.dev.write_block(0, &block0)?;
        self.statistics.block_writes += 1;
        Ok(())
    }

    /// Updates the header timestamp only; does not touch the cached data
    /// block.
    pub fn touch(&mut self, time: u32) -> FkfsResult<()> {
        self.header.time = time.into();
        self.write_header_slot(false)
    }

    /// Promotes the cached block to the device (if dirty) and advances the
    /// header generation. A no-op — and crucially, not a generation bump —
    /// if nothing is dirty (spec.md §4.4's idle-flush law).
    pub fn flush(&mut self) -> FkfsResult<()> {
        let wrote = self.cache.flush_to(&mut self.dev)?;
        if !wrote {
            debug!("fkfs: sync (ignored)");
            return Ok(());
        }
        self.statistics.block_writes += 1;

        self.header.generation = (self.header.generation.get() + 1).into();
        self.header_index = (self.header_index + 1) % 2;
        self.write_header_slot(false)?;

        debug!("fkfs: sync!");
        Ok(())
    }

    fn file_index(&self, file: u8) -> FkfsResult<usize> {
        let idx = file as usize;
        if idx >= FILES_MAX {
            return Err(FkfsError::InvalidArgument(format!("file id {file} >= FILES_MAX")));
        }
        Ok(idx)
    }

    fn priority_table(&self) -> [u8; FILES_MAX] {
        let mut table = [0u8; FILES_MAX];
        for (i, f) in self.files.iter().enumerate() {
            table[i] = f.priority;
        }
        table
    }

    fn wrap_at(&self) -> u32 {
        self.wrap_at_override.unwrap_or_else(|| self.dev.block_count().saturating_sub(2))
    }

    /// Writes `data` as one record owned by `file`. Flushes immediately if
    /// the file is configured `sync`.
    pub fn append(&mut self, file: u8, data: &[u8]) -> FkfsResult<()> {
        let idx = self.file_index(file)?;
        if data.is_empty() {
            return Err(FkfsError::InvalidArgument("zero-size append".into()));
        }
        let required = ENTRY_SIZE + data.len();
        if required > BLOCK_SIZE {
            return Err(FkfsError::InvalidArgument(format!(
                "record of {} bytes (with header) exceeds block size {BLOCK_SIZE}",
                required
            )));
        }
        let required = required as u16;

        debug!(
            "fkfs: allocating f#{file} pri={} version={} block={} [required={required}]",
            self.files[idx].priority,
            { self.header.files[idx].version.get() },
            { self.header.block.get() }
        );

        self.allocate_slot(idx, required)?;

        let version = self.header.files[idx].version.get();
        let mut entry = Entry {
            file,
            size: (data.len() as u16).into(),
            available: (data.len() as u16).into(),
            crc: 0u16.into(),
        };
        let crc = entry.compute_crc(version, data);
        entry.crc = crc.into();

        let offset = self.header.offset.get() as usize;
        {
            let buf = self.cache.buffer_mut();
            buf[offset..offset + ENTRY_SIZE].copy_from_slice(entry.as_bytes());
            buf[offset + ENTRY_SIZE..offset + ENTRY_SIZE + data.len()].copy_from_slice(data);
        }
        self.cache.mark_dirty();

        self.header.offset = (offset as u16 + required).into();
        let block = self.header.block;
        let new_offset = self.header.offset;
        let file_record = &mut self.header.files[idx];
        file_record.end_block = block;
        file_record.end_offset = new_offset;
        file_record.size = (file_record.size.get() + data.len() as u32).into();

        debug!(
            "fkfs: allocated f#{file} block={} [{offset} -> {}] {} bytes free",
            { self.header.block.get() },
            offset + required as usize,
            BLOCK_SIZE - (offset + required as usize)
        );

        if self.files[idx].sync {
            self.flush()?;
        }

        Ok(())
    }

    /// Finds a slot for `required` bytes, advancing (and wrapping) blocks as
    /// needed, per spec.md §4.3.
    fn allocate_slot(&mut self, idx: usize, required: u16) -> FkfsResult<()> {
        let mut new_offset = self.header.offset.get();
        let mut visited: u16 = 0;

        loop {
            if new_offset as usize + required as usize > BLOCK_SIZE {
                self.flush()?;

                let mut next_block = self.header.block.get() + 1;
                self.header.offset = 0u16.into();
                new_offset = 0;
                visited += 1;

                let wrap_at = self.wrap_at();
                if next_block == wrap_at {
                    trace!("fkfs: wrap around to first block {}", self.first_block);
                    next_block = self.first_block;
                }
                self.header.block = next_block.into();
            }

            let block_num = self.header.block.get();
            let read = self.cache.ensure(&mut self.dev, block_num)?;
            if read {
                self.statistics.block_reads += 1;
            }

            let priorities = self.priority_table();
            let found = scan_for_slot(
                self.cache.buffer(),
                &self.header.files,
                &priorities,
                self.files[idx].priority,
                required,
                new_offset,
            );

            if let Some(offset) = found {
                self.header.offset = offset.into();
                return Ok(());
            }

            new_offset = BLOCK_SIZE as u16;
            if visited >= SEEK_BLOCKS_MAX {
                warn!("fkfs: no space for file {idx} after {visited} block(s)");
                return Err(FkfsError::NoSpace);
            }
        }
    }

    /// Bumps the file's version (invalidating every prior record by CRC)
    /// and resets its extent to the current write head.
    pub fn truncate(&mut self, file: u8) -> FkfsResult<()> {
        let idx = self.file_index(file)?;
        let block = self.header.block;
        let file_record = &mut self.header.files[idx];
        file_record.version = (file_record.version.get() + 1).into();
        file_record.start_block = block;
        file_record.start_offset = 0u16.into();
        file_record.end_block = block;
        file_record.end_offset = 0u16.into();
        file_record.size = 0u32.into();
        info!("fkfs: truncated file {file}, new version {}", { self.header.files[idx].version.get() });
        Ok(())
    }

    pub fn truncate_all(&mut self) -> FkfsResult<()> {
        for file in 0..FILES_MAX as u8 {
            self.truncate(file)?;
        }
        Ok(())
    }

    /// Trims everything before the iterator's current position by moving
    /// `start_block` forward, then recomputes `size` by walking the
    /// remaining live records.
    pub fn truncate_at(&mut self, iter: &FileIterator) -> FkfsResult<()> {
        let idx = self.file_index(iter.token.file)?;
        self.header.files[idx].start_block = iter.token.block.into();
        self.header.files[idx].start_offset = 0u16.into();

        let mut scan = self.iterator_create(iter.token.file)?;
        scan.token.block = iter.token.block;
        scan.token.offset = 0;

        let mut size: u32 = 0;
        let config = IteratorConfig::default();
        while self.iterate(&mut scan, &config)? {
            size += scan.current.len() as u32;
        }
        self.header.files[idx].size = size.into();
        Ok(())
    }

    pub fn number_of_files(&self) -> u8 {
        for i in 0..FILES_MAX {
            if self.header.files[i].is_unused() {
                return i as u8;
            }
        }
        0
    }

    pub fn get_file(&self, file: u8) -> FkfsResult<FileInfo> {
        let idx = self.file_index(file)?;
        let fr = &self.header.files[idx];
        Ok(FileInfo {
            name: fr.name_str().to_string(),
            size: fr.size.get(),
            sync: self.files[idx].sync,
            priority: self.files[idx].priority,
            version: fr.version.get(),
        })
    }

    pub fn log_statistics(&self) {
        info!(
            "fkfs: index={} gen={} block={} offset={}",
            self.header_index,
            { self.header.generation.get() },
            { self.header.block.get() },
            { self.header.offset.get() }
        );
        for i in 0..FILES_MAX {
            if !self.header.files[i].is_unused() {
                info!("fkfs: {i} {}", self.header.files[i].name_str());
            }
        }
    }

    // --- Iterator API (spec.md §4.6) --------------------------------

    pub fn iterator_create(&self, file: u8) -> FkfsResult<FileIterator> {
        let idx = self.file_index(file)?;
        let fr = &self.header.files[idx];
        Ok(FileIterator {
            token: IteratorToken {
                file,
                block: fr.start_block.get(),
                offset: 0,
                last_block: self.header.block.get(),
                last_offset: self.header.offset.get(),
                size: fr.size.get(),
            },
            current: Vec::new(),
            bound: true,
        })
    }

    /// Rebinds a saved token to the file's current extent. If the file was
    /// truncated after the token was captured (its size went backwards),
    /// resets to the file's new start instead of replaying stale records.
    pub fn iterator_reopen(&self, token: IteratorToken) -> FkfsResult<FileIterator> {
        let idx = self.file_index(token.file)?;
        let fr = &self.header.files[idx];
        let mut new_token = token;
        new_token.last_block = fr.end_block.get();
        new_token.last_offset = fr.end_offset.get();

        if fr.size.get() < token.size {
            debug!("fkfs: reopen detected truncate on file {}, resetting", token.file);
            new_token.block = fr.start_block.get();
            new_token.offset = 0;
        }
        new_token.size = fr.size.get();

        Ok(FileIterator { token: new_token, current: Vec::new(), bound: true })
    }

    /// Restores exactly the saved position and stop boundary, with no
    /// rebinding to the file's current state.
    pub fn iterator_resume(&self, token: IteratorToken) -> FkfsResult<FileIterator> {
        Ok(FileIterator { token, current: Vec::new(), bound: true })
    }

    pub fn iterator_valid(&self, iter: &FileIterator) -> bool {
        if !iter.bound || iter.token.block == 0 {
            return false;
        }
        if iter.token.block > self.header.block.get() {
            return false;
        }
        if iter.token.block > iter.token.last_block {
            return false;
        }
        if iter.token.block == iter.token.last_block && iter.token.offset >= iter.token.last_offset {
            return false;
        }
        true
    }

    pub fn iterator_done(&self, iter: &FileIterator) -> bool {
        !self.iterator_valid(iter)
    }

    /// Parks the iterator at its own stop boundary, marking it done without
    /// delivering whatever records remain.
    pub fn iterator_move_end(&self, iter: &mut FileIterator) {
        iter.token.block = iter.token.last_block;
        iter.token.offset = iter.token.last_offset;
    }

    /// Advances past the entry the iterator is currently parked on, for use
    /// after an `iterate` call made with `manual_next: true`.
    pub fn iterate_move(&mut self, iter: &mut FileIterator) -> FkfsResult<()> {
        if !self.iterator_valid(iter) {
            return Ok(());
        }
        let block_num = iter.token.block;
        let read = self.cache.ensure(&mut self.dev, block_num)?;
        if read {
            self.statistics.block_reads += 1;
        }
        let offset = iter.token.offset as usize;
        if let EntryStatus::Good | EntryStatus::Crc = classify_entry(self.cache.buffer(), offset, &self.header.files)
        {
            if let Ok(entry) = Entry::read_from_bytes(&self.cache.buffer()[offset..offset + ENTRY_SIZE]) {
                iter.token.offset = iter.token.offset.saturating_add(ENTRY_SIZE as u16).saturating_add(entry.available.get());
            }
        }
        Ok(())
    }

    /// Streams the next record belonging to `iter`'s file, honoring
    /// `config`'s block/time budget. Returns `Ok(false)` when the iterator
    /// is exhausted or its budget runs out; the token remains valid for a
    /// later resumed call either way.
    pub fn iterate(&mut self, iter: &mut FileIterator, config: &IteratorConfig) -> FkfsResult<bool> {
        if !iter.bound {
            return Err(FkfsError::Uninitialized);
        }

        self.statistics.iterate_calls += 1;
        let started = self.clock.millis();
        let mut blocks_remaining = config.max_blocks;

        loop {
            if !self.iterator_valid(iter) {
                return Ok(false);
            }

            let block_num = iter.token.block;
            let read = self.cache.ensure(&mut self.dev, block_num)?;
            if read {
                self.statistics.block_reads += 1;
            }

            let offset = iter.token.offset as usize;
            match classify_entry(self.cache.buffer(), offset, &self.header.files) {
                EntryStatus::Good => {
                    let entry = Entry::read_from_bytes(&self.cache.buffer()[offset..offset + ENTRY_SIZE])
                        .expect("classify_entry already validated this range");
                    if entry.file == iter.token.file {
                        trace!("fkfs: scanning: data ({}, {offset})", iter.token.block);
                        let size = entry.size.get() as usize;
                        let data_start = offset + ENTRY_SIZE;
                        iter.current = self.cache.buffer()[data_start..data_start + size].to_vec();
                        if !config.manual_next {
                            iter.token.offset = iter
                                .token
                                .offset
                                .saturating_add(ENTRY_SIZE as u16)
                                .saturating_add(entry.available.get());
                        }
                        return Ok(true);
                    }
                    iter.token.offset = iter
                        .token
                        .offset
                        .saturating_add(ENTRY_SIZE as u16)
                        .saturating_add(entry.available.get());
                }
                EntryStatus::Crc => {
                    warn!("fkfs: scanning: crc mismatch at ({}, {offset}), skipping", iter.token.block);
                    match Entry::read_from_bytes(&self.cache.buffer()[offset..offset + ENTRY_SIZE]) {
                        Ok(entry) => {
                            iter.token.offset = iter
                                .token
                                .offset
                                .saturating_add(ENTRY_SIZE as u16)
                                .saturating_add(entry.available.get());
                        }
                        Err(_) => {
                            iter.token.block += 1;
                            iter.token.offset = 0;
                        }
                    }
                }
                EntryStatus::Size => {
                    trace!("fkfs: scanning: block ({}, {offset})", iter.token.block);
                    iter.token.block += 1;
                    iter.token.offset = 0;

                    let wrap_at = self.wrap_at();
                    if iter.token.block == wrap_at {
                        iter.token.block = self.first_block;
                    }

                    if config.max_blocks > 0 {
                        blocks_remaining -= 1;
                        if blocks_remaining == 0 {
                            return Ok(false);
                        }
                    }
                    if config.max_time > 0 && self.clock.millis().wrapping_sub(started) > config.max_time {
                        return Ok(false);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FILE_NAME_MAX;
    use crate::mem::MemBlockDevice;

    struct FakeClock {
        millis: std::cell::Cell<u32>,
    }

    impl FakeClock {
        fn new() -> Self {
            FakeClock { millis: std::cell::Cell::new(0) }
        }
        fn advance(&self, by: u32) {
            self.millis.set(self.millis.get() + by);
        }
    }

    impl Clock for FakeClock {
        fn millis(&self) -> u32 {
            self.millis.get()
        }
    }

    struct FakeRandom(u32);

    impl RandomSource for FakeRandom {
        fn random(&mut self, max: u32) -> u32 {
            if max == 0 {
                0
            } else {
                self.0 % max
            }
        }
    }

    fn new_fs(block_count: u32, first_block: u32) -> Filesystem<MemBlockDevice, FakeClock, FakeRandom> {
        Filesystem::create(MemBlockDevice::new(block_count), FakeClock::new(), FakeRandom(7))
            .with_first_block(first_block)
    }

    fn with_files(fs: &mut Filesystem<MemBlockDevice, FakeClock, FakeRandom>) {
        fs.initialize_file(0, 0, false, "HIGH.LOG").unwrap();
        fs.initialize_file(1, 100, false, "LOW.LOG").unwrap();
        fs.initialize_file(2, 255, true, "SYNC.LOG").unwrap();
        fs.initialize_file(3, 255, false, "SPARE.LOG").unwrap();
    }

    // Scenario 1 (spec.md §8): fresh mount lands on generation 1, header
    // slot 1, at (first_block, 0).
    #[test]
    fn fresh_mount_lands_on_generation_one() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();

        assert_eq!(fs.header.generation.get(), 1);
        assert_eq!(fs.header_index, 1);
        assert_eq!(fs.header.block.get(), 4);
        assert_eq!(fs.header.offset.get(), 0);
    }

    // Scenario 2: a single synced append lands byte-for-byte as an Entry
    // followed by its payload at the start of the first data block.
    #[test]
    fn single_sync_append_lays_out_entry_then_payload() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();

        fs.append(2, b"hello").unwrap();

        let mut block = [0u8; BLOCK_SIZE];
        fs.dev.read_block(4, &mut block).unwrap();
        assert_eq!(block[0], 2); // Entry::file
        assert_eq!(&block[ENTRY_SIZE..ENTRY_SIZE + 5], b"hello");
    }

    // Scenario 3: a strictly-higher-priority append reuses a resident
    // lower-priority record's slot at the head of the block, rather than
    // appending after it — the case that matters when the writer wraps
    // back onto a block a prior cycle already populated.
    #[test]
    fn higher_priority_append_overwrites_lower_priority_slot() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();

        let version = fs.header.files[1].version.get();
        let mut entry = Entry { file: 1, size: 5u16.into(), available: 5u16.into(), crc: 0u16.into() };
        let crc = entry.compute_crc(version, b"stale");
        entry.crc = crc.into();
        let mut block = [0u8; BLOCK_SIZE];
        block[..ENTRY_SIZE].copy_from_slice(entry.as_bytes());
        block[ENTRY_SIZE..ENTRY_SIZE + 5].copy_from_slice(b"stale");
        fs.dev.write_block(4, &block).unwrap();

        fs.append(0, b"hi").unwrap(); // high priority (0) should reuse offset 0

        let mut after = [0u8; BLOCK_SIZE];
        fs.dev.read_block(4, &mut after).unwrap();
        assert_eq!(after[0], 0);
        assert_eq!(&after[ENTRY_SIZE..ENTRY_SIZE + 2], b"hi");
    }

    // Scenario 4: N unsynced appends followed by one flush advance
    // generation by exactly one.
    #[test]
    fn one_flush_after_many_appends_advances_generation_once() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();
        let starting_generation = fs.header.generation.get();

        for _ in 0..5 {
            fs.append(3, b"x").unwrap();
        }
        fs.flush().unwrap();

        assert_eq!(fs.header.generation.get(), starting_generation + 1);
    }

    // Scenario 5: truncate hides old records via CRC mismatch (version
    // bump), it does not erase their bytes.
    #[test]
    fn truncate_hides_records_by_crc_not_erasure() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();

        fs.append(3, b"old-data").unwrap();
        fs.flush().unwrap();

        let mut block = [0u8; BLOCK_SIZE];
        fs.dev.read_block(4, &mut block).unwrap();
        assert_ne!(block[ENTRY_SIZE], 0); // bytes still resident

        fs.truncate(3).unwrap();

        let mut iter = fs.iterator_create(3).unwrap();
        let config = IteratorConfig::default();
        assert!(!fs.iterate(&mut iter, &config).unwrap());
    }

    // Scenario 6: on mount, the valid slot with the higher generation wins;
    // an invalid slot loses regardless of generation.
    #[test]
    fn mount_prefers_valid_slot_with_higher_generation() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();
        // slot 1 is now active with generation 1; slot 0 holds generation 0.
        fs.flush().unwrap(); // bumps to slot 0, generation 2, but nothing was
                              // dirty so this is a no-op per the idle-flush law.
        assert_eq!(fs.header_index, 1);

        fs.append(3, b"a").unwrap();
        fs.flush().unwrap();
        assert_eq!(fs.header_index, 0);
        assert_eq!(fs.header.generation.get(), 2);

        let mut fs2 = new_fs(32, 4);
        with_files(&mut fs2);
        fs2.dev = fs.dev;
        fs2.initialize(false).unwrap();
        assert_eq!(fs2.header.generation.get(), 2);
        assert_eq!(fs2.header_index, 0);
    }

    #[test]
    fn idle_flush_does_not_advance_generation() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();
        let generation = fs.header.generation.get();
        fs.flush().unwrap();
        assert_eq!(fs.header.generation.get(), generation);
    }

    #[test]
    fn equal_priority_never_overwrites_resident_entry() {
        let mut fs = new_fs(32, 4);
        fs.initialize_file(0, 50, false, "A.LOG").unwrap();
        fs.initialize_file(1, 50, false, "B.LOG").unwrap();
        fs.initialize_file(2, 255, false, "C.LOG").unwrap();
        fs.initialize_file(3, 255, false, "D.LOG").unwrap();
        fs.initialize(true).unwrap();

        let version = fs.header.files[0].version.get();
        let mut entry = Entry { file: 0, size: 5u16.into(), available: 5u16.into(), crc: 0u16.into() };
        let crc = entry.compute_crc(version, b"first");
        entry.crc = crc.into();
        let mut block = [0u8; BLOCK_SIZE];
        block[..ENTRY_SIZE].copy_from_slice(entry.as_bytes());
        block[ENTRY_SIZE..ENTRY_SIZE + 5].copy_from_slice(b"first");
        fs.dev.write_block(4, &block).unwrap();

        fs.append(1, b"second").unwrap();

        let mut after = [0u8; BLOCK_SIZE];
        fs.dev.read_block(4, &mut after).unwrap();
        // file 1's record must land after file 0's resident entry, not overwrite it.
        assert_eq!(after[0], 0);
        let second_offset = ENTRY_SIZE + 5;
        assert_eq!(after[second_offset], 1);
    }

    #[test]
    fn torn_entry_at_current_offset_is_reused() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();

        // Simulate a torn write_block: a well-formed Entry header for file 3
        // landed, but its payload bytes did not match what the CRC was
        // computed over (power loss mid-sector).
        let version = fs.header.files[3].version.get();
        let mut entry = Entry { file: 3, size: 10u16.into(), available: 10u16.into(), crc: 0u16.into() };
        let crc = entry.compute_crc(version, &[0u8; 10]);
        entry.crc = crc.into();
        let mut block = [0u8; BLOCK_SIZE];
        block[..ENTRY_SIZE].copy_from_slice(entry.as_bytes());
        block[ENTRY_SIZE] = 0xFF; // payload diverges from what the crc covers
        fs.dev.write_block(4, &block).unwrap();

        fs.append(3, b"ok").unwrap();
        let mut after = [0u8; BLOCK_SIZE];
        fs.dev.read_block(4, &mut after).unwrap();
        assert_eq!(after[0], 3);
        assert_eq!(&after[ENTRY_SIZE..ENTRY_SIZE + 2], b"ok");
    }

    // Crash law: a torn write to a data block that lands before the header
    // commit that would have advanced past it is reusable on the next
    // append after remount, because the remounted header's offset still
    // points at the torn region.
    #[test]
    fn crash_before_header_commit_leaves_torn_region_reusable() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();

        fs.append(3, b"0123456789").unwrap(); // dirties the cache, sync=false so no flush yet
        fs.cache.flush_to(&mut fs.dev).unwrap(); // the data block lands...
        fs.dev.tear_write(4, ENTRY_SIZE); // ...torn, payload lost
        // ...but the header commit that would record offset past it never
        // happens, so a remount still sees the bootstrap header.

        let mut fs2 = new_fs(32, 4);
        with_files(&mut fs2);
        fs2.dev = fs.dev;
        fs2.initialize(false).unwrap();
        assert_eq!(fs2.header.offset.get(), 0);

        fs2.append(3, b"ok").unwrap();
        let mut block = [0u8; BLOCK_SIZE];
        fs2.dev.read_block(4, &mut block).unwrap();
        assert_eq!(block[0], 3);
        assert_eq!(&block[ENTRY_SIZE..ENTRY_SIZE + 2], b"ok");
    }

    #[test]
    fn iterate_returns_appended_records_in_order() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();

        fs.append(3, b"one").unwrap();
        fs.append(3, b"two").unwrap();
        fs.flush().unwrap();

        let mut iter = fs.iterator_create(3).unwrap();
        let config = IteratorConfig::default();
        assert!(fs.iterate(&mut iter, &config).unwrap());
        assert_eq!(iter.data(), b"one");
        assert!(fs.iterate(&mut iter, &config).unwrap());
        assert_eq!(iter.data(), b"two");
        assert!(!fs.iterate(&mut iter, &config).unwrap());
    }

    #[test]
    fn manual_next_redelivers_until_advanced() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();
        fs.append(3, b"one").unwrap();
        fs.flush().unwrap();

        let mut iter = fs.iterator_create(3).unwrap();
        let config = IteratorConfig { manual_next: true, ..IteratorConfig::default() };
        assert!(fs.iterate(&mut iter, &config).unwrap());
        assert_eq!(iter.data(), b"one");
        assert!(fs.iterate(&mut iter, &config).unwrap());
        assert_eq!(iter.data(), b"one"); // redelivered: not yet advanced

        fs.iterate_move(&mut iter).unwrap();
        assert!(!fs.iterate(&mut iter, &config).unwrap());
    }

    #[test]
    fn get_file_reports_accumulated_size() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();
        fs.append(3, b"abc").unwrap();
        fs.append(3, b"de").unwrap();

        let info = fs.get_file(3).unwrap();
        assert_eq!(info.size, 5);
        assert_eq!(info.name, "SPARE.LOG");
    }

    #[test]
    fn file_name_longer_than_budget_is_truncated() {
        let mut fs = new_fs(32, 4);
        fs.initialize_file(0, 0, false, "WAY-TOO-LONG-A-NAME").unwrap();
        assert!(fs.header.files[0].name_str().len() < FILE_NAME_MAX);
    }

    #[test]
    fn append_over_block_budget_is_rejected() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();
        let too_big = vec![0u8; BLOCK_SIZE];
        assert!(matches!(fs.append(3, &too_big), Err(FkfsError::InvalidArgument(_))));
    }

    #[test]
    fn unknown_file_id_is_rejected() {
        let mut fs = new_fs(32, 4);
        with_files(&mut fs);
        fs.initialize(true).unwrap();
        assert!(matches!(fs.append(9, b"x"), Err(FkfsError::InvalidArgument(_))));
    }
}
