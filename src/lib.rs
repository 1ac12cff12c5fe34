//! fkfs: a small, crash-tolerant, append-mostly log-structured filesystem
//! for embedded data loggers writing to a raw block device.
//!
//! Single writer, single iterator, cooperative scheduling, one
//! block-sized RAM buffer (see `Filesystem`). The block device, clock,
//! and random source are supplied by the host through the traits in
//! [`device`].

pub mod allocator;
pub mod cache;
pub mod clock;
pub mod crc;
pub mod device;
pub mod entry;
pub mod error;
pub mod fs;
pub mod header;
pub mod iterator;
pub mod mem;
pub mod sync;
pub mod textlog;

pub use clock::{StdRandom, SystemClock};
pub use device::{BlockDevice, Clock, RandomSource, BLOCK_SIZE, FILES_MAX, FILE_NAME_MAX};
pub use entry::MAXIMUM_PAYLOAD_SIZE;
pub use error::{FkfsError, FkfsResult};
pub use fs::{FileInfo, Filesystem, Statistics, DEFAULT_FIRST_BLOCK};
pub use iterator::{FileIterator, IteratorConfig, IteratorToken};
pub use mem::MemBlockDevice;
pub use sync::FileBlockDevice;
pub use textlog::TextLog;
