use thiserror::Error;

/// Errors surfaced by the public API.
///
/// Record corruption and header-slot loss are never represented here —
/// they are recovered internally (see `crate::entry::EntryStatus` and
/// `crate::header`) and only ever show up as a log line.
#[derive(Debug, Error)]
pub enum FkfsError {
    #[error("device i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no space: visited the seek limit without finding a slot")]
    NoSpace,

    #[error("iterator used before iterator_create/reopen/resume")]
    Uninitialized,
}

pub type FkfsResult<T> = Result<T, FkfsError>;
