use thiserror::Error;

use crate::flash::FlashError;

/// Errors surfaced by the page store operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    /// `put` was called without a preceding `begin`.
    #[error("no upload in progress")]
    NoActiveUpload,

    /// The upload would grow past the reserved flash region.
    #[error("upload of {attempted} bytes exceeds the {max_size} byte page region")]
    RegionOverflow { attempted: usize, max_size: usize },

    /// The configured sector range cannot describe a region.
    #[error("invalid flash region: {0}")]
    InvalidRegion(&'static str),

    /// The underlying flash driver failed.
    #[error(transparent)]
    Flash(#[from] FlashError),
}
