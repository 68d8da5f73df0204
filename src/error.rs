use std::path::PathBuf;

use thiserror::Error;

/// Library error type for collection, cache and export operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The target path is missing or is not a regular file.
    #[error("not a regular file: {}", .0.display())]
    Path(PathBuf),

    /// A single image could not be decoded.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The texture backend refused an allocation.
    #[error("texture allocation of {width}x{height} failed: {reason}")]
    ResourceExhausted {
        width: u32,
        height: u32,
        reason: String,
    },

    /// The export target could not be encoded or written.
    #[error("failed to write {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// JPEG quality outside `1..=100`.
    #[error("jpeg quality must be within 1..=100, got {0}")]
    InvalidQuality(u8),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
