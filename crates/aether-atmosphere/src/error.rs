//! Error types for the fallible edges of the baker: table layouts and export.

use std::path::PathBuf;

/// A [`TextureLayout`](crate::texture::TextureLayout) that the parameterization cannot use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// An extent is below the minimum of two texels.
    #[error("{name} must be at least 2, got {value}")]
    ExtentTooSmall { name: &'static str, value: u32 },

    /// The mu extent is split in two halves and must be even.
    #[error("scattering mu size must be even, got {0}")]
    OddMuSize(u32),

    /// A derived 3D extent does not match the 4D extents it packs.
    #[error("{name} is {value}, expected {expected}")]
    Inconsistent {
        name: &'static str,
        value: u32,
        expected: u32,
    },
}

/// Errors that can occur when writing or reading baked tables.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Failed to create, read or write a file.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize sky metadata to RON.
    #[error("failed to serialize sky metadata: {0}")]
    Metadata(#[source] ron::Error),

    /// Failed to parse sky metadata.
    #[error("failed to parse sky metadata: {0}")]
    MetadataParse(#[source] ron::error::SpannedError),

    /// Failed to encode a debug image.
    #[error("failed to encode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A raw table on disk does not have the size its layout requires.
    #[error("{path}: expected {expected} bytes, found {found}")]
    ShapeMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
}
