use thiserror::Error;

use crate::texture::TextureFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("out of bounds")]
    OutOfBounds,

    #[error("invalid stride")]
    InvalidStride,

    #[error("invalid texture descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("unknown or destroyed texture handle")]
    UnknownTexture,

    #[error("mip {mip} out of range, texture has {count}")]
    MipOutOfRange { mip: u32, count: u32 },

    #[error("slice {slice} out of range, texture has {count}")]
    SliceOutOfRange { slice: u32, count: u32 },

    #[error("array slice mismatch: source has {src_slices}, destination has {dst_slices}")]
    SliceMismatch { src_slices: u32, dst_slices: u32 },

    #[error("destination has {available} mips, pyramid needs {needed}")]
    MipCountMismatch { needed: u32, available: u32 },

    #[error("extent mismatch: need at least {needed_w}x{needed_h}, got {actual_w}x{actual_h}")]
    ExtentMismatch {
        needed_w: u32,
        needed_h: u32,
        actual_w: u32,
        actual_h: u32,
    },

    #[error("format {format:?} rejected: {reason}")]
    FormatMismatch {
        format: TextureFormat,
        reason: &'static str,
    },

    #[error("source and destination refer to the same texture")]
    AliasedTextures,

    #[error("invalid mip-chain layout: {0}")]
    InvalidLayout(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
