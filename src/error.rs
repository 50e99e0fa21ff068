use crate::consts::QOI_MAGIC;

/// Errors that can occur while encoding or decoding a QOI image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid magic: expected {:#010x}, got {magic:#010x}", QOI_MAGIC)]
    InvalidMagic { magic: u32 },

    #[error("invalid number of channels: {channels}")]
    InvalidChannels { channels: u8 },

    #[error("invalid color space: {colorspace} (expected 0 or 1)")]
    InvalidColorSpace { colorspace: u8 },

    #[error("image contains no pixels: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("image is too large: {width}x{height} (max=400Mp)")]
    ImageTooLarge { width: u32, height: u32 },

    #[error("invalid image length: {size} bytes for {width}x{height} (expected {expected})")]
    InvalidImageLength { size: usize, expected: usize, width: u32, height: u32 },

    #[error("input buffer size too small: {size} (minimum required: {required})")]
    InputBufferTooSmall { size: usize, required: usize },

    #[error("output buffer size too small: {size} (minimum required: {required})")]
    OutputBufferTooSmall { size: usize, required: usize },

    #[error("input buffer is empty")]
    EmptyInput,

    #[cfg(feature = "std")]
    #[error("i/o error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the error was caused by an invalid image descriptor:
    /// bad magic, zero or oversized dimensions, bad channels or color space.
    pub const fn is_invalid_header(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic { .. }
                | Self::InvalidChannels { .. }
                | Self::InvalidColorSpace { .. }
                | Self::EmptyImage { .. }
                | Self::ImageTooLarge { .. }
        )
    }
}

pub type Result<T> = core::result::Result<T, Error>;
