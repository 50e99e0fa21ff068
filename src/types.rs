use core::convert::TryFrom;
use core::fmt;

use crate::error::{Error, Result};

/// Color space tag stored in the last header byte.
///
/// The tag is informative only: pixels are encoded and decoded the same way
/// regardless of its value.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[repr(u8)]
pub enum ColorSpace {
    /// sRGB color channels, linear alpha
    #[default]
    Srgb = 0,
    /// All channels linear
    Linear = 1,
}

impl ColorSpace {
    /// Header byte for this color space.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Srgb => "srgb",
            Self::Linear => "linear",
        })
    }
}

impl From<ColorSpace> for u8 {
    #[inline]
    fn from(colorspace: ColorSpace) -> Self {
        colorspace.as_u8()
    }
}

impl TryFrom<u8> for ColorSpace {
    type Error = Error;

    #[inline]
    fn try_from(colorspace: u8) -> Result<Self> {
        match colorspace {
            0 => Ok(Self::Srgb),
            1 => Ok(Self::Linear),
            _ => Err(Error::InvalidColorSpace { colorspace }),
        }
    }
}

/// Pixel layout: RGB or RGBA, one byte per channel.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[repr(u8)]
pub enum Channels {
    #[default]
    Rgb = 3,
    Rgba = 4,
}

impl Channels {
    /// Bytes per pixel (3 or 4).
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) const fn as_usize(self) -> usize {
        self as usize
    }

    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba)
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.has_alpha() { "rgba" } else { "rgb" })
    }
}

impl From<Channels> for u8 {
    #[inline]
    fn from(channels: Channels) -> Self {
        channels.as_u8()
    }
}

impl TryFrom<u8> for Channels {
    type Error = Error;

    #[inline]
    fn try_from(channels: u8) -> Result<Self> {
        match channels {
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Rgba),
            _ => Err(Error::InvalidChannels { channels }),
        }
    }
}
