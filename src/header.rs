use crate::consts::{QOI_HEADER_SIZE, QOI_MAGIC, QOI_PIXELS_MAX};
use crate::encode::encode_max_len;
use crate::error::{Error, Result};
use crate::types::{Channels, ColorSpace};
use crate::utils::unlikely;

/// Image header: dimensions, channels, color space.
///
/// ### Notes
/// A valid image header must satisfy the following conditions:
/// * Both width and height must be non-zero.
/// * `height < 400_000_000 / width` (the pixel count is bounded without overflow).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of 8-bit channels per pixel
    pub channels: Channels,
    /// Color space (informative field, doesn't affect encoding)
    pub colorspace: ColorSpace,
}

impl Default for Header {
    #[inline]
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            channels: Channels::default(),
            colorspace: ColorSpace::default(),
        }
    }
}

impl Header {
    /// Creates a new header and validates image dimensions.
    #[inline]
    pub fn try_new(
        width: u32, height: u32, channels: Channels, colorspace: ColorSpace,
    ) -> Result<Self> {
        let header = Self { width, height, channels, colorspace };
        header.validate()?;
        Ok(header)
    }

    /// Checks the image dimensions: non-zero and below the pixel limit.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        let (width, height) = (self.width, self.height);
        if unlikely(width == 0 || height == 0) {
            return Err(Error::EmptyImage { width, height });
        }
        if unlikely(height as usize >= QOI_PIXELS_MAX / width as usize) {
            return Err(Error::ImageTooLarge { width, height });
        }
        Ok(())
    }

    /// Creates a new header with modified channels.
    #[inline]
    pub const fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    /// Creates a new header with modified color space.
    #[inline]
    pub const fn with_colorspace(mut self, colorspace: ColorSpace) -> Self {
        self.colorspace = colorspace;
        self
    }

    /// Serializes the header into a bytes array.
    #[inline]
    pub fn encode(&self) -> [u8; QOI_HEADER_SIZE] {
        let mut out = [0; QOI_HEADER_SIZE];
        out[..4].copy_from_slice(&QOI_MAGIC.to_be_bytes());
        out[4..8].copy_from_slice(&self.width.to_be_bytes());
        out[8..12].copy_from_slice(&self.height.to_be_bytes());
        out[12] = self.channels.into();
        out[13] = self.colorspace.into();
        out
    }

    /// Deserializes the header from a byte array and validates it.
    ///
    /// Only the first 14 bytes of `data` are read.
    #[inline]
    pub fn decode(data: impl AsRef<[u8]>) -> Result<Self> {
        let data = data.as_ref();
        if unlikely(data.len() < QOI_HEADER_SIZE) {
            return Err(Error::InputBufferTooSmall { size: data.len(), required: QOI_HEADER_SIZE });
        }
        let v = &data[..QOI_HEADER_SIZE];
        let magic = u32::from_be_bytes([v[0], v[1], v[2], v[3]]);
        let width = u32::from_be_bytes([v[4], v[5], v[6], v[7]]);
        let height = u32::from_be_bytes([v[8], v[9], v[10], v[11]]);
        log::trace!("qoi header: magic={magic:#010x} {width}x{height} channels={} cs={}", v[12], v[13]);
        if unlikely(magic != QOI_MAGIC) {
            return Err(Error::InvalidMagic { magic });
        }
        let channels = v[12].try_into()?;
        let colorspace = v[13].try_into()?;
        Self::try_new(width, height, channels, colorspace)
    }

    /// Returns a number of pixels in the image.
    #[inline]
    pub const fn n_pixels(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Returns the total number of bytes in the raw pixel array.
    #[inline]
    pub const fn n_bytes(&self) -> usize {
        self.n_pixels().saturating_mul(self.channels.as_usize())
    }

    /// The maximum number of bytes the encoded image will take.
    ///
    /// Can be used to pre-allocate the buffer to encode the image into.
    #[inline]
    pub fn encode_max_len(&self) -> usize {
        encode_max_len(self.width, self.height, self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = Header::try_new(0x0102_0304, 2, Channels::Rgba, ColorSpace::Linear).unwrap();
        assert_eq!(
            header.encode(),
            [b'q', b'o', b'i', b'f', 1, 2, 3, 4, 0, 0, 0, 2, 4, 1],
        );
        assert_eq!(Header::decode(header.encode()).unwrap(), header);
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut bytes = Header::default().encode();
        bytes[3] = b'g';
        assert!(matches!(Header::decode(bytes), Err(Error::InvalidMagic { .. })));
    }

    #[test]
    fn test_header_rejects_bad_fields() {
        let good = Header::default().encode();

        let mut bytes = good;
        bytes[4..8].copy_from_slice(&0u32.to_be_bytes());
        assert!(matches!(Header::decode(bytes), Err(Error::EmptyImage { .. })));

        let mut bytes = good;
        bytes[8..12].copy_from_slice(&0u32.to_be_bytes());
        assert!(matches!(Header::decode(bytes), Err(Error::EmptyImage { .. })));

        let mut bytes = good;
        bytes[12] = 2;
        assert!(matches!(Header::decode(bytes), Err(Error::InvalidChannels { channels: 2 })));

        let mut bytes = good;
        bytes[13] = 2;
        assert!(matches!(Header::decode(bytes), Err(Error::InvalidColorSpace { colorspace: 2 })));

        assert!(matches!(
            Header::decode(&good[..13]),
            Err(Error::InputBufferTooSmall { size: 13, required: 14 })
        ));
    }

    #[test]
    fn test_header_pixel_limit() {
        let (rgb, srgb) = (Channels::Rgb, ColorSpace::Srgb);
        // 20_000 * 19_999 < 400M, 20_000 * 20_000 == 400M
        assert!(Header::try_new(20_000, 19_999, rgb, srgb).is_ok());
        assert!(matches!(
            Header::try_new(20_000, 20_000, rgb, srgb),
            Err(Error::ImageTooLarge { .. })
        ));
        assert!(matches!(
            Header::try_new(u32::MAX, u32::MAX, rgb, srgb),
            Err(Error::ImageTooLarge { .. })
        ));
        // the bound is checked by integer division, so the last admissible row is narrower
        assert!(Header::try_new(QOI_PIXELS_MAX as u32 / 2, 1, rgb, srgb).is_ok());
        assert!(Header::try_new(QOI_PIXELS_MAX as u32 - 1, 1, rgb, srgb).is_err());
    }
}
