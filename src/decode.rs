use alloc::{vec, vec::Vec};

use bytemuck::{cast_slice_mut, Pod};

use crate::consts::{
    QOI_HEADER_SIZE, QOI_MASK_2, QOI_MASK_6, QOI_OP_DIFF, QOI_OP_INDEX, QOI_OP_LUMA, QOI_OP_RGB,
    QOI_OP_RGBA, QOI_PADDING_SIZE,
};
use crate::error::{Error, Result};
use crate::header::Header;
use crate::index::ColorIndex;
use crate::pixel::Pixel;
use crate::types::Channels;
use crate::utils::{likely, unlikely};

/// Cursor over the chunk stream.
///
/// `has_more()` stops at `end` (start of the end marker), but multi-byte ops may
/// read past it; reads beyond the slice yield zeros instead of panicking.
struct ReadBuf<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> ReadBuf<'a> {
    pub const fn new(data: &'a [u8], end: usize) -> Self {
        Self { data, pos: 0, end }
    }

    #[inline]
    pub const fn has_more(&self) -> bool {
        self.pos < self.end
    }

    #[inline]
    pub fn read(&mut self) -> u8 {
        let v = self.data.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        v
    }

    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0; N];
        for v in &mut out {
            *v = self.read();
        }
        out
    }
}

/// Decodes the chunk stream (everything after the header) into `out`, which must
/// hold exactly `n_pixels * N` bytes. Returns the number of pixels that had to be
/// filled in because the stream ran out.
fn decode_impl<const N: usize>(data: &[u8], out: &mut [u8]) -> usize
where
    [u8; N]: Pod,
{
    let pixels = cast_slice_mut::<_, [u8; N]>(out);
    let mut buf = ReadBuf::new(data, data.len().saturating_sub(QOI_PADDING_SIZE));

    let mut index = ColorIndex::new();
    let mut px = Pixel::default();
    let mut run = 0_u8;
    let mut n_starved = 0;

    for px_out in pixels.iter_mut() {
        if run != 0 {
            run -= 1;
        } else if likely(buf.has_more()) {
            let b1 = buf.read();
            if b1 == QOI_OP_RGB {
                let [r, g, b] = buf.read_array();
                px = px.with_rgb(r, g, b);
            } else if b1 == QOI_OP_RGBA {
                let [r, g, b, a] = buf.read_array();
                px = Pixel::new(r, g, b, a);
            } else {
                match b1 & QOI_MASK_2 {
                    QOI_OP_INDEX => {
                        px = index.get(b1);
                    }
                    QOI_OP_DIFF => {
                        px = px.rgb_add(
                            (b1 >> 4 & 0x03).wrapping_sub(2),
                            (b1 >> 2 & 0x03).wrapping_sub(2),
                            (b1 & 0x03).wrapping_sub(2),
                        );
                    }
                    QOI_OP_LUMA => {
                        let b2 = buf.read();
                        let vg = (b1 & QOI_MASK_6).wrapping_sub(32);
                        let vg_8 = vg.wrapping_sub(8);
                        px = px.rgb_add(vg_8.wrapping_add(b2 >> 4), vg, vg_8.wrapping_add(b2 & 0x0f));
                    }
                    _ => {
                        // QOI_OP_RUN: the current pixel plus this many repeats
                        run = b1 & QOI_MASK_6;
                    }
                }
            }
            if b1 & QOI_MASK_2 != QOI_OP_INDEX {
                index.insert(px);
            }
        } else {
            n_starved += 1;
        }
        *px_out = px.to_channels();
    }

    n_starved
}

/// Decode the image header from a slice of bytes.
#[inline]
pub fn decode_header(data: impl AsRef<[u8]>) -> Result<Header> {
    Header::decode(data)
}

/// Decode the image into a newly allocated vector.
///
/// `channels` selects the output layout: 3 (RGB), 4 (RGBA), or 0 to use the
/// number of channels stored in the header.
#[inline]
pub fn decode(data: impl AsRef<[u8]>, channels: u8) -> Result<(Header, Vec<u8>)> {
    let channels = match channels {
        0 => None,
        channels => Some(Channels::try_from(channels)?),
    };
    let mut decoder = Decoder::new(&data)?;
    if let Some(channels) = channels {
        decoder = decoder.with_channels(channels);
    }
    let pixels = decoder.decode_to_vec()?;
    Ok((*decoder.header(), pixels))
}

/// Decode QOI images from slices.
#[derive(Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
    header: Header,
    channels: Channels,
}

impl<'a> Decoder<'a> {
    /// Creates a new decoder from a slice of bytes.
    ///
    /// The header is decoded and validated immediately; the input must be large
    /// enough to hold the header and the end marker.
    #[inline]
    pub fn new(data: &'a (impl AsRef<[u8]> + ?Sized)) -> Result<Self> {
        let data = data.as_ref();
        if unlikely(data.is_empty()) {
            return Err(Error::EmptyInput);
        }
        let required = QOI_HEADER_SIZE + QOI_PADDING_SIZE;
        if unlikely(data.len() < required) {
            return Err(Error::InputBufferTooSmall { size: data.len(), required });
        }
        let header = Header::decode(data)?;
        Ok(Self { data, header, channels: header.channels })
    }

    /// Returns a new decoder with modified number of channels.
    ///
    /// By default, the number of channels in the decoded image will be equal
    /// to whatever is specified in the header. However, it is also possible
    /// to decode RGB into RGBA (in which case the alpha channel will be set
    /// to 255), and vice versa (in which case the alpha channel will be ignored).
    #[inline]
    pub const fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    /// Returns the number of channels in the decoded image.
    ///
    /// Note: this may differ from the number of channels specified in the header.
    #[inline]
    pub const fn channels(&self) -> Channels {
        self.channels
    }

    /// Returns the decoded image header.
    #[inline]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the number of bytes needed to store the decoded image.
    #[inline]
    pub const fn required_buf_len(&self) -> usize {
        self.header.n_pixels().saturating_mul(self.channels.as_usize())
    }

    /// Decodes the image to a pre-allocated buffer and returns the number of bytes written.
    ///
    /// The minimum size of the buffer can be found via [`Decoder::required_buf_len`].
    #[inline]
    pub fn decode_to_buf(&self, mut buf: impl AsMut<[u8]>) -> Result<usize> {
        let buf = buf.as_mut();
        let size = self.required_buf_len();
        if unlikely(buf.len() < size) {
            return Err(Error::OutputBufferTooSmall { size: buf.len(), required: size });
        }
        let out = &mut buf[..size];
        let chunks = &self.data[QOI_HEADER_SIZE..];
        let n_starved = match self.channels {
            Channels::Rgb => decode_impl::<3>(chunks, out),
            Channels::Rgba => decode_impl::<4>(chunks, out),
        };
        if unlikely(n_starved != 0) {
            log::warn!(
                "qoi: chunk stream ended early, {} of {} pixels repeat the last value",
                n_starved,
                self.header.n_pixels()
            );
        }
        log::debug!(
            "qoi: decoded {}x{}x{} image, {} -> {} bytes",
            self.header.width,
            self.header.height,
            self.channels.as_u8(),
            self.data.len(),
            size
        );
        Ok(size)
    }

    /// Decodes the image into a newly allocated vector of bytes and returns it.
    #[inline]
    pub fn decode_to_vec(&self) -> Result<Vec<u8>> {
        let mut out = vec![0_u8; self.required_buf_len()];
        let _ = self.decode_to_buf(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{QOI_OP_RUN, QOI_PADDING};
    use crate::types::ColorSpace;

    fn stream(width: u32, height: u32, channels: Channels, chunks: &[u8]) -> Vec<u8> {
        let header = Header::try_new(width, height, channels, ColorSpace::Srgb).unwrap();
        let mut data = header.encode().to_vec();
        data.extend_from_slice(chunks);
        data.extend_from_slice(&QOI_PADDING);
        data
    }

    #[test]
    fn test_decode_literals() {
        let data = stream(2, 1, Channels::Rgba, &[QOI_OP_RGB, 101, 102, 103, QOI_OP_RGBA, 1, 2, 3, 4]);
        let (header, pixels) = decode(&data, 0).unwrap();
        assert_eq!(header.channels, Channels::Rgba);
        // rgb literal keeps the previous alpha (255 initially)
        assert_eq!(pixels, [101, 102, 103, 255, 1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_diff_wraps() {
        // 0x40 == (-2, -2, -2) from opaque black
        let data = stream(1, 1, Channels::Rgb, &[QOI_OP_DIFF]);
        assert_eq!(decode(&data, 0).unwrap().1, [254, 254, 254]);
        // 0x7f == (+1, +1, +1)
        let data = stream(2, 1, Channels::Rgb, &[QOI_OP_RGB, 255, 0, 255, 0x7f]);
        assert_eq!(decode(&data, 0).unwrap().1, [255, 0, 255, 0, 1, 0]);
    }

    #[test]
    fn test_decode_luma() {
        let data = stream(
            3,
            1,
            Channels::Rgb,
            &[QOI_OP_RGB, 100, 100, 100, QOI_OP_LUMA | 40, 0, QOI_OP_LUMA | 24, 0xff],
        );
        assert_eq!(decode(&data, 0).unwrap().1, [100, 100, 100, 100, 108, 100, 99, 100, 99]);
    }

    #[test]
    fn test_decode_run_and_index() {
        let px = Pixel::new(10, 20, 30, 255);
        let slot = px.hash_index();
        let chunks = [QOI_OP_RGB, 10, 20, 30, QOI_OP_RUN | 1, QOI_OP_RGB, 1, 1, 1, slot];
        let data = stream(5, 1, Channels::Rgb, &chunks);
        assert_eq!(
            decode(&data, 0).unwrap().1,
            [10, 20, 30, 10, 20, 30, 10, 20, 30, 1, 1, 1, 10, 20, 30]
        );
    }

    #[test]
    fn test_decode_starting_run() {
        let data = stream(3, 1, Channels::Rgba, &[QOI_OP_RUN | 1, QOI_OP_RGB, 10, 20, 30]);
        let (_, pixels) = decode(&data, 0).unwrap();
        assert_eq!(pixels, [0, 0, 0, 255, 0, 0, 0, 255, 10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_channel_conversion() {
        let data = stream(1, 1, Channels::Rgba, &[QOI_OP_RGBA, 1, 2, 3, 4]);
        assert_eq!(decode(&data, 3).unwrap().1, [1, 2, 3]);
        let data = stream(1, 1, Channels::Rgb, &[QOI_OP_RGB, 1, 2, 3]);
        let (header, pixels) = decode(&data, 4).unwrap();
        assert_eq!(header.channels, Channels::Rgb);
        assert_eq!(pixels, [1, 2, 3, 255]);
        assert!(matches!(decode(&data, 5), Err(Error::InvalidChannels { channels: 5 })));

        let decoder = Decoder::new(&data).unwrap();
        assert_eq!(decoder.channels(), Channels::Rgb);
        let decoder = decoder.with_channels(Channels::Rgba);
        assert_eq!(decoder.channels(), Channels::Rgba);
        assert_eq!(decoder.header().channels, Channels::Rgb);
        assert_eq!(decoder.required_buf_len(), 4);
        assert_eq!(decoder.decode_to_vec().unwrap(), [1, 2, 3, 255]);
    }

    #[test]
    fn test_decode_exhausted_stream_repeats_last_pixel() {
        let data = stream(4, 1, Channels::Rgb, &[QOI_OP_RGB, 7, 8, 9]);
        assert_eq!(decode(&data, 0).unwrap().1, [7, 8, 9, 7, 8, 9, 7, 8, 9, 7, 8, 9]);
    }

    #[test]
    fn test_decode_truncated_literal_reads_zeros() {
        // the literal's payload overlaps the end marker, which is read as data
        let data = stream(1, 1, Channels::Rgba, &[QOI_OP_RGBA]);
        assert_eq!(decode(&data, 0).unwrap().1, [0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert!(matches!(decode([0_u8; 0], 0), Err(Error::EmptyInput)));
        let data = stream(1, 1, Channels::Rgb, &[]);
        assert!(matches!(
            decode(&data[..21], 0),
            Err(Error::InputBufferTooSmall { size: 21, required: 22 })
        ));
        // header + marker alone is a valid frame; the pixel stays opaque black
        assert_eq!(decode(&data, 0).unwrap().1, [0, 0, 0]);
    }

    #[test]
    fn test_decode_to_buf() {
        let data = stream(1, 1, Channels::Rgb, &[QOI_OP_RGB, 1, 2, 3]);
        let decoder = Decoder::new(&data).unwrap();
        assert_eq!(decoder.required_buf_len(), 3);
        let mut buf = [0_u8; 2];
        assert!(matches!(decoder.decode_to_buf(&mut buf), Err(Error::OutputBufferTooSmall { .. })));
        let mut buf = [0_u8; 8];
        assert_eq!(decoder.decode_to_buf(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3, 0, 0, 0, 0, 0]);
    }
}
