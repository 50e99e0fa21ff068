use alloc::{vec, vec::Vec};

use bytemuck::{cast_slice, Pod};

use crate::consts::{
    QOI_HEADER_SIZE, QOI_MAX_RUN, QOI_OP_DIFF, QOI_OP_INDEX, QOI_OP_LUMA, QOI_OP_RGB, QOI_OP_RGBA,
    QOI_OP_RUN, QOI_PADDING, QOI_PADDING_SIZE,
};
use crate::error::{Error, Result};
use crate::header::Header;
use crate::index::ColorIndex;
use crate::pixel::Pixel;
use crate::types::{Channels, ColorSpace};
use crate::utils::{cold, unlikely};

struct WriteBuf<'a> {
    buf: &'a mut [u8],
}

impl<'a> WriteBuf<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    #[inline]
    pub fn write<const N: usize>(self, v: [u8; N]) -> Self {
        let (head, tail) = self.buf.split_at_mut(N);
        head.copy_from_slice(&v);
        Self { buf: tail }
    }

    #[inline]
    pub fn push(self, v: u8) -> Self {
        if let Some((first, tail)) = self.buf.split_first_mut() {
            *first = v;
            Self { buf: tail }
        } else {
            cold();
            unreachable!("output buffer is sized by encode_max_len()");
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

/// Chooses the op for a pixel that differs from `px_prev` and is not in the index.
#[inline]
fn encode_changed(buf: WriteBuf<'_>, px: Pixel, px_prev: Pixel) -> WriteBuf<'_> {
    if px.a() != px_prev.a() {
        return buf.write([QOI_OP_RGBA, px.r(), px.g(), px.b(), px.a()]);
    }

    let [vr, vg, vb] = px.rgb_sub(px_prev);

    // biased deltas fit their fields exactly when no bits above the field are set
    let (vr_2, vg_2, vb_2) = (vr.wrapping_add(2), vg.wrapping_add(2), vb.wrapping_add(2));
    if vr_2 | vg_2 | vb_2 | 3 == 3 {
        return buf.push(QOI_OP_DIFF | vr_2 << 4 | vg_2 << 2 | vb_2);
    }

    let vg_32 = vg.wrapping_add(32);
    let vg_r_8 = vr.wrapping_sub(vg).wrapping_add(8);
    let vg_b_8 = vb.wrapping_sub(vg).wrapping_add(8);
    if vg_32 | 63 == 63 && vg_r_8 | vg_b_8 | 15 == 15 {
        buf.write([QOI_OP_LUMA | vg_32, vg_r_8 << 4 | vg_b_8])
    } else {
        buf.write([QOI_OP_RGB, px.r(), px.g(), px.b()])
    }
}

fn encode_impl<const N: usize>(out: &mut [u8], data: &[u8], header: &Header) -> usize
where
    [u8; N]: Pod,
{
    let out_size = out.len();
    let mut buf = WriteBuf::new(out);
    buf = buf.write(header.encode());

    let pixels = cast_slice::<_, [u8; N]>(data);
    let last = pixels.len().saturating_sub(1);

    let mut index = ColorIndex::new();
    let mut px_prev = Pixel::default();
    let mut run = 0_u8;

    for (i, &chunk) in pixels.iter().enumerate() {
        let px = Pixel::from_channels(chunk);
        if px == px_prev {
            run += 1;
            if run == QOI_MAX_RUN || unlikely(i == last) {
                buf = buf.push(QOI_OP_RUN | (run - 1));
                run = 0;
            }
        } else {
            if run != 0 {
                buf = buf.push(QOI_OP_RUN | (run - 1));
                run = 0;
            }
            buf = match index.find_or_insert(px) {
                Some(slot) => buf.push(QOI_OP_INDEX | slot),
                None => encode_changed(buf, px, px_prev),
            };
            px_prev = px;
        }
    }

    buf = buf.write(QOI_PADDING);
    out_size.saturating_sub(buf.len())
}

/// The maximum number of bytes the encoded image will take.
///
/// Can be used to pre-allocate the buffer to encode the image into.
#[inline]
pub fn encode_max_len(width: u32, height: u32, channels: impl Into<u8>) -> usize {
    let (width, height) = (width as usize, height as usize);
    let n_pixels = width.saturating_mul(height);
    n_pixels
        .saturating_mul(usize::from(channels.into()) + 1)
        .saturating_add(QOI_HEADER_SIZE + QOI_PADDING_SIZE)
}

/// Encode the image into a newly allocated vector.
///
/// `data` must hold exactly `width * height * channels` bytes, row-major.
#[inline]
pub fn encode(data: impl AsRef<[u8]>, header: &Header) -> Result<Vec<u8>> {
    Encoder::new(&data, *header)?.encode_to_vec()
}

/// Encode QOI images into buffers.
pub struct Encoder<'a> {
    data: &'a [u8],
    header: Header,
}

impl<'a> Encoder<'a> {
    /// Creates a new encoder from a given array of pixel data and image header.
    ///
    /// The header is validated and the data length must match it exactly.
    #[inline]
    pub fn new(data: &'a (impl AsRef<[u8]> + ?Sized), header: Header) -> Result<Self> {
        let data = data.as_ref();
        header.validate()?;
        if unlikely(data.is_empty()) {
            return Err(Error::EmptyInput);
        }
        let expected = header.n_bytes();
        if unlikely(data.len() != expected) {
            return Err(Error::InvalidImageLength {
                size: data.len(),
                expected,
                width: header.width,
                height: header.height,
            });
        }
        Ok(Self { data, header })
    }

    /// Returns a new encoder with modified color space.
    ///
    /// Note: the color space doesn't affect encoding or decoding in any way, it's
    /// a purely informative field that's stored in the image header.
    #[inline]
    pub const fn with_colorspace(mut self, colorspace: ColorSpace) -> Self {
        self.header = self.header.with_colorspace(colorspace);
        self
    }

    /// Returns the header that will be stored in the encoded image.
    #[inline]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// The maximum number of bytes the encoded image will take.
    ///
    /// Can be used to pre-allocate the buffer to encode the image into.
    #[inline]
    pub fn required_buf_len(&self) -> usize {
        self.header.encode_max_len()
    }

    /// Encodes the image to a pre-allocated buffer and returns the number of bytes written.
    ///
    /// The minimum size of the buffer can be found via [`Encoder::required_buf_len`].
    #[inline]
    pub fn encode_to_buf(&self, mut buf: impl AsMut<[u8]>) -> Result<usize> {
        let buf = buf.as_mut();
        let size_required = self.required_buf_len();
        if unlikely(buf.len() < size_required) {
            return Err(Error::OutputBufferTooSmall { size: buf.len(), required: size_required });
        }
        let n_written = match self.header.channels {
            Channels::Rgb => encode_impl::<3>(buf, self.data, &self.header),
            Channels::Rgba => encode_impl::<4>(buf, self.data, &self.header),
        };
        log::debug!(
            "qoi: encoded {}x{}x{} image, {} -> {} bytes",
            self.header.width,
            self.header.height,
            self.header.channels.as_u8(),
            self.data.len(),
            n_written
        );
        Ok(n_written)
    }

    /// Encodes the image into a newly allocated vector of bytes and returns it.
    #[inline]
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let mut out = vec![0_u8; self.required_buf_len()];
        let size = self.encode_to_buf(&mut out)?;
        out.truncate(size);
        Ok(out)
    }
}
