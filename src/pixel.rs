use crate::consts::QOI_INDEX_SIZE;

/// RGBA pixel; the alpha byte is always present, RGB sources get 0xff.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct Pixel([u8; 4]);

impl Default for Pixel {
    /// Opaque black, the "previous pixel" before the first one is seen.
    #[inline]
    fn default() -> Self {
        Self::new(0, 0, 0, 0xff)
    }
}

impl Pixel {
    /// All-zero pixel, used to fill an empty color index.
    pub const ZERO: Self = Self([0; 4]);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Reads the first `N` channels of a source pixel; alpha is 0xff if `N < 4`.
    #[inline]
    pub const fn from_channels<const N: usize>(px: [u8; N]) -> Self {
        let mut out = Self::new(0, 0, 0, 0xff);
        let mut i = 0;
        while i < N && i < 4 {
            out.0[i] = px[i];
            i += 1;
        }
        out
    }

    /// Writes the first `N` channels out (alpha is dropped if `N == 3`).
    #[inline]
    pub const fn to_channels<const N: usize>(self) -> [u8; N] {
        let mut out = [0; N];
        let mut i = 0;
        while i < N && i < 4 {
            out[i] = self.0[i];
            i += 1;
        }
        out
    }

    #[inline]
    pub const fn r(self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub const fn g(self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub const fn b(self) -> u8 {
        self.0[2]
    }

    #[inline]
    pub const fn a(self) -> u8 {
        self.0[3]
    }

    /// Packed `r << 24 | g << 16 | b << 8 | a` value.
    #[inline]
    pub const fn packed(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Slot in the color index: `(r * 3 + g * 5 + b * 7 + a * 11) % 64`.
    #[inline]
    pub const fn hash_index(self) -> u8 {
        let r = self.r().wrapping_mul(3);
        let g = self.g().wrapping_mul(5);
        let b = self.b().wrapping_mul(7);
        let a = self.a().wrapping_mul(11);
        // 64 divides 256, so reducing each product mod 256 keeps the result exact
        r.wrapping_add(g).wrapping_add(b).wrapping_add(a) % (QOI_INDEX_SIZE as u8)
    }

    #[inline]
    pub const fn with_rgb(mut self, r: u8, g: u8, b: u8) -> Self {
        self.0[0] = r;
        self.0[1] = g;
        self.0[2] = b;
        self
    }

    /// Adds wrapping deltas to r, g, b; alpha is kept.
    #[inline]
    pub const fn rgb_add(mut self, r: u8, g: u8, b: u8) -> Self {
        self.0[0] = self.0[0].wrapping_add(r);
        self.0[1] = self.0[1].wrapping_add(g);
        self.0[2] = self.0[2].wrapping_add(b);
        self
    }

    /// Wrapping per-channel difference `self - prev` for r, g, b.
    #[inline]
    pub const fn rgb_sub(self, prev: Self) -> [u8; 3] {
        [
            self.r().wrapping_sub(prev.r()),
            self.g().wrapping_sub(prev.g()),
            self.b().wrapping_sub(prev.b()),
        ]
    }
}
