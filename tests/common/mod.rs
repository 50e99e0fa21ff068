#![allow(dead_code)]

use rand::Rng;
use rand_distr::{Distribution, Geometric};

pub fn hash<const N: usize>(px: [u8; N]) -> u8 {
    let r = px[0].wrapping_mul(3);
    let g = px[1].wrapping_mul(5);
    let b = px[2].wrapping_mul(7);
    let a = px.get(3).copied().unwrap_or(0xff).wrapping_mul(11);
    r.wrapping_add(g).wrapping_add(b).wrapping_add(a) % 64
}

struct GenState<const N: usize> {
    index: [[u8; N]; 64],
    pixels: Vec<u8>,
    prev: [u8; N],
    len: usize,
}

impl<const N: usize> GenState<N> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: [[0; N]; 64],
            pixels: Vec::with_capacity(capacity * N),
            prev: Self::zero(),
            len: 0,
        }
    }

    pub fn write(&mut self, px: [u8; N]) {
        self.index[hash(px) as usize] = px;
        self.pixels.extend_from_slice(&px);
        self.prev = px;
        self.len += 1;
    }

    pub fn pick_from_index(&self, rng: &mut impl Rng) -> [u8; N] {
        self.index[rng.random_range(0_usize..64)]
    }

    pub fn zero() -> [u8; N] {
        let mut px = [0; N];
        if N >= 4 {
            px[3] = 0xff;
        }
        px
    }
}

/// Random image generator biased towards each of the QOI chunk kinds.
pub struct ImageGen {
    p_new: f64,
    p_index: f64,
    p_repeat: f64,
    p_diff: f64,
    p_luma: f64,
    p_alpha: f64,
}

impl ImageGen {
    pub fn new_random(rng: &mut impl Rng) -> Self {
        let p = [0; 7].map(|_| rng.random::<f64>());
        let t = p.iter().sum::<f64>();
        Self {
            p_new: p[0] / t,
            p_index: p[1] / t,
            p_repeat: p[2] / t,
            p_diff: p[3] / t,
            p_luma: p[4] / t,
            p_alpha: p[5] / t,
        }
    }

    /// Generates at least `min_len` pixels with the given number of channels.
    pub fn generate(&self, rng: &mut impl Rng, channels: usize, min_len: usize) -> Vec<u8> {
        match channels {
            3 => self.generate_const::<_, 3>(rng, min_len),
            4 => self.generate_const::<_, 4>(rng, min_len),
            _ => panic!("unsupported channels: {channels}"),
        }
    }

    fn generate_const<R: Rng, const N: usize>(&self, rng: &mut R, min_len: usize) -> Vec<u8> {
        let mut s = GenState::<N>::with_capacity(min_len);
        let zero = GenState::<N>::zero();
        let run_len = Geometric::new(0.05).unwrap();

        while s.len < min_len {
            let mut p = rng.random_range(0.0..1.0);

            if p < self.p_new {
                s.write([0; N].map(|_| rng.random()));
                continue;
            }
            p -= self.p_new;

            if p < self.p_index {
                let px = s.pick_from_index(rng);
                s.write(px);
                continue;
            }
            p -= self.p_index;

            if p < self.p_repeat {
                let px = s.prev;
                let n_repeat = 1 + run_len.sample(rng).min(200) as usize;
                for _ in 0..n_repeat {
                    s.write(px);
                }
                continue;
            }
            p -= self.p_repeat;

            if p < self.p_diff {
                let mut px = s.prev;
                for c in &mut px[..3] {
                    *c = c.wrapping_add(rng.random_range(0_u8..4).wrapping_sub(2));
                }
                s.write(px);
                continue;
            }
            p -= self.p_diff;

            if p < self.p_luma {
                let mut px = s.prev;
                let vg = rng.random_range(0_u8..64).wrapping_sub(32);
                let vr = rng.random_range(0_u8..16).wrapping_sub(8).wrapping_add(vg);
                let vb = rng.random_range(0_u8..16).wrapping_sub(8).wrapping_add(vg);
                px[0] = px[0].wrapping_add(vr);
                px[1] = px[1].wrapping_add(vg);
                px[2] = px[2].wrapping_add(vb);
                s.write(px);
                continue;
            }
            p -= self.p_luma;

            if p < self.p_alpha && N >= 4 {
                let mut px = s.prev;
                px[N - 1] = rng.random();
                s.write(px);
                continue;
            }

            s.write(zero);
        }

        s.pixels
    }
}
