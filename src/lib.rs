//! Lossless encoder/decoder for [QOI](https://qoiformat.org) (Quite OK Image) pixel streams.
//!
//! The whole image is held in memory: [`encode`] turns a row-major RGB/RGBA
//! byte buffer into a QOI stream, [`decode`] reverses it bit-exactly. The
//! [`Encoder`] and [`Decoder`] types expose the same operations for
//! caller-provided buffers.
//!
//! With the `std` feature (enabled by default), [`read_file`] and
//! [`write_file`] wrap the codec for files; without it the crate is `no_std`
//! and only needs `alloc`.
#![forbid(unsafe_code)]
#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::inline_always,
    clippy::similar_names,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::cargo_common_metadata,
    clippy::cast_possible_truncation,
    clippy::precedence
)]

extern crate alloc;

mod decode;
mod encode;
mod error;
mod header;
mod index;
#[cfg(feature = "std")]
mod io;
mod pixel;
mod types;
mod utils;

#[doc(hidden)]
pub mod consts;

pub use crate::decode::{decode, decode_header, Decoder};
pub use crate::encode::{encode, encode_max_len, Encoder};
pub use crate::error::{Error, Result};
pub use crate::header::Header;
#[cfg(feature = "std")]
pub use crate::io::{read_file, read_from, write_file, write_to};
pub use crate::types::{Channels, ColorSpace};
