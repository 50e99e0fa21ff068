use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::decode::decode;
use crate::encode::encode;
use crate::error::Result;
use crate::header::Header;

/// Reads a whole QOI stream from `reader` and decodes it.
///
/// `channels` has the same meaning as in [`decode`](crate::decode).
pub fn read_from<R: Read>(mut reader: R, channels: u8) -> Result<(Header, Vec<u8>)> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode(data, channels)
}

/// Encodes the image and writes the stream to `writer`; returns the number of bytes written.
///
/// Nothing is written if encoding fails.
pub fn write_to<W: Write>(mut writer: W, data: impl AsRef<[u8]>, header: &Header) -> Result<usize> {
    let encoded = encode(data, header)?;
    writer.write_all(&encoded)?;
    writer.flush()?;
    Ok(encoded.len())
}

/// Reads and decodes a QOI file.
pub fn read_file(path: impl AsRef<Path>, channels: u8) -> Result<(Header, Vec<u8>)> {
    let path = path.as_ref();
    if !path.is_file() {
        let msg = format!("file not found: {}", path.display());
        return Err(io::Error::new(io::ErrorKind::NotFound, msg).into());
    }
    log::debug!("qoi: reading {}", path.display());
    read_from(File::open(path)?, channels)
}

/// Encodes the image and writes it to a QOI file; returns the number of bytes written.
///
/// The file is only created once encoding has succeeded.
pub fn write_file(path: impl AsRef<Path>, data: impl AsRef<[u8]>, header: &Header) -> Result<usize> {
    let path = path.as_ref();
    let encoded = encode(data, header)?;
    log::debug!("qoi: writing {} bytes to {}", encoded.len(), path.display());
    fs::write(path, &encoded)?;
    Ok(encoded.len())
}
