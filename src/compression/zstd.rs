//! Zstandard decompression (requires the `compression` feature).
//!
//! Switch titles ship most SARC archives as `.zs`: the complete archive
//! compressed as one Zstd stream. Decompress it with [`decompress_zstd`] and
//! parse the result with [`crate::formats::sarc::Sarc::parse`]. The same
//! wrapper appears around standalone BYML files (`.byml.zs`).

#![cfg(feature = "compression")]

use std::io;

use crate::{Error, Result};

/// Decompress a complete Zstandard-compressed buffer.
///
/// Returns [`Error::Zstd`] on any decompression failure.
pub fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    let out = zstd::decode_all(data).map_err(|_| Error::Zstd)?;
    tracing::debug!(compressed = data.len(), decompressed = out.len(), "zstd decompressed");
    Ok(out)
}

/// Decompress a Zstandard-compressed buffer when the decompressed size is
/// known ahead of time, avoiding incremental reallocation.
///
/// Returns [`Error::Io`] if the decoder cannot be initialised or streaming
/// the output fails.
pub fn decompress_zstd_with_size(data: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(decompressed_size);
    let mut decoder = zstd::Decoder::new(data)?;
    io::copy(&mut decoder, &mut out)?;
    Ok(out)
}
