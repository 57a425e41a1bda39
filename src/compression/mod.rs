//! Decompression of the stream codecs that wrap Nintendo assets.
//!
//! | Module | Algorithm | Typical use |
//! |--------|-----------|-------------|
//! | [`yaz0`] | Yaz0 (LZ77) | Wii U / 3DS `.szs` archives |
//! | [`zstd`] | Zstandard | Switch `.zs` archives (feature `compression`) |
//!
//! Yaz0 is implemented in-crate and always available. The Zstd helpers are
//! gated behind the `compression` Cargo feature so the core decoders build
//! without a C toolchain:
//!
//! ```toml
//! [dependencies]
//! ninkit = { version = "0.1", features = ["compression"] }
//! ```
//!
//! Decompress first, then hand the bytes to a parser in
//! [`crate::formats`]. [`crate::formats::sarc::Sarc::from_yaz0`] does both
//! steps for Yaz0-wrapped archives.

pub mod yaz0;

#[cfg(feature = "compression")]
pub mod zstd;
