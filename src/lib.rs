//! **ninkit** - decoders for Nintendo game-asset containers.
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`formats::byml`] | BYML v3 - binary YAML-like structured data |
//! | [`formats::sarc`] | SARC - SEAD ARChive |
//! | [`formats::kcl`]  | KCL - collision mesh |
//! | [`compression::yaz0`] | Yaz0 - LZ77 compression |
//! | `compression::zstd`   | Zstandard (feature `compression`) |
//!
//! All decoders take a byte slice and validate as they go: every section
//! must sit exactly where its offset says, padding must be zero and no
//! bytes may be left over. Failures are reported as [`Error`] values
//! carrying the offending byte offset.

pub mod compression;
pub mod error;
pub mod formats;
pub mod math;
pub mod stream;

pub use error::{Error, Result};
