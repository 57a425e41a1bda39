//! BYML (Binary YAML) - Nintendo structured-data container, version 3.
//!
//! A compact binary encoding of nested arrays, hashes and scalars. Used for
//! level data, actor parameters and most other structured game content.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "YB"                 (2 bytes; "BY" read little-endian)
//! [0x02] Version (3)                (u16 LE)
//! [0x04] HashKeyTableOffset         (u32 LE, 0 = absent)
//! [0x08] StringTableOffset          (u32 LE, 0 = absent)
//! [0x0C] RootNodeOffset             (u32 LE, 0 = absent)
//! ```
//! Every section that follows starts on a 4-byte boundary; padding bytes are
//! zero.
//!
//! ## String table (tag 0xC2)
//! ```text
//! [0x00] Tag 0xC2                   (u8)
//! [0x01] Count N                    (u24 LE)
//! [0x04] Offsets                    ((N+1) × u32, relative to table start)
//! [....] N null-terminated strings
//! ```
//!
//! ## Array (tag 0xC0)
//! ```text
//! [0x00] Tag 0xC0                   (u8)
//! [0x01] Count N                    (u24 LE)
//! [0x04] Types                      (N × u8)
//! [....] Padding to 4 bytes
//! [....] Values                     (N × u32)
//! ```
//!
//! ## Hash (tag 0xC1)
//! ```text
//! [0x00] Tag 0xC1                   (u8)
//! [0x01] Count N                    (u24 LE)
//! [0x04] Entries                    (N × { KeyIndex u24, Type u8, Value u32 })
//! ```
//! Entries are sorted alphabetically by key; the data they point to is laid
//! out in ascending offset order.
//!
//! ## Value slots
//! Bool, Int, UInt and Float live directly in the 4-byte slot. String is an
//! index into the string table. Int64/UInt64, Array and Hash slots are
//! absolute file offsets. Arrays and hashes may be referenced from several
//! places; each offset decodes to one shared [`Node`].
//!
//! Binary and Double values are not supported.

mod cache;
mod decoder;
mod node;

use std::fs;
use std::path::Path;

use cache::RefCache;
use decoder::Decoder;
pub use node::{Hash, Node, NodeType};

use crate::Result;
use crate::stream::{DataStream, Endian};

/// Knobs for [`Document::parse_with`].
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Maximum container nesting depth before decoding fails with
    /// [`crate::Error::TooDeeplyNested`]. The default fits the 2 MiB stack
    /// of a spawned thread in unoptimized builds.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { max_depth: 128 }
    }
}

/// A fully decoded BYML file.
#[derive(Debug, Clone)]
pub struct Document {
    hash_keys: Vec<String>,
    strings: Vec<String>,
    root: Option<Node>,
}

impl Document {
    /// File magic ("BY" stored little-endian).
    pub const MAGIC: &'static [u8; 2] = b"YB";
    /// The only supported format version.
    pub const VERSION: u16 = 3;

    /// Decode a BYML file with default options.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, &DecodeOptions::default())
    }

    /// Decode a BYML file.
    ///
    /// Succeeds only if every section sits exactly where the file says it
    /// does and the whole buffer is consumed.
    pub fn parse_with(data: &[u8], options: &DecodeOptions) -> Result<Self> {
        let _span = tracing::debug_span!("byml_parse", len = data.len()).entered();

        let mut s = DataStream::new(data, Endian::Little);
        s.magic(Self::MAGIC)?;
        s.expect_u16(Self::VERSION, "BYML version")?;

        let hash_key_table_offset = s.u32()?;
        let string_table_offset = s.u32()?;
        let root_offset = s.u32()?;

        let mut dec = Decoder::new(s, options);
        let mut cache = RefCache::default();

        if hash_key_table_offset != 0 {
            dec.locate(hash_key_table_offset)?;
            dec.hash_keys = dec.string_table("hash key")?;
        }
        if string_table_offset != 0 {
            dec.locate(string_table_offset)?;
            dec.strings = dec.string_table("string")?;
        }
        let root = if root_offset != 0 {
            dec.locate(root_offset)?;
            Some(dec.root(&mut cache, root_offset)?)
        } else {
            None
        };

        dec.s.assert_eof()?;

        tracing::debug!(
            hash_keys = dec.hash_keys.len(),
            strings = dec.strings.len(),
            containers = cache.len(),
            "BYML decoded"
        );

        Ok(Self {
            hash_keys: dec.hash_keys,
            strings: dec.strings,
            root,
        })
    }

    /// Read and decode a BYML file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path)?;
        Self::parse(&data)
    }

    /// Root node, if the file has one.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Hash key table in file order.
    pub fn hash_keys(&self) -> &[String] {
        &self.hash_keys
    }

    /// String table in file order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Hash key at `index`.
    pub fn hash_key(&self, index: usize) -> Option<&str> {
        self.hash_keys.get(index).map(String::as_str)
    }

    /// String table entry at `index`.
    pub fn string(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    /// Consume the document, returning its root node.
    pub fn into_root(self) -> Option<Node> {
        self.root
    }
}
