//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout ninkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Every error is fatal for the decode that raised it: no decoder returns a
/// partially-built value. Offsets are absolute positions in the buffer being
/// decoded.
#[derive(Debug, Error)]
pub enum Error {
    /// A magic, version, reserved field or padding byte did not hold the
    /// required value.
    #[error("malformed header at {offset:#x}: {what} (expected {expected}, found {found})")]
    MalformedHeader {
        /// Offset of the offending field.
        offset: usize,
        /// Field description.
        what: &'static str,
        /// Required value, rendered for display.
        expected: String,
        /// Value actually present.
        found: String,
    },
    /// A type tag byte is unknown, or is not the one required at this
    /// structural position.
    #[error("unexpected type tag {tag:#04x} at {offset:#x} (expected {expected})")]
    UnexpectedTypeTag {
        /// Offset of the node owning the tag.
        offset: usize,
        /// Raw tag byte.
        tag: u8,
        /// What was allowed here.
        expected: &'static str,
    },
    /// A recognised tag that this decoder deliberately does not handle.
    #[error("unsupported node type {name} ({tag:#04x}) at {offset:#x}")]
    UnsupportedType {
        /// Offset of the node owning the tag.
        offset: usize,
        /// Raw tag byte.
        tag: u8,
        /// Tag name.
        name: &'static str,
    },
    /// The cursor is not where the surrounding structure says it must be.
    #[error("position mismatch: at {actual:#x}, expected {expected:#x}")]
    PositionMismatch {
        /// Independently derived expected offset.
        expected: usize,
        /// Actual cursor position.
        actual: usize,
    },
    /// An index into a table is past its end.
    #[error("{table} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Name of the indexed table.
        table: &'static str,
        /// Offending index.
        index: usize,
        /// Table length.
        len: usize,
    },
    /// A hash would contain the same key twice.
    #[error("duplicate key in hash: {key:?}")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },
    /// Bytes remain after the structure was fully decoded.
    #[error("trailing data: {remaining} bytes left at {offset:#x}")]
    TrailingData {
        /// Offset where decoding finished.
        offset: usize,
        /// Unconsumed byte count.
        remaining: usize,
    },
    /// The buffer ended before a read could be satisfied.
    #[error("truncated input at {offset:#x}: need {needed} bytes, {available} available")]
    TruncatedInput {
        /// Offset where the read was attempted.
        offset: usize,
        /// Requested byte count.
        needed: usize,
        /// Bytes remaining in the buffer.
        available: usize,
    },
    /// A boolean slot held something other than 0 or 1.
    #[error("invalid Bool value {value} in node at {offset:#x}")]
    InvalidBool {
        /// Offset of the owning container.
        offset: usize,
        /// Raw slot value.
        value: u32,
    },
    /// A string was not valid UTF-8.
    #[error("invalid UTF-8 string at {offset:#x}")]
    InvalidUtf8 {
        /// Offset of the first byte of the string.
        offset: usize,
    },
    /// Nesting exceeded the configured depth limit.
    #[error("nesting deeper than {limit} levels at {offset:#x}")]
    TooDeeplyNested {
        /// Offset of the node that crossed the limit.
        offset: usize,
        /// Configured maximum depth.
        limit: usize,
    },
    /// A container refers to an offset whose decode has not finished.
    #[error("reference cycle through node at {offset:#x}")]
    ReferenceCycle {
        /// Offset referenced while still in progress.
        offset: usize,
    },
    /// A data alignment value is not one the format allows.
    #[error("unsupported data alignment {0:#x}")]
    UnsupportedAlignment(u32),
    /// A compressed stream refers to data it cannot contain.
    #[error("corrupt compressed stream at output offset {offset:#x}: {reason}")]
    CorruptStream {
        /// Output position where decoding failed.
        offset: usize,
        /// What went wrong.
        reason: &'static str,
    },
    /// A SARC file entry has an attribute word without the name flag.
    #[error("invalid SARC file attributes {0:#010x}")]
    InvalidFileAttributes(u32),
    /// A SARC file name does not hash to the value stored for it.
    #[error("file name hash mismatch for {name:?}: stored {stored:#010x}, computed {computed:#010x}")]
    HashMismatch {
        /// File name read from the name table.
        name: String,
        /// Hash stored in the file table.
        stored: u32,
        /// Hash computed from `name`.
        computed: u32,
    },
    /// A KCL octree key uses the reserved flag combination.
    #[error("invalid octree key {key:#010x} at {offset:#x}")]
    InvalidOctreeKey {
        /// Offset of the octree node.
        offset: usize,
        /// Raw key.
        key: u32,
    },
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Zstandard decompression failed.
    #[cfg(feature = "compression")]
    #[error("zstd decompression failed")]
    Zstd,
}
