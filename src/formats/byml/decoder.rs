//! Table, container and value decoding.

use std::sync::Arc;

use indexmap::map::Entry;

use super::cache::RefCache;
use super::{DecodeOptions, Hash, Node, NodeType};
use crate::stream::DataStream;
use crate::{Error, Result};

/// Size of one hash entry: u24 key index, u8 type, u32 slot.
const HASH_ENTRY_SIZE: usize = 8;

/// Hash entry as stored on disk (key-alphabetical order).
#[derive(Debug, Clone, Copy)]
struct HashEntry {
    key: u32,
    tag: u8,
    slot: u32,
}

/// Recursive-descent state for one document.
pub(super) struct Decoder<'a> {
    pub(super) s: DataStream<'a>,
    pub(super) hash_keys: Vec<String>,
    pub(super) strings: Vec<String>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    pub(super) fn new(s: DataStream<'a>, options: &DecodeOptions) -> Self {
        Self {
            s,
            hash_keys: Vec::new(),
            strings: Vec::new(),
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    /// Pad to the next 4-byte boundary and check that the section declared
    /// at `offset` starts here.
    pub(super) fn locate(&mut self, offset: u32) -> Result<()> {
        self.s.align(4)?;
        self.s.assert_position(offset as usize)
    }

    /// Decode a string table at the cursor.
    ///
    /// Every string must end exactly where the table's offset array says the
    /// next one begins.
    pub(super) fn string_table(&mut self, table: &'static str) -> Result<Vec<String>> {
        let start = self.s.position();
        self.expect_tag(NodeType::StringTable, start)?;
        let count = self.s.u24()? as usize;
        let offsets = self.s.u32s(count + 1)?;

        self.s.assert_position(start + offsets[0] as usize)?;

        let mut strings = Vec::with_capacity(count);
        for &end in &offsets[1..] {
            strings.push(self.s.null_string()?.to_owned());
            self.s.assert_position(start + end as usize)?;
        }

        tracing::debug!(table, offset = start, entries = count, "string table");
        Ok(strings)
    }

    /// Decode the root container at `offset`.
    pub(super) fn root(&mut self, cache: &mut RefCache, offset: u32) -> Result<Node> {
        let at = offset as usize;
        let tag = self.s.peek_u8()?;
        match NodeType::from_tag(tag) {
            Some(ty @ (NodeType::Array | NodeType::Hash)) => self.container(cache, ty, offset),
            _ => Err(Error::UnexpectedTypeTag {
                offset: at,
                tag,
                expected: "Array or Hash",
            }),
        }
    }

    /// Resolve an array or hash reference through the cache.
    fn container(&mut self, cache: &mut RefCache, ty: NodeType, offset: u32) -> Result<Node> {
        let node = cache.get_or_decode(offset, |cache| {
            let at = offset as usize;
            self.s.assert_position(at)?;
            self.enter(at)?;
            let node = match ty {
                NodeType::Array => Node::Array(Arc::new(self.array(cache, at)?)),
                _ => Node::Hash(Arc::new(self.hash(cache, at)?)),
            };
            self.depth -= 1;
            Ok(node)
        })?;

        // The same offset reached through a differently-typed slot.
        if node.node_type() != ty {
            return Err(Error::UnexpectedTypeTag {
                offset: offset as usize,
                tag: node.node_type().tag(),
                expected: ty.name(),
            });
        }
        Ok(node)
    }

    fn enter(&mut self, at: usize) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::TooDeeplyNested {
                offset: at,
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn array(&mut self, cache: &mut RefCache, at: usize) -> Result<Vec<Node>> {
        self.expect_tag(NodeType::Array, at)?;
        let count = self.s.u24()? as usize;
        let types = self.s.bytes(count)?;
        self.s.align(4)?;
        let slots = self.s.u32s(count)?;

        tracing::trace!(offset = at, entries = count, "array");

        types
            .iter()
            .zip(slots)
            .map(|(&tag, slot)| self.value(cache, at, tag, slot))
            .collect()
    }

    fn hash(&mut self, cache: &mut RefCache, at: usize) -> Result<Hash> {
        self.expect_tag(NodeType::Hash, at)?;
        let count = self.s.u24()? as usize;
        let raw = self
            .s
            .bytes(count.saturating_mul(HASH_ENTRY_SIZE))?;

        let mut table = DataStream::new(raw, self.s.endian());
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(HashEntry {
                key: table.u24()?,
                tag: table.u8()?,
                slot: table.u32()?,
            });
        }

        // Stored alphabetically by key, but the referenced data follows in
        // slot order. Decode in slot order so the cursor only moves forward.
        entries.sort_by_key(|e| e.slot);

        tracing::trace!(offset = at, entries = count, "hash");

        let mut map = Hash::with_capacity(count);
        for e in entries {
            let node = self.value(cache, at, e.tag, e.slot)?;
            let key = self
                .hash_keys
                .get(e.key as usize)
                .ok_or(Error::IndexOutOfRange {
                    table: "hash key",
                    index: e.key as usize,
                    len: self.hash_keys.len(),
                })?;
            match map.entry(key.clone()) {
                Entry::Occupied(o) => {
                    return Err(Error::DuplicateKey {
                        key: o.key().clone(),
                    });
                }
                Entry::Vacant(v) => {
                    v.insert(node);
                }
            }
        }
        Ok(map)
    }

    /// Resolve one `(tag, slot)` pair belonging to the container at `at`.
    fn value(&mut self, cache: &mut RefCache, at: usize, tag: u8, slot: u32) -> Result<Node> {
        let ty = NodeType::from_tag(tag).ok_or(Error::UnexpectedTypeTag {
            offset: at,
            tag,
            expected: "a value type",
        })?;

        Ok(match ty {
            NodeType::Null => Node::Null,
            NodeType::Bool => match slot {
                0 => Node::Bool(false),
                1 => Node::Bool(true),
                value => return Err(Error::InvalidBool { offset: at, value }),
            },
            NodeType::Int => Node::Int(slot as i32),
            NodeType::UInt => Node::UInt(slot),
            NodeType::Float => Node::Float(f32::from_bits(slot)),
            NodeType::String => {
                let s = self
                    .strings
                    .get(slot as usize)
                    .ok_or(Error::IndexOutOfRange {
                        table: "string",
                        index: slot as usize,
                        len: self.strings.len(),
                    })?;
                Node::String(s.clone())
            }
            NodeType::Int64 => {
                self.s.assert_position(slot as usize)?;
                Node::Int64(self.s.i64()?)
            }
            NodeType::UInt64 => {
                self.s.assert_position(slot as usize)?;
                Node::UInt64(self.s.u64()?)
            }
            NodeType::Array | NodeType::Hash => self.container(cache, ty, slot)?,
            NodeType::Binary | NodeType::Double | NodeType::StringTable => {
                return Err(Error::UnsupportedType {
                    offset: at,
                    tag,
                    name: ty.name(),
                });
            }
        })
    }

    fn expect_tag(&mut self, ty: NodeType, at: usize) -> Result<()> {
        let tag = self.s.u8()?;
        if tag != ty.tag() {
            return Err(Error::UnexpectedTypeTag {
                offset: at,
                tag,
                expected: ty.name(),
            });
        }
        Ok(())
    }
}
