//! Decoded BYML values.

use std::ops::Index;
use std::sync::Arc;

use indexmap::IndexMap;

/// Key → value mapping of a BYML hash.
///
/// Iteration order is the order the values are laid out in the file
/// (ascending slot offset), not the alphabetical order the keys are stored
/// in.
pub type Hash = IndexMap<String, Node>;

/// On-disk node type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeType {
    /// Index into the string table.
    String = 0xA0,
    /// Length-prefixed binary blob.
    Binary = 0xA1,
    /// Ordered sequence of nodes.
    Array = 0xC0,
    /// Key → node mapping.
    Hash = 0xC1,
    /// Table of null-terminated strings.
    StringTable = 0xC2,
    /// Boolean stored inline.
    Bool = 0xD0,
    /// Signed 32-bit integer stored inline.
    Int = 0xD1,
    /// Single-precision float stored inline.
    Float = 0xD2,
    /// Unsigned 32-bit integer stored inline.
    UInt = 0xD3,
    /// Signed 64-bit integer stored out of line.
    Int64 = 0xD4,
    /// Unsigned 64-bit integer stored out of line.
    UInt64 = 0xD5,
    /// Double-precision float stored out of line.
    Double = 0xD6,
    /// Null.
    Null = 0xFF,
}

impl NodeType {
    /// Map a raw tag byte to its type. Returns [`None`] for unknown bytes.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0xA0 => Self::String,
            0xA1 => Self::Binary,
            0xC0 => Self::Array,
            0xC1 => Self::Hash,
            0xC2 => Self::StringTable,
            0xD0 => Self::Bool,
            0xD1 => Self::Int,
            0xD2 => Self::Float,
            0xD3 => Self::UInt,
            0xD4 => Self::Int64,
            0xD5 => Self::UInt64,
            0xD6 => Self::Double,
            0xFF => Self::Null,
            _ => return None,
        })
    }

    /// Raw tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Binary => "Binary",
            Self::Array => "Array",
            Self::Hash => "Hash",
            Self::StringTable => "StringTable",
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::UInt => "UInt",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Double => "Double",
            Self::Null => "Null",
        }
    }
}

/// One decoded value.
///
/// Arrays and hashes are reference-counted: every reference to the same
/// file offset yields a clone of the same [`Arc`], so shared sub-graphs stay
/// shared. `==` compares by value; use [`Node::ptr_eq`] to compare identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 32-bit integer.
    Int(i32),
    /// Unsigned 32-bit integer.
    UInt(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// Single-precision float.
    Float(f32),
    /// String resolved from the string table.
    String(String),
    /// Ordered sequence.
    Array(Arc<Vec<Node>>),
    /// Key → value mapping.
    Hash(Arc<Hash>),
}

impl Node {
    /// On-disk type of this node.
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Null => NodeType::Null,
            Node::Bool(_) => NodeType::Bool,
            Node::Int(_) => NodeType::Int,
            Node::UInt(_) => NodeType::UInt,
            Node::Int64(_) => NodeType::Int64,
            Node::UInt64(_) => NodeType::UInt64,
            Node::Float(_) => NodeType::Float,
            Node::String(_) => NodeType::String,
            Node::Array(_) => NodeType::Array,
            Node::Hash(_) => NodeType::Hash,
        }
    }

    /// Whether two container nodes are the very same decoded instance.
    ///
    /// Always `false` for scalars, which carry no identity.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Array(a), Node::Array(b)) => Arc::ptr_eq(a, b),
            (Node::Hash(a), Node::Hash(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Whether this is [`Node::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// The value of a [`Node::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The value of a [`Node::Int`].
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Node::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The value of a [`Node::UInt`].
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Node::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// The value of a [`Node::Int64`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// The value of a [`Node::UInt64`].
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Node::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// The value of a [`Node::Float`].
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Node::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The contents of a [`Node::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(v) => Some(v),
            _ => None,
        }
    }

    /// The elements of a [`Node::Array`].
    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(v) => Some(v),
            _ => None,
        }
    }

    /// The entries of a [`Node::Hash`].
    pub fn as_hash(&self) -> Option<&Hash> {
        match self {
            Node::Hash(v) => Some(v),
            _ => None,
        }
    }

    /// Look up `key` if this node is a hash.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_hash()?.get(key)
    }
}

impl Index<&str> for Node {
    type Output = Node;

    /// Index a hash by key.
    ///
    /// # Panics
    /// Panics if the node is not a hash or has no such key.
    fn index(&self, key: &str) -> &Self::Output {
        self.get(key)
            .unwrap_or_else(|| panic!("no key '{key}' in BYML node"))
    }
}

impl Index<usize> for Node {
    type Output = Node;

    /// Index an array by position.
    ///
    /// # Panics
    /// Panics if the node is not an array or `index` is out of bounds.
    fn index(&self, index: usize) -> &Self::Output {
        self.as_array()
            .and_then(|a| a.get(index))
            .unwrap_or_else(|| panic!("no element {index} in BYML node"))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Node {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Null => s.serialize_unit(),
            Node::Bool(v) => s.serialize_bool(*v),
            Node::Int(v) => s.serialize_i32(*v),
            Node::UInt(v) => s.serialize_u32(*v),
            Node::Int64(v) => s.serialize_i64(*v),
            Node::UInt64(v) => s.serialize_u64(*v),
            Node::Float(v) => s.serialize_f32(*v),
            Node::String(v) => s.serialize_str(v),
            Node::Array(v) => s.collect_seq(v.iter()),
            Node::Hash(v) => s.collect_map(v.iter()),
        }
    }
}
