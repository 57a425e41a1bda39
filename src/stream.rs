//! Low-level binary cursor shared by all decoders.
//!
//! [`DataStream`] reads positionally from an immutable in-memory buffer.
//! Each read consumes exactly the bytes it promises or returns
//! [`Error::TruncatedInput`] - there is no partial-read ambiguity.
//!
//! Besides scalar reads the cursor carries the validation helpers the
//! formats lean on: [`DataStream::assert_position`],
//! [`DataStream::assert_eof`], zero-padding [`DataStream::align`] and the
//! `expect_*` family for magic numbers and fixed fields.

use std::fmt::Debug;

use crate::math::Vec3f;
use crate::{Error, Result};

/// Byte order of multi-byte scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// Bounded, endian-aware cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct DataStream<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

macro_rules! scalar {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self) -> Result<$ty> {
            let b = self.bytesa::<{ size_of::<$ty>() }>()?;
            Ok(match self.endian {
                Endian::Little => <$ty>::from_le_bytes(b),
                Endian::Big => <$ty>::from_be_bytes(b),
            })
        }
    };
}

impl<'a> DataStream<'a> {
    /// Create a cursor at offset 0.
    pub fn new(buf: &'a [u8], endian: Endian) -> Self {
        Self {
            buf,
            pos: 0,
            endian,
        }
    }

    /// Byte order used for scalar reads.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Switch byte order (e.g. after reading a byte-order mark).
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Current absolute offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Move the cursor to an absolute offset. Seeking to the end is allowed.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(Error::TruncatedInput {
                offset: pos,
                needed: 0,
                available: 0,
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Read exactly `n` bytes as a sub-slice.
    #[inline]
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::TruncatedInput {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..self.pos])
    }

    /// Read exactly `N` bytes into a fixed-size array.
    #[inline]
    pub fn bytesa<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut b = [0u8; N];
        b.copy_from_slice(self.bytes(N)?);
        Ok(b)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.buf.get(self.pos).copied().ok_or(Error::TruncatedInput {
            offset: self.pos,
            needed: 1,
            available: 0,
        })
    }

    /// Read one byte.
    #[inline]
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.bytesa::<1>()?[0])
    }

    scalar!(
        /// Read a `u16`.
        u16,
        u16
    );
    scalar!(
        /// Read an `i16`.
        i16,
        i16
    );
    scalar!(
        /// Read a `u32`.
        u32,
        u32
    );
    scalar!(
        /// Read an `i32`.
        i32,
        i32
    );
    scalar!(
        /// Read a `u64`.
        u64,
        u64
    );
    scalar!(
        /// Read an `i64`.
        i64,
        i64
    );

    /// Read a 24-bit unsigned integer.
    pub fn u24(&mut self) -> Result<u32> {
        let [a, b, c] = self.bytesa::<3>()?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes([a, b, c, 0]),
            Endian::Big => u32::from_be_bytes([0, a, b, c]),
        })
    }

    /// Read an IEEE-754 single.
    pub fn f32(&mut self) -> Result<f32> {
        self.u32().map(f32::from_bits)
    }

    /// Read `count` consecutive `u32`s.
    pub fn u32s(&mut self, count: usize) -> Result<Vec<u32>> {
        // Bounds-check the whole run up front so a bogus count cannot
        // trigger a huge allocation.
        let needed = count.checked_mul(4).ok_or(Error::TruncatedInput {
            offset: self.pos,
            needed: usize::MAX,
            available: self.remaining(),
        })?;
        if needed > self.remaining() {
            return Err(Error::TruncatedInput {
                offset: self.pos,
                needed,
                available: self.remaining(),
            });
        }
        (0..count).map(|_| self.u32()).collect()
    }

    /// Read three consecutive `u32`s.
    pub fn u32x3(&mut self) -> Result<[u32; 3]> {
        Ok([self.u32()?, self.u32()?, self.u32()?])
    }

    /// Read three consecutive `f32`s as a vector.
    pub fn vec3f(&mut self) -> Result<Vec3f> {
        Ok(Vec3f::new(self.f32()?, self.f32()?, self.f32()?))
    }

    /// Read a null-terminated UTF-8 string, consuming the terminator.
    pub fn null_string(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let rest = &self.buf[start..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::TruncatedInput {
                offset: self.buf.len(),
                needed: 1,
                available: 0,
            })?;
        let s = std::str::from_utf8(&rest[..end]).map_err(|_| Error::InvalidUtf8 { offset: start })?;
        self.pos = start + end + 1;
        Ok(s)
    }

    /// Consume padding up to the next multiple of `alignment` (a power of
    /// two). Every padding byte must be zero.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        debug_assert!(alignment.is_power_of_two());
        let padding = self.pos.next_multiple_of(alignment) - self.pos;
        let start = self.pos;
        let pad = self.bytes(padding)?;
        if let Some(i) = pad.iter().position(|&b| b != 0) {
            return Err(Error::MalformedHeader {
                offset: start + i,
                what: "alignment padding",
                expected: "0x00".into(),
                found: format!("{:#04x}", pad[i]),
            });
        }
        Ok(())
    }

    /// Fail with [`Error::PositionMismatch`] unless the cursor is at
    /// `expected`.
    #[inline]
    pub fn assert_position(&self, expected: usize) -> Result<()> {
        if self.pos != expected {
            return Err(Error::PositionMismatch {
                expected,
                actual: self.pos,
            });
        }
        Ok(())
    }

    /// Fail with [`Error::TrailingData`] unless the whole buffer was read.
    pub fn assert_eof(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::TrailingData {
                offset: self.pos,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Verify that the next bytes match `expected` (magic numbers, fixed
    /// byte patterns).
    pub fn expect_bytes(&mut self, expected: &[u8], what: &'static str) -> Result<()> {
        let offset = self.pos;
        let got = self.bytes(expected.len())?;
        if got != expected {
            return Err(Error::MalformedHeader {
                offset,
                what,
                expected: render_bytes(expected),
                found: render_bytes(got),
            });
        }
        Ok(())
    }

    /// Verify an ASCII magic tag.
    pub fn magic(&mut self, expected: &[u8]) -> Result<()> {
        self.expect_bytes(expected, "magic")
    }

    /// Read a `u8` and require it to equal `expected`.
    pub fn expect_u8(&mut self, expected: u8, what: &'static str) -> Result<()> {
        let offset = self.pos;
        let v = self.u8()?;
        check(offset, what, expected, v)
    }

    /// Read a `u16` and require it to equal `expected`.
    pub fn expect_u16(&mut self, expected: u16, what: &'static str) -> Result<()> {
        let offset = self.pos;
        let v = self.u16()?;
        check(offset, what, expected, v)
    }

    /// Read a `u32` and require it to equal `expected`.
    pub fn expect_u32(&mut self, expected: u32, what: &'static str) -> Result<()> {
        let offset = self.pos;
        let v = self.u32()?;
        check(offset, what, expected, v)
    }

    /// Read an `f32` and require it to equal `expected`.
    pub fn expect_f32(&mut self, expected: f32, what: &'static str) -> Result<()> {
        let offset = self.pos;
        let v = self.f32()?;
        check(offset, what, expected, v)
    }

    /// Read a two-byte byte-order mark and switch to the byte order it
    /// declares. `FE FF` is big endian, `FF FE` little endian.
    pub fn read_bom(&mut self) -> Result<Endian> {
        let offset = self.pos;
        let endian = match self.bytesa::<2>()? {
            [0xFE, 0xFF] => Endian::Big,
            [0xFF, 0xFE] => Endian::Little,
            other => {
                return Err(Error::MalformedHeader {
                    offset,
                    what: "byte order mark",
                    expected: "FE FF or FF FE".into(),
                    found: render_bytes(&other),
                });
            }
        };
        self.endian = endian;
        Ok(endian)
    }
}

fn check<T: PartialEq + Debug>(offset: usize, what: &'static str, expected: T, found: T) -> Result<()> {
    if expected != found {
        return Err(Error::MalformedHeader {
            offset,
            what,
            expected: format!("{expected:?}"),
            found: format!("{found:?}"),
        });
    }
    Ok(())
}

fn render_bytes(b: &[u8]) -> String {
    b.iter().map(|x| format!("{x:02X}")).collect::<Vec<_>>().join(" ")
}
