//! Byte-buffer builder shared by the integration tests.

#![allow(dead_code)]

/// Append-only byte buffer with endian-aware writers.
pub struct Bytes {
    pub buf: Vec<u8>,
    big: bool,
}

impl Bytes {
    pub fn le() -> Self {
        Self {
            buf: Vec::new(),
            big: false,
        }
    }

    pub fn be() -> Self {
        Self {
            buf: Vec::new(),
            big: true,
        }
    }

    pub fn pos(&self) -> u32 {
        self.buf.len() as u32
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.raw(&b)
    }

    pub fn u24(&mut self, v: u32) -> &mut Self {
        if self.big {
            let b = v.to_be_bytes();
            self.raw(&b[1..])
        } else {
            let b = v.to_le_bytes();
            self.raw(&b[..3])
        }
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.raw(&b)
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.raw(&b)
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.u32(v.to_bits())
    }

    pub fn raw(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    pub fn zeros(&mut self, n: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + n, 0);
        self
    }

    /// Zero-pad to a multiple of `n`.
    pub fn align(&mut self, n: usize) -> &mut Self {
        let len = self.buf.len().next_multiple_of(n);
        self.buf.resize(len, 0);
        self
    }

    /// Overwrite a previously written `u32`.
    pub fn patch_u32(&mut self, at: usize, v: u32) {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf[at..at + 4].copy_from_slice(&b);
    }
}

/// BYML header with all three offsets zeroed; patch them at 4, 8 and 12.
pub fn byml_header(b: &mut Bytes) {
    b.raw(b"YB").u16(3).u32(0).u32(0).u32(0);
}

/// BYML string table node with correctly computed offsets.
pub fn byml_string_table(b: &mut Bytes, strings: &[&str]) {
    let mut off = 4 + 4 * (strings.len() as u32 + 1);
    b.u8(0xC2).u24(strings.len() as u32).u32(off);
    for s in strings {
        off += s.len() as u32 + 1;
        b.u32(off);
    }
    for s in strings {
        b.raw(s.as_bytes()).u8(0);
    }
}
