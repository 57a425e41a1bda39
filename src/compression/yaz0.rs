//! Yaz0 decompression.
//!
//! Yaz0 is the LZ77 variant Nintendo has used since the GameCube. On the
//! Wii U it wraps SARC archives (`.szs`).
//!
//! ## Layout
//! ```text
//! [0x00] Magic "Yaz0"            (4 bytes)
//! [0x04] DecompressedSize        (u32 BE)
//! [0x08] DataAlignment           (u32 BE; 0x80, 0x1000, 0x2000 or 0x4000)
//! [0x0C] Reserved (0)            (u32 BE)
//! [0x10] Compressed groups
//! ```
//!
//! ## Groups
//! Each group starts with a header byte. Its bits, most significant first,
//! describe up to eight chunks: `1` copies one literal byte, `0` is a
//! back-reference of two or three bytes:
//! ```text
//! NR RR            distance = 0xRRR + 1, length = N + 2     (N != 0)
//! 0R RR NN         distance = 0xRRR + 1, length = NN + 0x12
//! ```

use crate::stream::{DataStream, Endian};
use crate::{Error, Result};

/// Alignment values the header may declare.
pub const ALIGNMENTS: [u32; 4] = [0x80, 0x1000, 0x2000, 0x4000];

/// A decompressed Yaz0 stream.
#[derive(Debug, Clone)]
pub struct Yaz0 {
    /// Data alignment recorded in the header. SARC archives use it as the
    /// alignment of their data section.
    pub alignment: u32,
    /// Decompressed bytes (exactly the size declared in the header).
    pub data: Vec<u8>,
}

/// Decompress a complete Yaz0 file.
pub fn decompress(data: &[u8]) -> Result<Yaz0> {
    let _span = tracing::debug_span!("yaz0_decompress", len = data.len()).entered();

    let mut s = DataStream::new(data, Endian::Big);
    s.magic(b"Yaz0")?;
    let size = s.u32()? as usize;
    let alignment = s.u32()?;
    if !ALIGNMENTS.contains(&alignment) {
        return Err(Error::UnsupportedAlignment(alignment));
    }
    s.expect_u32(0, "Yaz0 reserved")?;

    let out = decode_groups(&mut s, size)?;
    tracing::debug!(
        compressed = data.len(),
        decompressed = out.len(),
        alignment,
        "Yaz0 decompressed"
    );
    Ok(Yaz0 {
        alignment,
        data: out,
    })
}

/// Decode chunk groups from the cursor until `size` bytes are produced.
fn decode_groups(s: &mut DataStream<'_>, size: usize) -> Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::with_capacity(size.min(s.remaining().saturating_mul(8)));
    let mut header = 0u8;
    let mut chunks = 0;

    while out.len() < size {
        if chunks == 0 {
            header = s.u8()?;
            chunks = 8;
        }
        chunks -= 1;

        if header & 0x80 != 0 {
            out.push(s.u8()?);
        } else {
            let b1 = s.u8()? as usize;
            let b2 = s.u8()? as usize;
            let distance = ((b1 & 0x0F) << 8 | b2) + 1;
            let len = match b1 >> 4 {
                0 => s.u8()? as usize + 0x12,
                n => n + 2,
            };

            let start = out.len().checked_sub(distance).ok_or(Error::CorruptStream {
                offset: out.len(),
                reason: "back-reference before start of output",
            })?;
            if out.len() + len > size {
                return Err(Error::CorruptStream {
                    offset: out.len(),
                    reason: "back-reference past declared size",
                });
            }
            // Source and destination may overlap; copy byte by byte.
            for i in start..start + len {
                out.push(out[i]);
            }
        }
        header <<= 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaz0(size: u32, alignment: u32, body: &[u8]) -> Vec<u8> {
        let mut v = b"Yaz0".to_vec();
        v.extend_from_slice(&size.to_be_bytes());
        v.extend_from_slice(&alignment.to_be_bytes());
        v.extend_from_slice(&[0; 4]);
        v.extend_from_slice(body);
        v
    }

    #[test]
    fn literals_only() {
        let data = yaz0(3, 0x80, &[0b1110_0000, b'a', b'b', b'c']);
        let out = decompress(&data).unwrap();
        assert_eq!(out.data, b"abc");
        assert_eq!(out.alignment, 0x80);
    }

    #[test]
    fn short_back_reference_overlaps() {
        // 'a' then copy 4 bytes from distance 1.
        let data = yaz0(5, 0x80, &[0b1000_0000, b'a', 0x20, 0x00]);
        assert_eq!(decompress(&data).unwrap().data, b"aaaaa");
    }

    #[test]
    fn long_back_reference() {
        // "ab", then 0x12 + 1 bytes from distance 2.
        let data = yaz0(2 + 0x13, 0x1000, &[0b1100_0000, b'a', b'b', 0x00, 0x01, 0x01]);
        let out = decompress(&data).unwrap().data;
        assert_eq!(out.len(), 0x15);
        assert!(out.chunks(2).all(|c| c[0] == b'a' && c.get(1).is_none_or(|&b| b == b'b')));
    }

    #[test]
    fn multiple_groups() {
        let mut body = vec![0xFF];
        body.extend_from_slice(b"01234567");
        body.push(0x80);
        body.push(b'8');
        let data = yaz0(9, 0x80, &body);
        assert_eq!(decompress(&data).unwrap().data, b"012345678");
    }

    #[test]
    fn trailing_input_is_ignored() {
        let data = yaz0(1, 0x80, &[0x80, b'x', 0, 0, 0]);
        assert_eq!(decompress(&data).unwrap().data, b"x");
    }

    #[test]
    fn rejects_bad_alignment() {
        let data = yaz0(1, 0x10, &[0x80, b'x']);
        assert!(matches!(decompress(&data), Err(Error::UnsupportedAlignment(0x10))));
    }

    #[test]
    fn rejects_reference_before_start() {
        let data = yaz0(4, 0x80, &[0x00, 0x20, 0x00]);
        assert!(matches!(decompress(&data), Err(Error::CorruptStream { offset: 0, .. })));
    }

    #[test]
    fn rejects_truncated_body() {
        let data = yaz0(4, 0x80, &[0xF0, b'a', b'b']);
        assert!(matches!(decompress(&data), Err(Error::TruncatedInput { .. })));
    }
}
