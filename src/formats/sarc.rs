//! SARC (SEAD ARChive) - general-purpose Nintendo archive.
//!
//! Used pervasively in Wii U, 3DS and Switch game content. Usually wrapped
//! in Yaz0 (`.szs`, see [`crate::compression::yaz0`]) or Zstandard (`.zs`).
//!
//! ## Layout
//! ```text
//! [0x00] SARC header  (0x14 bytes)
//! [0x14] SFAT header  (0x0C bytes) + FAT entries (FileCount × 0x10)
//! [...]  SFNT header  (0x08 bytes) + null-terminated filenames (4-byte aligned)
//! [...]  Data section (begins at offset given in SARC header)
//! ```
//!
//! ## SARC Header (0x14 bytes)
//! ```text
//! [0x00] Magic "SARC"       (4 bytes)
//! [0x04] HeaderSize (0x14)  (u16, endian per BOM)
//! [0x06] BOM                (FE FF = big endian, FF FE = little endian)
//! [0x08] TotalFileSize      (u32)
//! [0x0C] DataOffset         (u32)
//! [0x10] Version (0x0100)   (u16)
//! [0x12] Reserved (0)       (u16)
//! ```
//!
//! ## SFAT Header (0x0C bytes)
//! ```text
//! [0x00] Magic "SFAT"           (4 bytes)
//! [0x04] HeaderSize (0x0C)      (u16)
//! [0x06] FileCount (max 0x3FFF) (u16)
//! [0x08] HashMultiplier (0x65)  (u32)
//! ```
//!
//! ## SFAT Entry (0x10 bytes)
//! ```text
//! [0x00] FilenameHash           (u32)
//! [0x04] FilenameAttrs          (u32)
//!         0 = no name; else 0x01BBBBBB where BBBBBB = name-table word offset
//! [0x08] DataStart              (u32) - relative to data section
//! [0x0C] DataEnd                (u32)
//! ```
//! Entries are sorted by hash; runtime uses binary search.
//!
//! ## SFNT Header (0x08 bytes)
//! ```text
//! [0x00] Magic "SFNT"     (4 bytes)
//! [0x04] HeaderSize (8)   (u16)
//! [0x06] Reserved (0)     (u16)
//! [0x08] Null-terminated filenames, 4-byte aligned
//! ```

use std::collections::HashSet;
use std::ops::Index;

use crate::compression::yaz0::Yaz0;
use crate::stream::{DataStream, Endian};
use crate::{Error, Result};

/// Hash multiplier every SARC uses.
pub const HASH_MULTIPLIER: u32 = 0x65;

/// Largest file count the format allows.
pub const MAX_FILES: u16 = 0x3FFF;

const NAME_FLAG: u32 = 0x0100_0000;

/// How to locate the start of the data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataAlignment {
    /// Trust the offsets in the file and jump straight to the first file.
    #[default]
    Auto,
    /// The data section is padded with zeros up to this power-of-two
    /// boundary, and the first file must start exactly there.
    Fixed(u32),
}

/// Knobs for [`Sarc::parse_with`].
#[derive(Debug, Clone, Default)]
pub struct SarcOptions {
    /// Data section alignment policy.
    pub alignment: DataAlignment,
}

/// A parsed SARC archive borrowing its file contents from the input
/// buffer.
#[derive(Debug)]
pub struct Sarc<'a> {
    /// All file entries, in file-table order.
    pub files: Vec<SarcFile<'a>>,
    /// Byte order declared by the BOM.
    pub endian: Endian,
    /// Absolute offset where file data begins.
    pub data_offset: u32,
}

/// A single file inside a SARC archive.
#[derive(Debug, Clone)]
pub struct SarcFile<'a> {
    /// Filename ([`None`] if the archive has no name table entry for this file).
    pub name: Option<&'a str>,
    /// Hash of the filename.
    pub hash: u32,
    /// Start byte offset within the data section.
    pub data_start: u32,
    /// End byte offset within the data section (exclusive).
    pub data_end: u32,
    /// File contents.
    pub data: &'a [u8],
}

struct FatEntry {
    hash: u32,
    name_offset: Option<usize>,
    data_start: u32,
    data_end: u32,
}

impl<'a> Sarc<'a> {
    /// Parse an uncompressed SARC archive with default options.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        Self::parse_with(data, &SarcOptions::default())
    }

    /// Parse a SARC archive that came out of a Yaz0 stream, using the
    /// stream's declared alignment for the data section.
    pub fn from_yaz0(yaz0: &'a Yaz0) -> Result<Self> {
        Self::parse_with(
            &yaz0.data,
            &SarcOptions {
                alignment: DataAlignment::Fixed(yaz0.alignment),
            },
        )
    }

    /// Parse an uncompressed SARC archive.
    ///
    /// The whole buffer must be accounted for: the header's total size must
    /// match and the last file must end at the end of the buffer.
    pub fn parse_with(data: &'a [u8], options: &SarcOptions) -> Result<Self> {
        let _span = tracing::debug_span!("sarc_parse", len = data.len()).entered();

        let mut s = DataStream::new(data, Endian::Little);
        s.magic(b"SARC")?;

        // Header size is stored in the archive's byte order, which the BOM
        // right after it declares.
        let size_at = s.position();
        let raw_header_size = s.bytesa::<2>()?;
        let endian = s.read_bom()?;
        let header_size = match endian {
            Endian::Little => u16::from_le_bytes(raw_header_size),
            Endian::Big => u16::from_be_bytes(raw_header_size),
        };
        if header_size != 0x14 {
            return Err(Error::MalformedHeader {
                offset: size_at,
                what: "SARC header size",
                expected: "0x14".into(),
                found: format!("{header_size:#x}"),
            });
        }

        s.expect_u32(data.len() as u32, "SARC file size")?;
        let data_offset = s.u32()?;
        s.expect_u16(0x0100, "SARC version")?;
        s.expect_u16(0, "SARC reserved")?;

        let fat = parse_sfat(&mut s)?;
        let names = parse_sfnt(&mut s, &fat)?;

        let base = data_offset as usize;
        let first = base + fat.first().map_or(0, |e| e.data_start as usize);
        match options.alignment {
            DataAlignment::Auto => s.seek(first)?,
            DataAlignment::Fixed(alignment) => {
                if !alignment.is_power_of_two() {
                    return Err(Error::UnsupportedAlignment(alignment));
                }
                s.align(alignment as usize)?;
                s.assert_position(first)?;
            }
        }

        let mut files = Vec::with_capacity(fat.len());
        for (entry, name) in fat.into_iter().zip(names) {
            let start = entry.data_start as usize;
            let end = entry.data_end as usize;
            let len = end.checked_sub(start).ok_or(Error::MalformedHeader {
                offset: base + start,
                what: "SARC file range",
                expected: format!("end >= {start:#x}"),
                found: format!("{end:#x}"),
            })?;
            s.seek(base + start)?;
            files.push(SarcFile {
                name,
                hash: entry.hash,
                data_start: entry.data_start,
                data_end: entry.data_end,
                data: s.bytes(len)?,
            });
        }
        s.assert_eof()?;

        let mut seen = HashSet::with_capacity(files.len());
        for name in files.iter().filter_map(|f| f.name) {
            if !seen.insert(name) {
                tracing::warn!(name, "duplicate filename in SARC");
            }
        }

        tracing::debug!(files = files.len(), ?endian, data_offset, "SARC parsed");

        Ok(Self {
            files,
            endian,
            data_offset,
        })
    }

    /// Compute the canonical hash for a filename.
    pub fn hash_filename(name: &str) -> u32 {
        sarc_hash(name.as_bytes(), HASH_MULTIPLIER)
    }

    /// Find a file by its exact name.
    ///
    /// Uses hash-then-name comparison. If the archive carries the same name
    /// twice the later entry wins.
    pub fn get(&self, name: &str) -> Option<&SarcFile<'a>> {
        let target = Self::hash_filename(name);
        self.files
            .iter()
            .rev()
            .find(|f| f.hash == target && f.name == Some(name))
    }

    /// Contents of the file called `name`.
    pub fn file_data(&self, name: &str) -> Option<&'a [u8]> {
        self.get(name).map(|f| f.data)
    }

    /// Iterate over all file entries.
    pub fn files(&self) -> impl Iterator<Item = &SarcFile<'a>> {
        self.files.iter()
    }
}

fn parse_sfat(s: &mut DataStream<'_>) -> Result<Vec<FatEntry>> {
    s.magic(b"SFAT")?;
    s.expect_u16(0x0C, "SFAT header size")?;
    let count_at = s.position();
    let file_count = s.u16()?;
    if file_count > MAX_FILES {
        return Err(Error::MalformedHeader {
            offset: count_at,
            what: "SFAT file count",
            expected: format!("<= {MAX_FILES:#x}"),
            found: format!("{file_count:#x}"),
        });
    }
    s.expect_u32(HASH_MULTIPLIER, "SFAT hash multiplier")?;

    let mut fat = Vec::with_capacity(file_count as usize);
    for _ in 0..file_count {
        let hash = s.u32()?;
        let attrs = s.u32()?;
        let name_offset = match attrs {
            0 => None,
            // Low 24 bits are a word offset into the name table.
            a if a & NAME_FLAG != 0 => Some((a & 0x00FF_FFFF) as usize * 4),
            a => return Err(Error::InvalidFileAttributes(a)),
        };
        fat.push(FatEntry {
            hash,
            name_offset,
            data_start: s.u32()?,
            data_end: s.u32()?,
        });
    }
    Ok(fat)
}

/// Read the name of every named FAT entry, checking each against its hash.
fn parse_sfnt<'a>(s: &mut DataStream<'a>, fat: &[FatEntry]) -> Result<Vec<Option<&'a str>>> {
    s.magic(b"SFNT")?;
    s.expect_u16(8, "SFNT header size")?;
    s.expect_u16(0, "SFNT reserved")?;

    let names_start = s.position();
    let mut names = Vec::with_capacity(fat.len());
    for entry in fat {
        let Some(offset) = entry.name_offset else {
            names.push(None);
            continue;
        };
        s.align(4)?;
        s.assert_position(names_start + offset)?;
        let name = s.null_string()?;
        let computed = sarc_hash(name.as_bytes(), HASH_MULTIPLIER);
        if computed != entry.hash {
            return Err(Error::HashMismatch {
                name: name.to_owned(),
                stored: entry.hash,
                computed,
            });
        }
        names.push(Some(name));
    }
    Ok(names)
}

impl<'a> Index<&str> for Sarc<'a> {
    type Output = SarcFile<'a>;

    /// Index by file name.
    ///
    /// # Panics
    /// Panics if the file name does not exist in the archive.
    fn index(&self, index: &str) -> &Self::Output {
        self.get(index)
            .unwrap_or_else(|| panic!("no file '{index}' in SARC"))
    }
}

/// SARC filename hash algorithm.
///
/// Each byte is sign-extended (cast to `i8`) before accumulating. This is
/// required to correctly handle non-ASCII characters in game paths.
pub fn sarc_hash(name: &[u8], multiplier: u32) -> u32 {
    let mut h: u32 = 0;
    for &b in name {
        h = h.wrapping_mul(multiplier).wrapping_add(b as i8 as u32);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::sarc_hash;

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(sarc_hash(b"", 0x65), 0);
        assert_eq!(sarc_hash(b"a", 0x65), 0x61);
        assert_eq!(sarc_hash(b"ab", 0x65), 0x61 * 0x65 + 0x62);
    }

    #[test]
    fn hash_sign_extends_high_bytes() {
        assert_eq!(sarc_hash(&[0xFF], 0x65), u32::MAX);
    }
}
