mod common;

use common::Bytes;
use ninkit::Error;
use ninkit::compression::yaz0;
use ninkit::formats::sarc::{DataAlignment, Sarc, SarcOptions};
use ninkit::stream::Endian;

/// Build a SARC archive. Names are 4-byte aligned in SFNT and file data is
/// 8-byte aligned inside the data section.
fn archive(big: bool, data_offset: u32, files: &[(Option<&str>, &[u8])]) -> Vec<u8> {
    let mut names = Bytes::le();
    let mut data = Bytes::le();
    let mut b = if big { Bytes::be() } else { Bytes::le() };

    b.raw(b"SARC").u16(0x14).u16(0xFEFF);
    b.u32(0).u32(data_offset).u16(0x0100).u16(0);
    b.raw(b"SFAT").u16(0x0C).u16(files.len() as u16).u32(0x65);
    for (name, contents) in files {
        data.align(8);
        let start = data.pos();
        data.raw(contents);
        match name {
            Some(n) => {
                names.align(4);
                b.u32(Sarc::hash_filename(n)).u32(0x0100_0000 | names.pos() / 4);
                names.raw(n.as_bytes()).u8(0);
            }
            None => {
                b.u32(0xDEAD_BEEF).u32(0);
            }
        }
        b.u32(start).u32(data.pos());
    }
    b.raw(b"SFNT").u16(8).u16(0).raw(&names.buf);

    let pad = data_offset as usize - b.buf.len();
    b.zeros(pad).raw(&data.buf);
    let len = b.pos();
    b.patch_u32(8, len);
    b.buf
}

fn two_files(big: bool, data_offset: u32) -> Vec<u8> {
    archive(
        big,
        data_offset,
        &[(Some("a.txt"), b"hello"), (Some("b.bin"), &[1, 2, 3, 4])],
    )
}

fn with_alignment(alignment: DataAlignment) -> SarcOptions {
    SarcOptions { alignment }
}

#[test]
fn little_endian_archive() {
    let data = two_files(false, 0x60);
    let sarc = Sarc::parse(&data).unwrap();

    assert_eq!(sarc.endian, Endian::Little);
    assert_eq!(sarc.data_offset, 0x60);
    assert_eq!(sarc.files.len(), 2);
    assert_eq!(sarc.file_data("a.txt"), Some(&b"hello"[..]));
    assert_eq!(sarc["b.bin"].data, &[1, 2, 3, 4]);
    assert_eq!(sarc["b.bin"].data_start, 8);
    assert_eq!(sarc["b.bin"].data_end, 12);
    assert!(sarc.get("c.txt").is_none());
}

#[test]
fn big_endian_archive() {
    let data = two_files(true, 0x60);
    let sarc = Sarc::parse(&data).unwrap();

    assert_eq!(sarc.endian, Endian::Big);
    let names: Vec<_> = sarc.files().map(|f| f.name).collect();
    assert_eq!(names, [Some("a.txt"), Some("b.bin")]);
    assert_eq!(sarc.file_data("a.txt"), Some(&b"hello"[..]));
}

#[test]
fn unnamed_file() {
    let data = archive(false, 0x40, &[(None, b"xyz")]);
    let sarc = Sarc::parse(&data).unwrap();

    assert_eq!(sarc.files[0].name, None);
    assert_eq!(sarc.files[0].hash, 0xDEAD_BEEF);
    assert_eq!(sarc.files[0].data, b"xyz");
}

#[test]
fn duplicate_names_resolve_to_last() {
    let data = archive(false, 0x60, &[(Some("a.txt"), b"one"), (Some("a.txt"), b"two")]);
    let sarc = Sarc::parse(&data).unwrap();

    assert_eq!(sarc.files.len(), 2);
    assert_eq!(sarc.file_data("a.txt"), Some(&b"two"[..]));
}

#[test]
fn fixed_alignment_matches_first_file() {
    let data = two_files(false, 0x60);
    for alignment in [0x10, 0x20] {
        let sarc = Sarc::parse_with(&data, &with_alignment(DataAlignment::Fixed(alignment))).unwrap();
        assert_eq!(sarc.files.len(), 2);
    }
}

#[test]
fn fixed_alignment_mismatch() {
    let data = two_files(false, 0x60);
    // Names end at 0x56, which aligns to 0x58 rather than 0x60.
    let err = Sarc::parse_with(&data, &with_alignment(DataAlignment::Fixed(8))).unwrap_err();
    assert!(matches!(
        err,
        Error::PositionMismatch {
            expected: 0x60,
            actual: 0x58
        }
    ));
}

#[test]
fn fixed_alignment_must_be_power_of_two() {
    let data = two_files(false, 0x60);
    let err = Sarc::parse_with(&data, &with_alignment(DataAlignment::Fixed(0x18))).unwrap_err();
    assert!(matches!(err, Error::UnsupportedAlignment(0x18)));
}

#[test]
fn from_yaz0_uses_stream_alignment() {
    let data = two_files(true, 0x80);

    let mut packed = b"Yaz0".to_vec();
    packed.extend_from_slice(&(data.len() as u32).to_be_bytes());
    packed.extend_from_slice(&0x80u32.to_be_bytes());
    packed.extend_from_slice(&[0; 4]);
    for chunk in data.chunks(8) {
        packed.push(0xFF);
        packed.extend_from_slice(chunk);
    }

    let yaz0 = yaz0::decompress(&packed).unwrap();
    assert_eq!(yaz0.data, data);
    let sarc = Sarc::from_yaz0(&yaz0).unwrap();
    assert_eq!(sarc.file_data("b.bin"), Some(&[1u8, 2, 3, 4][..]));
}

#[test]
fn hash_mismatch() {
    let mut data = two_files(false, 0x60);
    // First SFAT entry starts right after the SFAT header.
    data[0x20..0x24].copy_from_slice(&0x1234u32.to_le_bytes());

    let err = Sarc::parse(&data).unwrap_err();
    match err {
        Error::HashMismatch { name, stored, computed } => {
            assert_eq!(name, "a.txt");
            assert_eq!(stored, 0x1234);
            assert_eq!(computed, Sarc::hash_filename("a.txt"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_name_attributes() {
    let mut data = two_files(false, 0x60);
    data[0x24..0x28].copy_from_slice(&0x0200_0000u32.to_le_bytes());

    let err = Sarc::parse(&data).unwrap_err();
    assert!(matches!(err, Error::InvalidFileAttributes(0x0200_0000)));
}

#[test]
fn total_size_must_match_buffer() {
    let mut data = two_files(false, 0x60);
    data.push(0);

    let err = Sarc::parse(&data).unwrap_err();
    assert!(matches!(err, Error::MalformedHeader { offset: 8, .. }));
}

#[test]
fn trailing_data_after_last_file() {
    let mut data = two_files(false, 0x60);
    data.extend_from_slice(&[0; 4]);
    let len = data.len() as u32;
    data[8..12].copy_from_slice(&len.to_le_bytes());

    let err = Sarc::parse(&data).unwrap_err();
    assert!(matches!(
        err,
        Error::TrailingData {
            offset: 0x6C,
            remaining: 4
        }
    ));
}

#[test]
fn bad_bom() {
    let mut data = two_files(false, 0x60);
    data[6] = 0x12;
    data[7] = 0x34;
    assert!(Sarc::parse(&data).is_err());
}
