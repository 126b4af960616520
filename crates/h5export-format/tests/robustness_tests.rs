//! Robustness tests: malformed or truncated files produce errors, never
//! panics, and never a half-read container.

use h5export_format::container::Container;
use h5export_format::dataspace::Dataspace;
use h5export_format::datatype::Datatype;
use h5export_format::error::FormatError;
use h5export_format::object_header::ObjectHeader;
use h5export_format::property_list::LinkCreateProps;
use h5export_format::signature;
use h5export_format::superblock::Superblock;

fn sample_file() -> Vec<u8> {
    let mut c = Container::new();
    let lcpl = LinkCreateProps::new().create_intermediate_groups(true);
    let ds = c
        .create_dataset("/g/values", Datatype::f32_le(), &Dataspace::simple(&[2, 3]).unwrap(), &lcpl)
        .unwrap();
    let raw: Vec<u8> = (0..6).flat_map(|i| (i as f32).to_le_bytes()).collect();
    c.write(&ds, &Datatype::f32_le(), &raw).unwrap();
    c.create_dataset("/g/empty", Datatype::i32_le(), &Dataspace::simple(&[4]).unwrap(), &lcpl)
        .unwrap();
    c.to_bytes().unwrap()
}

// ---- Truncated / empty inputs ----

#[test]
fn empty_input() {
    assert_eq!(Container::from_bytes(&[]), Err(FormatError::SignatureNotFound));
}

#[test]
fn signature_only() {
    let data = [0x89, b'H', b'D', b'F', 0x0d, 0x0a, 0x1a, 0x0a];
    let sig = signature::find_signature(&data).unwrap();
    assert!(Superblock::parse(&data, sig).is_err());
    assert!(Container::from_bytes(&data).is_err());
}

#[test]
fn every_truncation_is_an_error() {
    let full = sample_file();
    assert!(Container::from_bytes(&full).is_ok());
    for len in 0..full.len() {
        assert!(
            Container::from_bytes(&full[..len]).is_err(),
            "prefix of {len} bytes parsed"
        );
    }
}

#[test]
fn truncated_object_header_v2() {
    assert!(ObjectHeader::parse(b"OHDR\x02\x00", 0, 8, 8).is_err());
}

#[test]
fn object_header_past_end() {
    assert!(ObjectHeader::parse(&[0u8; 8], usize::MAX - 2, 8, 8).is_err());
}

// ---- Corruption ----

#[test]
fn corrupted_superblock_checksum() {
    let mut data = sample_file();
    data[20] ^= 0xFF;
    assert!(matches!(
        Container::from_bytes(&data),
        Err(FormatError::ChecksumMismatch { .. })
    ));
}

#[test]
fn corrupted_object_header() {
    let full = sample_file();
    let root = Superblock::parse(&full, 0).unwrap().root_group_address as usize;
    let mut data = full.clone();
    // first message inside the root header
    data[root + 8] ^= 0x55;
    assert!(Container::from_bytes(&data).is_err());
}

#[test]
fn bad_superblock_version() {
    let mut data = sample_file();
    data[8] = 9;
    assert_eq!(Container::from_bytes(&data), Err(FormatError::UnsupportedVersion(9)));
}

// ---- Editing after a parse ----

#[test]
fn reparse_edit_rewrite() {
    let mut c = Container::from_bytes(&sample_file()).unwrap();
    c.unlink("/g/values").unwrap();
    let lcpl = LinkCreateProps::new();
    let ds = c
        .create_dataset("/g/values", Datatype::f64_le(), &Dataspace::simple(&[1]).unwrap(), &lcpl)
        .unwrap();
    c.write(&ds, &Datatype::f64_le(), &7.25f64.to_le_bytes()).unwrap();

    let again = Container::from_bytes(&c.to_bytes().unwrap()).unwrap();
    assert_eq!(again.member_names("/g").unwrap(), vec!["empty", "values"]);
    let view = again.dataset("/g/values").unwrap();
    assert_eq!(view.datatype, Datatype::f64_le());
    assert_eq!(view.data, Some(&7.25f64.to_le_bytes()[..]));
    assert_eq!(again.dataset("/g/empty").unwrap().data, None);
}
