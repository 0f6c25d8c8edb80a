//! Listings captured from real 7z builds.

use sevenzip_bridge::{parse_entries, parse_listing, ArchiveError};

const ZIP_LISTING: &str = include_str!("fixtures/listing_zip.txt");
const SEVENZ_CRLF_LISTING: &str = include_str!("fixtures/listing_7z_crlf.txt");

#[test]
fn zip_listing_entries() {
    let listing = parse_listing(ZIP_LISTING).unwrap();

    let paths: Vec<&str> = listing.entries.iter().map(|e| e.path().unwrap()).collect();
    assert_eq!(
        paths,
        vec![
            "CLV-H-SBXYZ",
            "CLV-H-SBXYZ/save.sram",
            "CLV-H-SBXYZ/cartridge.png"
        ]
    );

    let folder = &listing.entries[0];
    assert!(folder.is_directory());
    assert_eq!(folder.get("Attributes"), Some("D_ drwxr-xr-x"));

    let save = &listing.entries[1];
    assert!(!save.is_directory());
    assert_eq!(save.size(), Some(8192));
    assert_eq!(save.get("PackedSize"), Some("1021"));
    assert_eq!(save.get("HostOS"), Some("Unix"));
    assert_eq!(save.get("Method"), Some("Deflate"));
    assert_eq!(save.get("Created"), Some(""));

    assert_eq!(listing.entries[2].get("Method"), Some("Store"));
}

#[test]
fn zip_listing_properties() {
    let listing = parse_listing(ZIP_LISTING).unwrap();

    assert_eq!(listing.properties.path().ok(), Some("hakchi_saves.zip"));
    assert_eq!(listing.properties.get("Type"), Some("zip"));
    assert_eq!(listing.properties.get("PhysicalSize"), Some("1893"));
    assert_eq!(listing.properties.len(), 3);
}

#[test]
fn windows_listing_with_crlf() {
    let listing = parse_listing(SEVENZ_CRLF_LISTING).unwrap();

    assert_eq!(listing.properties.get("Path"), Some(r"C:\games\roms.7z"));
    assert_eq!(listing.properties.get("Solid"), Some("+"));
    assert_eq!(listing.properties.get("Method"), Some("LZMA2:12"));

    assert_eq!(listing.entries.len(), 2);
    let rom = &listing.entries[0];
    assert_eq!(rom.path().ok(), Some("Super Mario Bros. (World).nes"));
    assert_eq!(rom.size(), Some(40976));
    assert_eq!(rom.get("CRC"), Some("3337EC46"));
    assert!(!rom.is_directory());

    let readme = &listing.entries[1];
    assert_eq!(readme.path().ok(), Some("readme.txt"));
    assert_eq!(readme.get("PackedSize"), Some(""));
    assert!(readme.iter().all(|(_, value)| !value.ends_with('\r')));
}

#[test]
fn entries_match_full_listing() {
    let entries = parse_entries(SEVENZ_CRLF_LISTING).unwrap();
    assert_eq!(entries, parse_listing(SEVENZ_CRLF_LISTING).unwrap().entries);
}

#[test]
fn truncated_listing_is_format_error() {
    let cut = ZIP_LISTING.find("----------").unwrap();
    let result = parse_listing(&ZIP_LISTING[..cut]);
    assert!(matches!(result, Err(ArchiveError::Format(_))));
}
