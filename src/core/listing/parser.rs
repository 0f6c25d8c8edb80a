use log::trace;

use crate::models::{ArchiveEntry, ArchiveError};

/// Line separating the archive header from the per-entry records
const ENTRY_SEPARATOR: &str = "\n----------\n";

/// Line opening the archive property block inside the header
const PROPERTY_SEPARATOR: &str = "\n--\n";

const RECORD_SEPARATOR: &str = "\n\n";

const KEY_VALUE_DELIMITER: &str = " = ";

/// Parsed output of `7z l -slt`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Archive-level properties (`Type`, `Physical Size`, ...); empty if the header has none
    pub properties: ArchiveEntry,
    /// One entry per record, in listing order
    pub entries: Vec<ArchiveEntry>,
}

/// Parse the technical listing produced by `l -slt`
///
/// # Arguments
/// * `output` - Full captured standard output of one listing invocation
///
/// # Errors
/// * `Format` if the `----------` separator is missing or duplicated
/// * `Format` if a record line has no ` = ` delimiter
pub fn parse_listing(output: &str) -> Result<Listing, ArchiveError> {
    let output = output.replace("\r\n", "\n");

    let parts: Vec<&str> = output.split(ENTRY_SEPARATOR).collect();
    let (header, body) = match parts.as_slice() {
        [header, body] => (*header, *body),
        _ => {
            return Err(ArchiveError::Format(format!(
                "missing or duplicated separator (found {} sections)",
                parts.len()
            )))
        }
    };

    let entries = body
        .split(RECORD_SEPARATOR)
        .map(|fragment| fragment.trim_matches('\n'))
        .filter(|fragment| !fragment.is_empty())
        .map(parse_record)
        .collect::<Result<Vec<_>, _>>()?;

    trace!("Parsed {} listing entries", entries.len());

    Ok(Listing {
        properties: parse_properties(header),
        entries,
    })
}

/// Parse only the entry records of a listing
pub fn parse_entries(output: &str) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    parse_listing(output).map(|listing| listing.entries)
}

/// Parse one blank-line-delimited record into an entry
fn parse_record(fragment: &str) -> Result<ArchiveEntry, ArchiveError> {
    let mut entry = ArchiveEntry::new();
    for line in fragment.split('\n') {
        let (key, value) = split_line(line).ok_or_else(|| {
            ArchiveError::Format(format!("malformed record line: {:?}", line))
        })?;
        entry.insert(key, value);
    }
    trace!("{:?}", entry);
    Ok(entry)
}

/// Header properties follow the `--` line; anything else in the header is banner text
fn parse_properties(header: &str) -> ArchiveEntry {
    let mut properties = ArchiveEntry::new();
    if let Some((_, block)) = header.split_once(PROPERTY_SEPARATOR) {
        for (key, value) in block.lines().filter_map(split_line) {
            properties.insert(key, value);
        }
    }
    properties
}

fn split_line(line: &str) -> Option<(String, &str)> {
    line.split_once(KEY_VALUE_DELIMITER)
        .map(|(key, value)| (key.replace(' ', ""), value))
}
