// Parser for the archiver's technical listing output
pub mod parser;

pub use parser::{parse_entries, parse_listing, Listing};
