//! One archive contract over two engines: the external `7z` command-line
//! tool, and the in-process `zip`/`sevenz-rust` libraries.
//!
//! [`SevenZipExtractor`] and [`SevenZipCompressor`] pick a [`Backend`] once,
//! when they are built: the configured one, or the host default (the native
//! libraries on Windows, the command-line tool elsewhere).
//!
//! ```no_run
//! use sevenzip_bridge::{ArchiveConfig, CompressionLevel, SevenZipCompressor, SevenZipExtractor};
//!
//! let config = ArchiveConfig {
//!     compression_level: CompressionLevel::High,
//!     ..ArchiveConfig::default()
//! };
//! SevenZipCompressor::with_config(&config)?.compress_files("saves.7z", ["save1.sav", "save2.sav"])?;
//!
//! let extractor = SevenZipExtractor::open_with("saves.7z", &config)?;
//! let mut save = Vec::new();
//! extractor.extract_file_at(0, &mut save)?;
//! # Ok::<(), sevenzip_bridge::ArchiveError>(())
//! ```

// Module declarations
pub mod core;
pub mod models;

pub use crate::core::compression::common::{ArchiveCompressor, ArchiveExtractor};
pub use crate::core::compression::{SevenZipCompressor, SevenZipExtractor};
pub use crate::core::listing::{parse_entries, parse_listing, Listing};
pub use crate::core::process::{ProcessOutput, ProcessRunner};
pub use crate::models::{
    ArchiveConfig, ArchiveEntry, ArchiveError, ArchiveResult, Backend, CompressionLevel,
};
