use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use sevenz_rust::lzma::LZMA2Options;
use sevenz_rust::{
    Password, SevenZArchiveEntry, SevenZMethod, SevenZMethodConfiguration, SevenZReader, SevenZWriter,
};

use crate::core::compression::common::{
    collect_inputs, enclosed_path, has_extension, has_signature, unpack_entry, ArchiveHandler,
};
use crate::models::{ArchiveEntry, ArchiveError, CompressionLevel};

const SEVENZ_SIGNATURE: &[u8] = b"7z\xBC\xAF\x27\x1C";

/// Coder for entry data: stored as-is for `None`, LZMA2 otherwise
fn content_method(level: CompressionLevel) -> SevenZMethodConfiguration {
    match level.lzma_preset() {
        Some(preset) => LZMA2Options::with_preset(preset).into(),
        None => SevenZMethod::COPY.into(),
    }
}

/// Native handler for `.7z` archives, backed by sevenz-rust
pub struct SevenZHandler;

impl SevenZHandler {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, archive_path: &Path) -> Result<SevenZReader<File>, ArchiveError> {
        SevenZReader::open(archive_path, Password::empty())
            .map_err(|e| ArchiveError::Archive(
                format!("Failed to read 7z archive {}: {}", archive_path.display(), e)
            ))
    }
}

impl ArchiveHandler for SevenZHandler {
    /// List 7z entries from the archive header
    ///
    /// Entry data is never decoded, so listing stays cheap for solid archives
    /// and still works when a data block is damaged.
    fn list(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let reader = self.open(archive_path)?;

        let entries = reader
            .archive()
            .files
            .iter()
            .map(|entry| {
                ArchiveEntry::new()
                    .with("Path", entry.name.as_str())
                    .with("Folder", if entry.is_directory { "+" } else { "-" })
                    .with("Size", entry.size.to_string())
            })
            .collect();

        Ok(entries)
    }

    /// Extract every entry below `dest_dir`, skipping names that would escape it
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<(), ArchiveError> {
        let mut reader = self.open(archive_path)?;
        fs::create_dir_all(dest_dir)?;

        reader.for_each_entries(|entry, data| {
            match enclosed_path(entry.name()) {
                Some(relative) => {
                    unpack_entry(dest_dir, &relative, entry.is_directory(), data)?;
                }
                None => {
                    debug!("Skipping unsafe 7z entry name {:?}", entry.name());
                    io::copy(data, &mut io::sink())?;
                }
            }
            Ok(true)
        })
        .map_err(|e| ArchiveError::Archive(
            format!("Failed to extract 7z archive: {}", e)
        ))?;

        Ok(())
    }

    fn extract_entry(&self, archive_path: &Path, name: &str, sink: &mut dyn Write) -> Result<u64, ArchiveError> {
        let mut reader = self.open(archive_path)?;
        let mut written = None;

        reader.for_each_entries(|entry, data| {
            if entry.name() == name && !entry.is_directory() {
                written = Some(io::copy(data, &mut *sink)?);
                return Ok(false);
            }
            io::copy(data, &mut io::sink())?;
            Ok(true)
        })
        .map_err(|e| ArchiveError::Archive(
            format!("Failed to extract {} from 7z archive: {}", name, e)
        ))?;

        written.ok_or_else(|| ArchiveError::NoSuchEntry(name.to_string()))
    }

    /// Create 7z archive from files and directories
    ///
    /// # Behavior
    /// - Uses LZMA2 with the preset matching the compression level, or copy for `None`
    /// - Files are streamed from disk, never buffered whole
    fn create(&self, output_path: &Path, files: &[PathBuf], level: CompressionLevel) -> Result<(), ArchiveError> {
        let items = collect_inputs(files)?;

        let file = File::create(output_path)
            .map_err(|e| ArchiveError::Archive(
                format!("Failed to create 7z file {}: {}", output_path.display(), e)
            ))?;

        let mut writer = SevenZWriter::new(file)
            .map_err(|e| ArchiveError::Archive(
                format!("Failed to create 7z writer: {}", e)
            ))?;
        writer.set_content_methods(vec![content_method(level)]);

        for item in items {
            let entry = SevenZArchiveEntry::from_path(&item.source, item.name.clone());

            if item.is_dir {
                writer.push_archive_entry::<&[u8]>(entry, None)
                    .map_err(|e| ArchiveError::Archive(
                        format!("Failed to add directory {} to archive: {}", item.name, e)
                    ))?;
                continue;
            }

            let mut source = File::open(&item.source)
                .map_err(|e| ArchiveError::Archive(
                    format!("Failed to open file {}: {}", item.source.display(), e)
                ))?;

            writer.push_archive_entry(entry, Some(&mut source))
                .map_err(|e| ArchiveError::Archive(
                    format!("Failed to add file {} to archive: {}", item.name, e)
                ))?;
        }

        writer.finish()
            .map_err(|e| ArchiveError::Archive(
                format!("Failed to finalize 7z archive: {}", e)
            ))?;

        Ok(())
    }

    /// Returns true for .7z names, or for files starting with the 7z signature
    fn supports(&self, archive_path: &Path) -> bool {
        has_extension(archive_path, &["7z"]) || has_signature(archive_path, SEVENZ_SIGNATURE)
    }
}

impl Default for SevenZHandler {
    fn default() -> Self {
        Self::new()
    }
}
