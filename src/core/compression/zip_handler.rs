use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use zip::result::ZipError;
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::core::compression::common::{
    collect_inputs, has_extension, has_signature, unpack_entry, ArchiveHandler,
};
use crate::models::{ArchiveEntry, ArchiveError, CompressionLevel};

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
const EMPTY_ZIP_SIGNATURE: &[u8] = b"PK\x05\x06";

/// Native handler for `.zip` archives
pub struct ZipHandler;

impl ZipHandler {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, archive_path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
        let file = File::open(archive_path)
            .map_err(|e| ArchiveError::Archive(
                format!("Failed to open ZIP archive {}: {}", archive_path.display(), e)
            ))?;

        ZipArchive::new(file)
            .map_err(|e| ArchiveError::Archive(
                format!("Failed to read ZIP archive: {}", e)
            ))
    }
}

impl ArchiveHandler for ZipHandler {
    /// List ZIP entries
    ///
    /// Directory names lose their trailing `/`, matching the archiver's listing.
    fn list(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut archive = self.open(archive_path)?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index(i)
                .map_err(|e| ArchiveError::Archive(
                    format!("Failed to read file at index {}: {}", i, e)
                ))?;

            let entry = ArchiveEntry::new()
                .with("Path", file.name().trim_end_matches('/'))
                .with("Folder", if file.is_dir() { "+" } else { "-" })
                .with("Size", file.size().to_string())
                .with("PackedSize", file.compressed_size().to_string())
                .with("CRC", format!("{:08X}", file.crc32()))
                .with("Method", format!("{:?}", file.compression()));
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Extract every entry below `dest_dir`
    ///
    /// Entries whose names would escape `dest_dir` are skipped. Unix modes
    /// stored in the archive are restored on Unix hosts.
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<(), ArchiveError> {
        let mut archive = self.open(archive_path)?;
        fs::create_dir_all(dest_dir)?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)
                .map_err(|e| ArchiveError::Archive(
                    format!("Failed to read file at index {}: {}", i, e)
                ))?;

            let relative = match file.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    debug!("Skipping unsafe ZIP entry name {:?}", file.name());
                    continue;
                }
            };
            let is_dir = file.is_dir();

            let output_path = unpack_entry(dest_dir, &relative, is_dir, &mut file)
                .map_err(|e| ArchiveError::Archive(
                    format!("Failed to extract {}: {}", relative.display(), e)
                ))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode().filter(|_| !is_dir) {
                    fs::set_permissions(&output_path, fs::Permissions::from_mode(mode))?;
                }
            }
            #[cfg(not(unix))]
            let _ = output_path;
        }

        Ok(())
    }

    fn extract_entry(&self, archive_path: &Path, name: &str, sink: &mut dyn Write) -> Result<u64, ArchiveError> {
        let mut archive = self.open(archive_path)?;

        let mut file = match archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Err(ArchiveError::NoSuchEntry(name.to_string())),
            Err(e) => return Err(ArchiveError::Archive(
                format!("Failed to read {} from ZIP archive: {}", name, e)
            )),
        };

        io::copy(&mut file, sink)
            .map_err(|e| ArchiveError::Archive(
                format!("Failed to extract file {}: {}", name, e)
            ))
    }

    /// Create ZIP archive from files and directories
    ///
    /// # Behavior
    /// - Files are streamed from disk, never buffered whole
    /// - `CompressionLevel::None` stores entries, every other level deflates at that level
    fn create(&self, output_path: &Path, files: &[PathBuf], level: CompressionLevel) -> Result<(), ArchiveError> {
        let items = collect_inputs(files)?;

        let file = File::create(output_path)
            .map_err(|e| ArchiveError::Archive(
                format!("Failed to create ZIP file {}: {}", output_path.display(), e)
            ))?;
        let mut zip = ZipWriter::new(file);

        let method = match level {
            CompressionLevel::None => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let dir_opts = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o755);
        let file_opts = FileOptions::<()>::default()
            .compression_method(method)
            .compression_level(level.zip_level())
            .unix_permissions(0o644);

        for item in items {
            if item.is_dir {
                zip.add_directory(item.name.as_str(), dir_opts)
                    .map_err(|e| ArchiveError::Archive(
                        format!("Failed to add directory {} to archive: {}", item.name, e)
                    ))?;
                continue;
            }

            let mut source = File::open(&item.source)
                .map_err(|e| ArchiveError::Archive(
                    format!("Failed to open file {}: {}", item.source.display(), e)
                ))?;

            zip.start_file(item.name.as_str(), file_opts)
                .map_err(|e| ArchiveError::Archive(
                    format!("Failed to start file {} in archive: {}", item.name, e)
                ))?;

            io::copy(&mut source, &mut zip)
                .map_err(|e| ArchiveError::Archive(
                    format!("Failed to write file {} to archive: {}", item.name, e)
                ))?;
        }

        zip.finish()
            .map_err(|e| ArchiveError::Archive(
                format!("Failed to finalize ZIP archive: {}", e)
            ))?;

        Ok(())
    }

    /// Returns true for .zip/.var names, or for files starting with a ZIP signature
    fn supports(&self, archive_path: &Path) -> bool {
        has_extension(archive_path, &["zip", "var"])
            || has_signature(archive_path, ZIP_SIGNATURE)
            || has_signature(archive_path, EMPTY_ZIP_SIGNATURE)
    }
}

impl Default for ZipHandler {
    fn default() -> Self {
        Self::new()
    }
}
