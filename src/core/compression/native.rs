// Backend using the in-process zip and 7z libraries

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::core::compression::common::{ArchiveCompressor, ArchiveExtractor, ArchiveHandler};
use crate::core::compression::sevenz_handler::SevenZHandler;
use crate::core::compression::zip_handler::ZipHandler;
use crate::core::file_ops::ArchiveHandle;
use crate::models::{ArchiveConfig, ArchiveEntry, ArchiveError, CompressionLevel};

fn handlers() -> Vec<Arc<dyn ArchiveHandler>> {
    vec![
        Arc::new(ZipHandler::new()),
        Arc::new(SevenZHandler::new()),
    ]
}

/// Pick the handler for an archive by extension, then by leading signature
fn get_handler(archive_path: &Path) -> Result<Arc<dyn ArchiveHandler>, ArchiveError> {
    for handler in handlers() {
        if handler.supports(archive_path) {
            return Ok(handler);
        }
    }

    let ext = archive_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("unknown");

    Err(ArchiveError::UnsupportedArchive(
        format!("Unsupported archive format: .{}", ext)
    ))
}

/// Archive reader using the zip and sevenz-rust libraries
pub struct NativeExtractor {
    handler: Arc<dyn ArchiveHandler>,
    handle: ArchiveHandle,
    entries: Vec<ArchiveEntry>,
}

impl NativeExtractor {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        Self::with_handle(ArchiveHandle::from_path(path)?)
    }

    /// In-memory archives have no name, so the format comes from their signature
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        Self::with_handle(ArchiveHandle::from_bytes(bytes)?)
    }

    fn with_handle(handle: ArchiveHandle) -> Result<Self, ArchiveError> {
        let handler = get_handler(handle.path())?;
        let entries = handler.list(handle.path())?;
        info!("Listed {} entries in {}", entries.len(), handle.path().display());

        Ok(Self {
            handler,
            handle,
            entries,
        })
    }
}

impl ArchiveExtractor for NativeExtractor {
    fn archive_path(&self) -> &Path {
        self.handle.path()
    }

    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn extract_archive(&self, directory: &Path) -> Result<(), ArchiveError> {
        self.handler.extract(self.handle.path(), directory)
    }

    fn extract_file(&self, name: &str, sink: &mut dyn Write) -> Result<u64, ArchiveError> {
        self.handler.extract_entry(self.handle.path(), name, sink)
    }

    fn release(&mut self) -> Result<(), ArchiveError> {
        self.handle.release()
    }
}

/// Archive writer using the zip and sevenz-rust libraries
///
/// The format follows the archive name (`.zip` or `.7z`). Unlike the
/// command-line tool, an existing archive is replaced rather than updated.
pub struct NativeCompressor {
    level: CompressionLevel,
}

impl NativeCompressor {
    pub fn new(config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        config.validate()?;
        Ok(Self {
            level: config.compression_level,
        })
    }
}

impl ArchiveCompressor for NativeCompressor {
    fn compression_level(&self) -> CompressionLevel {
        self.level
    }

    fn set_compression_level(&mut self, level: CompressionLevel) {
        self.level = level;
    }

    fn compress_files(&self, archive_name: &Path, files: &[PathBuf]) -> Result<(), ArchiveError> {
        if files.is_empty() {
            return Err(ArchiveError::InvalidConfig("No files to compress".to_string()));
        }
        let handler = get_handler(archive_name)?;
        handler.create(archive_name, files, self.level)?;
        info!("Compressed {} inputs into {}", files.len(), archive_name.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_files(dir: &Path) -> Vec<PathBuf> {
        fs::write(dir.join("a.txt"), b"alpha").unwrap();
        fs::write(dir.join("b.bin"), (0u8..=255).cycle().take(10_000).collect::<Vec<u8>>()).unwrap();
        vec![dir.join("a.txt"), dir.join("b.bin")]
    }

    #[test]
    fn test_get_handler() {
        assert!(get_handler(Path::new("test.zip")).is_ok());
        assert!(get_handler(Path::new("test.7z")).is_ok());

        match get_handler(Path::new("test.rar")) {
            Err(ArchiveError::UnsupportedArchive(msg)) => assert!(msg.contains("rar")),
            _ => panic!("Expected UnsupportedArchive error"),
        }
    }

    #[test]
    fn test_round_trip_both_formats() {
        for name in ["out.zip", "out.7z"] {
            let temp = TempDir::new().unwrap();
            let inputs = create_test_files(temp.path());
            let archive_path = temp.path().join(name);

            let compressor = NativeCompressor::new(&ArchiveConfig::default()).unwrap();
            compressor.compress_files(&archive_path, &inputs).unwrap();

            let extractor = NativeExtractor::open(&archive_path).unwrap();
            let mut names = extractor.archive_file_names().unwrap();
            names.sort();
            assert_eq!(names, vec!["a.txt", "b.bin"]);

            let mut sink = Vec::new();
            extractor.extract_file("b.bin", &mut sink).unwrap();
            assert_eq!(sink, fs::read(temp.path().join("b.bin")).unwrap());
        }
    }

    #[test]
    fn test_from_bytes_detects_format_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let inputs = create_test_files(temp.path());
        let archive_path = temp.path().join("mem.7z");
        NativeCompressor::new(&ArchiveConfig::default())
            .unwrap()
            .compress_files(&archive_path, &inputs)
            .unwrap();

        let bytes = fs::read(&archive_path).unwrap();
        let mut extractor = NativeExtractor::from_bytes(&bytes).unwrap();
        let temp_copy = extractor.archive_path().to_path_buf();
        assert!(temp_copy.exists());
        assert_eq!(extractor.entries().len(), 2);

        extractor.release().unwrap();
        assert!(!temp_copy.exists());
        assert!(archive_path.exists());
    }

    #[test]
    fn test_unrecognised_bytes() {
        let result = NativeExtractor::from_bytes(b"definitely not an archive");
        assert!(matches!(result, Err(ArchiveError::UnsupportedArchive(_))));
    }

    #[test]
    fn test_extract_by_index_uses_requested_index() {
        let temp = TempDir::new().unwrap();
        let inputs = create_test_files(temp.path());
        let archive_path = temp.path().join("indexed.zip");
        NativeCompressor::new(&ArchiveConfig::default())
            .unwrap()
            .compress_files(&archive_path, &inputs)
            .unwrap();

        let extractor = NativeExtractor::open(&archive_path).unwrap();
        let mut sink = Vec::new();
        extractor.extract_file_at(0, &mut sink).unwrap();
        assert_eq!(sink, b"alpha");

        sink.clear();
        let written = extractor.extract_file_at(1, &mut sink).unwrap();
        assert_eq!(written, 10_000);

        let out_of_range = extractor.extract_file_at(2, &mut Vec::new());
        assert!(matches!(out_of_range, Err(ArchiveError::NoSuchEntry(_))));
    }
}
