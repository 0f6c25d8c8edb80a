// Archive backends and the facades that select between them
pub mod cli;
pub mod common;
pub mod native;
pub mod zip_handler;

#[path = "7z_handler.rs"]
pub mod sevenz_handler;

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::models::{ArchiveConfig, ArchiveEntry, ArchiveError, Backend, CompressionLevel};
use cli::{CliCompressor, CliExtractor};
use common::{ArchiveCompressor, ArchiveExtractor};
use native::{NativeCompressor, NativeExtractor};

/// Archive reader over whichever backend the configuration selects
///
/// The backend is chosen once, when the reader is built, and kept for its
/// whole lifetime. Dropping the reader deletes the temporary copy of an
/// in-memory archive; [`close`](Self::close) does the same but reports errors.
///
/// # Example
/// ```no_run
/// use sevenzip_bridge::SevenZipExtractor;
///
/// let extractor = SevenZipExtractor::open("games.7z")?;
/// for name in extractor.archive_file_names()? {
///     println!("{}", name);
/// }
/// let mut rom = Vec::new();
/// extractor.extract_file("rom.nes", &mut rom)?;
/// # Ok::<(), sevenzip_bridge::ArchiveError>(())
/// ```
pub struct SevenZipExtractor {
    backend: Backend,
    inner: Box<dyn ArchiveExtractor>,
}

impl SevenZipExtractor {
    /// Open an archive on disk with the default configuration
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        Self::open_with(path, &ArchiveConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let backend = config.resolve_backend();
        debug!("Opening {} with {} backend", path.display(), backend);

        let inner: Box<dyn ArchiveExtractor> = match backend {
            Backend::CommandLine => Box::new(CliExtractor::open(path, config)?),
            Backend::Native => Box::new(NativeExtractor::open(path)?),
        };
        Ok(Self { backend, inner })
    }

    /// Read an archive held in memory with the default configuration
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        Self::from_bytes_with(bytes, &ArchiveConfig::default())
    }

    pub fn from_bytes_with(bytes: &[u8], config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        let backend = config.resolve_backend();
        debug!("Opening {} byte in-memory archive with {} backend", bytes.len(), backend);

        let inner: Box<dyn ArchiveExtractor> = match backend {
            Backend::CommandLine => Box::new(CliExtractor::from_bytes(bytes, config)?),
            Backend::Native => Box::new(NativeExtractor::from_bytes(bytes)?),
        };
        Ok(Self { backend, inner })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// File the backend reads: the original archive, or its temporary copy
    pub fn archive_path(&self) -> &Path {
        self.inner.archive_path()
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        self.inner.entries()
    }

    pub fn archive_file_names(&self) -> Result<Vec<String>, ArchiveError> {
        self.inner.archive_file_names()
    }

    pub fn extract_archive(&self, directory: impl AsRef<Path>) -> Result<(), ArchiveError> {
        self.inner.extract_archive(directory.as_ref())
    }

    pub fn extract_file(&self, name: &str, sink: &mut dyn Write) -> Result<u64, ArchiveError> {
        self.inner.extract_file(name, sink)
    }

    pub fn extract_file_at(&self, index: usize, sink: &mut dyn Write) -> Result<u64, ArchiveError> {
        self.inner.extract_file_at(index, sink)
    }

    /// Release the archive, deleting its temporary copy if there is one
    pub fn close(mut self) -> Result<(), ArchiveError> {
        self.inner.release()
    }
}

impl Drop for SevenZipExtractor {
    fn drop(&mut self) {
        if let Err(e) = self.inner.release() {
            warn!("{}", e);
        }
    }
}

/// Archive writer over whichever backend the configuration selects
pub struct SevenZipCompressor {
    backend: Backend,
    inner: Box<dyn ArchiveCompressor>,
}

impl SevenZipCompressor {
    pub fn new() -> Result<Self, ArchiveError> {
        Self::with_config(&ArchiveConfig::default())
    }

    pub fn with_config(config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        let backend = config.resolve_backend();
        let inner: Box<dyn ArchiveCompressor> = match backend {
            Backend::CommandLine => Box::new(CliCompressor::new(config)?),
            Backend::Native => Box::new(NativeCompressor::new(config)?),
        };
        Ok(Self { backend, inner })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn compression_level(&self) -> CompressionLevel {
        self.inner.compression_level()
    }

    pub fn set_compression_level(&mut self, level: CompressionLevel) {
        self.inner.set_compression_level(level);
    }

    /// Compress files and directories into `archive_name`
    pub fn compress_files<I, P>(&self, archive_name: impl AsRef<Path>, files: I) -> Result<(), ArchiveError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let files: Vec<PathBuf> = files.into_iter().map(|f| f.as_ref().to_path_buf()).collect();
        self.inner.compress_files(archive_name.as_ref(), &files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn native() -> ArchiveConfig {
        ArchiveConfig {
            backend: Some(Backend::Native),
            ..ArchiveConfig::default()
        }
    }

    fn create_test_files(dir: &Path) {
        fs::create_dir_all(dir.join("subdir")).unwrap();
        fs::write(dir.join("file1.txt"), b"test content 1").unwrap();
        fs::write(dir.join("subdir/file2.txt"), b"test content 2").unwrap();
    }

    #[test]
    fn test_backend_fixed_at_construction() {
        let compressor = SevenZipCompressor::with_config(&native()).unwrap();
        assert_eq!(compressor.backend(), Backend::Native);

        let cli = ArchiveConfig {
            backend: Some(Backend::CommandLine),
            ..ArchiveConfig::default()
        };
        assert_eq!(SevenZipCompressor::with_config(&cli).unwrap().backend(), Backend::CommandLine);
        assert_eq!(SevenZipCompressor::new().unwrap().backend(), Backend::host());
    }

    #[test]
    fn test_compressor_level_from_config() {
        let config = ArchiveConfig {
            compression_level: CompressionLevel::Ultra,
            ..native()
        };
        let mut compressor = SevenZipCompressor::with_config(&config).unwrap();
        assert_eq!(compressor.compression_level(), CompressionLevel::Ultra);

        compressor.set_compression_level(CompressionLevel::Fast);
        assert_eq!(compressor.compression_level(), CompressionLevel::Fast);
    }

    #[test]
    fn test_extract_and_create_7z() {
        let temp_source = TempDir::new().unwrap();
        let temp_extract = TempDir::new().unwrap();
        let temp_output = TempDir::new().unwrap();
        create_test_files(temp_source.path());

        let archive_path = temp_output.path().join("test.7z");
        SevenZipCompressor::with_config(&native())
            .unwrap()
            .compress_files(&archive_path, [temp_source.path().join("file1.txt"), temp_source.path().join("subdir")])
            .unwrap();

        let extractor = SevenZipExtractor::open_with(&archive_path, &native()).unwrap();
        assert_eq!(extractor.backend(), Backend::Native);
        extractor.extract_archive(temp_extract.path()).unwrap();
        extractor.close().unwrap();

        assert!(temp_extract.path().join("file1.txt").exists());
        assert!(temp_extract.path().join("subdir/file2.txt").exists());
    }

    #[test]
    fn test_drop_removes_temporary_copy() {
        let temp = TempDir::new().unwrap();
        create_test_files(temp.path());
        let archive_path = temp.path().join("test.zip");
        SevenZipCompressor::with_config(&native())
            .unwrap()
            .compress_files(&archive_path, [temp.path().join("file1.txt")])
            .unwrap();

        let extractor = SevenZipExtractor::from_bytes_with(&fs::read(&archive_path).unwrap(), &native()).unwrap();
        assert_eq!(extractor.archive_file_names().unwrap(), vec!["file1.txt"]);

        let temp_copy = extractor.archive_path().to_path_buf();
        assert_ne!(temp_copy, archive_path);
        assert!(temp_copy.exists());

        drop(extractor);
        assert!(!temp_copy.exists());
        assert!(archive_path.exists());
    }
}
