// Backend driving an external 7z executable

use std::ffi::OsString;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::core::compression::common::{ArchiveCompressor, ArchiveExtractor};
use crate::core::file_ops::ArchiveHandle;
use crate::core::listing::parse_listing;
use crate::core::process::ProcessRunner;
use crate::models::{ArchiveConfig, ArchiveEntry, ArchiveError, CompressionLevel};

/// `l -slt <archive>`: list with technical detail
fn list_args(archive: &Path) -> Vec<OsString> {
    vec!["l".into(), "-slt".into(), archive.into()]
}

/// `x -y -o<dir> <archive>`: extract everything, overwriting
fn extract_all_args(archive: &Path, directory: &Path) -> Vec<OsString> {
    let mut output_dir = OsString::from("-o");
    output_dir.push(directory);
    vec!["x".into(), "-y".into(), output_dir, archive.into()]
}

/// `x -so -spd -- <archive> <entry>`: one entry to standard output
///
/// `-spd` turns off wildcard matching and `--` ends switch parsing, so the
/// entry name is matched literally even if it starts with `-` or holds `*?[`.
fn extract_one_args(archive: &Path, name: &str) -> Vec<OsString> {
    vec![
        "x".into(),
        "-so".into(),
        "-spd".into(),
        "--".into(),
        archive.into(),
        name.into(),
    ]
}

/// `a -mx<N> -y <archive> <files...>`: add at compression level N
fn add_args(archive: &Path, files: &[PathBuf], level: CompressionLevel) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "a".into(),
        format!("-mx{}", level.value()).into(),
        "-y".into(),
        archive.into(),
    ];
    args.extend(files.iter().map(|f| f.as_os_str().to_os_string()));
    args
}

fn runner(config: &ArchiveConfig) -> ProcessRunner {
    ProcessRunner::new(&config.binary).with_timeout(config.timeout())
}

/// Archive reader backed by the 7z command-line tool
///
/// Entries are read once at construction from the technical listing; every
/// extraction is a new archiver invocation.
pub struct CliExtractor {
    runner: ProcessRunner,
    handle: ArchiveHandle,
    entries: Vec<ArchiveEntry>,
    chunk_size: usize,
}

impl CliExtractor {
    /// Open an archive on disk and read its listing
    ///
    /// # Errors
    /// * `Launch` if the archiver cannot be started
    /// * `Backend` if the archiver rejects the file
    /// * `Format` if the listing cannot be parsed
    pub fn open(path: &Path, config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        Self::with_handle(ArchiveHandle::from_path(path)?, config)
    }

    /// Copy an in-memory archive to a temporary file and read its listing
    ///
    /// The temporary file is removed on [`release`](ArchiveExtractor::release),
    /// on drop, or right away if the listing fails.
    pub fn from_bytes(bytes: &[u8], config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        Self::with_handle(ArchiveHandle::from_bytes(bytes)?, config)
    }

    fn with_handle(handle: ArchiveHandle, config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        config.validate()?;
        let runner = runner(config);

        let output = runner.run(list_args(handle.path()))?.check()?;
        let listing = parse_listing(&output.stdout)?;
        info!(
            "Listed {} entries in {}",
            listing.entries.len(),
            handle.path().display()
        );

        Ok(Self {
            runner,
            handle,
            entries: listing.entries,
            chunk_size: config.chunk_size,
        })
    }
}

impl ArchiveExtractor for CliExtractor {
    fn archive_path(&self) -> &Path {
        self.handle.path()
    }

    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Extract every entry; a failure part way leaves whatever the archiver wrote
    fn extract_archive(&self, directory: &Path) -> Result<(), ArchiveError> {
        self.runner
            .run(extract_all_args(self.handle.path(), directory))?
            .check()?;
        Ok(())
    }

    /// Stream one entry from the archiver's standard output into `sink`
    ///
    /// Output is copied in `chunk_size` reads until end of stream; the exit
    /// code is checked afterwards, so bytes already written to `sink` remain
    /// when the archiver reports failure.
    fn extract_file(&self, name: &str, sink: &mut dyn Write) -> Result<u64, ArchiveError> {
        let mut process = self.runner.spawn(extract_one_args(self.handle.path(), name))?;
        let mut buffer = vec![0u8; self.chunk_size];
        let mut written = 0u64;

        if let Some(stdout) = process.stdout() {
            loop {
                let read = match stdout.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(read) => read,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                sink.write_all(&buffer[..read])?;
                written += read as u64;
            }
        }

        process.wait()?.check()?;
        debug!("Extracted {} ({} bytes)", name, written);
        Ok(written)
    }

    fn release(&mut self) -> Result<(), ArchiveError> {
        self.handle.release()
    }
}

/// Archive writer backed by the 7z command-line tool
pub struct CliCompressor {
    runner: ProcessRunner,
    level: CompressionLevel,
}

impl CliCompressor {
    pub fn new(config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        config.validate()?;
        Ok(Self {
            runner: runner(config),
            level: config.compression_level,
        })
    }
}

impl ArchiveCompressor for CliCompressor {
    fn compression_level(&self) -> CompressionLevel {
        self.level
    }

    fn set_compression_level(&mut self, level: CompressionLevel) {
        self.level = level;
    }

    /// Add files to the archive, creating it if needed and overwriting entries of the same name
    fn compress_files(&self, archive_name: &Path, files: &[PathBuf]) -> Result<(), ArchiveError> {
        if files.is_empty() {
            return Err(ArchiveError::InvalidConfig("No files to compress".to_string()));
        }
        self.runner
            .run(add_args(archive_name, files, self.level))?
            .check()?;
        info!("Compressed {} inputs into {}", files.len(), archive_name.display());
        Ok(())
    }
}
