// Capability traits shared by both backends, plus helpers for the native format handlers

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::models::{ArchiveEntry, ArchiveError, CompressionLevel};

/// Reading side of an archive backend
///
/// Implementations own the archive file (and its temporary copy, if any) for
/// their whole lifetime. A single instance must not be used from two threads
/// at once; distinct instances share nothing.
pub trait ArchiveExtractor: Send {
    /// Archive file on disk; a temporary copy for in-memory sources
    fn archive_path(&self) -> &Path;

    /// Entries in listing order
    fn entries(&self) -> &[ArchiveEntry];

    /// `Path` of every entry, in listing order
    fn archive_file_names(&self) -> Result<Vec<String>, ArchiveError> {
        self.entries()
            .iter()
            .map(|entry| entry.path().map(str::to_owned))
            .collect()
    }

    /// Extract every entry below `directory`, overwriting existing files
    fn extract_archive(&self, directory: &Path) -> Result<(), ArchiveError>;

    /// Stream one entry into `sink`, returning the number of bytes written
    fn extract_file(&self, name: &str, sink: &mut dyn Write) -> Result<u64, ArchiveError>;

    /// Stream the entry at `index` of [`entries`](Self::entries) into `sink`
    fn extract_file_at(&self, index: usize, sink: &mut dyn Write) -> Result<u64, ArchiveError> {
        let entries = self.entries();
        let entry = entries.get(index).ok_or_else(|| ArchiveError::NoSuchEntry(
            format!("index {} (archive has {} entries)", index, entries.len())
        ))?;
        let name = entry.path()?.to_string();
        self.extract_file(&name, sink)
    }

    /// Give up the archive file, deleting it if it is a temporary copy
    fn release(&mut self) -> Result<(), ArchiveError>;
}

/// Writing side of an archive backend
pub trait ArchiveCompressor: Send {
    fn compression_level(&self) -> CompressionLevel;

    fn set_compression_level(&mut self, level: CompressionLevel);

    /// Add `files` to `archive_name`; directories are added recursively
    fn compress_files(&self, archive_name: &Path, files: &[PathBuf]) -> Result<(), ArchiveError>;
}

/// Trait for the in-process handlers of each archive format
pub trait ArchiveHandler: Send + Sync {
    /// List entries with the same attribute names the archiver uses
    fn list(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError>;

    /// Extract archive to specified directory preserving hierarchy
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<(), ArchiveError>;

    /// Copy one entry's content into `sink`
    fn extract_entry(&self, archive_path: &Path, name: &str, sink: &mut dyn Write) -> Result<u64, ArchiveError>;

    /// Create archive from the given files and directories
    fn create(&self, output_path: &Path, files: &[PathBuf], level: CompressionLevel) -> Result<(), ArchiveError>;

    /// Check if this handler supports the given file
    fn supports(&self, archive_path: &Path) -> bool;
}

/// One file or directory to be written into a new archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    pub source: PathBuf,
    /// Name inside the archive, `/`-separated
    pub name: String,
    pub is_dir: bool,
}

/// Expand the compressor's inputs into archive items
///
/// Files are stored under their base name. Directories are walked and stored
/// relative to their parent, so `photos/` keeps its own name as prefix.
pub fn collect_inputs(files: &[PathBuf]) -> Result<Vec<InputItem>, ArchiveError> {
    let mut items = Vec::new();

    for file in files {
        if file.is_file() {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| ArchiveError::Archive(
                    format!("Invalid input path: {}", file.display())
                ))?;
            items.push(InputItem { source: file.clone(), name, is_dir: false });
        } else if file.is_dir() {
            let base = file.parent().unwrap_or_else(|| Path::new(""));
            for entry in WalkDir::new(file).follow_links(false).sort_by_file_name() {
                let entry = entry.map_err(|e| ArchiveError::Archive(
                    format!("Failed to walk {}: {}", file.display(), e)
                ))?;
                let relative = entry.path().strip_prefix(base)
                    .map_err(|e| ArchiveError::Archive(
                        format!("Failed to calculate relative path: {}", e)
                    ))?;
                items.push(InputItem {
                    source: entry.path().to_path_buf(),
                    name: entry_name(relative),
                    is_dir: entry.file_type().is_dir(),
                });
            }
        } else {
            return Err(ArchiveError::Archive(
                format!("No such file or directory: {}", file.display())
            ));
        }
    }

    Ok(items)
}

/// Archive-internal name for a relative path
pub fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Relative output path for an entry name, or `None` if it would leave the destination
pub fn enclosed_path(name: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => return None,
            part if cfg!(windows) && part.contains(':') => return None,
            part => path.push(part),
        }
    }
    (!path.as_os_str().is_empty()).then_some(path)
}

/// Write one entry below `dest_dir`, replacing any existing file
pub fn unpack_entry<R: Read + ?Sized>(
    dest_dir: &Path,
    relative: &Path,
    is_dir: bool,
    data: &mut R,
) -> io::Result<PathBuf> {
    let output_path = dest_dir.join(relative);
    if is_dir {
        fs::create_dir_all(&output_path)?;
    } else {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        io::copy(data, &mut File::create(&output_path)?)?;
    }
    Ok(output_path)
}

/// Case-insensitive extension check
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Check the file's leading bytes against a signature
pub fn has_signature(path: &Path, signature: &[u8]) -> bool {
    let mut head = vec![0u8; signature.len()];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut head))
        .map(|_| head == signature)
        .unwrap_or(false)
}
