use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::TempPath;

use crate::models::ArchiveError;

/// Ownership record for the archive file a reader works on
///
/// A handle built from an in-memory buffer owns a temporary copy on disk and
/// deletes it exactly once: on [`release`](Self::release) or, failing that,
/// when dropped. A handle built from a path never touches the file.
#[derive(Debug)]
pub struct ArchiveHandle {
    path: PathBuf,
    temporary: bool,
    temp_path: Option<TempPath>,
}

impl ArchiveHandle {
    /// Refer to an existing archive on disk
    ///
    /// Relative paths are resolved against the current directory so the
    /// archiver sees the same file regardless of its own working directory.
    pub fn from_path(path: &Path) -> Result<Self, ArchiveError> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir()?.join(path)
        };

        Ok(Self {
            path,
            temporary: false,
            temp_path: None,
        })
    }

    /// Materialize an in-memory archive into a temporary file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let mut file = tempfile::Builder::new()
            .prefix("sevenzip_bridge_")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let temp_path = file.into_temp_path();
        debug!("Wrote {} byte archive to {}", bytes.len(), temp_path.display());

        Ok(Self {
            path: temp_path.to_path_buf(),
            temporary: true,
            temp_path: Some(temp_path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle created the file and is responsible for deleting it
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Delete the temporary copy now, reporting failure
    ///
    /// Does nothing for handles built from a path, or when already released.
    pub fn release(&mut self) -> Result<(), ArchiveError> {
        if let Some(temp_path) = self.temp_path.take() {
            debug!("Removing temporary archive {}", self.path.display());
            temp_path.close()?;
        }
        Ok(())
    }
}
