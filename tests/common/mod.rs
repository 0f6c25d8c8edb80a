#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tempfile::TempDir;

use sevenzip_bridge::{ArchiveConfig, Backend};

const FAKE_ARCHIVER: &str = include_str!("../fixtures/fake-7z.sh");

/// Path of the tar-backed 7z stand-in, written once per test binary
///
/// Written before any test spawns a process, so no forked child can still
/// hold the script open for writing when it is executed.
pub fn fake_archiver() -> &'static Path {
    static SCRIPT: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
    let (_, path) = SCRIPT.get_or_init(|| {
        let dir = tempfile::Builder::new()
            .prefix("fake7z_")
            .tempdir()
            .expect("Couldn't create archiver directory");
        let path = dir.path().join("7z");
        fs::write(&path, FAKE_ARCHIVER).expect("Couldn't write archiver script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Couldn't make archiver script executable");
        (dir, path)
    });
    path
}

/// Command-line backend pointed at the stand-in archiver
pub fn cli_config() -> ArchiveConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    ArchiveConfig {
        binary: fake_archiver().to_path_buf(),
        backend: Some(Backend::CommandLine),
        ..ArchiveConfig::default()
    }
}

pub fn native_config() -> ArchiveConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    ArchiveConfig {
        backend: Some(Backend::Native),
        ..ArchiveConfig::default()
    }
}

/// Deterministic bytes that are not trivially compressible
pub fn pseudo_random(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Write named files into `dir`, returning their full paths in order
pub fn write_files(dir: &Path, files: &[(&str, &[u8])]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(name, content)| {
            let path = dir.join(name);
            fs::write(&path, content).unwrap();
            path
        })
        .collect()
}
