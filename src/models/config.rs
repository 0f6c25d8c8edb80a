use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::ArchiveError;

/// Default read size for streaming a single entry out of the archiver
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default archiver executable, resolved through `PATH`
pub const DEFAULT_BINARY: &str = "7z";

/// Compression effort, passed verbatim to the archiver as `-mx<N>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CompressionLevel {
    None = 0,
    Fast = 1,
    Low = 3,
    #[default]
    Normal = 5,
    High = 7,
    Ultra = 9,
}

impl CompressionLevel {
    pub const ALL: [CompressionLevel; 6] = [
        CompressionLevel::None,
        CompressionLevel::Fast,
        CompressionLevel::Low,
        CompressionLevel::Normal,
        CompressionLevel::High,
        CompressionLevel::Ultra,
    ];

    /// Numeric strength understood by the archiver
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionLevel::None => "none",
            CompressionLevel::Fast => "fast",
            CompressionLevel::Low => "low",
            CompressionLevel::Normal => "normal",
            CompressionLevel::High => "high",
            CompressionLevel::Ultra => "ultra",
        }
    }

    /// Deflate level for zip entries; `None` means store without compression
    pub fn zip_level(self) -> Option<i64> {
        match self {
            CompressionLevel::None => None,
            level => Some(i64::from(level.value())),
        }
    }

    /// LZMA2 preset for 7z archives written in-process; `None` means copy without compression
    pub fn lzma_preset(self) -> Option<u32> {
        match self {
            CompressionLevel::None => None,
            level => Some(u32::from(level.value())),
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for CompressionLevel {
    type Error = ArchiveError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        CompressionLevel::ALL
            .into_iter()
            .find(|level| level.value() == value)
            .ok_or_else(|| ArchiveError::InvalidConfig(format!("Unknown compression level: {}", value)))
    }
}

impl FromStr for CompressionLevel {
    type Err = ArchiveError;

    /// Accepts either the level name (case-insensitive) or its numeral
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<u8>() {
            return CompressionLevel::try_from(value);
        }
        CompressionLevel::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ArchiveError::InvalidConfig(format!("Unknown compression level: {}", s)))
    }
}

/// Archive engine behind the extractor/compressor facades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Backend {
    /// External `7z` process
    CommandLine,
    /// In-process zip/7z libraries
    Native,
}

impl Backend {
    /// Backend used when the configuration does not force one
    pub fn host() -> Self {
        if cfg!(windows) {
            Backend::Native
        } else {
            Backend::CommandLine
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::CommandLine => f.write_str("cli"),
            Backend::Native => f.write_str("native"),
        }
    }
}

impl FromStr for Backend {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" | "commandline" | "command-line" => Ok(Backend::CommandLine),
            "native" => Ok(Backend::Native),
            other => Err(ArchiveError::InvalidConfig(format!("Unknown backend: {}", other))),
        }
    }
}

/// Archive configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveConfig {
    /// Archiver executable for the command-line backend
    pub binary: PathBuf,
    /// Forced backend; the host default is used when unset
    pub backend: Option<Backend>,
    /// Level used by new compressors
    pub compression_level: CompressionLevel,
    /// Read size when streaming a single entry
    pub chunk_size: usize,
    /// Kill the archiver after this many seconds
    pub timeout_secs: Option<u64>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            backend: None,
            compression_level: CompressionLevel::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout_secs: None,
        }
    }
}

impl ArchiveConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ArchiveError> {
        let config: ArchiveConfig = serde_json::from_str(json)
            .map_err(|e| ArchiveError::InvalidConfig(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ArchiveError> {
        let json = fs::read_to_string(path)
            .map_err(|e| ArchiveError::InvalidConfig(
                format!("Failed to read configuration {}: {}", path.display(), e)
            ))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ArchiveError> {
        if self.chunk_size == 0 {
            return Err(ArchiveError::InvalidConfig("chunkSize must be greater than 0".to_string()));
        }
        if self.binary.as_os_str().is_empty() {
            return Err(ArchiveError::InvalidConfig("binary must not be empty".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(ArchiveError::InvalidConfig("timeoutSecs must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Backend to construct: the forced one, or the host default
    pub fn resolve_backend(&self) -> Backend {
        self.backend.unwrap_or_else(Backend::host)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
