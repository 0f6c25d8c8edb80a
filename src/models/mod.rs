pub mod error;
pub mod entry;
pub mod config;

// Re-export commonly used types
pub use error::{ArchiveError, ArchiveResult};
pub use entry::ArchiveEntry;
pub use config::{ArchiveConfig, Backend, CompressionLevel};
