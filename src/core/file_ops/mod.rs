// Archive file ownership on disk
pub mod temp_manager;

pub use temp_manager::ArchiveHandle;
