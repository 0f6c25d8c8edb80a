pub mod compression;
pub mod file_ops;
pub mod listing;
pub mod process;
