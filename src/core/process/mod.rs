// Lifecycle of the external archiver process
pub mod runner;

pub use runner::{ProcessOutput, ProcessRunner, RunningProcess};
