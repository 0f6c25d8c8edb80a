//! Command-line front end for sevenzip-bridge.
//!
//! Lists, extracts and creates archives through whichever backend the
//! configuration (or the host platform) selects.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;

use sevenzip_bridge::{ArchiveConfig, Backend, CompressionLevel, SevenZipCompressor, SevenZipExtractor};

#[derive(Parser, Debug)]
#[command(name = "sevenzip-bridge")]
#[command(version)]
#[command(about = "List, extract and create archives with 7z or the built-in libraries", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Backend to use: cli or native (default depends on the platform)
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// Archiver executable for the cli backend
    #[arg(long, value_name = "PATH", global = true)]
    binary: Option<PathBuf>,

    /// Kill the archiver after this many seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List entry names
    List {
        archive: PathBuf,
        /// Print every entry attribute as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract the whole archive into a directory
    Extract {
        archive: PathBuf,
        directory: PathBuf,
    },
    /// Write one entry to standard output
    Cat {
        archive: PathBuf,
        /// Entry path inside the archive
        #[arg(required_unless_present = "index")]
        entry: Option<String>,
        /// Entry position in the listing instead of its path
        #[arg(long, conflicts_with = "entry")]
        index: Option<usize>,
    },
    /// Add files and directories to an archive
    Add {
        archive: PathBuf,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// none, fast, low, normal, high or ultra (or 0-9)
        #[arg(long, short = 'l')]
        level: Option<CompressionLevel>,
    },
}

impl Cli {
    fn archive_config(&self) -> Result<ArchiveConfig> {
        let mut config = match &self.config {
            Some(path) => ArchiveConfig::from_file(path)?,
            None => ArchiveConfig::default(),
        };
        if let Some(backend) = self.backend {
            config.backend = Some(backend);
        }
        if let Some(binary) = &self.binary {
            config.binary = binary.clone();
        }
        if self.timeout.is_some() {
            config.timeout_secs = self.timeout;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.archive_config()?;
    debug!("{:?}", config);

    match cli.command {
        Command::List { archive, json } => {
            let extractor = SevenZipExtractor::open_with(&archive, &config)
                .with_context(|| format!("Couldn't list {}", archive.display()))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if json {
                serde_json::to_writer_pretty(&mut out, extractor.entries())?;
                writeln!(out)?;
            } else {
                for name in extractor.archive_file_names()? {
                    writeln!(out, "{}", name)?;
                }
            }
            extractor.close()?;
        }
        Command::Extract { archive, directory } => {
            let extractor = SevenZipExtractor::open_with(&archive, &config)
                .with_context(|| format!("Couldn't open {}", archive.display()))?;
            extractor
                .extract_archive(&directory)
                .with_context(|| format!("Couldn't extract into {}", directory.display()))?;
            extractor.close()?;
        }
        Command::Cat { archive, entry, index } => {
            let extractor = SevenZipExtractor::open_with(&archive, &config)
                .with_context(|| format!("Couldn't open {}", archive.display()))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            match (entry, index) {
                (Some(name), _) => extractor.extract_file(&name, &mut out)?,
                (None, Some(index)) => extractor.extract_file_at(index, &mut out)?,
                (None, None) => bail!("Either an entry path or --index is required"),
            };
            out.flush()?;
            extractor.close()?;
        }
        Command::Add { archive, files, level } => {
            let mut compressor = SevenZipCompressor::with_config(&config)?;
            if let Some(level) = level {
                compressor.set_compression_level(level);
            }
            compressor
                .compress_files(&archive, &files)
                .with_context(|| format!("Couldn't compress into {}", archive.display()))?;
        }
    }

    Ok(())
}
