//! `wordpos-index` binary.

use std::io::stdout;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use wordpos_index::cli::{dump, load, run, stats};
use Command::{Batch, Dump, Stats};

/// Inspects word-position search index files.
#[derive(Parser)]
#[command(version, author, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dumps every recovered position for one word id.
    Dump {
        /// Path to the index file.
        index: PathBuf,
        /// Word id to dump.
        word: u32,
    },
    /// Prints the word count and per-word match counts.
    Stats {
        /// Path to the index file.
        index: PathBuf,
    },
    /// Runs a batch of dump instructions from a TOML manifest.
    Batch {
        /// TOML manifest file or standard input (-).
        manifest: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Dump { index, word } => dump(&mut stdout(), &index, word),
        Stats { index } => stats(&mut stdout(), &index),
        Batch { manifest } => run(&mut stdout(), &load(&manifest)?),
    }
}
