//! Word-position search index
//!
//! A compact on-disk structure that, given a vocabulary of `W` distinct
//! words enumerated `0..W`, records for each word the sorted list of byte
//! offsets in some source corpus where that word occurs.
//!
//! # Library
//!
//! [`Builder`] accepts `(word, position)` pairs in any order (though within
//! a single word, positions must arrive non-decreasing — the natural order
//! of a corpus scan) and produces one index file under bounded memory,
//! regardless of corpus size. [`SliceReader`] opens that file for random
//! access: [`SliceReader::find`] returns a [`Cursor`] that pages through a
//! single word's positions.
//!
//! Positions are stored quantized: every position is shifted right by
//! [`SHIFT`] bits before storage, so two positions within the same
//! `2^SHIFT`-byte bucket are indistinguishable on read. This is a fixed,
//! permanent loss of precision, not a tunable — callers needing exact byte
//! offsets must round-trip through their own finer index.
//!
//! ```no_run
//! use wordpos_index::{Builder, SliceReader};
//!
//! # fn main() -> wordpos_index::Result<()> {
//! let mut builder = Builder::open("corpus.idx", /* words */ 4096, /* capacity */ 1 << 20)?;
//! builder.add(12, 0)?;
//! builder.add(12, 96)?;
//! builder.add(7, 40)?;
//! builder.close()?;
//!
//! let reader = SliceReader::open("corpus.idx")?;
//! let mut cursor = reader.find(12)?;
//! let mut buf = [0u64; 256];
//! while !cursor.done() {
//!     let n = cursor.page(&mut buf)?;
//!     println!("{:?}", &buf[..n]);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Command-line Interface
//!
//! Install via `cargo install wordpos-index`. Disable default features to
//! use only the library:
//!
//! ```toml
//! [dependencies]
//! wordpos-index = { version = "0.1", default-features = false }
//! ```
//!
//! Default features:
//!
//!   * `cli`: dump/stats/batch functionality used by the `wordpos-index`
//!     binary.
//!
//!     Requires: `anyhow`, `indexmap`, `serde`, `toml`
//!
//!   * `bin`: enables compilation of the `wordpos-index` binary.
//!
//!     Requires: `cli`, `clap`, `tracing-subscriber`

#![forbid(unsafe_code)]

/// Command-line interface functionality of the `wordpos-index` binary.
#[cfg(feature = "cli")]
pub mod cli;

mod builder;
mod io;
mod slice_reader;
mod slice_writer;
mod varint;

pub use builder::Builder;
pub use slice_reader::{Cursor, SliceReader, PAGE_SIZE};
pub use slice_writer::SliceWriter;

use std::io as stdio;
use std::result;

use thiserror::Error;

/// Granularity, in bits, that positions are quantized to on write. Fixed,
/// not a tunable — changing it changes the on-disk format.
pub const SHIFT: u32 = 2;

/// Crate-wide result alias.
pub type Result<T> = result::Result<T, Error>;

/// Errors produced by the builder, slice writer, and slice reader.
///
/// Every variant aborts the enclosing operation; none is locally
/// recoverable.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A slice writer received a position whose quantized bucket is below
    /// the last one written for the current word.
    #[error("position out of order within word")]
    OutOfOrder,
    /// A slice writer was closed before exactly `word_count` calls to
    /// `next_word` had elapsed.
    #[error("slice writer closed with words remaining")]
    Incomplete,
    /// A reader asked for a word id outside `0..word_count`.
    #[error("word id out of range")]
    IndexRangeError,
    /// A builder was opened with an in-memory capacity of zero, which can
    /// never hold a single entry.
    #[error("builder capacity must be at least 1")]
    InvalidCapacity,
    /// A slice or index file's directory is not monotonically
    /// non-decreasing, or a varint spans past a word's declared byte range.
    #[error("corrupt index file")]
    Corrupt,
    /// Any underlying I/O failure.
    #[error(transparent)]
    Io(#[from] stdio::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_matches_spec() {
        assert_eq!(SHIFT, 2);
    }
}
