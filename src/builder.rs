//! The outer external-memory pipeline: buffers `(word, position)` pairs in
//! a fixed-capacity in-memory arena, flushes full buffers to slice files,
//! and merges every slice into the final index on close.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::slice_reader::{SliceReader, PAGE_SIZE};
use crate::slice_writer::SliceWriter;
use crate::{Error, Result};

const WRITER_BUFFER_SIZE: usize = 4096;

/// Builds a word-position index from `(word, position)` pairs delivered in
/// corpus order, using bounded memory regardless of corpus size.
///
/// The in-memory buffer is an intrusive per-word singly-linked list over a
/// shared arena: `match_positions`/`next` form the arena, `first`/`last`
/// are per-word head/tail indices into it. This keeps insertion O(1) with
/// no per-word allocation and dense memory for the flush traversal.
pub struct Builder {
    output_path: PathBuf,
    working_dir: PathBuf,
    word_count: u32,
    capacity: usize,
    match_positions: Vec<u64>,
    next: Vec<Option<usize>>,
    first: Vec<Option<usize>>,
    last: Vec<Option<usize>>,
    count: usize,
    block_count: u32,
    word_total: u64,
    non_dup_total: u64,
}

impl Builder {
    /// Opens a builder for `word_count` words with an in-memory capacity of
    /// `capacity` entries, creating the sibling working directory
    /// `<output_path>.Working/`.
    ///
    /// Fails with [`Error::InvalidCapacity`] if `capacity` is 0: a
    /// zero-length arena could never hold the first `add`ed entry, so
    /// rejecting it here turns a spec-legal but useless caller
    /// configuration into a `Result` error instead of an out-of-bounds
    /// panic on the first call to [`add`](Self::add).
    pub fn open(output_path: impl Into<PathBuf>, word_count: u32, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        let output_path = output_path.into();
        let working_dir = working_dir_for(&output_path);
        fs::create_dir_all(&working_dir)?;
        Ok(Self {
            output_path,
            working_dir,
            word_count,
            capacity,
            match_positions: vec![0; capacity],
            next: vec![None; capacity],
            first: vec![None; word_count as usize],
            last: vec![None; word_count as usize],
            count: 0,
            block_count: 0,
            word_total: 0,
            non_dup_total: 0,
        })
    }

    /// Number of `add` calls made so far.
    pub fn word_total(&self) -> u64 {
        self.word_total
    }

    /// `word_total` minus the calls suppressed by the exact-duplicate check.
    pub fn non_dup_total(&self) -> u64 {
        self.non_dup_total
    }

    /// Appends `position` to `word`'s in-memory chain, flushing a slice if
    /// the arena fills.
    pub fn add(&mut self, word: u32, position: u64) -> Result<()> {
        if word >= self.word_count {
            return Err(Error::IndexRangeError);
        }
        self.word_total += 1;
        let word = word as usize;

        if let Some(last_idx) = self.last[word] {
            if self.match_positions[last_idx] == position {
                // exact duplicate, suppressed before the shift even runs
                return Ok(());
            }
        }

        let entry = self.count;
        self.match_positions[entry] = position;
        self.next[entry] = None;
        match self.last[word] {
            Some(last_idx) => self.next[last_idx] = Some(entry),
            None => self.first[word] = Some(entry),
        }
        self.last[word] = Some(entry);

        self.count += 1;
        self.non_dup_total += 1;
        if self.count == self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Flushes the full buffer to `<block_count>.idx`, then resets it.
    #[tracing::instrument(level = "debug", skip(self))]
    fn flush(&mut self) -> Result<()> {
        let slice_path = self.working_dir.join(format!("{}.idx", self.block_count));
        let sink = BufWriter::with_capacity(WRITER_BUFFER_SIZE, File::create(&slice_path)?);
        let mut writer = SliceWriter::open(sink, self.word_count)?;
        for word in 0..self.word_count as usize {
            let mut entry = self.first[word];
            while let Some(idx) = entry {
                writer.write_position(self.match_positions[idx])?;
                entry = self.next[idx];
            }
            writer.next_word()?;
        }
        writer.close()?;

        tracing::debug!(block = self.block_count, entries = self.count, "flushed slice");
        self.block_count += 1;
        self.count = 0;
        self.first.iter_mut().for_each(|slot| *slot = None);
        self.last.iter_mut().for_each(|slot| *slot = None);
        Ok(())
    }

    /// Flushes any remainder, merges every slice into the final index, and
    /// removes the working directory.
    ///
    /// On failure the working directory is left in place for post-mortem
    /// inspection rather than deleted.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn close(mut self) -> Result<()> {
        if self.count > 0 {
            self.flush()?;
        }
        match self.block_count {
            0 => self.write_empty_index()?,
            1 => self.rename_sole_slice()?,
            _ => self.merge()?,
        }
        fs::remove_dir_all(&self.working_dir)?;
        Ok(())
    }

    /// No data was ever added: write a valid, all-empty index directly.
    fn write_empty_index(&self) -> Result<()> {
        let sink = BufWriter::with_capacity(WRITER_BUFFER_SIZE, File::create(&self.output_path)?);
        let mut writer = SliceWriter::open(sink, self.word_count)?;
        for _ in 0..self.word_count {
            writer.next_word()?;
        }
        writer.close()?;
        Ok(())
    }

    /// Single-slice fast path: rename instead of re-encoding.
    fn rename_sole_slice(&self) -> Result<()> {
        let sole = self.working_dir.join("0.idx");
        fs::rename(&sole, &self.output_path)?;
        Ok(())
    }

    /// K-way merge: for every word, append each slice's cursor output in
    /// slice-creation order. Because slices are flushed in corpus order,
    /// that concatenation is already globally ascending per word — no
    /// priority queue is needed.
    #[tracing::instrument(level = "debug", skip(self))]
    fn merge(&self) -> Result<()> {
        let mut readers = Vec::with_capacity(self.block_count as usize);
        for block in 0..self.block_count {
            let path = self.working_dir.join(format!("{block}.idx"));
            readers.push(SliceReader::open(path)?);
        }

        let sink = BufWriter::with_capacity(WRITER_BUFFER_SIZE, File::create(&self.output_path)?);
        let mut writer = SliceWriter::open(sink, self.word_count)?;
        let mut buf = [0u64; PAGE_SIZE];

        for word in 0..self.word_count {
            for reader in &readers {
                let mut cursor = reader.find(word)?;
                while !cursor.done() {
                    let filled = cursor.page(&mut buf)?;
                    for &position in &buf[..filled] {
                        writer.write_position(position)?;
                    }
                }
            }
            writer.next_word()?;
        }
        writer.close()?;
        tracing::debug!(slices = self.block_count, "merged slices into index");
        Ok(())
    }
}

fn working_dir_for(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_owned();
    name.push(".Working");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice_reader::SliceReader;

    fn read_all(reader: &SliceReader, word: u32) -> Vec<u64> {
        let mut cursor = reader.find(word).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u64; 64];
        while !cursor.done() {
            let n = cursor.page(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn s3_multi_slice_merge() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.idx");
        let mut builder = Builder::open(&output, 1, 2).unwrap();
        builder.add(0, 4).unwrap();
        builder.add(0, 8).unwrap(); // fills capacity 2, flushes slice 0
        builder.add(0, 12).unwrap(); // stays in buffer
        builder.close().unwrap();

        let reader = SliceReader::open(&output).unwrap();
        assert_eq!(read_all(&reader, 0), vec![4, 8, 12]);
        assert!(!dir.path().join("out.idx.Working").exists());
    }

    #[test]
    fn s4_duplicate_across_slice_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.idx");
        let mut builder = Builder::open(&output, 1, 2).unwrap();
        builder.add(0, 4).unwrap();
        builder.add(0, 8).unwrap();
        builder.add(0, 8).unwrap(); // exact duplicate, suppressed pre-shift
        assert_eq!(builder.non_dup_total(), 2);
        builder.close().unwrap();

        let reader = SliceReader::open(&output).unwrap();
        assert_eq!(read_all(&reader, 0), vec![4, 8]);
    }

    #[test]
    fn s6_single_slice_fast_path_matches_direct_write() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.idx");
        let mut builder = Builder::open(&output, 3, 1024).unwrap();
        builder.add(0, 4).unwrap();
        builder.add(1, 8).unwrap();
        builder.add(2, 16).unwrap();
        builder.close().unwrap();
        let merged = fs::read(&output).unwrap();

        let direct = {
            use crate::slice_writer::SliceWriter;
            let mut writer = SliceWriter::open(Vec::new(), 3).unwrap();
            writer.write_position(4).unwrap();
            writer.next_word().unwrap();
            writer.write_position(8).unwrap();
            writer.next_word().unwrap();
            writer.write_position(16).unwrap();
            writer.next_word().unwrap();
            writer.close().unwrap()
        };
        assert_eq!(merged, direct);
    }

    #[test]
    fn empty_builder_produces_valid_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.idx");
        let builder = Builder::open(&output, 4, 16).unwrap();
        builder.close().unwrap();

        let reader = SliceReader::open(&output).unwrap();
        assert_eq!(reader.word_count(), 4);
        for word in 0..4 {
            assert!(read_all(&reader, word).is_empty());
        }
    }

    #[test]
    fn zero_capacity_is_rejected_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.idx");
        let err = Builder::open(&output, 2, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidCapacity));
        assert!(!dir.path().join("out.idx.Working").exists());
    }

    #[test]
    fn add_out_of_range_word_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.idx");
        let mut builder = Builder::open(&output, 2, 16).unwrap();
        let err = builder.add(2, 0).unwrap_err();
        assert!(matches!(err, Error::IndexRangeError));
    }

    #[test]
    fn varying_capacity_yields_byte_identical_output() {
        let input: Vec<(u32, u64)> =
            (0..500u32).map(|i| (i % 7, u64::from(i) * 4)).collect();

        let mut outputs = Vec::new();
        for capacity in [4usize, 17, 500, 10_000] {
            let dir = tempfile::tempdir().unwrap();
            let output = dir.path().join("out.idx");
            let mut builder = Builder::open(&output, 7, capacity).unwrap();
            for &(word, position) in &input {
                builder.add(word, position).unwrap();
            }
            builder.close().unwrap();
            outputs.push(fs::read(&output).unwrap());
        }
        for pair in outputs.windows(2) {
            assert_eq!(pair[0], pair[1], "buffer capacity must not affect output bytes");
        }
    }
}
