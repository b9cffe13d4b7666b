//! Opens a slice/index file and hands out per-word cursors that page
//! through decoded absolute positions.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{ReadBytesExt, LE};

use crate::varint;
use crate::{Error, Result, SHIFT};

/// Fixed page size a merger should request per [`Cursor::page`] call; not
/// enforced here, callers are free to ask for any size until `done()`.
pub const PAGE_SIZE: usize = 256;

/// A slice or index file opened for random access by word id.
pub struct SliceReader {
    path: PathBuf,
    /// `first_byte_offset[0..word_count]` plus a synthesized
    /// `first_byte_offset[word_count]` pointing at the directory's own start.
    first_byte_offset: Vec<u32>,
    word_count: u32,
}

impl SliceReader {
    /// Opens `path`, reading the trailer and directory.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let len = file.metadata()?.len();
        if len < 4 {
            return Err(Error::Corrupt);
        }
        file.seek(SeekFrom::End(-4))?;
        let word_count = file.read_u32::<LE>()?;

        let directory_len = 4u64 * (u64::from(word_count) + 1);
        if len < directory_len {
            return Err(Error::Corrupt);
        }
        let directory_start = len - directory_len;
        file.seek(SeekFrom::Start(directory_start))?;

        let mut first_byte_offset = Vec::with_capacity(word_count as usize + 1);
        for _ in 0..word_count {
            first_byte_offset.push(file.read_u32::<LE>()?);
        }
        // the directory's own start doubles as the implicit end-of-stream
        // offset for the last word; it is representable only up to u32::MAX,
        // the same cap the writer's directory entries carry.
        let directory_start_u32 = u32::try_from(directory_start).map_err(|_| Error::Corrupt)?;
        first_byte_offset.push(directory_start_u32);

        for pair in first_byte_offset.windows(2) {
            if pair[0] > pair[1] {
                return Err(Error::Corrupt);
            }
        }

        Ok(Self { path, first_byte_offset, word_count })
    }

    /// The `W` this file was built with.
    pub fn word_count(&self) -> u32 {
        self.word_count
    }

    /// Returns a cursor over `word`'s matches. An empty range is a
    /// legitimate value, not a distinct "no matches" type.
    pub fn find(&self, word: u32) -> Result<Cursor> {
        if word >= self.word_count {
            return Err(Error::IndexRangeError);
        }
        let start = u64::from(self.first_byte_offset[word as usize]);
        let end = u64::from(self.first_byte_offset[word as usize + 1]);
        Cursor::open(&self.path, start, end)
    }
}

/// Pages through one word's decoded absolute positions.
pub struct Cursor {
    reader: BufReader<File>,
    pos: u64,
    end: u64,
    last_value: u64,
}

impl Cursor {
    fn open(path: &Path, start: u64, end: u64) -> Result<Self> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(start))?;
        Ok(Self { reader: BufReader::new(file), pos: start, end, last_value: 0 })
    }

    /// Whether this cursor's byte position has reached the range end.
    pub fn done(&self) -> bool {
        self.pos >= self.end
    }

    /// Decodes up to `buf.len()` additional positions, returning how many
    /// were produced. May be called with a page of any size until `done()`.
    pub fn page(&mut self, buf: &mut [u64]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() && !self.done() {
            let delta = varint::decode_bounded(&mut self.reader, &mut self.pos, self.end)?;
            self.last_value += delta;
            buf[filled] = self.last_value << SHIFT;
            filled += 1;
        }
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice_writer::SliceWriter;
    use std::io::Write as _;

    fn build(path: &Path, word_count: u32, words: &[&[u64]]) {
        let file = File::create(path).unwrap();
        let mut writer = SliceWriter::open(file, word_count).unwrap();
        for positions in words {
            for &position in *positions {
                writer.write_position(position).unwrap();
            }
            writer.next_word().unwrap();
        }
        writer.close().unwrap().flush().unwrap();
    }

    #[test]
    fn s1_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.idx");
        build(&path, 1, &[&[4, 5]]);
        let reader = SliceReader::open(&path).unwrap();
        let mut cursor = reader.find(0).unwrap();
        let mut buf = [0u64; 8];
        let n = cursor.page(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[4]);
        assert!(cursor.done());
    }

    #[test]
    fn s2_empty_word_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.idx");
        build(&path, 2, &[&[], &[8]]);
        let reader = SliceReader::open(&path).unwrap();
        let mut empty = reader.find(0).unwrap();
        assert!(empty.done());
        let mut buf = [0u64; 8];
        assert_eq!(empty.page(&mut buf).unwrap(), 0);

        let mut cursor = reader.find(1).unwrap();
        let n = cursor.page(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[8]);
    }

    #[test]
    fn out_of_range_word_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.idx");
        build(&path, 1, &[&[4]]);
        let reader = SliceReader::open(&path).unwrap();
        assert!(matches!(reader.find(1), Err(Error::IndexRangeError)));
    }

    #[test]
    fn page_can_be_called_with_arbitrary_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.idx");
        let positions: Vec<u64> = (0..50).map(|i| i * 4).collect();
        build(&path, 1, &[&positions]);
        let reader = SliceReader::open(&path).unwrap();
        let mut cursor = reader.find(0).unwrap();
        let mut collected = Vec::new();
        let mut buf = [0u64; 7];
        while !cursor.done() {
            let n = cursor.page(&mut buf).unwrap();
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, positions);
    }
}
