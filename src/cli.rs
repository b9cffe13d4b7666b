use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{SliceReader, PAGE_SIZE};

/// Prints every recovered position for `word` in `path`'s index, one per
/// line.
pub fn dump(out: &mut dyn Write, path: &dyn AsRef<Path>, word: u32) -> Result<()> {
    let path = path.as_ref();
    let reader =
        SliceReader::open(path).with_context(|| format!("Cannot open `{}`", path.display()))?;
    let mut cursor = reader
        .find(word)
        .with_context(|| format!("Word {word} out of range in `{}`", path.display()))?;
    let mut buf = [0u64; PAGE_SIZE];
    while !cursor.done() {
        let filled = cursor
            .page(&mut buf)
            .with_context(|| format!("Cannot read `{}`", path.display()))?;
        for &position in &buf[..filled] {
            writeln!(out, "{position}")?;
        }
    }
    Ok(())
}

/// Prints the word count and, for every word, its match count, for `path`'s
/// index.
pub fn stats(out: &mut dyn Write, path: &dyn AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let reader =
        SliceReader::open(path).with_context(|| format!("Cannot open `{}`", path.display()))?;
    writeln!(out, "words\t{}", reader.word_count())?;
    let mut buf = [0u64; PAGE_SIZE];
    for word in 0..reader.word_count() {
        let mut cursor = reader.find(word)?;
        let mut count = 0u64;
        while !cursor.done() {
            count += cursor.page(&mut buf)? as u64;
        }
        writeln!(out, "{word}\t{count}")?;
    }
    Ok(())
}

/// Loads a TOML [`Manifest`] from file or standard input `"-"`.
pub fn load(input: &dyn AsRef<Path>) -> Result<Manifest> {
    let input = input.as_ref();
    let text = if input == Path::new("-") {
        let mut string = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut string)
            .context("Cannot read standard input")?;
        string
    } else {
        fs::read_to_string(input).with_context(|| format!("Cannot open `{}`", input.display()))?
    };
    toml::from_str(&text).with_context(|| format!("Cannot load `{}`", input.display()))
}

/// Runs every entry of `manifest`, dumping to `out`.
///
///   * `manifest`: label-keyed batch of [`Entry`] instructions, see
///     [`Manifest`].
pub fn run(out: &mut dyn Write, manifest: &Manifest) -> Result<()> {
    for (label, entry) in manifest {
        writeln!(out, "# {label}: {}", entry.index.display())?;
        for &word in &entry.words {
            dump(out, &entry.index, word)?;
        }
    }
    Ok(())
}

/// Batch of dump instructions, keyed by an arbitrary label for readability.
pub type Manifest = IndexMap<String, Entry>;

/// One manifest entry: an index file and the word ids to dump from it.
#[derive(Debug, Eq, PartialEq, Clone, Deserialize)]
pub struct Entry {
    /// Path to the index file.
    pub index: PathBuf,
    /// Word ids to dump.
    pub words: Vec<u32>,
}
