//! The byte-sink abstraction the slice writer is built on: any [`Write`]
//! wrapped with a running byte count, so `first_byte_offset` entries can be
//! read off as the writer goes rather than seeked back to afterwards.

use std::io::{self, Write};

use byteorder::{WriteBytesExt, LE};

/// Wraps an inner writer, counting every byte that passes through it.
pub(crate) struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// Total bytes written so far through this sink.
    pub(crate) fn bytes_written(&self) -> u64 {
        self.count
    }

    pub(crate) fn write_u32_le(&mut self, value: u32) -> io::Result<()> {
        self.inner.write_u32::<LE>(value)?;
        self.count += 4;
        Ok(())
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
