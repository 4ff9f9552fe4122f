//! Positioned byte streams.
//!
//! Container parsing never trusts a pointer it has not checked against the
//! container size, so the reader side records the size once at open and
//! tracks its own cursor instead of asking the underlying stream.

use crate::error::{ArchiveError, Result};
use crate::offset::ArchiveOffset;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// A seekable reader that knows the container size and its own position.
#[derive(Debug)]
pub struct PositionedReader<R> {
    inner: R,
    size: u64,
    position: u64,
}

impl<R: Read + Seek> PositionedReader<R> {
    /// Wrap a reader, measuring its size and rewinding to the start.
    pub fn new(mut inner: R) -> Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            size,
            position: 0,
        })
    }

    /// Container size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current read position.
    pub fn position(&self) -> ArchiveOffset {
        ArchiveOffset::new(self.position)
    }

    /// Seek to an absolute offset. Offsets past the end are rejected.
    pub fn seek_to(&mut self, offset: ArchiveOffset) -> Result<()> {
        if offset.get() > self.size {
            return Err(ArchiveError::pointer_out_of_range(offset.get(), self.size));
        }
        self.inner.seek(SeekFrom::Start(offset.get()))?;
        self.position = offset.get();
        Ok(())
    }

    /// Number of bytes between the cursor and the end of the container.
    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.position)
    }

    fn ensure_available(&self, needed: u64) -> Result<()> {
        if needed > self.remaining() {
            return Err(ArchiveError::truncated(self.position, needed, self.size));
        }
        Ok(())
    }

    /// Read exactly `buf.len()` bytes.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure_available(buf.len() as u64)?;
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            // The stream shrank underneath us.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(ArchiveError::truncated(
                self.position,
                buf.len() as u64,
                self.size,
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a fixed-size record.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Copy `len` bytes from the cursor into `writer` using `buffer`.
    pub fn copy_to<W: Write>(
        &mut self,
        len: u64,
        writer: &mut W,
        buffer: &mut [u8],
    ) -> Result<u64> {
        self.ensure_available(len)?;
        if buffer.is_empty() && len > 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "copy buffer is empty").into());
        }
        let mut left = len;
        while left > 0 {
            let chunk = left.min(buffer.len() as u64) as usize;
            self.read_exact(&mut buffer[..chunk])?;
            writer.write_all(&buffer[..chunk])?;
            left -= chunk as u64;
        }
        Ok(len)
    }

    /// Get a reference to the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the wrapper, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// A writer that counts the bytes written through it.
#[derive(Debug)]
pub struct PositionedWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> PositionedWriter<W> {
    /// Wrap a writer positioned at the start of the container.
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes written so far.
    pub fn position(&self) -> ArchiveOffset {
        ArchiveOffset::new(self.position)
    }

    /// Get a mutable reference to the inner writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the wrapper, returning the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PositionedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
