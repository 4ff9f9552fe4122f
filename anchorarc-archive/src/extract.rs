//! Content extraction.
//!
//! Content ranges are recorded by the reader but never trusted: every range
//! is checked against the container size right before it is read.

use crate::reader::ArchiveReader;
use anchorarc_core::node::path_from_bytes;
use anchorarc_core::{ArchiveError, ArchiveOffset, Node, NodeKind, Result};
use std::io::{self, Read, Seek, Write};
use std::path::PathBuf;

/// Check that a node's content range lies inside a container of `container_size` bytes.
///
/// Only the end of the range is checked, so an empty file whose content
/// offset equals the container size is accepted.
pub fn check_content_range(node: &Node, container_size: u64) -> Result<ArchiveOffset> {
    let offset = node
        .content_offset
        .ok_or_else(|| ArchiveError::unassigned(&node.access_path))?;
    let end = offset.checked_add(node.size)?;
    if end.get() > container_size {
        return Err(ArchiveError::ContentOutOfRange {
            offset: offset.get(),
            len: node.size,
            size: container_size,
        });
    }
    Ok(offset)
}

/// Copy everything from `reader` to `writer` through `buffer`.
pub fn copy_with_buffer<R, W>(reader: &mut R, writer: &mut W, buffer: &mut [u8]) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if buffer.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "copy buffer is empty"));
    }
    let mut copied = 0u64;
    loop {
        let n = match reader.read(buffer) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        copied += n as u64;
    }
}

/// Decode a stored symlink target: the last byte must be the terminator.
pub fn decode_symlink_target(bytes: &[u8], offset: ArchiveOffset) -> Result<PathBuf> {
    let Some((&0, target)) = bytes.split_last() else {
        return Err(ArchiveError::UnterminatedSymlink {
            offset: offset.get(),
            target: String::from_utf8_lossy(bytes).into_owned(),
        });
    };
    if target.contains(&0) {
        return Err(ArchiveError::InvalidSymlinkTarget {
            offset: offset.get(),
            target: String::from_utf8_lossy(target).into_owned(),
        });
    }
    Ok(path_from_bytes(target))
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Stream a regular file's content into `writer`.
    pub fn extract<W: Write>(&mut self, node: &Node, writer: &mut W) -> Result<u64> {
        if node.kind != NodeKind::Regular {
            return Err(ArchiveError::invalid_mode(node.mode()));
        }
        let offset = check_content_range(node, self.container_size())?;
        let mut buffer = vec![0u8; self.buffer_size()];
        let stream = self.stream_mut();
        stream.seek_to(offset)?;
        stream.copy_to(node.size, writer, &mut buffer)
    }

    /// Read and validate a symlink's target.
    pub fn symlink_target(&mut self, node: &Node) -> Result<PathBuf> {
        if node.kind != NodeKind::Symlink {
            return Err(ArchiveError::invalid_mode(node.mode()));
        }
        let offset = check_content_range(node, self.container_size())?;
        let len = usize::try_from(node.size)
            .map_err(|_| ArchiveError::Allocation { size: node.size })?;

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| ArchiveError::Allocation { size: node.size })?;
        bytes.resize(len, 0);

        let stream = self.stream_mut();
        stream.seek_to(offset)?;
        stream.read_exact(&mut bytes)?;
        decode_symlink_target(&bytes, offset)
    }
}
