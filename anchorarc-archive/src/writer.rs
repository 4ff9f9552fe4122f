//! Archive writer.
//!
//! Writes a tree whose offsets have been assigned by
//! [`assign_offsets`](crate::layout::assign_offsets). The writer never
//! reorders anything: it checks before each record that its position
//! matches the assigned offset and fails otherwise.

use crate::extract::copy_with_buffer;
use crate::format::{ContainerHeader, DirectoryHeader, EntryHeader, FileHeader};
use anchorarc_core::node::path_to_bytes;
use anchorarc_core::{
    ArchiveError, ArchiveOffset, ContentSource, Node, NodeKind, PositionedWriter, Result, Tree,
};
use std::io::{Read, Write};
use tracing::trace;

/// Default copy buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Container writer.
pub struct ArchiveWriter<W: Write> {
    writer: PositionedWriter<W>,
    buffer_size: usize,
}

fn header_offset(node: &Node) -> Result<ArchiveOffset> {
    node.header_offset
        .ok_or_else(|| ArchiveError::unassigned(&node.access_path))
}

fn content_offset(node: &Node) -> Result<ArchiveOffset> {
    node.content_offset
        .ok_or_else(|| ArchiveError::unassigned(&node.access_path))
}

impl<W: Write> ArchiveWriter<W> {
    /// Create a new writer positioned at the start of the container.
    pub fn new(writer: W) -> Self {
        Self {
            writer: PositionedWriter::new(writer),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the size of the buffer used to copy file content.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Write the container for `tree`, pulling file bytes from `content`.
    ///
    /// Returns the number of bytes written.
    pub fn write_archive<C: ContentSource>(
        &mut self,
        tree: &Tree,
        content: &mut C,
    ) -> Result<u64> {
        self.write_archive_with(tree, content, |_| {})
    }

    /// Like [`write_archive`](Self::write_archive), calling `observer` as
    /// each node's content is written.
    pub fn write_archive_with<C, F>(
        &mut self,
        tree: &Tree,
        content: &mut C,
        mut observer: F,
    ) -> Result<u64>
    where
        C: ContentSource,
        F: FnMut(&Node),
    {
        let first = tree.roots().first().ok_or(ArchiveError::EmptyTree)?;
        let header = ContainerHeader {
            root_offset: header_offset(first)?,
        };
        self.writer.write_all(&header.to_bytes())?;

        self.write_headers(tree.roots())?;

        let mut buffer = vec![0u8; self.buffer_size];
        for (_, node) in tree.walk() {
            observer(node);
            self.write_content(node, content, &mut buffer)?;
        }

        self.writer.flush()?;
        Ok(self.writer.position().get())
    }

    fn expect_position(&self, expected: ArchiveOffset) -> Result<()> {
        let actual = self.writer.position();
        if actual != expected {
            return Err(ArchiveError::LayoutMismatch {
                expected: expected.get(),
                actual: actual.get(),
            });
        }
        Ok(())
    }

    fn write_headers(&mut self, siblings: &[Node]) -> Result<()> {
        for (index, node) in siblings.iter().enumerate() {
            let offset = header_offset(node)?;
            self.expect_position(offset)?;

            let next = siblings.get(index + 1);
            let entry = EntryHeader {
                mode: node.mode(),
                is_last: next.is_none(),
                next_offset: next.map(header_offset).transpose()?.unwrap_or_default(),
                name: node.name_bytes().into_owned(),
                times: node.times,
            };
            trace!(%offset, name = %node.display_name(), "writing entry header");
            self.writer.write_all(&entry.to_bytes()?)?;

            match node.kind {
                NodeKind::Directory => {
                    let children = node.children();
                    let first = children.first();
                    let dir = DirectoryHeader {
                        is_empty: first.is_none(),
                        first_child: first.map(header_offset).transpose()?.unwrap_or_default(),
                    };
                    self.writer.write_all(&dir.to_bytes())?;
                    self.write_headers(children)?;
                }
                NodeKind::Regular | NodeKind::Symlink => {
                    let file = FileHeader {
                        content_offset: content_offset(node)?,
                        size: node.size,
                    };
                    self.writer.write_all(&file.to_bytes())?;
                }
            }
        }
        Ok(())
    }

    fn write_content<C: ContentSource>(
        &mut self,
        node: &Node,
        content: &mut C,
        buffer: &mut [u8],
    ) -> Result<()> {
        match node.kind {
            NodeKind::Directory => Ok(()),
            NodeKind::Regular => {
                self.expect_position(content_offset(node)?)?;
                let mut source = content.open(node)?.take(node.size);
                let copied = copy_with_buffer(&mut source, &mut self.writer, buffer)
                    .map_err(|e| ArchiveError::filesystem("copy", &node.access_path, e))?;
                if copied != node.size {
                    return Err(ArchiveError::ContentSizeMismatch {
                        path: node.access_path.clone(),
                        expected: node.size,
                        actual: copied,
                    });
                }
                Ok(())
            }
            NodeKind::Symlink => {
                self.expect_position(content_offset(node)?)?;
                let target = node
                    .symlink_target
                    .as_deref()
                    .ok_or_else(|| ArchiveError::MissingSymlinkTarget {
                        path: node.access_path.clone(),
                    })?;
                let bytes = path_to_bytes(target);
                let actual = bytes.len() as u64 + 1;
                if actual != node.size {
                    return Err(ArchiveError::ContentSizeMismatch {
                        path: node.access_path.clone(),
                        expected: node.size,
                        actual,
                    });
                }
                self.writer.write_all(&bytes)?;
                self.writer.write_all(&[0])?;
                Ok(())
            }
        }
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.writer.position().get()
    }

    /// Consume the writer and return the inner writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryContentSource;
    use crate::layout::assign_offsets;

    fn build(tree: &mut Tree, content: &mut MemoryContentSource) -> Result<Vec<u8>> {
        assign_offsets(tree)?;
        let mut writer = ArchiveWriter::new(Vec::new()).with_buffer_size(7);
        let written = writer.write_archive(tree, content)?;
        let bytes = writer.into_inner();
        assert_eq!(written, bytes.len() as u64);
        Ok(bytes)
    }

    #[test]
    fn test_write_single_file() {
        let mut tree = Tree::from_roots(vec![Node::file("hello.txt", "hello.txt", 5).unwrap()]);
        let mut content = MemoryContentSource::new();
        content.insert("hello.txt", b"hello".to_vec());

        let bytes = build(&mut tree, &mut content).unwrap();
        assert_eq!(bytes.len(), 40 + 333 + 5);
        assert_eq!(&bytes[32..40], &40u64.to_le_bytes());
        // Last and only entry.
        assert_eq!(bytes[40 + 4], 1);
        assert_eq!(&bytes[373..], b"hello");
    }

    #[test]
    fn test_symlink_content_is_terminated() {
        let mut tree = Tree::from_roots(vec![Node::symlink("l", "l", "target").unwrap()]);
        let bytes = build(&mut tree, &mut MemoryContentSource::new()).unwrap();
        assert_eq!(&bytes[373..], b"target\0");
    }

    #[test]
    fn test_short_source_is_rejected() {
        let mut tree = Tree::from_roots(vec![Node::file("f", "f", 10).unwrap()]);
        let mut content = MemoryContentSource::new();
        content.insert("f", b"short".to_vec());

        assert!(matches!(
            build(&mut tree, &mut content),
            Err(ArchiveError::ContentSizeMismatch {
                expected: 10,
                actual: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_long_source_is_truncated_to_recorded_size() {
        let mut tree = Tree::from_roots(vec![Node::file("f", "f", 3).unwrap()]);
        let mut content = MemoryContentSource::new();
        content.insert("f", b"abcdef".to_vec());

        let bytes = build(&mut tree, &mut content).unwrap();
        assert_eq!(&bytes[373..], b"abc");
    }

    #[test]
    fn test_unassigned_offsets_rejected() {
        let tree = Tree::from_roots(vec![Node::file("f", "f", 0).unwrap()]);
        let mut writer = ArchiveWriter::new(Vec::new());
        assert!(matches!(
            writer.write_archive(&tree, &mut MemoryContentSource::new()),
            Err(ArchiveError::UnassignedOffset { .. })
        ));
    }

    #[test]
    fn test_layout_mismatch_detected() {
        let mut tree = Tree::from_roots(vec![Node::file("f", "f", 0).unwrap()]);
        assign_offsets(&mut tree).unwrap();
        tree.roots_mut()[0].header_offset = Some(ArchiveOffset::new(41));

        let mut writer = ArchiveWriter::new(Vec::new());
        assert!(matches!(
            writer.write_archive(&tree, &mut MemoryContentSource::new()),
            Err(ArchiveError::LayoutMismatch {
                expected: 41,
                actual: 40
            })
        ));
    }

    #[test]
    fn test_directory_links() {
        let dir = Node::directory("d", "d")
            .unwrap()
            .with_children([
                Node::file("a", "d/a", 0).unwrap(),
                Node::file("b", "d/b", 0).unwrap(),
            ])
            .unwrap();
        let mut tree = Tree::from_roots(vec![dir, Node::directory("e", "e").unwrap()]);
        let mut content = MemoryContentSource::new();
        content.insert("d/a", Vec::new());
        content.insert("d/b", Vec::new());
        let bytes = build(&mut tree, &mut content).unwrap();

        // d: not last, next -> e at 40 + 326 + 333 + 333
        assert_eq!(bytes[44], 0);
        assert_eq!(&bytes[45..53], &1032u64.to_le_bytes());
        // d's directory header: not empty, first child at 366
        assert_eq!(bytes[357], 0);
        assert_eq!(&bytes[358..366], &366u64.to_le_bytes());
        // e: last, empty
        assert_eq!(bytes[1032 + 4], 1);
        assert_eq!(bytes[1032 + 317], 1);
        assert_eq!(&bytes[1032 + 318..1032 + 326], &[0u8; 8]);
    }
}
