//! Archive reader.
//!
//! Rebuilds a [`Tree`] from an untrusted container. Only headers are read;
//! content ranges are recorded and checked lazily when extracted.
//!
//! Every pointer is checked before it is followed: it must lie inside the
//! container and must not point before the current read position. Since the
//! cursor only ever moves forward, the chain of followed pointers is strictly
//! increasing and a malformed container cannot make the reader loop.

use crate::format::{ContainerHeader, DirectoryHeader, EntryHeader, FileHeader};
use crate::writer::DEFAULT_BUFFER_SIZE;
use anchorarc_core::node::os_string_from_bytes;
use anchorarc_core::{
    ArchiveError, ArchiveOffset, Node, NodeKind, PositionedReader, Result, Tree,
};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default limit on directory nesting.
pub const DEFAULT_MAX_DEPTH: usize = 4096;

/// Options controlling how a container is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Deepest accepted directory nesting; top-level nodes are at depth 0.
    pub max_depth: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ReadOptions {
    /// Builder method to set the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Container reader.
pub struct ArchiveReader<R: Read + Seek> {
    stream: PositionedReader<R>,
    options: ReadOptions,
    buffer_size: usize,
}

/// One sibling sequence being collected.
struct Level {
    /// Directory owning the sequence; `None` for the top level.
    dir: Option<Node>,
    siblings: Vec<Node>,
    next: Option<ArchiveOffset>,
}

/// A decoded node plus the links leaving it.
struct ParsedNode {
    node: Node,
    next: Option<ArchiveOffset>,
    first_child: Option<ArchiveOffset>,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Open a container.
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            stream: PositionedReader::new(reader)?,
            options: ReadOptions::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        })
    }

    /// Builder method to set read options.
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the size of the buffer used to copy file content.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Container size in bytes, measured when the reader was opened.
    pub fn container_size(&self) -> u64 {
        self.stream.size()
    }

    pub(crate) fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub(crate) fn stream_mut(&mut self) -> &mut PositionedReader<R> {
        &mut self.stream
    }

    /// Parse the container header and every entry header.
    pub fn read_tree(&mut self) -> Result<Tree> {
        self.stream.seek_to(ArchiveOffset::ZERO)?;
        let header = ContainerHeader::from_bytes(&self.stream.read_array()?)?;
        debug!(
            root = %header.root_offset,
            size = self.stream.size(),
            "reading archive"
        );

        let mut levels = vec![Level {
            dir: None,
            siblings: Vec::new(),
            next: Some(header.root_offset),
        }];

        loop {
            let depth = levels.len().saturating_sub(1);
            let Some(level) = levels.last_mut() else {
                return Ok(Tree::new());
            };

            if let Some(offset) = level.next.take() {
                let parent = level.dir.as_ref().map(|dir| dir.access_path.as_path());
                let parsed = self.read_node(offset, parent)?;
                level.next = parsed.next;

                match parsed.first_child {
                    Some(first_child) => {
                        let child_depth = depth + 1;
                        if child_depth > self.options.max_depth {
                            return Err(ArchiveError::TooDeep {
                                depth: child_depth,
                                limit: self.options.max_depth,
                            });
                        }
                        levels.push(Level {
                            dir: Some(parsed.node),
                            siblings: Vec::new(),
                            next: Some(first_child),
                        });
                    }
                    None => level.siblings.push(parsed.node),
                }
                continue;
            }

            // Sibling sequence complete: attach it to its directory.
            let Some(done) = levels.pop() else {
                return Ok(Tree::new());
            };
            match (done.dir, levels.last_mut()) {
                (Some(mut dir), Some(parent)) => {
                    dir.children = Some(done.siblings);
                    parent.siblings.push(dir);
                }
                _ => return Ok(Tree::from_roots(done.siblings)),
            }
        }
    }

    /// Check a pointer and move the cursor to it.
    fn follow(&mut self, offset: ArchiveOffset) -> Result<()> {
        let size = self.stream.size();
        if offset.get() >= size {
            return Err(ArchiveError::pointer_out_of_range(offset.get(), size));
        }
        let cursor = self.stream.position();
        if offset < cursor {
            return Err(ArchiveError::backward_pointer(offset.get(), cursor.get()));
        }
        self.stream.seek_to(offset)
    }

    fn read_node(&mut self, offset: ArchiveOffset, parent: Option<&Path>) -> Result<ParsedNode> {
        self.follow(offset)?;
        let entry = EntryHeader::from_bytes(&self.stream.read_array()?)?;
        let kind = NodeKind::from_mode(entry.mode)?;
        let name = os_string_from_bytes(&entry.name);
        let access_path = match parent {
            Some(parent) => parent.join(&name),
            None => PathBuf::from(&name),
        };

        let (size, content_offset, first_child) = match kind {
            NodeKind::Directory => {
                let dir = DirectoryHeader::from_bytes(&self.stream.read_array()?);
                (0, None, (!dir.is_empty).then_some(dir.first_child))
            }
            NodeKind::Regular | NodeKind::Symlink => {
                let file = FileHeader::from_bytes(&self.stream.read_array()?);
                (file.size, Some(file.content_offset), None)
            }
        };

        trace!(%offset, path = %access_path.display(), size, "read entry");

        let mut node = Node::from_mode(name, access_path, entry.mode, size)?
            .with_times(entry.times);
        node.header_offset = Some(offset);
        node.content_offset = content_offset;

        Ok(ParsedNode {
            node,
            next: (!entry.is_last).then_some(entry.next_offset),
            first_child,
        })
    }

    /// Consume the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }
}
