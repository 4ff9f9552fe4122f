//! Re-materializing a tree through a filesystem sink.

use crate::extract::check_content_range;
use crate::reader::ArchiveReader;
use anchorarc_core::{FsSink, Node, NodeKind, Result, Tree};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Owner bits added while a directory is being populated.
const DIR_WORK_BITS: u32 = 0o700;

/// Counts of what an unpack produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Directories created (or reused).
    pub directories: u64,
    /// Regular files written.
    pub files: u64,
    /// Symlinks created.
    pub symlinks: u64,
    /// File content bytes written.
    pub bytes: u64,
}

impl UnpackSummary {
    /// Total number of nodes processed.
    pub fn entries(&self) -> u64 {
        self.directories + self.files + self.symlinks
    }
}

/// Writes the nodes of a tree below an output directory.
pub struct Unpacker<S: FsSink> {
    sink: S,
    output: PathBuf,
}

impl<S: FsSink> Unpacker<S> {
    /// Create an unpacker writing below `output` through `sink`.
    pub fn new(sink: S, output: impl Into<PathBuf>) -> Self {
        Self {
            sink,
            output: output.into(),
        }
    }

    /// Unpack every node of `tree`, reading content from `reader`.
    pub fn unpack<R: Read + Seek>(
        &mut self,
        reader: &mut ArchiveReader<R>,
        tree: &Tree,
    ) -> Result<UnpackSummary> {
        self.unpack_with(reader, tree, |_| {})
    }

    /// Like [`unpack`](Self::unpack), calling `observer` before each node.
    pub fn unpack_with<R, F>(
        &mut self,
        reader: &mut ArchiveReader<R>,
        tree: &Tree,
        mut observer: F,
    ) -> Result<UnpackSummary>
    where
        R: Read + Seek,
        F: FnMut(&Node),
    {
        let mut summary = UnpackSummary::default();
        for node in tree.roots() {
            self.unpack_node(reader, node, &mut observer, &mut summary)?;
        }
        Ok(summary)
    }

    fn unpack_node<R, F>(
        &mut self,
        reader: &mut ArchiveReader<R>,
        node: &Node,
        observer: &mut F,
        summary: &mut UnpackSummary,
    ) -> Result<()>
    where
        R: Read + Seek,
        F: FnMut(&Node),
    {
        observer(node);
        let path = self.output.join(&node.access_path);
        info!("extracting {}", node.access_path.display());

        match node.kind {
            NodeKind::Directory => {
                self.make_dir(&path, node.permissions | DIR_WORK_BITS)?;
                for child in node.children() {
                    self.unpack_node(reader, child, observer, summary)?;
                }
                // Children are done; restoring now keeps their creation from touching the times.
                self.sink.set_permissions(&path, node.permissions)?;
                self.sink.set_times(&path, &node.times)?;
                summary.directories += 1;
            }
            NodeKind::Regular => {
                check_content_range(node, reader.container_size())?;
                let mut file = self.sink.create_file(&path, node.permissions)?;
                let written = reader.extract(node, &mut file)?;
                file.flush()?;
                drop(file);
                self.sink.set_permissions(&path, node.permissions)?;
                self.sink.set_times(&path, &node.times)?;
                summary.files += 1;
                summary.bytes += written;
            }
            NodeKind::Symlink => {
                let target = reader.symlink_target(node)?;
                debug!(target = %target.display(), "creating symlink");
                self.sink.create_symlink(&target, &path)?;
                summary.symlinks += 1;
            }
        }
        Ok(())
    }

    fn make_dir(&mut self, path: &Path, permissions: u32) -> Result<()> {
        match self.sink.create_dir(path, permissions) {
            Err(e) if e.is_already_exists() => {
                debug!(path = %path.display(), "directory already exists");
                Ok(())
            }
            other => other,
        }
    }

    /// Get a reference to the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the unpacker, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
