//! Collaborator traits.
//!
//! The codec itself only ever sees a [`Tree`] and byte streams. Everything
//! that touches a live filesystem sits behind one of these traits so that
//! packing and unpacking can be driven entirely in memory.

use crate::error::Result;
use crate::node::{Node, Timestamps, Tree};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Enumerates directory trees to archive.
pub trait TreeSource {
    /// Build a tree with one top-level node per root path.
    ///
    /// Sibling order must be deterministic; it becomes the order of the
    /// forward-link chain in the container.
    fn enumerate(&mut self, roots: &[PathBuf]) -> Result<Tree>;
}

/// Supplies the bytes of regular files while packing.
pub trait ContentSource {
    /// Reader over one file's content.
    type Reader: Read;

    /// Open the content of a regular file node.
    fn open(&mut self, node: &Node) -> Result<Self::Reader>;
}

/// Destination for re-materialized nodes while unpacking.
pub trait FsSink {
    /// Writer for a newly created file.
    type File: Write;

    /// Create a directory.
    fn create_dir(&mut self, path: &Path, permissions: u32) -> Result<()>;

    /// Create (or truncate) a regular file.
    fn create_file(&mut self, path: &Path, permissions: u32) -> Result<Self::File>;

    /// Create a symbolic link at `path` pointing to `target`.
    fn create_symlink(&mut self, target: &Path, path: &Path) -> Result<()>;

    /// Restore access and modification times.
    fn set_times(&mut self, path: &Path, times: &Timestamps) -> Result<()>;

    /// Restore permission bits.
    fn set_permissions(&mut self, path: &Path, permissions: u32) -> Result<()>;
}

impl<T: ContentSource + ?Sized> ContentSource for &mut T {
    type Reader = T::Reader;

    fn open(&mut self, node: &Node) -> Result<Self::Reader> {
        (**self).open(node)
    }
}

impl<T: TreeSource + ?Sized> TreeSource for &mut T {
    fn enumerate(&mut self, roots: &[PathBuf]) -> Result<Tree> {
        (**self).enumerate(roots)
    }
}

impl<T: FsSink + ?Sized> FsSink for &mut T {
    type File = T::File;

    fn create_dir(&mut self, path: &Path, permissions: u32) -> Result<()> {
        (**self).create_dir(path, permissions)
    }

    fn create_file(&mut self, path: &Path, permissions: u32) -> Result<Self::File> {
        (**self).create_file(path, permissions)
    }

    fn create_symlink(&mut self, target: &Path, path: &Path) -> Result<()> {
        (**self).create_symlink(target, path)
    }

    fn set_times(&mut self, path: &Path, times: &Timestamps) -> Result<()> {
        (**self).set_times(path, times)
    }

    fn set_permissions(&mut self, path: &Path, permissions: u32) -> Result<()> {
        (**self).set_permissions(path, permissions)
    }
}
