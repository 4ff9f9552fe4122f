//! In-memory directory tree.
//!
//! A [`Tree`] is the owned form of a filesystem subtree. The filesystem tree
//! source builds one while packing, and the archive reader builds one while
//! listing or unpacking. Both sides produce the same shape: an ordered
//! top-level sibling sequence, with each directory owning its ordered
//! children.
//!
//! The on-disk format links siblings through "next" pointers and directories
//! through a "first child" pointer. Those links are not represented here: a
//! directory simply owns a `Vec` of children, and an empty vector is an empty
//! directory.

use crate::error::{ArchiveError, Result};
use crate::offset::ArchiveOffset;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// Bit mask for the file type bits of a mode.
pub const S_IFMT: u32 = 0o170000;
/// File type bits of a regular file.
pub const S_IFREG: u32 = 0o100000;
/// File type bits of a directory.
pub const S_IFDIR: u32 = 0o040000;
/// File type bits of a symbolic link.
pub const S_IFLNK: u32 = 0o120000;
/// Permission bits (rwx for user/group/other plus setuid, setgid, sticky).
pub const PERMISSION_MASK: u32 = 0o7777;

/// Longest accepted name in bytes; the on-disk field also holds a terminator.
pub const MAX_NAME_LEN: usize = 255;

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl NodeKind {
    /// Decode the kind from the type bits of `mode`.
    ///
    /// Anything other than a regular file, a directory or a symlink (sockets,
    /// FIFOs, devices, garbage) is rejected.
    pub fn from_mode(mode: u32) -> Result<Self> {
        match mode & S_IFMT {
            S_IFREG => Ok(Self::Regular),
            S_IFDIR => Ok(Self::Directory),
            S_IFLNK => Ok(Self::Symlink),
            _ => Err(ArchiveError::invalid_mode(mode)),
        }
    }

    /// File type bits for this kind.
    pub fn type_bits(self) -> u32 {
        match self {
            Self::Regular => S_IFREG,
            Self::Directory => S_IFDIR,
            Self::Symlink => S_IFLNK,
        }
    }

    /// Human readable kind name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Regular => "File",
            Self::Directory => "Directory",
            Self::Symlink => "Symlink",
        }
    }

    /// Whether nodes of this kind carry a content range.
    pub fn has_content(self) -> bool {
        !matches!(self, Self::Directory)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    /// Whole seconds (negative before 1970).
    pub secs: i64,
    /// Nanoseconds, always below one second.
    pub nanos: u32,
}

impl Timestamp {
    /// Create a timestamp.
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }
}

/// The three timestamps captured for every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamps {
    /// Last access time.
    pub accessed: Timestamp,
    /// Last modification time.
    pub modified: Timestamp,
    /// Last status change time.
    pub changed: Timestamp,
}

/// Check that the raw bytes of `name` can be stored as a single path component.
///
/// Names are byte strings; no particular encoding is required.
pub fn validate_name(name: &[u8]) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.len() > MAX_NAME_LEN {
        "name is longer than 255 bytes"
    } else if name.contains(&0) {
        "name contains a NUL byte"
    } else if name.contains(&b'/') {
        "name contains a path separator"
    } else if name == b".." {
        "name refers to the parent directory"
    } else {
        return Ok(());
    };
    Err(ArchiveError::invalid_name(String::from_utf8_lossy(name), reason))
}

/// Raw bytes of an OS string, as stored in names and symlink payloads.
pub fn os_str_to_bytes(s: &OsStr) -> Cow<'_, [u8]> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Cow::Borrowed(s.as_bytes())
    }
    #[cfg(not(unix))]
    {
        match s.to_string_lossy() {
            Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
            Cow::Owned(s) => Cow::Owned(s.into_bytes()),
        }
    }
}

/// OS string from raw stored bytes (without terminator).
pub fn os_string_from_bytes(bytes: &[u8]) -> OsString {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        OsStr::from_bytes(bytes).to_os_string()
    }
    #[cfg(not(unix))]
    {
        OsString::from(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Raw bytes of a path as stored in a symlink payload.
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    os_str_to_bytes(path.as_os_str())
}

/// Path from the raw bytes of a symlink payload (without terminator).
pub fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(os_string_from_bytes(bytes))
}

/// A file, directory or symlink in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Leaf name, in whatever encoding the filesystem used.
    pub name: OsString,
    /// Path relative to the traversal root (or as given on the command line).
    pub access_path: PathBuf,
    /// Node kind.
    pub kind: NodeKind,
    /// Permission bits (`mode & 0o7777`).
    pub permissions: u32,
    /// Content length: file size, or symlink target length plus terminator.
    pub size: u64,
    /// Access, modification and status change times.
    pub times: Timestamps,
    /// Link target, for symlinks whose target is known.
    pub symlink_target: Option<PathBuf>,
    /// Ordered children, for directories only.
    pub children: Option<Vec<Node>>,
    /// Position of this node's entry header in the container.
    pub header_offset: Option<ArchiveOffset>,
    /// Position of this node's content in the container.
    pub content_offset: Option<ArchiveOffset>,
}

impl Node {
    fn new(name: OsString, access_path: PathBuf, kind: NodeKind, size: u64) -> Result<Self> {
        validate_name(&os_str_to_bytes(&name))?;
        let permissions = match kind {
            NodeKind::Regular => 0o644,
            NodeKind::Directory => 0o755,
            NodeKind::Symlink => 0o777,
        };
        Ok(Self {
            name,
            access_path,
            kind,
            permissions,
            size,
            times: Timestamps::default(),
            symlink_target: None,
            children: matches!(kind, NodeKind::Directory).then(Vec::new),
            header_offset: None,
            content_offset: None,
        })
    }

    /// Create a regular file node.
    pub fn file(
        name: impl Into<OsString>,
        access_path: impl Into<PathBuf>,
        size: u64,
    ) -> Result<Self> {
        Self::new(name.into(), access_path.into(), NodeKind::Regular, size)
    }

    /// Create an empty directory node.
    pub fn directory(name: impl Into<OsString>, access_path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(name.into(), access_path.into(), NodeKind::Directory, 0)
    }

    /// Create a symlink node; its size is the target length plus terminator.
    pub fn symlink(
        name: impl Into<OsString>,
        access_path: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
    ) -> Result<Self> {
        let target = target.into();
        let bytes = path_to_bytes(&target);
        if bytes.contains(&0) {
            return Err(ArchiveError::InvalidSymlinkTarget {
                offset: 0,
                target: target.to_string_lossy().into_owned(),
            });
        }
        let size = bytes.len() as u64 + 1;
        let mut node = Self::new(name.into(), access_path.into(), NodeKind::Symlink, size)?;
        node.symlink_target = Some(target);
        Ok(node)
    }

    /// Create a node whose kind and permissions are decoded from `mode`.
    ///
    /// Symlink targets are left unset; content is loaded on demand.
    pub fn from_mode(
        name: impl Into<OsString>,
        access_path: impl Into<PathBuf>,
        mode: u32,
        size: u64,
    ) -> Result<Self> {
        let kind = NodeKind::from_mode(mode)?;
        let size = if kind.has_content() { size } else { 0 };
        let mut node = Self::new(name.into(), access_path.into(), kind, size)?;
        node.permissions = mode & PERMISSION_MASK;
        Ok(node)
    }

    /// Raw bytes of the leaf name.
    pub fn name_bytes(&self) -> Cow<'_, [u8]> {
        os_str_to_bytes(&self.name)
    }

    /// Leaf name for display; invalid UTF-8 is replaced.
    pub fn display_name(&self) -> Cow<'_, str> {
        self.name.to_string_lossy()
    }

    /// Builder method to set timestamps.
    pub fn with_times(mut self, times: Timestamps) -> Self {
        self.times = times;
        self
    }

    /// Builder method to set permission bits.
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions & PERMISSION_MASK;
        self
    }

    /// Builder method to append children to a directory.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Result<Self> {
        for child in children {
            self.push_child(child)?;
        }
        Ok(self)
    }

    /// Append a child to this directory.
    pub fn push_child(&mut self, child: Node) -> Result<()> {
        match &mut self.children {
            Some(children) => {
                children.push(child);
                Ok(())
            }
            None => Err(ArchiveError::NotADirectory {
                path: self.access_path.clone(),
            }),
        }
    }

    /// Full mode: type bits plus permissions.
    pub fn mode(&self) -> u32 {
        self.kind.type_bits() | (self.permissions & PERMISSION_MASK)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::Regular
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        self.kind == NodeKind::Symlink
    }

    /// Children of a directory; empty for every other kind.
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Whether this is a directory without children.
    pub fn is_empty_dir(&self) -> bool {
        self.children.as_ref().is_some_and(Vec::is_empty)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mode={:o} size={:012} name={} path={}",
            self.kind,
            self.mode(),
            self.size,
            self.display_name(),
            self.access_path.display()
        )
    }
}

/// An owned directory tree: one top-level sibling sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    roots: Vec<Node>,
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree from a top-level sibling sequence.
    pub fn from_roots(roots: Vec<Node>) -> Self {
        Self { roots }
    }

    /// Append a top-level node.
    pub fn push(&mut self, node: Node) {
        self.roots.push(node);
    }

    /// Top-level nodes.
    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// Mutable top-level nodes.
    pub fn roots_mut(&mut self) -> &mut [Node] {
        &mut self.roots
    }

    /// Consume the tree, returning the top-level nodes.
    pub fn into_roots(self) -> Vec<Node> {
        self.roots
    }

    /// Whether the tree has no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.walk().count()
    }

    /// Depth-first, pre-order traversal yielding `(depth, node)`.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self.roots.iter())],
        }
    }

    /// Find a node by access path.
    pub fn find(&self, path: impl AsRef<Path>) -> Option<&Node> {
        let path = path.as_ref();
        self.walk()
            .map(|(_, node)| node)
            .find(|node| node.access_path == path)
    }
}

/// Iterator returned by [`Tree::walk`].
pub struct Walk<'a> {
    stack: Vec<(usize, std::slice::Iter<'a, Node>)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            let depth = top.0;
            match top.1.next() {
                Some(node) => {
                    let children = node.children();
                    if !children.is_empty() {
                        self.stack.push((depth + 1, children.iter()));
                    }
                    return Some((depth, node));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
