//! Filesystem collaborators.
//!
//! [`FsTreeSource`] enumerates live directories, [`FsContentSource`] reads
//! file bytes while packing, and [`DiskSink`] re-creates nodes while
//! unpacking. [`MemoryContentSource`] serves file bytes from memory.

use anchorarc_core::{
    ArchiveError, ContentSource, FsSink, Node, Result, Timestamp, Timestamps, Tree, TreeSource,
};
use filetime::FileTime;
use std::collections::HashMap;
use std::fs::{self, File, Metadata};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// How symbolic links found while enumerating are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    /// Store symlinks as symlinks, never following them.
    #[default]
    Physical,
    /// Leave symlinks out of the archive.
    Ignore,
}

/// Tree source walking the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTreeSource {
    /// Symlink handling.
    pub symlinks: SymlinkPolicy,
}

impl FsTreeSource {
    /// Create a tree source with the given symlink policy.
    pub fn new(symlinks: SymlinkPolicy) -> Self {
        Self { symlinks }
    }

    fn enumerate_root(&self, root: &Path, tree: &mut Tree) -> Result<()> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .follow_root_links(false)
            .sort_by_file_name();

        // Open directories; `open[i]` is at depth `i`.
        let mut open: Vec<Node> = Vec::new();
        for entry in walker {
            let entry = entry.map_err(walk_error)?;
            while open.len() > entry.depth() {
                close_dir(&mut open, tree)?;
            }

            let Some(node) = self.node_for(&entry)? else {
                continue;
            };
            debug!(path = %node.access_path.display(), kind = %node.kind, "enumerated");
            if node.is_dir() {
                open.push(node);
            } else {
                attach(node, &mut open, tree)?;
            }
        }
        while !open.is_empty() {
            close_dir(&mut open, tree)?;
        }
        Ok(())
    }

    fn node_for(&self, entry: &DirEntry) -> Result<Option<Node>> {
        let path = entry.path();
        let meta = entry.metadata().map_err(walk_error)?;
        let file_type = meta.file_type();
        let name = entry.file_name();

        let node = if file_type.is_dir() {
            Node::directory(name, path)?
        } else if file_type.is_file() {
            Node::file(name, path, meta.len())?
        } else if file_type.is_symlink() {
            if self.symlinks == SymlinkPolicy::Ignore {
                debug!(path = %path.display(), "ignoring symlink");
                return Ok(None);
            }
            let target =
                fs::read_link(path).map_err(|e| ArchiveError::filesystem("readlink", path, e))?;
            Node::symlink(name, path, target)?
        } else {
            warn!("skipping {}: unsupported file type", path.display());
            return Ok(None);
        };

        let permissions = permissions_of(&meta, &node);
        Ok(Some(
            node.with_permissions(permissions)
                .with_times(times_of(&meta)),
        ))
    }
}

impl TreeSource for FsTreeSource {
    fn enumerate(&mut self, roots: &[PathBuf]) -> Result<Tree> {
        let mut tree = Tree::new();
        for root in roots {
            self.enumerate_root(root, &mut tree)?;
        }
        Ok(tree)
    }
}

fn walk_error(err: walkdir::Error) -> ArchiveError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    ArchiveError::filesystem("walk", path, io::Error::from(err))
}

fn attach(node: Node, open: &mut [Node], tree: &mut Tree) -> Result<()> {
    match open.last_mut() {
        Some(parent) => parent.push_child(node),
        None => {
            tree.push(node);
            Ok(())
        }
    }
}

fn close_dir(open: &mut Vec<Node>, tree: &mut Tree) -> Result<()> {
    match open.pop() {
        Some(dir) => attach(dir, open, tree),
        None => Ok(()),
    }
}

#[cfg(unix)]
fn permissions_of(meta: &Metadata, _node: &Node) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn permissions_of(meta: &Metadata, node: &Node) -> u32 {
    let base = if node.is_file() { 0o644 } else { 0o755 };
    if meta.permissions().readonly() {
        base & !0o222
    } else {
        base
    }
}

fn timestamp(time: FileTime) -> Timestamp {
    Timestamp::new(time.unix_seconds(), time.nanoseconds())
}

fn times_of(meta: &Metadata) -> Timestamps {
    let modified = timestamp(FileTime::from_last_modification_time(meta));
    #[cfg(unix)]
    let changed = {
        use std::os::unix::fs::MetadataExt;
        Timestamp::new(meta.ctime(), meta.ctime_nsec() as u32)
    };
    #[cfg(not(unix))]
    let changed = modified;

    Timestamps {
        accessed: timestamp(FileTime::from_last_access_time(meta)),
        modified,
        changed,
    }
}

/// Content source opening files by their access path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContentSource;

impl ContentSource for FsContentSource {
    type Reader = File;

    fn open(&mut self, node: &Node) -> Result<File> {
        File::open(&node.access_path)
            .map_err(|e| ArchiveError::filesystem("open", &node.access_path, e))
    }
}

/// Content source serving bytes from memory, keyed by access path.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentSource {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryContentSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the content of `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.insert(path.into(), data);
    }
}

impl ContentSource for MemoryContentSource {
    type Reader = Cursor<Vec<u8>>;

    fn open(&mut self, node: &Node) -> Result<Self::Reader> {
        self.files
            .get(&node.access_path)
            .map(|data| Cursor::new(data.clone()))
            .ok_or_else(|| {
                ArchiveError::filesystem(
                    "open",
                    &node.access_path,
                    io::Error::from(io::ErrorKind::NotFound),
                )
            })
    }
}

/// Sink writing to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSink;

impl DiskSink {
    fn is_symlink(path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
    }
}

impl FsSink for DiskSink {
    type File = File;

    fn create_dir(&mut self, path: &Path, permissions: u32) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(permissions);
        }
        #[cfg(not(unix))]
        let _ = permissions;

        match builder.create(path) {
            Ok(()) => Ok(()),
            // Only a real directory may be reused; anything else (notably a
            // symlink unpacked earlier) must not be descended into.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                match fs::symlink_metadata(path) {
                    Ok(meta) if meta.is_dir() => Err(ArchiveError::filesystem("mkdir", path, e)),
                    _ => Err(ArchiveError::NotADirectory {
                        path: path.to_path_buf(),
                    }),
                }
            }
            Err(e) => Err(ArchiveError::filesystem("mkdir", path, e)),
        }
    }

    fn create_file(&mut self, path: &Path, permissions: u32) -> Result<File> {
        if Self::is_symlink(path) {
            fs::remove_file(path).map_err(|e| ArchiveError::filesystem("unlink", path, e))?;
        }
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(permissions);
        }
        #[cfg(not(unix))]
        let _ = permissions;

        options
            .open(path)
            .map_err(|e| ArchiveError::filesystem("create", path, e))
    }

    #[cfg(unix)]
    fn create_symlink(&mut self, target: &Path, path: &Path) -> Result<()> {
        std::os::unix::fs::symlink(target, path)
            .map_err(|e| ArchiveError::filesystem("symlink", path, e))
    }

    #[cfg(not(unix))]
    fn create_symlink(&mut self, _target: &Path, path: &Path) -> Result<()> {
        Err(ArchiveError::filesystem(
            "symlink",
            path,
            io::Error::new(io::ErrorKind::Unsupported, "symlinks are not supported"),
        ))
    }

    fn set_times(&mut self, path: &Path, times: &Timestamps) -> Result<()> {
        let atime = FileTime::from_unix_time(times.accessed.secs, times.accessed.nanos);
        let mtime = FileTime::from_unix_time(times.modified.secs, times.modified.nanos);
        filetime::set_file_times(path, atime, mtime)
            .map_err(|e| ArchiveError::filesystem("utimes", path, e))
    }

    fn set_permissions(&mut self, path: &Path, permissions: u32) -> Result<()> {
        #[cfg(unix)]
        let perms = {
            use std::os::unix::fs::PermissionsExt;
            fs::Permissions::from_mode(permissions)
        };
        #[cfg(not(unix))]
        let perms = {
            let mut perms = fs::metadata(path)
                .map_err(|e| ArchiveError::filesystem("stat", path, e))?
                .permissions();
            perms.set_readonly(permissions & 0o200 == 0);
            perms
        };
        fs::set_permissions(path, perms).map_err(|e| ArchiveError::filesystem("chmod", path, e))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::fs::{PermissionsExt, symlink};
    use tempfile::TempDir;

    fn populate(root: &Path) {
        fs::create_dir_all(root.join("b/nested")).unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("b/one.txt"), b"one").unwrap();
        fs::write(root.join("b/nested/two.txt"), b"two!").unwrap();
        fs::write(root.join("c.txt"), b"").unwrap();
        symlink("b/one.txt", root.join("link")).unwrap();
    }

    fn names(tree: &Tree) -> Vec<(usize, String)> {
        tree.walk()
            .map(|(depth, node)| (depth, node.display_name().into_owned()))
            .collect()
    }

    #[test]
    fn test_enumerate_sorted_depth_first() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("data");
        populate(&root);

        let tree = FsTreeSource::default().enumerate(&[root.clone()]).unwrap();
        assert_eq!(
            names(&tree),
            vec![
                (0, "data".to_string()),
                (1, "a".to_string()),
                (1, "b".to_string()),
                (2, "nested".to_string()),
                (3, "two.txt".to_string()),
                (2, "one.txt".to_string()),
                (1, "c.txt".to_string()),
                (1, "link".to_string()),
            ]
        );

        let link = tree.find(root.join("link")).unwrap();
        assert!(link.is_symlink());
        assert_eq!(link.size, "b/one.txt".len() as u64 + 1);
        assert!(tree.find(root.join("a")).unwrap().is_empty_dir());
        assert_eq!(tree.find(root.join("b/nested/two.txt")).unwrap().size, 4);
    }

    #[test]
    fn test_ignore_symlinks() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path());

        let tree = FsTreeSource::new(SymlinkPolicy::Ignore)
            .enumerate(&[tmp.path().to_path_buf()])
            .unwrap();
        assert!(tree.walk().all(|(_, node)| !node.is_symlink()));
        assert_eq!(tree.node_count(), 7);
    }

    #[test]
    fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        let err = FsTreeSource::default()
            .enumerate(&[tmp.path().join("missing")])
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Filesystem { operation: "walk", .. }));
    }

    #[test]
    fn test_content_sources() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, b"disk").unwrap();

        let node = Node::file("f", &path, 4).unwrap();
        let mut data = String::new();
        FsContentSource
            .open(&node)
            .unwrap()
            .read_to_string(&mut data)
            .unwrap();
        assert_eq!(data, "disk");

        let mut memory = MemoryContentSource::new();
        assert!(memory.open(&node).is_err());
        memory.insert(&path, b"memory".to_vec());
        assert_eq!(memory.open(&node).unwrap().into_inner(), b"memory");
    }

    #[test]
    fn test_disk_sink() {
        let tmp = TempDir::new().unwrap();
        let mut sink = DiskSink;

        let dir = tmp.path().join("d");
        sink.create_dir(&dir, 0o755).unwrap();
        assert!(sink.create_dir(&dir, 0o755).unwrap_err().is_already_exists());

        let file = dir.join("f");
        {
            use std::io::Write;
            let mut out = sink.create_file(&file, 0o600).unwrap();
            out.write_all(b"content").unwrap();
        }
        sink.set_permissions(&file, 0o640).unwrap();
        let times = Timestamps {
            accessed: Timestamp::new(1_000_000_000, 0),
            modified: Timestamp::new(1_234_567_890, 500),
            changed: Timestamp::default(),
        };
        sink.set_times(&file, &times).unwrap();

        let meta = fs::metadata(&file).unwrap();
        assert_eq!(meta.permissions().mode() & 0o7777, 0o640);
        assert_eq!(
            FileTime::from_last_access_time(&meta),
            FileTime::from_unix_time(1_000_000_000, 0)
        );
        assert_eq!(
            FileTime::from_last_modification_time(&meta),
            FileTime::from_unix_time(1_234_567_890, 500)
        );

        let link = dir.join("l");
        sink.create_symlink(Path::new("f"), &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("f"));
    }

    #[test]
    fn test_disk_sink_refuses_symlinked_directory() {
        let tmp = TempDir::new().unwrap();
        let elsewhere = tmp.path().join("elsewhere");
        fs::create_dir(&elsewhere).unwrap();
        let link = tmp.path().join("d");
        symlink(&elsewhere, &link).unwrap();

        let mut sink = DiskSink;
        assert!(matches!(
            sink.create_dir(&link, 0o755),
            Err(ArchiveError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_disk_sink_replaces_symlinked_file() {
        let tmp = TempDir::new().unwrap();
        let victim = tmp.path().join("victim");
        fs::write(&victim, b"keep").unwrap();
        let path = tmp.path().join("f");
        symlink(&victim, &path).unwrap();

        let mut sink = DiskSink;
        drop(sink.create_file(&path, 0o644).unwrap());
        assert_eq!(fs::read(&victim).unwrap(), b"keep");
        assert!(!fs::symlink_metadata(&path).unwrap().file_type().is_symlink());
    }
}
