//! Pack, list and unpack on filesystem paths.

use crate::fs::{DiskSink, FsContentSource, FsTreeSource, SymlinkPolicy};
use crate::layout::assign_offsets;
use crate::reader::{ArchiveReader, ReadOptions};
use crate::unpack::{UnpackSummary, Unpacker};
use crate::writer::{ArchiveWriter, DEFAULT_BUFFER_SIZE};
use anchorarc_core::{ArchiveError, Node, NodeKind, Result, Tree, TreeSource};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Mode of a newly created archive file.
pub const ARCHIVE_FILE_MODE: u32 = 0o640;

/// Options for [`pack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    /// Copy buffer size in bytes.
    pub buffer_size: usize,
    /// Symlink handling while enumerating.
    pub symlinks: SymlinkPolicy,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            symlinks: SymlinkPolicy::default(),
        }
    }
}

impl PackOptions {
    /// Builder method to set the copy buffer size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Builder method to set the symlink policy.
    pub fn with_symlinks(mut self, symlinks: SymlinkPolicy) -> Self {
        self.symlinks = symlinks;
        self
    }
}

/// Options for [`unpack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Copy buffer size in bytes.
    pub buffer_size: usize,
    /// Parsing options.
    pub read: ReadOptions,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            read: ReadOptions::default(),
        }
    }
}

impl UnpackOptions {
    /// Builder method to set the copy buffer size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Builder method to set parsing options.
    pub fn with_read_options(mut self, read: ReadOptions) -> Self {
        self.read = read;
        self
    }
}

/// What a pack stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackSummary {
    /// Directories stored.
    pub directories: u64,
    /// Regular files stored.
    pub files: u64,
    /// Symlinks stored.
    pub symlinks: u64,
    /// Bytes of file and symlink content.
    pub content_bytes: u64,
    /// Size of the archive file.
    pub archive_size: u64,
}

impl PackSummary {
    fn from_tree(tree: &Tree, archive_size: u64) -> Self {
        let mut summary = Self {
            archive_size,
            ..Self::default()
        };
        for (_, node) in tree.walk() {
            match node.kind {
                NodeKind::Directory => summary.directories += 1,
                NodeKind::Regular => summary.files += 1,
                NodeKind::Symlink => summary.symlinks += 1,
            }
            summary.content_bytes += node.size;
        }
        summary
    }

    /// Total number of nodes stored.
    pub fn entries(&self) -> u64 {
        self.directories + self.files + self.symlinks
    }
}

/// Progress reporting hooks.
///
/// Any `FnMut(&Node)` closure is a `Progress` that only observes nodes.
pub trait Progress {
    /// Called once the number of nodes is known.
    fn start(&mut self, _total: u64) {}

    /// Called before each node is processed.
    fn node(&mut self, node: &Node);

    /// Called after the last node.
    fn finish(&mut self) {}
}

impl<F: FnMut(&Node)> Progress for F {
    fn node(&mut self, node: &Node) {
        self(node)
    }
}

/// Archive `roots` into a new file at `output`.
pub fn pack(roots: &[PathBuf], output: &Path, options: &PackOptions) -> Result<PackSummary> {
    pack_with_progress(roots, output, options, |_: &Node| {})
}

/// Like [`pack`], reporting to `progress`.
///
/// On failure the partially written output file is removed.
pub fn pack_with_progress<P: Progress>(
    roots: &[PathBuf],
    output: &Path,
    options: &PackOptions,
    mut progress: P,
) -> Result<PackSummary> {
    let mut tree = FsTreeSource::new(options.symlinks).enumerate(roots)?;
    let layout = assign_offsets(&mut tree)?;
    progress.start(tree.node_count() as u64);

    let file = create_archive_file(output)?;
    match write_container(file, &tree, options, &mut progress) {
        Ok(written) => {
            progress.finish();
            info!(
                "packed {} entries into {} ({} bytes)",
                tree.node_count(),
                output.display(),
                written
            );
            debug_assert_eq!(written, layout.total_size);
            Ok(PackSummary::from_tree(&tree, written))
        }
        Err(e) => {
            if let Err(remove) = fs::remove_file(output) {
                warn!("failed to remove partial archive {}: {}", output.display(), remove);
            }
            Err(e)
        }
    }
}

fn create_archive_file(output: &Path) -> Result<File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(ARCHIVE_FILE_MODE);
    }
    options
        .open(output)
        .map_err(|e| ArchiveError::filesystem("create", output, e))
}

fn write_container<P: Progress>(
    file: File,
    tree: &Tree,
    options: &PackOptions,
    progress: &mut P,
) -> Result<u64> {
    let mut writer =
        ArchiveWriter::new(BufWriter::new(file)).with_buffer_size(options.buffer_size);
    let written = writer.write_archive_with(tree, &mut FsContentSource, |node| {
        info!("adding {}", node.access_path.display());
        progress.node(node);
    })?;
    let mut buffered = writer.into_inner();
    buffered.flush()?;
    buffered
        .into_inner()
        .map_err(|e| ArchiveError::Io(e.into_error()))?;
    Ok(written)
}

fn open_archive(input: &Path) -> Result<ArchiveReader<BufReader<File>>> {
    let file = File::open(input).map_err(|e| ArchiveError::filesystem("open", input, e))?;
    ArchiveReader::new(BufReader::new(file))
}

/// Read the tree stored in the archive at `input`.
pub fn list(input: &Path, options: &ReadOptions) -> Result<Tree> {
    open_archive(input)?.with_options(*options).read_tree()
}

/// Unpack the archive at `input` below `output`.
pub fn unpack(input: &Path, output: &Path, options: &UnpackOptions) -> Result<UnpackSummary> {
    unpack_with_progress(input, output, options, |_: &Node| {})
}

/// Like [`unpack`], reporting to `progress`.
pub fn unpack_with_progress<P: Progress>(
    input: &Path,
    output: &Path,
    options: &UnpackOptions,
    mut progress: P,
) -> Result<UnpackSummary> {
    let mut reader = open_archive(input)?
        .with_options(options.read)
        .with_buffer_size(options.buffer_size);
    let tree = reader.read_tree()?;
    progress.start(tree.node_count() as u64);

    fs::create_dir_all(output).map_err(|e| ArchiveError::filesystem("mkdir", output, e))?;
    let mut unpacker = Unpacker::new(DiskSink, output);
    let summary = unpacker.unpack_with(&mut reader, &tree, |node| progress.node(node))?;
    progress.finish();
    info!(
        "unpacked {} entries into {}",
        summary.entries(),
        output.display()
    );
    Ok(summary)
}
