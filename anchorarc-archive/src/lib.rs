//! # anchorarc archive
//!
//! The anchorarc container format: a seekable, forward-linked serialization
//! of a directory tree.
//!
//! - [`layout`]: two-pass offset assignment
//! - [`format`]: byte layout of every record
//! - [`writer`]: writing a laid-out tree
//! - [`reader`]: rebuilding a tree from an untrusted container
//! - [`extract`]: bounds-checked content access
//! - [`unpack`]: re-creating a tree through a filesystem sink
//! - [`listing`]: human readable listings
//! - [`fs`]: filesystem tree source, content sources and sink
//! - [`ops`]: pack, list and unpack on paths
//!
//! ## Example
//!
//! ```rust
//! use anchorarc_archive::fs::MemoryContentSource;
//! use anchorarc_archive::{ArchiveReader, ArchiveWriter, assign_offsets};
//! use anchorarc_core::{Node, Tree};
//! use std::io::Cursor;
//!
//! let mut tree = Tree::from_roots(vec![Node::file("hello.txt", "hello.txt", 5).unwrap()]);
//! let mut content = MemoryContentSource::new();
//! content.insert("hello.txt", b"hello".to_vec());
//!
//! assign_offsets(&mut tree).unwrap();
//! let mut writer = ArchiveWriter::new(Vec::new());
//! writer.write_archive(&tree, &mut content).unwrap();
//!
//! let mut reader = ArchiveReader::new(Cursor::new(writer.into_inner())).unwrap();
//! let parsed = reader.read_tree().unwrap();
//! let mut out = Vec::new();
//! reader.extract(&parsed.roots()[0], &mut out).unwrap();
//! assert_eq!(out, b"hello");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod extract;
pub mod format;
pub mod fs;
pub mod layout;
pub mod listing;
pub mod ops;
pub mod reader;
pub mod unpack;
pub mod writer;

// Re-exports
pub use extract::check_content_range;
pub use format::{ContainerHeader, DirectoryHeader, EntryHeader, FileHeader, SIGNATURE_TEXT};
pub use fs::{DiskSink, FsContentSource, FsTreeSource, MemoryContentSource, SymlinkPolicy};
pub use layout::{Layout, assign_offsets};
pub use listing::{ListEntry, write_listing};
pub use ops::{PackOptions, PackSummary, Progress, UnpackOptions, list, pack, unpack};
pub use reader::{ArchiveReader, ReadOptions};
pub use unpack::{UnpackSummary, Unpacker};
pub use writer::ArchiveWriter;
