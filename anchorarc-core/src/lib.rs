//! # anchorarc core
//!
//! Core components for the anchorarc directory archiver.
//!
//! - [`node`]: the in-memory directory tree
//! - [`offset`]: strongly typed container positions
//! - [`stream`]: positioned byte readers and writers
//! - [`traits`]: collaborator traits for tree sources, content sources and filesystem sinks
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ CLI: pack / list / unpack                               │
//! ├─────────────────────────────────────────────────────────┤
//! │ Archive: layout, header codec, writer, reader, unpack   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Core (this crate): Tree, ArchiveOffset, streams, traits │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use anchorarc_core::{Node, Tree};
//!
//! let dir = Node::directory("docs", "docs")
//!     .unwrap()
//!     .with_children([Node::file("a.txt", "docs/a.txt", 5).unwrap()])
//!     .unwrap();
//! let tree = Tree::from_roots(vec![dir]);
//! assert_eq!(tree.node_count(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod node;
pub mod offset;
pub mod stream;
pub mod traits;

// Re-exports for convenience
pub use error::{ArchiveError, ErrorCategory, Result};
pub use node::{Node, NodeKind, Timestamp, Timestamps, Tree};
pub use offset::ArchiveOffset;
pub use stream::{PositionedReader, PositionedWriter};
pub use traits::{ContentSource, FsSink, TreeSource};
