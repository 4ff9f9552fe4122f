//! Two-pass offset assignment.
//!
//! Every header is placed before any content, in depth-first order, so the
//! writer can emit the whole container in a single forward pass and every
//! pointer it writes refers to a position at or after its own record.

use crate::format::{CONTAINER_HEADER_SIZE, node_header_size};
use anchorarc_core::{ArchiveError, ArchiveOffset, Node, Result, Tree};
use tracing::debug;

/// Result of laying out a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Offset of the first top-level entry header.
    pub root_offset: ArchiveOffset,
    /// First byte after the last header; content starts here.
    pub headers_end: ArchiveOffset,
    /// Total container size.
    pub total_size: u64,
}

/// Pass 1: assign header offsets, starting right after the container header.
///
/// Returns the offset one past the last header.
pub fn assign_header_offsets(tree: &mut Tree) -> Result<ArchiveOffset> {
    let mut cursor = ArchiveOffset::new(CONTAINER_HEADER_SIZE as u64);
    for node in tree.roots_mut() {
        place_header(node, &mut cursor)?;
    }
    Ok(cursor)
}

fn place_header(node: &mut Node, cursor: &mut ArchiveOffset) -> Result<()> {
    node.header_offset = Some(*cursor);
    cursor.advance(node_header_size(node.kind) as u64)?;
    if let Some(children) = node.children.as_mut() {
        for child in children {
            place_header(child, cursor)?;
        }
    }
    Ok(())
}

/// Pass 2: assign content offsets, starting at `start`.
///
/// Returns the offset one past the last content byte.
pub fn assign_content_offsets(tree: &mut Tree, start: ArchiveOffset) -> Result<ArchiveOffset> {
    let mut cursor = start;
    for node in tree.roots_mut() {
        place_content(node, &mut cursor)?;
    }
    Ok(cursor)
}

fn place_content(node: &mut Node, cursor: &mut ArchiveOffset) -> Result<()> {
    if node.kind.has_content() {
        node.content_offset = Some(*cursor);
        cursor.advance(node.size)?;
    } else {
        node.content_offset = None;
    }
    if let Some(children) = node.children.as_mut() {
        for child in children {
            place_content(child, cursor)?;
        }
    }
    Ok(())
}

/// Run both passes.
pub fn assign_offsets(tree: &mut Tree) -> Result<Layout> {
    if tree.is_empty() {
        return Err(ArchiveError::EmptyTree);
    }

    let headers_end = assign_header_offsets(tree)?;
    let end = assign_content_offsets(tree, headers_end)?;
    let layout = Layout {
        root_offset: ArchiveOffset::new(CONTAINER_HEADER_SIZE as u64),
        headers_end,
        total_size: end.get(),
    };
    debug!(
        nodes = tree.node_count(),
        headers_end = %layout.headers_end,
        total_size = layout.total_size,
        "assigned archive layout"
    );
    Ok(layout)
}
