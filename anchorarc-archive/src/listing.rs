//! Human readable listing of a tree.
//!
//! Listing only looks at headers already parsed into the tree; content is
//! never read and content ranges are not checked.

use anchorarc_core::{Node, Result, Tree};
use std::fmt;
use std::io::Write;

/// Indentation per depth level.
const INDENT: usize = 2;

/// One line of a listing.
#[derive(Debug, Clone, Copy)]
pub struct ListEntry<'a> {
    /// Nesting depth (0 for top-level nodes).
    pub depth: usize,
    /// The listed node.
    pub node: &'a Node,
}

impl fmt::Display for ListEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:width$}{}", "", self.node, width = self.depth * INDENT)
    }
}

/// Depth-first listing entries of `tree`.
pub fn entries(tree: &Tree) -> impl Iterator<Item = ListEntry<'_>> {
    tree.walk().map(|(depth, node)| ListEntry { depth, node })
}

/// Write one line per node accepted by `filter`, returning the number of lines.
pub fn write_listing<W, F>(tree: &Tree, out: &mut W, mut filter: F) -> Result<usize>
where
    W: Write,
    F: FnMut(&Node) -> bool,
{
    let mut lines = 0;
    for entry in entries(tree).filter(|entry| filter(entry.node)) {
        writeln!(out, "{entry}")?;
        lines += 1;
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Tree {
        let root = Node::directory("root", "root")
            .unwrap()
            .with_children([
                Node::directory("docs", "root/docs")
                    .unwrap()
                    .with_children([Node::file("a.txt", "root/docs/a.txt", 1234).unwrap()])
                    .unwrap(),
                Node::symlink("link", "root/link", "docs").unwrap(),
            ])
            .unwrap();
        Tree::from_roots(vec![root])
    }

    #[test]
    fn test_listing_format() {
        let mut out = Vec::new();
        let lines = write_listing(&tree(), &mut out, |_| true).unwrap();
        assert_eq!(lines, 4);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Directory mode=40755 size=000000000000 name=root path=root\n\
             \x20\x20Directory mode=40755 size=000000000000 name=docs path=root/docs\n\
             \x20\x20\x20\x20File mode=100644 size=000000001234 name=a.txt path=root/docs/a.txt\n\
             \x20\x20Symlink mode=120777 size=000000000005 name=link path=root/link\n"
        );
    }

    #[test]
    fn test_listing_filter() {
        let mut out = Vec::new();
        let lines = write_listing(&tree(), &mut out, |node| node.is_file()).unwrap();
        assert_eq!(lines, 1);
        assert!(String::from_utf8(out).unwrap().starts_with("    File"));
    }
}
