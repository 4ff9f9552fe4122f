//! Parsing containers that were damaged or crafted on purpose.

use anchorarc_archive::{
    ArchiveReader, ArchiveWriter, MemoryContentSource, ReadOptions, assign_offsets,
};
use anchorarc_core::{ArchiveError, ErrorCategory, Node, Tree};
use std::io::Cursor;

fn build(mut tree: Tree, content: &mut MemoryContentSource) -> Vec<u8> {
    assign_offsets(&mut tree).unwrap();
    let mut writer = ArchiveWriter::new(Vec::new());
    writer.write_archive(&tree, content).unwrap();
    writer.into_inner()
}

/// Files `a`, `b`, `c` of 0, 10 and 100 bytes; headers at 40, 373 and 706.
fn flat() -> Vec<u8> {
    let tree = Tree::from_roots(vec![
        Node::file("a", "a", 0).unwrap(),
        Node::file("b", "b", 10).unwrap(),
        Node::file("c", "c", 100).unwrap(),
    ]);
    let mut content = MemoryContentSource::new();
    content.insert("a", Vec::new());
    content.insert("b", vec![1; 10]);
    content.insert("c", vec![2; 100]);
    build(tree, &mut content)
}

/// Directory `d` at 40 holding file `f` at 366.
fn nested() -> Vec<u8> {
    let dir = Node::directory("d", "d")
        .unwrap()
        .with_children([Node::file("f", "d/f", 0).unwrap()])
        .unwrap();
    let mut content = MemoryContentSource::new();
    content.insert("d/f", Vec::new());
    build(Tree::from_roots(vec![dir]), &mut content)
}

fn read(bytes: Vec<u8>) -> Result<Tree, ArchiveError> {
    ArchiveReader::new(Cursor::new(bytes))?.read_tree()
}

#[test]
fn test_bad_signature() {
    let mut bytes = flat();
    bytes[..4].copy_from_slice(b"PK\x03\x04");
    let err = read(bytes).unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidMagic { .. }));
    assert_eq!(err.category(), ErrorCategory::Format);
}

#[test]
fn test_empty_input() {
    let err = read(Vec::new()).unwrap_err();
    assert!(matches!(err, ArchiveError::TruncatedRecord { needed: 40, .. }));
}

#[test]
fn test_root_beyond_end() {
    let mut bytes = flat();
    bytes[32..40].copy_from_slice(&1_000_000u64.to_le_bytes());
    let err = read(bytes).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::PointerOutOfRange {
            offset: 1_000_000,
            ..
        }
    ));
    assert_eq!(err.category(), ErrorCategory::Bounds);
}

#[test]
fn test_container_cut_short() {
    let bytes = flat();
    let err = read(bytes[..800].to_vec()).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::TruncatedRecord {
            offset: 706,
            needed: 317,
            size: 800
        }
    ));
}

#[test]
fn test_next_beyond_end() {
    let mut bytes = flat();
    bytes[45..53].copy_from_slice(&u64::MAX.to_le_bytes());
    assert!(matches!(
        read(bytes).unwrap_err(),
        ArchiveError::PointerOutOfRange { .. }
    ));
}

#[test]
fn test_next_pointing_before_own_header() {
    let mut bytes = flat();
    // b (at 373) now links back to a (at 40).
    bytes[373 + 5..373 + 13].copy_from_slice(&40u64.to_le_bytes());
    let err = read(bytes).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::BackwardPointer {
            offset: 40,
            cursor: 706
        }
    ));
    assert_eq!(err.category(), ErrorCategory::Ordering);
}

#[test]
fn test_child_pointing_at_parent() {
    let mut bytes = nested();
    // First child of d (directory header at 357) points back at d.
    bytes[358..366].copy_from_slice(&40u64.to_le_bytes());
    assert!(matches!(
        read(bytes).unwrap_err(),
        ArchiveError::BackwardPointer {
            offset: 40,
            cursor: 366
        }
    ));
}

#[test]
fn test_non_empty_directory_without_child() {
    let mut bytes = nested();
    bytes[358..366].fill(0);
    assert!(matches!(
        read(bytes).unwrap_err(),
        ArchiveError::BackwardPointer { offset: 0, .. }
    ));
}

#[test]
fn test_name_with_separator() {
    let mut bytes = flat();
    bytes[53..57].copy_from_slice(b"x/y\0");
    assert!(matches!(
        read(bytes).unwrap_err(),
        ArchiveError::InvalidName { name, .. } if name == "x/y"
    ));
}

#[test]
fn test_name_parent_reference() {
    let mut bytes = flat();
    bytes[53..56].copy_from_slice(b"..\0");
    assert!(matches!(
        read(bytes).unwrap_err(),
        ArchiveError::InvalidName { name, .. } if name == ".."
    ));
}

#[cfg(unix)]
#[test]
fn test_name_bytes_are_not_decoded() {
    let mut bytes = flat();
    bytes[53..58].copy_from_slice(b"caf\xe9\0");
    let tree = read(bytes).unwrap();
    let node = &tree.roots()[0];
    assert_eq!(node.name_bytes().as_ref(), b"caf\xe9");
    assert_eq!(node.display_name(), "caf\u{fffd}");
}

#[test]
fn test_name_without_terminator() {
    let mut bytes = flat();
    bytes[53..53 + 256].fill(b'n');
    assert!(matches!(
        read(bytes).unwrap_err(),
        ArchiveError::InvalidName { .. }
    ));
}

#[test]
fn test_invalid_mode() {
    let mut bytes = flat();
    // A FIFO.
    bytes[40..44].copy_from_slice(&0o010644u32.to_le_bytes());
    assert!(matches!(
        read(bytes).unwrap_err(),
        ArchiveError::InvalidMode { mode: 0o010644 }
    ));
}

#[test]
fn test_content_beyond_end() {
    let mut bytes = flat();
    // Size of c (file header at 706 + 317).
    bytes[1031..1039].copy_from_slice(&101u64.to_le_bytes());

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    // Listing does not look at content.
    let tree = reader.read_tree().unwrap();
    let c = &tree.roots()[2];
    let err = reader.extract(c, &mut Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::ContentOutOfRange {
            offset: 1049,
            len: 101,
            size: 1149
        }
    ));
}

#[test]
fn test_unterminated_symlink() {
    let tree = Tree::from_roots(vec![Node::symlink("l", "l", "abc").unwrap()]);
    let mut bytes = build(tree, &mut MemoryContentSource::new());
    assert_eq!(&bytes[373..], b"abc\0");
    bytes[376] = b'x';

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let tree = reader.read_tree().unwrap();
    assert!(matches!(
        reader.symlink_target(&tree.roots()[0]).unwrap_err(),
        ArchiveError::UnterminatedSymlink { offset: 373, .. }
    ));
}

#[test]
fn test_nesting_limit() {
    let mut node = Node::directory("leaf", "leaf").unwrap();
    for level in 0..20 {
        let name = format!("d{level}");
        node = Node::directory(name.as_str(), name.as_str())
            .unwrap()
            .with_children([node])
            .unwrap();
    }
    let bytes = build(Tree::from_roots(vec![node]), &mut MemoryContentSource::new());

    let mut reader = ArchiveReader::new(Cursor::new(bytes.clone()))
        .unwrap()
        .with_options(ReadOptions::default().with_max_depth(10));
    assert!(matches!(
        reader.read_tree().unwrap_err(),
        ArchiveError::TooDeep {
            depth: 11,
            limit: 10
        }
    ));

    let tree = read(bytes).unwrap();
    assert_eq!(tree.node_count(), 21);
    let (depth, deepest) = tree.walk().last().unwrap();
    assert_eq!(depth, 20);
    assert_eq!(deepest.name, "leaf");
}
