//! Container record layouts.
//!
//! A container is a 40-byte container header followed by one entry header
//! per node (each immediately followed by its kind header), followed by the
//! raw content of every file and symlink. All records are packed and
//! little-endian; all offsets are absolute positions from the start of the
//! container.
//!
//! ```text
//! container header   signature[32] root_offset:u64
//! entry header       mode:u32 is_last:u8 next_offset:u64 name[256]
//!                    atime[16] mtime[16] ctime[16]
//! timestamp          secs:i64 nanos:i64
//! file header        content_offset:u64 content_size:u64
//! directory header   is_empty:u8 first_child_offset:u64
//! ```

use anchorarc_core::node::{MAX_NAME_LEN, NodeKind, Timestamp, Timestamps, validate_name};
use anchorarc_core::{ArchiveError, ArchiveOffset, Result};

/// Signature text at the start of every container.
pub const SIGNATURE_TEXT: &str = "ARC.AnchorField.v2";

/// Length of the NUL-padded signature field.
pub const SIGNATURE_LEN: usize = 32;

/// The signature field as stored.
pub const SIGNATURE: [u8; SIGNATURE_LEN] = pad_signature(SIGNATURE_TEXT.as_bytes());

/// Size of the container header.
pub const CONTAINER_HEADER_SIZE: usize = 40;

/// Size of an entry header.
pub const ENTRY_HEADER_SIZE: usize = 317;

/// Size of a file (and symlink) header.
pub const FILE_HEADER_SIZE: usize = 16;

/// Size of a directory header.
pub const DIRECTORY_HEADER_SIZE: usize = 9;

/// Size of the NUL-padded name field.
pub const NAME_FIELD_LEN: usize = 256;

/// Size of an encoded timestamp.
pub const TIMESTAMP_SIZE: usize = 16;

const NANOS_PER_SEC: i64 = 1_000_000_000;

// Entry header field positions.
const MODE_AT: usize = 0;
const IS_LAST_AT: usize = 4;
const NEXT_AT: usize = 5;
const NAME_AT: usize = 13;
const ATIME_AT: usize = NAME_AT + NAME_FIELD_LEN;
const MTIME_AT: usize = ATIME_AT + TIMESTAMP_SIZE;
const CTIME_AT: usize = MTIME_AT + TIMESTAMP_SIZE;

const fn pad_signature(text: &[u8]) -> [u8; SIGNATURE_LEN] {
    let mut out = [0u8; SIGNATURE_LEN];
    let mut i = 0;
    while i < text.len() {
        out[i] = text[i];
        i += 1;
    }
    out
}

/// Size of the kind-specific header following an entry header.
pub fn kind_header_size(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Directory => DIRECTORY_HEADER_SIZE,
        NodeKind::Regular | NodeKind::Symlink => FILE_HEADER_SIZE,
    }
}

/// Total header bytes of one node: entry header plus kind header.
pub fn node_header_size(kind: NodeKind) -> usize {
    ENTRY_HEADER_SIZE + kind_header_size(kind)
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn u64_at(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

fn i64_at(buf: &[u8], at: usize) -> i64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    i64::from_le_bytes(bytes)
}

fn put(buf: &mut [u8], at: usize, bytes: &[u8]) {
    buf[at..at + bytes.len()].copy_from_slice(bytes);
}

/// Container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Offset of the first top-level entry header.
    pub root_offset: ArchiveOffset,
}

impl ContainerHeader {
    /// Encode the header.
    pub fn to_bytes(&self) -> [u8; CONTAINER_HEADER_SIZE] {
        let mut buf = [0u8; CONTAINER_HEADER_SIZE];
        put(&mut buf, 0, &SIGNATURE);
        put(&mut buf, SIGNATURE_LEN, &self.root_offset.get().to_le_bytes());
        buf
    }

    /// Decode the header, checking the signature.
    pub fn from_bytes(buf: &[u8; CONTAINER_HEADER_SIZE]) -> Result<Self> {
        let signature = &buf[..SIGNATURE_LEN];
        if signature != SIGNATURE {
            return Err(ArchiveError::invalid_magic(SIGNATURE.to_vec(), signature.to_vec()));
        }
        Ok(Self {
            root_offset: ArchiveOffset::new(u64_at(buf, SIGNATURE_LEN)),
        })
    }
}

/// Generic per-node header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// File type bits and permissions.
    pub mode: u32,
    /// Whether this is the last node of its sibling sequence.
    pub is_last: bool,
    /// Offset of the next sibling's entry header (0 when last).
    pub next_offset: ArchiveOffset,
    /// Leaf name bytes, without terminator.
    pub name: Vec<u8>,
    /// Captured timestamps.
    pub times: Timestamps,
}

impl EntryHeader {
    /// Encode the header. The name is validated before it is written.
    pub fn to_bytes(&self) -> Result<[u8; ENTRY_HEADER_SIZE]> {
        validate_name(&self.name)?;
        let next = if self.is_last {
            0
        } else {
            self.next_offset.get()
        };

        let mut buf = [0u8; ENTRY_HEADER_SIZE];
        put(&mut buf, MODE_AT, &self.mode.to_le_bytes());
        buf[IS_LAST_AT] = u8::from(self.is_last);
        put(&mut buf, NEXT_AT, &next.to_le_bytes());
        // Remaining name bytes stay zero, which terminates the name.
        put(&mut buf, NAME_AT, &self.name);
        put(&mut buf, ATIME_AT, &encode_timestamp(&self.times.accessed));
        put(&mut buf, MTIME_AT, &encode_timestamp(&self.times.modified));
        put(&mut buf, CTIME_AT, &encode_timestamp(&self.times.changed));
        Ok(buf)
    }

    /// Decode the header, validating the name, mode and timestamps.
    pub fn from_bytes(buf: &[u8; ENTRY_HEADER_SIZE]) -> Result<Self> {
        let mode = u32_at(buf, MODE_AT);
        NodeKind::from_mode(mode)?;

        let name = decode_name(&buf[NAME_AT..NAME_AT + NAME_FIELD_LEN])?;
        let times = Timestamps {
            accessed: decode_timestamp(&buf[ATIME_AT..ATIME_AT + TIMESTAMP_SIZE])?,
            modified: decode_timestamp(&buf[MTIME_AT..MTIME_AT + TIMESTAMP_SIZE])?,
            changed: decode_timestamp(&buf[CTIME_AT..CTIME_AT + TIMESTAMP_SIZE])?,
        };

        Ok(Self {
            mode,
            is_last: buf[IS_LAST_AT] != 0,
            next_offset: ArchiveOffset::new(u64_at(buf, NEXT_AT)),
            name,
            times,
        })
    }
}

fn decode_name(field: &[u8]) -> Result<Vec<u8>> {
    let Some(end) = field.iter().position(|&b| b == 0) else {
        return Err(ArchiveError::invalid_name(
            String::from_utf8_lossy(field),
            "name is not NUL-terminated",
        ));
    };
    debug_assert!(end <= MAX_NAME_LEN);
    let name = &field[..end];
    validate_name(name)?;
    Ok(name.to_vec())
}

fn encode_timestamp(ts: &Timestamp) -> [u8; TIMESTAMP_SIZE] {
    let mut buf = [0u8; TIMESTAMP_SIZE];
    put(&mut buf, 0, &ts.secs.to_le_bytes());
    put(&mut buf, 8, &i64::from(ts.nanos).to_le_bytes());
    buf
}

fn decode_timestamp(buf: &[u8]) -> Result<Timestamp> {
    let secs = i64_at(buf, 0);
    let nanos = i64_at(buf, 8);
    if !(0..NANOS_PER_SEC).contains(&nanos) {
        return Err(ArchiveError::InvalidTimestamp { secs, nanos });
    }
    Ok(Timestamp::new(secs, nanos as u32))
}

/// Header following the entry header of a regular file or symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Offset of the content bytes.
    pub content_offset: ArchiveOffset,
    /// Content length in bytes.
    pub size: u64,
}

impl FileHeader {
    /// Encode the header.
    pub fn to_bytes(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        put(&mut buf, 0, &self.content_offset.get().to_le_bytes());
        put(&mut buf, 8, &self.size.to_le_bytes());
        buf
    }

    /// Decode the header. Content bounds are checked at extraction time.
    pub fn from_bytes(buf: &[u8; FILE_HEADER_SIZE]) -> Self {
        Self {
            content_offset: ArchiveOffset::new(u64_at(buf, 0)),
            size: u64_at(buf, 8),
        }
    }
}

/// Header following the entry header of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryHeader {
    /// Whether the directory has no children.
    pub is_empty: bool,
    /// Offset of the first child's entry header (0 when empty).
    pub first_child: ArchiveOffset,
}

impl DirectoryHeader {
    /// Encode the header.
    pub fn to_bytes(&self) -> [u8; DIRECTORY_HEADER_SIZE] {
        let first = if self.is_empty {
            0
        } else {
            self.first_child.get()
        };
        let mut buf = [0u8; DIRECTORY_HEADER_SIZE];
        buf[0] = u8::from(self.is_empty);
        put(&mut buf, 1, &first.to_le_bytes());
        buf
    }

    /// Decode the header.
    pub fn from_bytes(buf: &[u8; DIRECTORY_HEADER_SIZE]) -> Self {
        Self {
            is_empty: buf[0] != 0,
            first_child: ArchiveOffset::new(u64_at(buf, 1)),
        }
    }
}
