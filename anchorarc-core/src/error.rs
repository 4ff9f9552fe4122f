//! Error types for anchorarc operations.
//!
//! Every failure in the codec is fatal for the operation that hit it, so the
//! error type is a flat enum carrying enough context (offending value, offset,
//! expected bound) to diagnose a broken container without re-reading it.
//! [`ArchiveError::category`] maps each variant onto the coarse taxonomy used
//! by callers that only care about the class of failure.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The container bytes do not follow the format (magic, names, modes, strings).
    Format,
    /// An offset or range points outside the container.
    Bounds,
    /// A pointer refers backwards from the read cursor.
    Ordering,
    /// The underlying stream or filesystem failed.
    Io,
    /// Memory for a name, path or symlink target could not be allocated.
    Resource,
    /// The API was driven with inconsistent input (unassigned offsets, empty tree).
    Usage,
}

/// The main error type for anchorarc operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// I/O error from the underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A filesystem operation on a specific path failed.
    #[error("{operation} failed for {}: {source}", path.display())]
    Filesystem {
        /// Name of the failed operation (`mkdir`, `symlink`, ...).
        operation: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The container does not start with the expected signature.
    #[error("Invalid archive signature: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected signature bytes.
        expected: Vec<u8>,
        /// Bytes actually found.
        found: Vec<u8>,
    },

    /// A node name is not acceptable as a single path component.
    #[error("Invalid file name {name:?}: {reason}")]
    InvalidName {
        /// The offending name (lossily decoded).
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A mode does not describe a regular file, directory or symlink.
    #[error("Invalid file mode {mode:#o}")]
    InvalidMode {
        /// The offending mode bits.
        mode: u32,
    },

    /// A timestamp nanosecond field is out of range.
    #[error("Invalid timestamp {secs}.{nanos}: nanoseconds must be below 1000000000")]
    InvalidTimestamp {
        /// Seconds part.
        secs: i64,
        /// Nanoseconds part as stored.
        nanos: i64,
    },

    /// A symlink target is not NUL-terminated within its declared size.
    #[error("Symlink target {target:?} at offset {offset} is not NUL-terminated")]
    UnterminatedSymlink {
        /// Content offset of the target string.
        offset: u64,
        /// The target bytes read so far (lossily decoded).
        target: String,
    },

    /// A symlink target contains a NUL before its terminator.
    #[error("Symlink target {target:?} at offset {offset} contains an interior NUL")]
    InvalidSymlinkTarget {
        /// Content offset of the target string.
        offset: u64,
        /// The target bytes (lossily decoded).
        target: String,
    },

    /// A header pointer is at or beyond the end of the container.
    #[error("Header position {offset} is exceeding container size {size}")]
    PointerOutOfRange {
        /// The pointer that was followed.
        offset: u64,
        /// Container size in bytes.
        size: u64,
    },

    /// A fixed-size record would extend past the end of the container.
    #[error("Truncated record at offset {offset}: need {needed} bytes, container size is {size}")]
    TruncatedRecord {
        /// Offset of the record.
        offset: u64,
        /// Size of the record.
        needed: u64,
        /// Container size in bytes.
        size: u64,
    },

    /// A content range extends past the end of the container.
    #[error("Content range {offset}+{len} is exceeding container size {size}")]
    ContentOutOfRange {
        /// Content offset.
        offset: u64,
        /// Content length.
        len: u64,
        /// Container size in bytes.
        size: u64,
    },

    /// Offset arithmetic overflowed.
    #[error("Offset overflow: {offset} + {len} does not fit in 64 bits")]
    OffsetOverflow {
        /// Base offset.
        offset: u64,
        /// Length added to it.
        len: u64,
    },

    /// Directory nesting exceeded the configured limit.
    #[error("Directory nesting depth {depth} exceeds limit {limit}")]
    TooDeep {
        /// Depth reached.
        depth: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A pointer refers to a position before the read cursor.
    #[error("Invalid header position {offset}: read cursor is already at {cursor}")]
    BackwardPointer {
        /// The pointer that was about to be followed.
        offset: u64,
        /// Read cursor position at that moment.
        cursor: u64,
    },

    /// A buffer for archive data could not be allocated.
    #[error("Failed to allocate {size} bytes")]
    Allocation {
        /// Requested size.
        size: u64,
    },

    /// There is nothing to archive.
    #[error("Cannot write an archive for an empty tree")]
    EmptyTree,

    /// A node was written or extracted before its offsets were assigned.
    #[error("Node {} has no assigned archive offset", path.display())]
    UnassignedOffset {
        /// Access path of the node.
        path: PathBuf,
    },

    /// The writer position diverged from the assigned layout.
    #[error("Layout mismatch: expected to write at offset {expected}, writer is at {actual}")]
    LayoutMismatch {
        /// Offset assigned during layout.
        expected: u64,
        /// Actual writer position.
        actual: u64,
    },

    /// A source file yielded fewer bytes than recorded in the tree.
    #[error(
        "Size of {} changed while archiving: expected {expected} bytes, read {actual}",
        path.display()
    )]
    ContentSizeMismatch {
        /// Access path of the source file.
        path: PathBuf,
        /// Size recorded during enumeration.
        expected: u64,
        /// Bytes actually available.
        actual: u64,
    },

    /// A symlink node is being archived without a known target.
    #[error("Symlink {} has no target", path.display())]
    MissingSymlinkTarget {
        /// Access path of the node.
        path: PathBuf,
    },

    /// A child was attached to a node that is not a directory.
    #[error("{} is not a directory", path.display())]
    NotADirectory {
        /// Access path of the node.
        path: PathBuf,
    },
}

/// Result type alias for anchorarc operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    /// Create an invalid signature error.
    pub fn invalid_magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason,
        }
    }

    /// Create an invalid mode error.
    pub fn invalid_mode(mode: u32) -> Self {
        Self::InvalidMode { mode }
    }

    /// Create a filesystem error for `operation` on `path`.
    pub fn filesystem(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create a pointer out of range error.
    pub fn pointer_out_of_range(offset: u64, size: u64) -> Self {
        Self::PointerOutOfRange { offset, size }
    }

    /// Create a truncated record error.
    pub fn truncated(offset: u64, needed: u64, size: u64) -> Self {
        Self::TruncatedRecord {
            offset,
            needed,
            size,
        }
    }

    /// Create a backward pointer error.
    pub fn backward_pointer(offset: u64, cursor: u64) -> Self {
        Self::BackwardPointer { offset, cursor }
    }

    /// Create an unassigned offset error.
    pub fn unassigned(path: impl Into<PathBuf>) -> Self {
        Self::UnassignedOffset { path: path.into() }
    }

    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidMagic { .. }
            | Self::InvalidName { .. }
            | Self::InvalidMode { .. }
            | Self::InvalidTimestamp { .. }
            | Self::UnterminatedSymlink { .. }
            | Self::InvalidSymlinkTarget { .. } => ErrorCategory::Format,
            Self::PointerOutOfRange { .. }
            | Self::TruncatedRecord { .. }
            | Self::ContentOutOfRange { .. }
            | Self::OffsetOverflow { .. }
            | Self::TooDeep { .. } => ErrorCategory::Bounds,
            Self::BackwardPointer { .. } => ErrorCategory::Ordering,
            Self::Io(_) | Self::Filesystem { .. } | Self::ContentSizeMismatch { .. } => {
                ErrorCategory::Io
            }
            Self::Allocation { .. } => ErrorCategory::Resource,
            Self::EmptyTree
            | Self::UnassignedOffset { .. }
            | Self::LayoutMismatch { .. }
            | Self::MissingSymlinkTarget { .. }
            | Self::NotADirectory { .. } => ErrorCategory::Usage,
        }
    }

    /// Whether this is a filesystem error caused by an already existing path.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Filesystem { source, .. } | Self::Io(source) => {
                source.kind() == io::ErrorKind::AlreadyExists
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArchiveError::invalid_magic(b"ARC".to_vec(), b"PK\x03".to_vec());
        assert!(err.to_string().contains("Invalid archive signature"));

        let err = ArchiveError::invalid_name("a/b", "contains a path separator");
        assert!(err.to_string().contains("\"a/b\""));

        let err = ArchiveError::invalid_mode(0o010644);
        assert!(err.to_string().contains("0o10644"));

        let err = ArchiveError::pointer_out_of_range(4096, 100);
        assert!(err.to_string().contains("4096"));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            ArchiveError::invalid_mode(0).category(),
            ErrorCategory::Format
        );
        assert_eq!(
            ArchiveError::truncated(10, 317, 20).category(),
            ErrorCategory::Bounds
        );
        assert_eq!(
            ArchiveError::backward_pointer(40, 366).category(),
            ErrorCategory::Ordering
        );
        assert_eq!(
            ArchiveError::Allocation { size: u64::MAX }.category(),
            ErrorCategory::Resource
        );
        assert_eq!(ArchiveError::EmptyTree.category(), ErrorCategory::Usage);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ArchiveError = io_err.into();
        assert!(matches!(err, ArchiveError::Io(_)));
        assert_eq!(err.category(), ErrorCategory::Io);
    }

    #[test]
    fn test_already_exists() {
        let err = ArchiveError::filesystem(
            "mkdir",
            "out/dir",
            io::Error::from(io::ErrorKind::AlreadyExists),
        );
        assert!(err.is_already_exists());
        assert!(err.to_string().contains("out/dir"));

        let err = ArchiveError::filesystem(
            "mkdir",
            "out/dir",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_already_exists());
    }
}
