//! Container addresses.
//!
//! An [`ArchiveOffset`] is an absolute byte position inside a container. It is
//! deliberately not a `u64` so that container positions cannot be mixed up
//! with sizes, depths or in-memory indices, and all arithmetic on it is
//! overflow-checked.

use crate::error::{ArchiveError, Result};
use std::fmt;

/// Absolute byte position inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ArchiveOffset(u64);

impl ArchiveOffset {
    /// The start of the container; also the on-disk "no pointer" sentinel.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw position.
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// The raw position.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Advance by `len` bytes.
    pub fn checked_add(self, len: u64) -> Result<Self> {
        self.0
            .checked_add(len)
            .map(Self)
            .ok_or(ArchiveError::OffsetOverflow {
                offset: self.0,
                len,
            })
    }

    /// Advance in place by `len` bytes.
    pub fn advance(&mut self, len: u64) -> Result<()> {
        *self = self.checked_add(len)?;
        Ok(())
    }
}

impl From<u64> for ArchiveOffset {
    fn from(offset: u64) -> Self {
        Self(offset)
    }
}

impl From<ArchiveOffset> for u64 {
    fn from(offset: ArchiveOffset) -> Self {
        offset.0
    }
}

impl fmt::Display for ArchiveOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
