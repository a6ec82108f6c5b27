//! Schema version identifiers.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Identifies one variant in a schema's evolution history.
///
/// Versions are positive integers starting at 1. A registry always holds the
/// contiguous range `v1..=vN`, so `next` is the only successor a converter
/// may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SchemaVersion(NonZeroU32);

impl SchemaVersion {
    /// The first version of every schema.
    pub const FIRST: Self = match NonZeroU32::new(1) {
        Some(n) => Self(n),
        None => unreachable!(),
    };

    /// Create a version from its number. Returns `None` for 0.
    pub const fn new(n: u32) -> Option<Self> {
        match NonZeroU32::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// The version number.
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The version that directly follows this one, if representable.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// The version directly before this one. `None` for v1.
    pub fn prev(self) -> Option<Self> {
        Self::new(self.get() - 1)
    }

    /// Whether `other` is the direct successor of `self`.
    pub fn is_followed_by(self, other: Self) -> bool {
        self.next() == Some(other)
    }

    /// Index of this version in a `v1`-based dense array.
    pub(crate) fn index(self) -> usize {
        (self.get() - 1) as usize
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A raw version number of 0 was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("schema versions start at 1")]
pub struct ZeroVersion;

impl TryFrom<u32> for SchemaVersion {
    type Error = ZeroVersion;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n).ok_or(ZeroVersion)
    }
}

impl From<SchemaVersion> for u32 {
    fn from(v: SchemaVersion) -> u32 {
        v.get()
    }
}
