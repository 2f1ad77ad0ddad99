//! Medium identities and absolute byte offsets.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::error::MediumError;

static NEXT_MEDIUM_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one logical medium (file, memory buffer, stream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediumId(u64);

impl MediumId {
    /// Allocates a process-unique medium identity.
    pub fn next() -> Self {
        MediumId(NEXT_MEDIUM_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Returns the raw identity value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MediumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "medium#{}", self.0)
    }
}

/// Absolute byte position within one specific medium.
///
/// Offsets of different media are never ordered against each other:
/// `partial_cmp` returns `None` and both `<` and `>` are `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Offset {
    medium: MediumId,
    absolute: u64,
}

impl Offset {
    /// Creates an offset at `absolute` bytes from the start of `medium`.
    pub fn new(medium: MediumId, absolute: u64) -> Self {
        Self { medium, absolute }
    }

    /// Returns the medium this offset belongs to.
    pub fn medium(&self) -> MediumId {
        self.medium
    }

    /// Returns the absolute byte position.
    pub fn absolute(&self) -> u64 {
        self.absolute
    }

    /// Returns a new offset moved by `delta` bytes (may be negative).
    ///
    /// # Returns
    /// `InvalidRange` if the result would be negative or overflow `u64`.
    pub fn advance(&self, delta: i64) -> Result<Offset, MediumError> {
        let absolute = self.absolute.checked_add_signed(delta).ok_or_else(|| {
            MediumError::invalid_range(
                self.absolute,
                delta.unsigned_abs(),
                format!("advancing by {} leaves the addressable range", delta),
            )
        })?;
        Ok(Offset::new(self.medium, absolute))
    }

    /// Returns the signed distance from `self` to `other` (`other - self`).
    ///
    /// # Returns
    /// `InvalidRange` if both offsets refer to different media.
    pub fn distance_to(&self, other: &Offset) -> Result<i64, MediumError> {
        self.ensure_same_medium(other)?;
        let distance = other.absolute as i128 - self.absolute as i128;
        i64::try_from(distance).map_err(|_| {
            MediumError::invalid_range(self.absolute, 0, "distance does not fit into i64")
        })
    }

    /// Returns `true` if `self` lies strictly before `other` on the same medium.
    pub fn is_before(&self, other: &Offset) -> bool {
        self.medium == other.medium && self.absolute < other.absolute
    }

    /// Returns `true` if `self` lies at or behind `other` on the same medium.
    pub fn is_behind_or_equal(&self, other: &Offset) -> bool {
        self.medium == other.medium && self.absolute >= other.absolute
    }

    pub(crate) fn ensure_same_medium(&self, other: &Offset) -> Result<(), MediumError> {
        self.ensure_medium(other.medium)
    }

    pub(crate) fn ensure_medium(&self, medium: MediumId) -> Result<(), MediumError> {
        if self.medium != medium {
            return Err(MediumError::invalid_range(
                self.absolute,
                0,
                format!("offset of {} used with {}", self.medium, medium),
            ));
        }
        Ok(())
    }
}

impl PartialOrd for Offset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.medium != other.medium {
            return None;
        }
        Some(self.absolute.cmp(&other.absolute))
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.medium, self.absolute)
    }
}
