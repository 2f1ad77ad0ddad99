//! Contiguous byte ranges on a medium, optionally carrying cached bytes.

use std::fmt;

use crate::error::MediumError;
use crate::offset::Offset;

/// Classification of how a "left" region overlaps a "right" region.
///
/// The caller decides which region is the left one; every variant is phrased
/// from the left region's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// The regions share no byte
    NoOverlap,
    /// Both regions cover exactly the same bytes
    SameRange,
    /// Every byte of left lies inside right, right is bigger
    LeftFullyInsideRight,
    /// Every byte of right lies inside left, left is bigger
    RightFullyInsideLeft,
    /// Left starts first and its back overlaps the front of right
    LeftOverlapsRightAtFront,
    /// Right starts first and left's front overlaps the back of right
    LeftOverlapsRightAtBack,
}

/// Result of clipping a region against another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    /// Part of the clipped region before the other region
    pub front: Option<Region>,
    /// Part of the clipped region covered by the other region
    pub overlapped: Region,
    /// Part of the clipped region behind the other region
    pub back: Option<Region>,
}

/// Contiguous byte range `[start, start + size)` with optional payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Region {
    start: Offset,
    size: u64,
    bytes: Option<Vec<u8>>,
}

impl Region {
    /// Creates a region without payload.
    ///
    /// # Arguments
    /// * `start` - First byte of the region
    /// * `size` - Number of bytes, must be > 0
    pub fn new(start: Offset, size: u64) -> Result<Self, MediumError> {
        if size == 0 {
            return Err(MediumError::invalid_range(
                start.absolute(),
                size,
                "region size must be > 0",
            ));
        }
        if start.absolute().checked_add(size).is_none() {
            return Err(MediumError::invalid_range(
                start.absolute(),
                size,
                "region end exceeds the addressable range",
            ));
        }
        Ok(Self {
            start,
            size,
            bytes: None,
        })
    }

    /// Creates a region carrying `bytes`; its size is the payload length.
    pub fn with_bytes(start: Offset, bytes: Vec<u8>) -> Result<Self, MediumError> {
        let mut region = Region::new(start, bytes.len() as u64)?;
        region.bytes = Some(bytes);
        Ok(region)
    }

    /// Returns the first byte of the region.
    pub fn start(&self) -> Offset {
        self.start
    }

    /// Returns the number of bytes covered.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the offset one byte behind the region.
    pub fn end(&self) -> Offset {
        Offset::new(self.start.medium(), self.end_absolute())
    }

    /// Returns the absolute position one byte behind the region.
    pub fn end_absolute(&self) -> u64 {
        self.start.absolute() + self.size
    }

    /// Returns the payload, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// Consumes the region, returning its payload.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        self.bytes
    }

    /// Returns `true` if the region carries payload.
    pub fn is_cached(&self) -> bool {
        self.bytes.is_some()
    }

    /// Returns `true` if `offset` lies within `[start, end)`.
    pub fn contains(&self, offset: &Offset) -> bool {
        offset.medium() == self.start.medium()
            && offset.absolute() >= self.start.absolute()
            && offset.absolute() < self.end_absolute()
    }

    /// Returns the number of bytes both regions have in common.
    pub fn overlapping_byte_count(&self, other: &Region) -> u64 {
        if self.start.medium() != other.start.medium() {
            return 0;
        }
        let start = self.start.absolute().max(other.start.absolute());
        let end = self.end_absolute().min(other.end_absolute());
        end.saturating_sub(start)
    }

    /// Classifies the overlap of `self` (left) with `other` (right).
    pub fn overlap(&self, other: &Region) -> Overlap {
        if self.overlapping_byte_count(other) == 0 {
            return Overlap::NoOverlap;
        }

        let (left_start, left_end) = (self.start.absolute(), self.end_absolute());
        let (right_start, right_end) = (other.start.absolute(), other.end_absolute());

        if left_start == right_start && left_end == right_end {
            Overlap::SameRange
        } else if right_start <= left_start && left_end <= right_end {
            Overlap::LeftFullyInsideRight
        } else if left_start <= right_start && right_end <= left_end {
            Overlap::RightFullyInsideLeft
        } else if left_start < right_start {
            Overlap::LeftOverlapsRightAtFront
        } else {
            Overlap::LeftOverlapsRightAtBack
        }
    }

    /// Splits the region into `[start, at)` and `[at, end)`.
    ///
    /// # Returns
    /// `InvalidRange` unless `at` lies strictly inside the region.
    pub fn split_at(&self, at: &Offset) -> Result<(Region, Region), MediumError> {
        if !self.contains(at) || at.absolute() == self.start.absolute() {
            return Err(MediumError::invalid_range(
                at.absolute(),
                self.size,
                format!("split point outside of region {}", self),
            ));
        }

        let first_size = at.absolute() - self.start.absolute();
        match &self.bytes {
            Some(bytes) => {
                let (first, second) = bytes.split_at(first_size as usize);
                Ok((
                    Region::with_bytes(self.start, first.to_vec())?,
                    Region::with_bytes(*at, second.to_vec())?,
                ))
            }
            None => Ok((
                Region::new(self.start, first_size)?,
                Region::new(*at, self.size - first_size)?,
            )),
        }
    }

    /// Cuts `self` into the part covered by `other` and the uncovered remainders.
    ///
    /// # Returns
    /// `None` if the regions do not overlap.
    pub fn clip(&self, other: &Region) -> Result<Option<Clip>, MediumError> {
        if self.overlapping_byte_count(other) == 0 {
            return Ok(None);
        }

        let mut front = None;
        let mut back = None;
        let mut overlapped = self.clone();

        if self.start.is_before(&other.start) {
            let (head, rest) = overlapped.split_at(&other.start)?;
            front = Some(head);
            overlapped = rest;
        }

        if other.end_absolute() < overlapped.end_absolute() {
            let (rest, tail) = overlapped.split_at(&other.end())?;
            overlapped = rest;
            back = Some(tail);
        }

        Ok(Some(Clip {
            front,
            overlapped,
            back,
        }))
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("start", &self.start)
            .field("size", &self.size)
            .field("cached", &self.is_cached())
            .finish()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) on {}",
            self.start.absolute(),
            self.end_absolute(),
            self.start.medium()
        )
    }
}
