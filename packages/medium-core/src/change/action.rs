use std::fmt;

use crate::error::MediumError;
use crate::region::Region;

/// Kind of a medium action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Insert payload bytes before the region start
    Insert,
    /// Remove the region's bytes
    Remove,
    /// Replace the region's bytes by the payload
    Replace,
    /// Read the region's bytes (flush plan step)
    Read,
    /// Write payload, or the preceding read's bytes, to the region (flush plan step)
    Write,
    /// Cut the medium at the region start (flush plan step)
    Truncate,
}

/// A scheduled edit or a single step of a flush plan.
#[derive(Clone, PartialEq, Eq)]
pub struct Action {
    /// Identity assigned by the change manager, 0 for plan steps
    pub(crate) id: u64,
    /// Kind of the action
    pub(crate) kind: ActionKind,
    /// Affected region; for inserts its size is the payload length
    pub(crate) region: Region,
    /// Disambiguates actions anchored at the same offset
    pub(crate) sequence: u32,
    /// Inserted, replacing or written bytes
    pub(crate) payload: Option<Vec<u8>>,
    /// `true` while the edit is scheduled but neither undone nor flushed
    pub(crate) pending: bool,
}

impl Action {
    pub(crate) fn step(kind: ActionKind, region: Region, payload: Option<Vec<u8>>) -> Self {
        Self {
            id: 0,
            kind,
            region,
            sequence: 0,
            payload,
            pending: false,
        }
    }

    /// Returns the action kind.
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Returns the affected region.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Returns the sequence number among actions at the same start offset.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Returns the payload bytes, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Returns `true` while the edit is neither undone nor flushed.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns how many bytes this edit adds to (or removes from) the medium.
    ///
    /// # Returns
    /// The signed size change, `InvalidRange` if it does not fit an `i64`.
    pub fn size_delta(&self) -> Result<i64, MediumError> {
        let overflow = || {
            MediumError::invalid_range(
                self.region.start().absolute(),
                self.region.size(),
                "edit size delta exceeds the addressable range",
            )
        };
        let payload_len = self.payload.as_ref().map_or(0, Vec::len);
        let added = i64::try_from(payload_len).map_err(|_| overflow())?;
        let removed = i64::try_from(self.region.size()).map_err(|_| overflow())?;
        Ok(match self.kind {
            ActionKind::Insert => added,
            ActionKind::Remove => -removed,
            ActionKind::Replace => added - removed,
            ActionKind::Read | ActionKind::Write | ActionKind::Truncate => 0,
        })
    }

    /// Ordering key of pending actions: start offset, then sequence.
    pub(crate) fn key(&self) -> (u64, u32) {
        (self.region.start().absolute(), self.sequence)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("kind", &self.kind)
            .field("region", &self.region)
            .field("sequence", &self.sequence)
            .field("payload_len", &self.payload.as_ref().map(Vec::len))
            .field("pending", &self.pending)
            .finish()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} #{}", self.kind, self.region, self.sequence)
    }
}
