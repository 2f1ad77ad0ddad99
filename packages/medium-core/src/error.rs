//! Medium access error types.

use thiserror::Error;

/// Medium access, caching and editing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediumError {
    /// Zero-sized, out-of-bounds or cross-medium range
    #[error("Invalid range at offset {offset} (size={size}): {reason}")]
    InvalidRange {
        offset: u64,
        size: u64,
        reason: String,
    },

    /// Invalid configuration or call argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// New edit collides with a pending remove or replace
    #[error("Edit [{requested_offset}, +{requested_size}) overlaps pending edit [{existing_offset}, +{existing_size})")]
    OverlappingEdit {
        existing_offset: u64,
        existing_size: u64,
        requested_offset: u64,
        requested_size: u64,
    },

    /// Action is not (or no longer) pending in this change manager
    #[error("Unknown action at offset {offset} (sequence={sequence})")]
    UnknownAction { offset: u64, sequence: u32 },

    /// Too many actions scheduled at one offset
    #[error("Sequence number overflow for actions at offset {offset}")]
    SequenceOverflow { offset: u64 },

    /// Fewer bytes available than requested
    #[error("End of medium at offset {offset}: requested {requested} bytes, read {bytes_read}")]
    EndOfMedium {
        offset: u64,
        requested: u64,
        bytes_read: u64,
        partial: Vec<u8>,
    },

    /// Write access to a read-only medium
    #[error("Medium is read-only: {0}")]
    ReadOnlyMedium(String),

    /// Medium store or accessor is not open
    #[error("Medium is closed")]
    MediumClosed,

    /// I/O failure reported by an accessor
    #[error("Medium access failure: {0}")]
    MediumAccessFailure(String),
}

impl MediumError {
    /// Returns `true` for the end-of-medium condition callers usually recover from.
    pub fn is_end_of_medium(&self) -> bool {
        matches!(self, MediumError::EndOfMedium { .. })
    }

    /// Returns the bytes read before the medium ended, if this is `EndOfMedium`.
    pub fn partial_bytes(&self) -> Option<&[u8]> {
        match self {
            MediumError::EndOfMedium { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Returns how many bytes were read before the medium ended, if this is `EndOfMedium`.
    pub fn bytes_read(&self) -> Option<u64> {
        match self {
            MediumError::EndOfMedium { bytes_read, .. } => Some(*bytes_read),
            _ => None,
        }
    }

    pub(crate) fn invalid_range(offset: u64, size: u64, reason: impl Into<String>) -> Self {
        MediumError::InvalidRange {
            offset,
            size,
            reason: reason.into(),
        }
    }
}
