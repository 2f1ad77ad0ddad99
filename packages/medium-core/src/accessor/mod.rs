//! Byte-level access to the storage behind a medium.
//!
//! Accessors are positioned: `read`, `write` and `truncate` act at the
//! current position. They are the only part of the crate touching storage.

mod file;
pub mod io_utils;
mod memory;

pub use file::FileAccessor;
pub use memory::MemoryAccessor;

use crate::error::MediumError;
use crate::offset::{MediumId, Offset};

/// Positioned read/write access to one medium.
pub trait Accessor {
    /// Returns the identity of the accessed medium.
    fn medium(&self) -> MediumId;

    /// Opens the underlying storage. Opening an open accessor does nothing.
    fn open(&mut self) -> Result<(), MediumError>;

    /// Closes the underlying storage.
    ///
    /// # Returns
    /// `MediumClosed` if the accessor is not open.
    fn close(&mut self) -> Result<(), MediumError>;

    fn is_open(&self) -> bool;

    fn is_read_only(&self) -> bool;

    /// Returns the current medium length in bytes.
    fn len(&self) -> Result<u64, MediumError>;

    fn is_empty(&self) -> Result<bool, MediumError> {
        Ok(self.len()? == 0)
    }

    /// Moves the position used by the next read, write or truncate.
    ///
    /// Positions behind the end are allowed; writing there zero-fills the gap.
    fn set_position(&mut self, offset: Offset) -> Result<(), MediumError>;

    fn current_position(&self) -> Result<Offset, MediumError>;

    /// Returns `true` if the position is at or behind the end of the medium.
    fn is_at_end(&self) -> Result<bool, MediumError> {
        Ok(self.current_position()?.absolute() >= self.len()?)
    }

    /// Fills `buffer` from the current position and advances past the read bytes.
    ///
    /// # Returns
    /// `buffer.len()`, or `EndOfMedium` carrying the bytes read if the medium
    /// ends first.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, MediumError>;

    /// Writes `buffer` at the current position and advances past it.
    ///
    /// # Returns
    /// `ReadOnlyMedium` on read-only media.
    fn write(&mut self, buffer: &[u8]) -> Result<(), MediumError>;

    /// Cuts the medium at the current position.
    ///
    /// # Returns
    /// `ReadOnlyMedium` on read-only media.
    fn truncate(&mut self) -> Result<(), MediumError>;
}

/// Builds the `EndOfMedium` error for a short read.
pub(crate) fn end_of_medium(offset: u64, requested: usize, partial: &[u8]) -> MediumError {
    MediumError::EndOfMedium {
        offset,
        requested: requested as u64,
        bytes_read: partial.len() as u64,
        partial: partial.to_vec(),
    }
}
