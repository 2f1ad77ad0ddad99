use crate::error::MediumError;
use crate::offset::{MediumId, Offset};

use super::{end_of_medium, Accessor};

/// Accessor over a growable in-memory byte buffer.
#[derive(Debug)]
pub struct MemoryAccessor {
    medium: MediumId,
    bytes: Vec<u8>,
    position: u64,
    read_only: bool,
    open: bool,
}

impl MemoryAccessor {
    /// Creates a closed, writable accessor over `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            medium: MediumId::next(),
            bytes,
            position: 0,
            read_only: false,
            open: false,
        }
    }

    /// Creates a closed, read-only accessor over `bytes`.
    pub fn read_only(bytes: Vec<u8>) -> Self {
        Self {
            read_only: true,
            ..Self::new(bytes)
        }
    }

    /// Returns the buffer contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn ensure_open(&self) -> Result<(), MediumError> {
        if !self.open {
            return Err(MediumError::MediumClosed);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), MediumError> {
        self.ensure_open()?;
        if self.read_only {
            return Err(MediumError::ReadOnlyMedium(format!(
                "memory buffer {}",
                self.medium
            )));
        }
        Ok(())
    }
}

impl Accessor for MemoryAccessor {
    fn medium(&self) -> MediumId {
        self.medium
    }

    fn open(&mut self) -> Result<(), MediumError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), MediumError> {
        self.ensure_open()?;
        self.open = false;
        self.position = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn len(&self) -> Result<u64, MediumError> {
        self.ensure_open()?;
        Ok(self.bytes.len() as u64)
    }

    fn set_position(&mut self, offset: Offset) -> Result<(), MediumError> {
        self.ensure_open()?;
        offset.ensure_medium(self.medium)?;
        self.position = offset.absolute();
        Ok(())
    }

    fn current_position(&self) -> Result<Offset, MediumError> {
        self.ensure_open()?;
        Ok(Offset::new(self.medium, self.position))
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, MediumError> {
        self.ensure_open()?;
        let start = self.position.min(self.bytes.len() as u64) as usize;
        let available = (self.bytes.len() - start).min(buffer.len());
        buffer[..available].copy_from_slice(&self.bytes[start..start + available]);

        let offset = self.position;
        self.position += available as u64;
        if available < buffer.len() {
            return Err(end_of_medium(offset, buffer.len(), &buffer[..available]));
        }
        Ok(available)
    }

    fn write(&mut self, buffer: &[u8]) -> Result<(), MediumError> {
        self.ensure_writable()?;
        let start = usize::try_from(self.position).map_err(|_| {
            MediumError::invalid_range(self.position, buffer.len() as u64, "position exceeds memory")
        })?;
        let end = start + buffer.len();
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[start..end].copy_from_slice(buffer);
        self.position = end as u64;
        Ok(())
    }

    fn truncate(&mut self) -> Result<(), MediumError> {
        self.ensure_writable()?;
        self.bytes.truncate(self.position.min(self.bytes.len() as u64) as usize);
        Ok(())
    }
}
