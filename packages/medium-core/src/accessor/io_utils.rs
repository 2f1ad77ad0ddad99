//! I/O utilities for medium accessors.

use std::io::{ErrorKind, Read};

use crate::error::MediumError;

/// Classifies I/O errors into MediumError variants.
///
/// Nothing is retried here; transient failures surface like any other.
pub fn classify_io_error(error: std::io::Error, context: &str) -> MediumError {
    match error.kind() {
        ErrorKind::ReadOnlyFilesystem => {
            MediumError::ReadOnlyMedium(format!("{}: {}", context, error))
        }
        ErrorKind::StorageFull | ErrorKind::OutOfMemory => {
            MediumError::MediumAccessFailure(format!("{} (storage full): {}", context, error))
        }
        kind => MediumError::MediumAccessFailure(format!("{} ({:?}): {}", context, kind, error)),
    }
}

/// Reads until `buffer` is full or the reader is exhausted.
///
/// # Returns
/// The number of bytes read, less than `buffer.len()` only at end of input.
pub fn read_up_to<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
