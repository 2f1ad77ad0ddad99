//! Division of byte ranges into bounded chunks.

use crate::error::MediumError;
use crate::offset::Offset;

/// Iterator over `(start, size)` chunks of an absolute byte range.
///
/// All chunks but the last have exactly `chunk_size` bytes; the last one
/// holds the remainder.
#[derive(Debug, Clone)]
pub struct Chunks {
    next_start: u64,
    end: u64,
    chunk_size: u64,
}

impl Chunks {
    /// Creates a chunk iterator for `[start, start + total_size)`.
    ///
    /// # Returns
    /// `InvalidArgument` if `chunk_size` is 0, `InvalidRange` if the range
    /// is empty or its end overflows.
    pub fn new(start: u64, total_size: u64, chunk_size: u64) -> Result<Self, MediumError> {
        if chunk_size == 0 {
            return Err(MediumError::InvalidArgument(
                "chunk size must be > 0".to_string(),
            ));
        }
        if total_size == 0 {
            return Err(MediumError::invalid_range(
                start,
                total_size,
                "cannot chunk an empty range",
            ));
        }
        let end = start.checked_add(total_size).ok_or_else(|| {
            MediumError::invalid_range(start, total_size, "range end exceeds the addressable range")
        })?;
        Ok(Self {
            next_start: start,
            end,
            chunk_size,
        })
    }
}

impl Iterator for Chunks {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_start >= self.end {
            return None;
        }
        let start = self.next_start;
        let size = self.chunk_size.min(self.end - start);
        self.next_start = start + size;
        Some((start, size))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next_start);
        let count = remaining.div_ceil(self.chunk_size) as usize;
        (count, Some(count))
    }
}

impl DoubleEndedIterator for Chunks {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.next_start >= self.end {
            return None;
        }
        let remaining = self.end - self.next_start;
        let last_size = match remaining % self.chunk_size {
            0 => self.chunk_size,
            rest => rest,
        };
        self.end -= last_size;
        Some((self.end, last_size))
    }
}

/// Applies `action` to each chunk of `[start, start + total_size)` in
/// ascending order and collects the results.
///
/// # Arguments
/// * `start` - Start of the range
/// * `total_size` - Size of the range, must be > 0
/// * `chunk_size` - Maximum chunk size, must be > 0
/// * `action` - Called with each chunk's start offset and size
///
/// # Returns
/// The results in chunk order, or the first error returned by `action`.
pub fn walk_chunks<T, F>(
    start: Offset,
    total_size: u64,
    chunk_size: u64,
    mut action: F,
) -> Result<Vec<T>, MediumError>
where
    F: FnMut(Offset, u64) -> Result<T, MediumError>,
{
    let chunks = Chunks::new(start.absolute(), total_size, chunk_size)?;
    let mut results = Vec::with_capacity(chunks.size_hint().0);
    for (chunk_start, chunk_size) in chunks {
        results.push(action(Offset::new(start.medium(), chunk_start), chunk_size)?);
    }
    Ok(results)
}
