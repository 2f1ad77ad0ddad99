//! Bounded, region-based read cache for one medium.
//!
//! Cached regions never overlap, never exceed the configured region size and
//! their total size never exceeds the configured cache size. Regions are
//! evicted in insertion order once the total size bound is crossed.


use std::collections::{BTreeMap, BTreeSet};

use crate::chunk::walk_chunks;
use crate::config::MediumConfig;
use crate::error::MediumError;
use crate::offset::{MediumId, Offset};
use crate::region::{Overlap, Region};

/// A cached region plus the insertion stamp used for eviction.
#[derive(Debug, Clone)]
struct CacheEntry {
    region: Region,
    stamp: u64,
}

/// Region cache of one medium.
#[derive(Debug)]
pub struct MediumCache {
    /// Medium all cached regions belong to
    medium: MediumId,
    /// Upper bound for the sum of all region sizes
    max_cache_size: u64,
    /// Upper bound for a single region's size
    max_region_size: u64,
    /// Cached regions keyed by absolute start offset
    regions: BTreeMap<u64, CacheEntry>,
    /// `(stamp, start)` pairs, oldest insertion first
    insertion_order: BTreeSet<(u64, u64)>,
    /// Sum of all cached region sizes
    current_size: u64,
    /// Stamp handed to the next inserted region
    next_stamp: u64,
}

impl MediumCache {
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `medium` - Medium the cache belongs to
    /// * `max_cache_size` - Maximum total cached bytes, must be > 0
    /// * `max_region_size` - Maximum bytes per region, must be > 0 and
    ///   not exceed `max_cache_size`
    pub fn new(
        medium: MediumId,
        max_cache_size: u64,
        max_region_size: u64,
    ) -> Result<Self, MediumError> {
        if max_cache_size == 0 || max_region_size == 0 {
            return Err(MediumError::InvalidArgument(
                "cache sizes must be > 0".to_string(),
            ));
        }
        if max_region_size > max_cache_size {
            return Err(MediumError::InvalidArgument(format!(
                "max region size {} exceeds max cache size {}",
                max_region_size, max_cache_size
            )));
        }
        Ok(Self {
            medium,
            max_cache_size,
            max_region_size,
            regions: BTreeMap::new(),
            insertion_order: BTreeSet::new(),
            current_size: 0,
            next_stamp: 0,
        })
    }

    /// Creates an empty cache sized according to `config`.
    pub fn with_config(medium: MediumId, config: &MediumConfig) -> Result<Self, MediumError> {
        Self::new(medium, config.max_cache_size, config.max_cache_region_size)
    }

    /// Returns the medium this cache belongs to.
    pub fn medium(&self) -> MediumId {
        self.medium
    }

    /// Returns the maximum total cache size in bytes.
    pub fn max_cache_size(&self) -> u64 {
        self.max_cache_size
    }

    /// Returns the maximum size of a single cached region in bytes.
    pub fn max_region_size(&self) -> u64 {
        self.max_region_size
    }

    /// Adds freshly read data to the cache.
    ///
    /// Existing regions covered by `region` are dropped, partially covered
    /// ones are trimmed to their uncovered remainder. `region` is split into
    /// pieces of at most the maximum region size. Afterwards the oldest
    /// insertions are evicted until the total size bound holds again, which
    /// may include leading pieces of `region` itself.
    ///
    /// # Arguments
    /// * `region` - Region with payload on this cache's medium
    ///
    /// # Returns
    /// `Result<(), MediumError>`; the cache is unchanged on error.
    pub fn add_region(&mut self, region: Region) -> Result<(), MediumError> {
        region.start().ensure_medium(self.medium)?;
        let Some(bytes) = region.bytes() else {
            return Err(MediumError::InvalidArgument(format!(
                "region {} carries no data to cache",
                region
            )));
        };

        tracing::debug!("Adding region {} to cache", region);

        let pieces = walk_chunks(
            region.start(),
            region.size(),
            self.max_region_size,
            |chunk_start, chunk_size| {
                let from = (chunk_start.absolute() - region.start().absolute()) as usize;
                let to = from + chunk_size as usize;
                Region::with_bytes(chunk_start, bytes[from..to].to_vec())
            },
        )?;

        self.clip_cached_regions(&region)?;

        for piece in pieces {
            let stamp = self.next_stamp;
            self.next_stamp += 1;
            self.insert_entry(CacheEntry {
                region: piece,
                stamp,
            });
        }

        self.evict_to_max_size();
        Ok(())
    }

    /// Drops all cached bytes inside `[start, start + size)`.
    ///
    /// Regions partially inside the range keep their remainder outside of it.
    pub fn remove_regions_in_range(&mut self, start: Offset, size: u64) -> Result<(), MediumError> {
        start.ensure_medium(self.medium)?;
        let range = Region::new(start, size)?;

        tracing::debug!("Removing cached regions in range {}", range);

        self.clip_cached_regions(&range)
    }

    /// Returns regions covering `[start, start + size)` without gaps.
    ///
    /// Cached regions overlapping the range are returned unclipped, together
    /// with payload-free gap regions of at most the maximum region size. If
    /// the whole range lies inside a single cached region, only that region
    /// is returned.
    ///
    /// # Returns
    /// `InvalidRange` if `size` is 0 or `start` belongs to another medium.
    pub fn get_regions_in_range(&self, start: Offset, size: u64) -> Result<Vec<Region>, MediumError> {
        start.ensure_medium(self.medium)?;
        let range = Region::new(start, size)?;
        let range_end = range.end_absolute();

        let mut result = Vec::new();
        let mut previous_end = start.absolute();

        for entry in self.overlapping_entries(&range) {
            let cached = &entry.region;
            if matches!(
                cached.overlap(&range),
                Overlap::RightFullyInsideLeft | Overlap::SameRange
            ) {
                return Ok(vec![cached.clone()]);
            }
            let cached_start = cached.start().absolute();
            if cached_start > previous_end {
                result.extend(self.gaps(previous_end, cached_start - previous_end)?);
            }
            result.push(cached.clone());
            previous_end = cached.end_absolute();
        }

        if range_end > previous_end {
            result.extend(self.gaps(previous_end, range_end - previous_end)?);
        }

        Ok(result)
    }

    /// Returns the number of consecutively cached bytes starting at `start`.
    ///
    /// Stops at the first uncached byte; returns 0 if `start` is not cached.
    pub fn get_cached_byte_count_at(&self, start: Offset) -> Result<u64, MediumError> {
        start.ensure_medium(self.medium)?;
        let position = start.absolute();

        let Some((_, first)) = self.regions.range(..=position).next_back() else {
            return Ok(0);
        };
        if !first.region.contains(&start) {
            return Ok(0);
        }

        let mut count = first.region.end_absolute() - position;
        let mut previous_end = first.region.end_absolute();

        for (&next_start, next) in self.regions.range(position + 1..) {
            if next_start != previous_end {
                break;
            }
            count += next.region.size();
            previous_end = next.region.end_absolute();
        }

        Ok(count)
    }

    /// Returns copies of all cached regions in ascending offset order.
    pub fn get_all_cached_regions(&self) -> Vec<Region> {
        self.regions
            .values()
            .map(|entry| entry.region.clone())
            .collect()
    }

    /// Returns the total number of cached bytes.
    pub fn calculate_current_size(&self) -> u64 {
        self.current_size
    }

    /// Drops every cached region.
    pub fn clear(&mut self) {
        self.regions.clear();
        self.insertion_order.clear();
        self.current_size = 0;
    }

    /// Entries whose regions share at least one byte with `range`, by offset.
    fn overlapping_entries<'a>(&'a self, range: &'a Region) -> impl Iterator<Item = &'a CacheEntry> {
        let start = range.start().absolute();
        let before = self
            .regions
            .range(..start)
            .next_back()
            .map(|(_, entry)| entry)
            .filter(move |entry| entry.region.end_absolute() > start);
        let inside = self
            .regions
            .range(start..range.end_absolute())
            .map(|(_, entry)| entry);
        before.into_iter().chain(inside)
    }

    /// Removes every cached byte covered by `range`, keeping remainders.
    ///
    /// Remainders keep the insertion stamp of the region they came from.
    fn clip_cached_regions(&mut self, range: &Region) -> Result<(), MediumError> {
        let overlapping: Vec<u64> = self
            .overlapping_entries(range)
            .map(|entry| entry.region.start().absolute())
            .collect();

        let mut replacements = Vec::new();
        for start in &overlapping {
            let Some(entry) = self.regions.get(start) else {
                continue;
            };
            let Some(clip) = entry.region.clip(range)? else {
                continue;
            };
            for remainder in [clip.front, clip.back].into_iter().flatten() {
                replacements.push(CacheEntry {
                    region: remainder,
                    stamp: entry.stamp,
                });
            }
        }

        for start in overlapping {
            self.remove_entry(start);
        }
        for entry in replacements {
            self.insert_entry(entry);
        }
        Ok(())
    }

    /// Synthesizes payload-free regions for an uncached gap.
    fn gaps(&self, start: u64, size: u64) -> Result<Vec<Region>, MediumError> {
        walk_chunks(
            Offset::new(self.medium, start),
            size,
            self.max_region_size,
            Region::new,
        )
    }

    fn evict_to_max_size(&mut self) {
        while self.current_size > self.max_cache_size {
            let Some((stamp, start)) = self.insertion_order.pop_first() else {
                break;
            };
            if let Some(entry) = self.regions.remove(&start) {
                debug_assert_eq!(entry.stamp, stamp);
                self.current_size -= entry.region.size();
                tracing::debug!("Evicted region {} from cache", entry.region);
            }
        }
    }

    fn insert_entry(&mut self, entry: CacheEntry) {
        let start = entry.region.start().absolute();
        self.remove_entry(start);
        self.current_size += entry.region.size();
        self.insertion_order.insert((entry.stamp, start));
        self.regions.insert(start, entry);
    }

    fn remove_entry(&mut self, start: u64) {
        if let Some(entry) = self.regions.remove(&start) {
            self.current_size -= entry.region.size();
            self.insertion_order.remove(&(entry.stamp, start));
        }
    }
}
