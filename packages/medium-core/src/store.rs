//! Medium store: cached reads and deferred edits over one accessor.

use crate::accessor::{end_of_medium, Accessor};
use crate::cache::MediumCache;
use crate::change::{Action, ActionKind, ChangeManager, FlushPlan};
use crate::chunk::walk_chunks;
use crate::config::MediumConfig;
use crate::error::MediumError;
use crate::offset::{MediumId, Offset};
use crate::region::Region;

/// Reads, caches and edits one medium through an accessor.
///
/// Edits stay pending until `flush` writes them with bounded I/O. The cache
/// and pending edits are owned by the store and dropped on `close`.
#[derive(Debug)]
pub struct MediumStore<A: Accessor> {
    /// Storage access
    accessor: A,
    /// Sizes and caching switch
    config: MediumConfig,
    /// Read cache of the medium
    cache: MediumCache,
    /// Pending edits of the medium
    changes: ChangeManager,
}

impl<A: Accessor> MediumStore<A> {
    /// Creates a store over `accessor`. The store starts closed.
    ///
    /// # Returns
    /// `InvalidArgument` if `config` is invalid.
    pub fn new(accessor: A, config: MediumConfig) -> Result<Self, MediumError> {
        config.validate()?;
        let medium = accessor.medium();
        Ok(Self {
            cache: MediumCache::with_config(medium, &config)?,
            changes: ChangeManager::new(medium),
            accessor,
            config,
        })
    }

    pub fn open(&mut self) -> Result<(), MediumError> {
        self.accessor.open()
    }

    /// Closes the accessor, dropping cached data and pending edits.
    pub fn close(&mut self) -> Result<(), MediumError> {
        self.ensure_open()?;
        self.cache.clear();
        self.changes.clear_all();
        self.accessor.close()
    }

    pub fn is_open(&self) -> bool {
        self.accessor.is_open()
    }

    pub fn medium(&self) -> MediumId {
        self.accessor.medium()
    }

    pub fn config(&self) -> &MediumConfig {
        &self.config
    }

    /// Returns the current length of the medium, not counting pending edits.
    pub fn medium_length(&self) -> Result<u64, MediumError> {
        self.ensure_open()?;
        self.accessor.len()
    }

    /// Creates an offset of this medium.
    ///
    /// # Returns
    /// `InvalidRange` if `absolute` lies behind the end of the medium.
    pub fn create_offset(&self, absolute: u64) -> Result<Offset, MediumError> {
        let length = self.medium_length()?;
        if absolute > length {
            return Err(MediumError::invalid_range(
                absolute,
                0,
                format!("offset behind medium end {}", length),
            ));
        }
        Ok(Offset::new(self.medium(), absolute))
    }

    /// Returns `true` if `offset` is at or behind the end of the medium.
    pub fn is_at_end_of_medium(&self, offset: Offset) -> Result<bool, MediumError> {
        offset.ensure_medium(self.medium())?;
        Ok(offset.absolute() >= self.medium_length()?)
    }

    /// Returns the number of consecutively cached bytes at `offset`.
    pub fn get_cached_byte_count_at(&self, offset: Offset) -> Result<u64, MediumError> {
        self.ensure_open()?;
        self.cache.get_cached_byte_count_at(offset)
    }

    /// Reads the uncached parts of `[offset, offset + size)` into the cache.
    ///
    /// Does nothing if caching is disabled.
    ///
    /// # Returns
    /// `EndOfMedium` if the medium ends inside the range; the bytes read up
    /// to the end are cached anyway.
    pub fn cache(&mut self, offset: Offset, size: u64) -> Result<(), MediumError> {
        self.ensure_open()?;
        offset.ensure_medium(self.medium())?;
        if !self.config.caching_enabled {
            return Ok(());
        }
        self.load(offset, size).map(|_| ())
    }

    /// Returns the bytes of `[offset, offset + size)`, caching what was read.
    ///
    /// Pending edits are not reflected.
    ///
    /// # Returns
    /// `EndOfMedium` carrying the available bytes if the medium ends inside
    /// the range, with zero bytes if `offset` is at or behind the end.
    pub fn get_data(&mut self, offset: Offset, size: u64) -> Result<Vec<u8>, MediumError> {
        self.ensure_open()?;
        offset.ensure_medium(self.medium())?;
        if size == 0 {
            return Err(MediumError::invalid_range(
                offset.absolute(),
                size,
                "cannot read zero bytes",
            ));
        }
        if offset.absolute() >= self.accessor.len()? {
            return Err(end_of_medium(offset.absolute(), size as usize, &[]));
        }

        if self.config.caching_enabled {
            self.load(offset, size)
        } else {
            self.read_through(offset, size)
        }
    }

    /// Schedules inserting `bytes` at `offset`.
    pub fn insert_data(&mut self, offset: Offset, bytes: Vec<u8>) -> Result<Action, MediumError> {
        self.ensure_writable()?;
        offset.ensure_medium(self.medium())?;
        self.ensure_within_medium(offset.absolute(), bytes.len() as u64, offset.absolute())?;
        self.changes.schedule_insert(offset, bytes)
    }

    /// Schedules removing `size` bytes at `offset`.
    pub fn remove_data(&mut self, offset: Offset, size: u64) -> Result<Action, MediumError> {
        self.ensure_writable()?;
        offset.ensure_medium(self.medium())?;
        let region = Region::new(offset, size)?;
        self.ensure_within_medium(offset.absolute(), size, region.end_absolute())?;
        self.changes.schedule_remove(region)
    }

    /// Schedules replacing `size` bytes at `offset` by `bytes`.
    pub fn replace_data(
        &mut self,
        offset: Offset,
        size: u64,
        bytes: Vec<u8>,
    ) -> Result<Action, MediumError> {
        self.ensure_writable()?;
        offset.ensure_medium(self.medium())?;
        let region = Region::new(offset, size)?;
        self.ensure_within_medium(offset.absolute(), size, region.end_absolute())?;
        self.changes.schedule_replace(region, bytes)
    }

    /// Undoes a pending edit returned by this store.
    pub fn undo(&mut self, action: &Action) -> Result<Action, MediumError> {
        self.ensure_open()?;
        self.changes.undo(action)
    }

    /// Returns the pending edits in `(offset, sequence)` order.
    pub fn pending_actions(&self) -> Vec<Action> {
        self.changes.pending_actions()
    }

    /// Writes all pending edits to the medium.
    ///
    /// On failure the cache is dropped, the edits stay pending and the
    /// accessor error is returned; the medium may be partially rewritten.
    ///
    /// # Returns
    /// The flushed edits, no longer pending.
    pub fn flush(&mut self) -> Result<Vec<Action>, MediumError> {
        self.ensure_open()?;
        if self.changes.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_writable()?;

        let length = self.accessor.len()?;
        let block_size = self.config.max_read_write_block_size;
        // An empty medium only holds inserts at offset 0, written as they are.
        let plan = if length == 0 {
            self.changes.create_initial_write_plan(block_size)?
        } else {
            self.changes.create_flush_plan(block_size, length)?
        };

        if let Err(e) = self.execute(&plan) {
            tracing::error!("Flush of {} failed, dropping cache: {}", self.medium(), e);
            self.cache.clear();
            return Err(e);
        }

        let flushed = self.changes.mark_flushed(&plan)?;
        self.refresh_cache(&plan, length);
        tracing::debug!(
            "Flushed {} edits to {}, length {} -> {}",
            flushed.len(),
            self.medium(),
            length,
            plan.final_size()
        );
        Ok(flushed)
    }

    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    pub fn into_accessor(self) -> A {
        self.accessor
    }

    /// Returns the bytes of the range from cached regions, reading and
    /// caching the gaps.
    fn load(&mut self, offset: Offset, size: u64) -> Result<Vec<u8>, MediumError> {
        let regions = self.cache.get_regions_in_range(offset, size)?;
        let Some(first_start) = regions.first().map(|region| region.start().absolute()) else {
            return Ok(Vec::new());
        };

        // Edge regions are unclipped, so the data may start before `offset`.
        let skip = (offset.absolute() - first_start) as usize;
        let mut data = Vec::with_capacity(size as usize + skip);

        for region in regions {
            if let Some(bytes) = region.bytes() {
                data.extend_from_slice(bytes);
                continue;
            }
            match self.read_through(region.start(), region.size()) {
                Ok(bytes) => {
                    data.extend_from_slice(&bytes);
                    self.cache.add_region(Region::with_bytes(region.start(), bytes)?)?;
                }
                Err(MediumError::EndOfMedium { partial, .. }) => {
                    tracing::warn!(
                        "Medium {} ended at {} while caching {} bytes at {}",
                        self.medium(),
                        region.start().absolute() + partial.len() as u64,
                        size,
                        offset.absolute()
                    );
                    data.extend_from_slice(&partial);
                    if !partial.is_empty() {
                        self.cache.add_region(Region::with_bytes(region.start(), partial)?)?;
                    }
                    let available = data.get(skip..).unwrap_or_default();
                    return Err(end_of_medium(offset.absolute(), size as usize, available));
                }
                Err(e) => return Err(e),
            }
        }

        data.drain(..skip);
        data.truncate(size as usize);
        Ok(data)
    }

    /// Reads the range from the accessor in bounded blocks.
    fn read_through(&mut self, start: Offset, size: u64) -> Result<Vec<u8>, MediumError> {
        let accessor = &mut self.accessor;
        let mut data = Vec::with_capacity(size as usize);

        walk_chunks(
            start,
            size,
            self.config.max_read_write_block_size,
            |chunk_start, chunk_size| {
                accessor.set_position(chunk_start)?;
                let mut buffer = vec![0u8; chunk_size as usize];
                match accessor.read(&mut buffer) {
                    Ok(_) => {
                        data.extend_from_slice(&buffer);
                        Ok(())
                    }
                    Err(MediumError::EndOfMedium { partial, .. }) => {
                        data.extend_from_slice(&partial);
                        Err(end_of_medium(start.absolute(), size as usize, &data))
                    }
                    Err(e) => Err(e),
                }
            },
        )?;

        Ok(data)
    }

    fn execute(&mut self, plan: &FlushPlan) -> Result<(), MediumError> {
        let mut last_read = Vec::new();
        for step in plan.steps() {
            tracing::trace!("Executing flush step {}", step);
            self.accessor.set_position(step.region().start())?;
            match step.kind() {
                ActionKind::Read => {
                    last_read.resize(step.region().size() as usize, 0);
                    self.accessor.read(&mut last_read)?;
                }
                ActionKind::Write => {
                    let bytes = step.payload().unwrap_or(&last_read[..]);
                    self.accessor.write(bytes)?;
                }
                ActionKind::Truncate => self.accessor.truncate()?,
                ActionKind::Insert | ActionKind::Remove | ActionKind::Replace => {
                    return Err(MediumError::InvalidArgument(format!(
                        "{} is not a flush step",
                        step
                    )));
                }
            }
        }
        Ok(())
    }

    /// Drops cached bytes the plan moved or overwrote, then caches the
    /// written payloads at their new offsets.
    ///
    /// The medium is already rewritten here, so a failure only drops the cache.
    fn refresh_cache(&mut self, plan: &FlushPlan, old_length: u64) {
        if let Err(e) = self.try_refresh_cache(plan, old_length) {
            tracing::warn!("Dropping cache of {} after flush: {}", self.medium(), e);
            self.cache.clear();
        }
    }

    fn try_refresh_cache(&mut self, plan: &FlushPlan, old_length: u64) -> Result<(), MediumError> {
        let Some(first) = plan.first_modified_offset() else {
            return Ok(());
        };
        let end = old_length.max(plan.final_size());
        if end > first.absolute() {
            self.cache
                .remove_regions_in_range(first, end - first.absolute())?;
        }

        if !self.config.caching_enabled {
            return Ok(());
        }
        for step in plan.steps().iter().filter(|step| step.kind() == ActionKind::Write) {
            if let Some(payload) = step.payload() {
                self.cache
                    .add_region(Region::with_bytes(step.region().start(), payload.to_vec())?)?;
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), MediumError> {
        if !self.accessor.is_open() {
            return Err(MediumError::MediumClosed);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), MediumError> {
        self.ensure_open()?;
        if self.accessor.is_read_only() {
            return Err(MediumError::ReadOnlyMedium(self.medium().to_string()));
        }
        Ok(())
    }

    fn ensure_within_medium(&self, start: u64, size: u64, end: u64) -> Result<(), MediumError> {
        let length = self.accessor.len()?;
        if end > length {
            return Err(MediumError::invalid_range(
                start,
                size,
                format!("edit reaches behind medium end {}", length),
            ));
        }
        Ok(())
    }
}
