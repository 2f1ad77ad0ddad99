use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::MediumError;
use crate::offset::{MediumId, Offset};
use crate::region::{Overlap, Region};

use super::action::{Action, ActionKind};
use super::plan::{self, FlushPlan};

/// Identities of scheduled actions, unique across all managers.
static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Holds the pending edits of a single medium.
///
/// Pending removes and replaces never overlap each other. Every scheduling
/// call validates first and mutates afterwards, so a rejected edit leaves the
/// pending set untouched.
#[derive(Debug)]
pub struct ChangeManager {
    /// Medium all scheduled edits refer to
    medium: MediumId,
    /// Pending edits keyed by `(start offset, sequence)`
    actions: BTreeMap<(u64, u32), Action>,
}

impl ChangeManager {
    /// Creates a change manager without pending edits.
    pub fn new(medium: MediumId) -> Self {
        Self {
            medium,
            actions: BTreeMap::new(),
        }
    }

    /// Returns the medium this manager schedules edits for.
    pub fn medium(&self) -> MediumId {
        self.medium
    }

    /// Schedules the insertion of `bytes` before the byte at `at`.
    ///
    /// # Arguments
    /// * `at` - Insertion point
    /// * `bytes` - Inserted bytes, must not be empty
    ///
    /// # Returns
    /// The pending insert action, or `OverlappingEdit` if a pending remove
    /// or replace strictly contains `at`.
    pub fn schedule_insert(&mut self, at: Offset, bytes: Vec<u8>) -> Result<Action, MediumError> {
        at.ensure_medium(self.medium)?;
        let region = Region::new(at, bytes.len() as u64)?;

        if let Some(blocking) = self
            .actions
            .values()
            .filter(|action| matches!(action.kind, ActionKind::Remove | ActionKind::Replace))
            .find(|action| strictly_inside(&action.region, at.absolute()))
        {
            return Err(overlapping(blocking, &region));
        }

        self.push(ActionKind::Insert, region, Some(bytes), &[])
    }

    /// Schedules the removal of `region`.
    ///
    /// Pending removes and replaces enclosed by `region` are undone, as are
    /// pending inserts anchored strictly inside it.
    ///
    /// # Returns
    /// The pending remove action, or `OverlappingEdit` if `region` partially
    /// overlaps a pending remove or replace.
    pub fn schedule_remove(&mut self, region: Region) -> Result<Action, MediumError> {
        region.start().ensure_medium(self.medium)?;
        let region = Region::new(region.start(), region.size())?;

        let mut invalidated = self.enclosed_edits(&region)?;
        invalidated.extend(self.inserts_inside(&region).map(Action::key));

        self.push(ActionKind::Remove, region, None, &invalidated)
    }

    /// Schedules replacing the bytes of `region` by `bytes`.
    ///
    /// `bytes` may be shorter or longer than `region`, or empty. Pending
    /// removes and replaces enclosed by `region` are undone.
    ///
    /// # Returns
    /// The pending replace action, or `OverlappingEdit` if `region` partially
    /// overlaps a pending remove or replace or a pending insert is anchored
    /// strictly inside `region`.
    pub fn schedule_replace(&mut self, region: Region, bytes: Vec<u8>) -> Result<Action, MediumError> {
        region.start().ensure_medium(self.medium)?;
        let region = Region::new(region.start(), region.size())?;

        let invalidated = self.enclosed_edits(&region)?;
        if let Some(insert) = self.inserts_inside(&region).next() {
            return Err(overlapping(insert, &region));
        }

        self.push(ActionKind::Replace, region, Some(bytes), &invalidated)
    }

    /// Undoes a pending action previously returned by this manager.
    ///
    /// # Returns
    /// The action marked non-pending, or `UnknownAction` if it is not pending
    /// here (never scheduled here, already undone or already flushed).
    pub fn undo(&mut self, action: &Action) -> Result<Action, MediumError> {
        let key = action.key();
        if !self.owns(action) {
            return Err(unknown_action(key));
        }
        match self.actions.entry(key) {
            Entry::Occupied(entry) if entry.get().id == action.id => {
                let mut undone = entry.remove();
                undone.pending = false;
                tracing::debug!("Undid {}", undone);
                Ok(undone)
            }
            _ => Err(unknown_action(key)),
        }
    }

    /// Drops every pending action without executing it.
    pub fn clear_all(&mut self) {
        if !self.actions.is_empty() {
            tracing::debug!("Dropping {} pending actions", self.actions.len());
        }
        self.actions.clear();
    }

    /// Returns copies of all pending actions in `(offset, sequence)` order.
    pub fn pending_actions(&self) -> Vec<Action> {
        self.actions.values().cloned().collect()
    }

    /// Returns the number of pending actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if no action is pending.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Converts the pending actions into bounded read, write and truncate steps.
    ///
    /// # Arguments
    /// * `write_block_size` - Maximum size of every read or write step, must be > 0
    /// * `total_medium_size` - Current size of the medium, must be > 0
    ///
    /// # Returns
    /// The flush plan. `InvalidArgument` for zero sizes, `InvalidRange` if a
    /// pending edit reaches beyond `total_medium_size`.
    pub fn create_flush_plan(
        &self,
        write_block_size: u64,
        total_medium_size: u64,
    ) -> Result<FlushPlan, MediumError> {
        if write_block_size == 0 {
            return Err(MediumError::InvalidArgument(
                "write block size must be > 0".to_string(),
            ));
        }
        if total_medium_size == 0 {
            return Err(MediumError::InvalidArgument(
                "total medium size must be > 0".to_string(),
            ));
        }
        self.plan(write_block_size, total_medium_size)
    }

    /// Converts the pending inserts of an empty medium into bounded writes.
    ///
    /// # Returns
    /// The flush plan, `InvalidArgument` for a zero block size and
    /// `InvalidRange` if a pending edit needs existing bytes.
    pub(crate) fn create_initial_write_plan(
        &self,
        write_block_size: u64,
    ) -> Result<FlushPlan, MediumError> {
        if write_block_size == 0 {
            return Err(MediumError::InvalidArgument(
                "write block size must be > 0".to_string(),
            ));
        }
        self.plan(write_block_size, 0)
    }

    fn plan(&self, write_block_size: u64, total_medium_size: u64) -> Result<FlushPlan, MediumError> {
        let plan = plan::build(
            self.medium,
            self.actions.values(),
            write_block_size,
            total_medium_size,
        )?;

        tracing::debug!(
            "Created flush plan with {} steps for {} actions, size {} -> {}",
            plan.steps().len(),
            plan.consumed().len(),
            total_medium_size,
            plan.final_size()
        );

        Ok(plan)
    }

    /// Removes the actions consumed by an executed flush plan.
    ///
    /// # Returns
    /// The consumed actions marked non-pending, or `UnknownAction` (without
    /// removing anything) if one of them is no longer pending.
    pub fn mark_flushed(&mut self, plan: &FlushPlan) -> Result<Vec<Action>, MediumError> {
        for action in plan.consumed() {
            let key = action.key();
            if !self.owns(action) {
                return Err(unknown_action(key));
            }
            match self.actions.get(&key) {
                Some(pending) if pending.id == action.id => {}
                _ => return Err(unknown_action(key)),
            }
        }

        let flushed = plan
            .consumed()
            .iter()
            .filter_map(|action| self.actions.remove(&action.key()))
            .map(|mut action| {
                action.pending = false;
                action
            })
            .collect();
        Ok(flushed)
    }

    fn owns(&self, action: &Action) -> bool {
        action.region.start().medium() == self.medium
    }

    /// Keys of pending removes and replaces enclosed by `region`.
    ///
    /// Fails if any pending remove or replace overlaps `region` in another way.
    fn enclosed_edits(&self, region: &Region) -> Result<Vec<(u64, u32)>, MediumError> {
        let mut enclosed = Vec::new();
        for action in self
            .actions
            .values()
            .filter(|action| matches!(action.kind, ActionKind::Remove | ActionKind::Replace))
        {
            match region.overlap(&action.region) {
                Overlap::NoOverlap => {}
                Overlap::SameRange | Overlap::RightFullyInsideLeft => enclosed.push(action.key()),
                Overlap::LeftFullyInsideRight
                | Overlap::LeftOverlapsRightAtFront
                | Overlap::LeftOverlapsRightAtBack => return Err(overlapping(action, region)),
            }
        }
        Ok(enclosed)
    }

    fn inserts_inside<'a>(&'a self, region: &'a Region) -> impl Iterator<Item = &'a Action> {
        self.actions.values().filter(move |action| {
            action.kind == ActionKind::Insert
                && strictly_inside(region, action.region.start().absolute())
        })
    }

    fn invalidate(&mut self, keys: &[(u64, u32)]) {
        for key in keys {
            if let Some(action) = self.actions.remove(key) {
                tracing::debug!("Invalidated {} enclosed by a new edit", action);
            }
        }
    }

    /// Adds a new pending action after dropping the `invalidated` ones.
    ///
    /// The sequence number follows the last remaining action at the same start.
    fn push(
        &mut self,
        kind: ActionKind,
        region: Region,
        payload: Option<Vec<u8>>,
        invalidated: &[(u64, u32)],
    ) -> Result<Action, MediumError> {
        let start = region.start().absolute();
        let sequence = self
            .actions
            .range((start, 0)..=(start, u32::MAX))
            .rev()
            .map(|(key, _)| *key)
            .find(|key| !invalidated.contains(key))
            .map(|(_, last)| {
                last.checked_add(1)
                    .ok_or(MediumError::SequenceOverflow { offset: start })
            })
            .transpose()?
            .unwrap_or(0);

        self.invalidate(invalidated);

        let action = Action {
            id: NEXT_ACTION_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            region,
            sequence,
            payload,
            pending: true,
        };

        tracing::debug!("Scheduled {}", action);
        self.actions.insert(action.key(), action.clone());
        Ok(action)
    }
}

fn strictly_inside(region: &Region, position: u64) -> bool {
    region.start().absolute() < position && position < region.end_absolute()
}

fn unknown_action((offset, sequence): (u64, u32)) -> MediumError {
    MediumError::UnknownAction { offset, sequence }
}

fn overlapping(existing: &Action, requested: &Region) -> MediumError {
    MediumError::OverlappingEdit {
        existing_offset: existing.region.start().absolute(),
        existing_size: existing.region.size(),
        requested_offset: requested.start().absolute(),
        requested_size: requested.size(),
    }
}
