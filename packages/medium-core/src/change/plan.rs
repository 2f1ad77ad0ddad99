use crate::chunk::Chunks;
use crate::error::MediumError;
use crate::offset::{MediumId, Offset};
use crate::region::Region;

use super::action::{Action, ActionKind};

/// Ordered bounded I/O steps materializing a set of pending edits.
///
/// Steps are `Read`, `Write` and `Truncate` actions to execute in order. A
/// `Write` without payload writes the bytes of the immediately preceding
/// `Read`.
#[derive(Debug, Clone)]
pub struct FlushPlan {
    /// Steps to execute in order
    steps: Vec<Action>,
    /// Pending edits the steps materialize
    consumed: Vec<Action>,
    /// Medium size after all steps ran
    final_size: u64,
}

impl FlushPlan {
    /// Returns the steps in execution order.
    pub fn steps(&self) -> &[Action] {
        &self.steps
    }

    /// Returns the pending edits this plan materializes.
    pub fn consumed(&self) -> &[Action] {
        &self.consumed
    }

    /// Returns the medium size after executing the plan.
    pub fn final_size(&self) -> u64 {
        self.final_size
    }

    /// Returns `true` if executing the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the lowest offset a step writes to or truncates at.
    pub fn first_modified_offset(&self) -> Option<Offset> {
        self.steps
            .iter()
            .filter(|step| step.kind != ActionKind::Read)
            .map(|step| step.region.start())
            .min_by_key(|offset| offset.absolute())
    }
}

/// Unedited bytes that end up `shift` bytes away from `source`.
#[derive(Debug, Clone, Copy)]
struct Move {
    source: u64,
    size: u64,
    shift: i64,
}

/// Payload bytes written at their final offset.
struct PayloadWrite<'a> {
    destination: u64,
    bytes: &'a [u8],
}

/// Builds the flush plan for `actions`, given in `(offset, sequence)` order.
///
/// Walks the edits keeping a cursor into the original medium and the size
/// delta accumulated so far. Unedited bytes between edits move by that delta.
pub(crate) fn build<'a>(
    medium: MediumId,
    actions: impl Iterator<Item = &'a Action>,
    write_block_size: u64,
    total_medium_size: u64,
) -> Result<FlushPlan, MediumError> {
    let mut moves = Vec::new();
    let mut writes = Vec::new();
    let mut consumed = Vec::new();
    let mut cursor = 0u64;
    let mut delta = 0i64;

    for action in actions {
        let start = action.region.start().absolute();
        let reach = match action.kind {
            ActionKind::Insert => start,
            _ => action.region.end_absolute(),
        };
        if reach > total_medium_size {
            return Err(MediumError::invalid_range(
                start,
                action.region.size(),
                format!("pending edit ends behind the medium size {}", total_medium_size),
            ));
        }

        if start > cursor {
            if delta != 0 {
                moves.push(Move {
                    source: cursor,
                    size: start - cursor,
                    shift: delta,
                });
            }
            cursor = start;
        }

        let destination = shifted(cursor, delta)?;
        let payload = action.payload.as_deref().unwrap_or_default();

        match action.kind {
            ActionKind::Insert => {
                writes.push(PayloadWrite {
                    destination,
                    bytes: payload,
                });
                delta = accumulate(delta, payload.len() as u64, 0, start)?;
            }
            ActionKind::Remove => {
                cursor = action.region.end_absolute();
                delta = accumulate(delta, 0, action.region.size(), start)?;
            }
            ActionKind::Replace => {
                if !payload.is_empty() {
                    writes.push(PayloadWrite {
                        destination,
                        bytes: payload,
                    });
                }
                cursor = action.region.end_absolute();
                delta = accumulate(delta, payload.len() as u64, action.region.size(), start)?;
            }
            ActionKind::Read | ActionKind::Write | ActionKind::Truncate => {
                return Err(MediumError::InvalidArgument(format!(
                    "{} is not an edit",
                    action
                )));
            }
        }
        consumed.push(action.clone());
    }

    if total_medium_size > cursor && delta != 0 {
        moves.push(Move {
            source: cursor,
            size: total_medium_size - cursor,
            shift: delta,
        });
    }

    let final_size = shifted(total_medium_size, delta)?;
    let mut steps = Vec::new();

    // Downward moves front to back, upward moves back to front.
    for relocation in moves.iter().filter(|m| m.shift < 0) {
        for (source, size) in Chunks::new(relocation.source, relocation.size, write_block_size)? {
            push_copy(&mut steps, medium, source, size, relocation.shift)?;
        }
    }
    for relocation in moves.iter().rev().filter(|m| m.shift > 0) {
        for (source, size) in Chunks::new(relocation.source, relocation.size, write_block_size)?.rev() {
            push_copy(&mut steps, medium, source, size, relocation.shift)?;
        }
    }

    for write in &writes {
        for (destination, size) in
            Chunks::new(write.destination, write.bytes.len() as u64, write_block_size)?
        {
            let from = (destination - write.destination) as usize;
            let bytes = write.bytes[from..from + size as usize].to_vec();
            steps.push(Action::step(
                ActionKind::Write,
                Region::new(Offset::new(medium, destination), size)?,
                Some(bytes),
            ));
        }
    }

    if delta < 0 {
        steps.push(Action::step(
            ActionKind::Truncate,
            Region::new(Offset::new(medium, final_size), delta.unsigned_abs())?,
            None,
        ));
    }

    Ok(FlushPlan {
        steps,
        consumed,
        final_size,
    })
}

fn push_copy(
    steps: &mut Vec<Action>,
    medium: MediumId,
    source: u64,
    size: u64,
    shift: i64,
) -> Result<(), MediumError> {
    let destination = shifted(source, shift)?;
    steps.push(Action::step(
        ActionKind::Read,
        Region::new(Offset::new(medium, source), size)?,
        None,
    ));
    steps.push(Action::step(
        ActionKind::Write,
        Region::new(Offset::new(medium, destination), size)?,
        None,
    ));
    Ok(())
}

fn shifted(position: u64, delta: i64) -> Result<u64, MediumError> {
    position.checked_add_signed(delta).ok_or_else(|| {
        MediumError::invalid_range(
            position,
            delta.unsigned_abs(),
            "edits move bytes out of the addressable range",
        )
    })
}

/// Adds `added - removed` bytes to the running size delta.
fn accumulate(delta: i64, added: u64, removed: u64, offset: u64) -> Result<i64, MediumError> {
    let overflow = || {
        MediumError::invalid_range(
            offset,
            added.max(removed),
            "edit size delta exceeds the addressable range",
        )
    };
    let added = i64::try_from(added).map_err(|_| overflow())?;
    let removed = i64::try_from(removed).map_err(|_| overflow())?;
    delta
        .checked_add(added)
        .and_then(|delta| delta.checked_sub(removed))
        .ok_or_else(overflow)
}
