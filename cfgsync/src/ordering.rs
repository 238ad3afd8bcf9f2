use std::collections::HashMap;

use crate::entry::NamedEntry;
use crate::error::SyncError;
use crate::position::Placement;

fn positions<E: NamedEntry>(live: &[E]) -> HashMap<&str, usize> {
    live.iter()
        .enumerate()
        .map(|(idx, entry)| (entry.name(), idx))
        .collect()
}

/// True when the plan's entries form one contiguous block of the live
/// listing, in plan order.
pub(crate) fn is_properly_sorted<E: NamedEntry>(live: &[E], plan: &[E]) -> bool {
    let rank: HashMap<&str, usize> = plan
        .iter()
        .enumerate()
        .map(|(idx, entry)| (entry.name(), idx))
        .collect();

    let managed: Vec<(usize, usize)> = live
        .iter()
        .enumerate()
        .filter_map(|(device_idx, entry)| {
            rank.get(entry.name())
                .map(|&plan_idx| (device_idx, plan_idx))
        })
        .collect();
    if managed.len() != plan.len() {
        return false;
    }

    let mut previous: Option<(usize, usize)> = None;
    for (position, &(device_idx, plan_idx)) in managed.iter().enumerate() {
        if plan_idx != position {
            return false;
        }
        if let Some((prev_device, prev_plan)) = previous
            && device_idx - prev_device != plan_idx - prev_plan
        {
            return false;
        }
        previous = Some((device_idx, plan_idx));
    }
    true
}

/// Validates the pivot of `placement` against the live listing before any
/// write is attempted.
pub(crate) fn check_pivot<E: NamedEntry>(
    live: &[E],
    plan: &[E],
    placement: &Placement,
) -> Result<(), SyncError> {
    let Some(pivot) = placement.pivot() else {
        return Ok(());
    };
    if plan.iter().any(|entry| entry.name() == pivot) {
        return Err(SyncError::InvalidPosition(format!(
            "pivot `{pivot}` is part of the managed entries"
        )));
    }
    if !live.iter().any(|entry| entry.name() == pivot) {
        return Err(SyncError::MissingPivotPoint(pivot.to_string()));
    }
    Ok(())
}

/// Whether the managed block already sits where `placement` wants it.
/// Assumes the block is contiguous.
pub(crate) fn placement_satisfied<E: NamedEntry>(
    live: &[E],
    plan: &[E],
    placement: &Placement,
) -> Result<bool, SyncError> {
    let (Some(first), Some(last)) = (plan.first(), plan.last()) else {
        return Ok(true);
    };
    let index = positions(live);
    let pivot_index = |pivot: &str| {
        index
            .get(pivot)
            .copied()
            .ok_or_else(|| SyncError::MissingPivotPoint(pivot.to_string()))
    };
    let name_at = |idx: usize| live.get(idx).map(NamedEntry::name);

    let satisfied = match placement {
        Placement::First => name_at(0) == Some(first.name()),
        Placement::Last => live.last().map(NamedEntry::name) == Some(last.name()),
        Placement::Before { pivot, direct: true } => {
            let pivot = pivot_index(pivot.as_str())?;
            pivot > 0 && name_at(pivot - 1) == Some(last.name())
        }
        Placement::Before {
            pivot,
            direct: false,
        } => {
            let pivot = pivot_index(pivot.as_str())?;
            index.get(last.name()).is_some_and(|&idx| idx < pivot)
        }
        Placement::After { pivot, direct: true } => {
            let pivot = pivot_index(pivot.as_str())?;
            name_at(pivot + 1) == Some(first.name())
        }
        Placement::After {
            pivot,
            direct: false,
        } => {
            let pivot = pivot_index(pivot.as_str())?;
            index.get(first.name()).is_some_and(|&idx| idx > pivot)
        }
    };
    Ok(satisfied)
}
