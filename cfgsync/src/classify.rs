//! Classification of plan and state entries against the live listing.
//!
//! [`classify`] looks only at state and plan. [`resolve`] then folds in the
//! live listing and produces the ordered [`Changeset`] the managers turn into
//! a batch.

use std::collections::{HashMap, HashSet};

use tracing::error;

use crate::entry::{EntryBridge, NamedEntry, Ownership, UuidEntry};
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EntryState {
    Unknown,
    Ok,
    Missing,
    Outdated,
    Renamed { new_name: String },
    Deleted,
}

#[derive(Debug, Clone)]
pub(crate) struct Tracked<E> {
    pub entry: E,
    /// Index of the state entry this one is tied to.
    pub anchor: Option<usize>,
    pub state: EntryState,
}

#[derive(Debug)]
pub(crate) struct Classification<E> {
    /// Plan entries, in plan order.
    pub planned: Vec<Tracked<E>>,
    /// State entries that left the plan, in state order.
    pub deleted: Vec<Tracked<E>>,
    pub renamed_targets: HashSet<String>,
}

/// Changes to apply, grouped in the order they must reach the device.
#[derive(Debug)]
pub(crate) struct Changeset<E> {
    pub deletes: Vec<String>,
    pub renames: Vec<(String, String)>,
    pub edits: Vec<E>,
    pub creates: Vec<E>,
}

impl<E> Default for Changeset<E> {
    fn default() -> Self {
        Self {
            deletes: Vec::new(),
            renames: Vec::new(),
            edits: Vec::new(),
            creates: Vec::new(),
        }
    }
}

impl<E> Changeset<E> {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty()
            && self.renames.is_empty()
            && self.edits.is_empty()
            && self.creates.is_empty()
    }
}

pub(crate) fn ensure_unique_names<E: NamedEntry>(plan: &[E]) -> Result<(), SyncError> {
    let mut seen = HashSet::with_capacity(plan.len());
    for entry in plan {
        if entry.name().is_empty() {
            return Err(SyncError::Conflict("plan contains an entry without a name".into()));
        }
        if !seen.insert(entry.name()) {
            return Err(SyncError::Conflict(format!(
                "plan contains entry `{}` more than once",
                entry.name()
            )));
        }
    }
    Ok(())
}

pub(crate) fn classify<E: NamedEntry>(
    state: &[E],
    plan: &[E],
    bridge: &dyn EntryBridge<E>,
) -> Result<Classification<E>, SyncError> {
    ensure_unique_names(plan)?;

    let state_by_name: HashMap<&str, usize> = state
        .iter()
        .enumerate()
        .map(|(idx, entry)| (entry.name(), idx))
        .collect();
    let plan_names: HashSet<&str> = plan.iter().map(NamedEntry::name).collect();

    let mut anchored = vec![false; state.len()];
    let mut renamed_targets = HashSet::new();
    let mut planned = Vec::with_capacity(plan.len());

    for entry in plan {
        let mut tracked = Tracked {
            entry: entry.clone(),
            anchor: None,
            state: EntryState::Unknown,
        };
        if let Some(&idx) = state_by_name.get(entry.name()) {
            anchored[idx] = true;
            tracked.anchor = Some(idx);
            tracked.state = if bridge.matches(entry, &state[idx]) {
                EntryState::Ok
            } else {
                EntryState::Outdated
            };
        } else if let Some(idx) = state.iter().enumerate().position(|(idx, candidate)| {
            !anchored[idx]
                && !plan_names.contains(candidate.name())
                && bridge.matches(entry, candidate)
        }) {
            anchored[idx] = true;
            tracked.anchor = Some(idx);
            tracked.state = EntryState::Renamed {
                new_name: entry.name().to_string(),
            };
            renamed_targets.insert(entry.name().to_string());
        } else {
            tracked.state = EntryState::Missing;
        }
        planned.push(tracked);
    }

    let deleted = state
        .iter()
        .enumerate()
        .filter(|(idx, _)| !anchored[*idx])
        .map(|(idx, entry)| Tracked {
            entry: entry.clone(),
            anchor: Some(idx),
            state: EntryState::Deleted,
        })
        .collect();

    Ok(Classification {
        planned,
        deleted,
        renamed_targets,
    })
}

/// Live counterpart of each state entry, matched by name.
pub(crate) fn counterparts_by_name<E: NamedEntry>(state: &[E], live: &[E]) -> Vec<Option<usize>> {
    let live_by_name: HashMap<&str, usize> = live
        .iter()
        .enumerate()
        .map(|(idx, entry)| (entry.name(), idx))
        .collect();
    state
        .iter()
        .map(|entry| live_by_name.get(entry.name()).copied())
        .collect()
}

/// Live counterpart of each state entry, matched by uuid first and by name
/// for whatever is left. A live entry backs at most one state entry.
pub(crate) fn counterparts_by_uuid<E: UuidEntry>(state: &[E], live: &[E]) -> Vec<Option<usize>> {
    let live_by_uuid: HashMap<&str, usize> = live
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| entry.uuid().map(|uuid| (uuid, idx)))
        .collect();
    let live_by_name: HashMap<&str, usize> = live
        .iter()
        .enumerate()
        .map(|(idx, entry)| (entry.name(), idx))
        .collect();

    let mut taken = vec![false; live.len()];
    let mut result: Vec<Option<usize>> = state
        .iter()
        .map(|entry| {
            let idx = entry.uuid().and_then(|uuid| live_by_uuid.get(uuid).copied())?;
            taken[idx] = true;
            Some(idx)
        })
        .collect();
    for (slot, entry) in result.iter_mut().zip(state) {
        if slot.is_some() {
            continue;
        }
        if let Some(&idx) = live_by_name.get(entry.name())
            && !taken[idx]
        {
            taken[idx] = true;
            *slot = Some(idx);
        }
    }
    result
}

fn unknown_residue(name: &str) -> SyncError {
    error!(entry = name, "entry left classification in unknown state");
    SyncError::Internal(format!("entry `{name}` was never classified"))
}

pub(crate) fn resolve<E: NamedEntry>(
    classification: &mut Classification<E>,
    live: &[E],
    counterparts: &[Option<usize>],
    ownership: Ownership,
    bridge: &dyn EntryBridge<E>,
) -> Result<Changeset<E>, SyncError> {
    let claimed: HashSet<usize> = counterparts.iter().flatten().copied().collect();
    let plan_names: HashSet<&str> = classification
        .planned
        .iter()
        .map(|t| t.entry.name())
        .collect();

    let mut changes = Changeset::default();
    for (idx, entry) in live.iter().enumerate() {
        if claimed.contains(&idx) {
            continue;
        }
        let wanted = plan_names.contains(entry.name())
            || classification.renamed_targets.contains(entry.name());
        match ownership {
            Ownership::NonExhaustive if wanted => {
                return Err(SyncError::Conflict(format!(
                    "entry `{}` already exists on the device and is not managed",
                    entry.name()
                )));
            }
            Ownership::NonExhaustive => {}
            Ownership::Exhaustive => changes.deletes.push(entry.name().to_string()),
        }
    }

    let counterpart = |anchor: Option<usize>| -> Result<Option<&E>, SyncError> {
        let idx = anchor.ok_or_else(|| {
            SyncError::Internal("classified entry has no state anchor".into())
        })?;
        Ok(counterparts
            .get(idx)
            .copied()
            .flatten()
            .and_then(|live_idx| live.get(live_idx)))
    };

    for tracked in &mut classification.planned {
        match tracked.state.clone() {
            EntryState::Ok | EntryState::Outdated => match counterpart(tracked.anchor)? {
                None => {
                    tracked.state = EntryState::Missing;
                    changes.creates.push(tracked.entry.clone());
                }
                Some(current) => {
                    if current.name() != tracked.entry.name() {
                        changes
                            .renames
                            .push((current.name().to_string(), tracked.entry.name().to_string()));
                    }
                    if bridge.matches(&tracked.entry, current) {
                        tracked.state = EntryState::Ok;
                    } else {
                        tracked.state = EntryState::Outdated;
                        changes.edits.push(tracked.entry.clone());
                    }
                }
            },
            EntryState::Renamed { new_name } => match counterpart(tracked.anchor)? {
                None => {
                    tracked.state = EntryState::Missing;
                    changes.creates.push(tracked.entry.clone());
                }
                Some(current) => {
                    if current.name() != new_name {
                        changes
                            .renames
                            .push((current.name().to_string(), new_name));
                    }
                    if !bridge.matches(&tracked.entry, current) {
                        changes.edits.push(tracked.entry.clone());
                    }
                }
            },
            EntryState::Missing => changes.creates.push(tracked.entry.clone()),
            EntryState::Deleted => {
                return Err(SyncError::Internal(format!(
                    "plan entry `{}` classified as deleted",
                    tracked.entry.name()
                )));
            }
            EntryState::Unknown => return Err(unknown_residue(tracked.entry.name())),
        }
    }

    for tracked in &classification.deleted {
        match &tracked.state {
            EntryState::Deleted => {
                if let Some(current) = counterpart(tracked.anchor)? {
                    changes.deletes.push(current.name().to_string());
                }
            }
            EntryState::Unknown => return Err(unknown_residue(tracked.entry.name())),
            other => {
                return Err(SyncError::Internal(format!(
                    "state entry `{}` left the plan as {other:?}",
                    tracked.entry.name()
                )));
            }
        }
    }

    Ok(changes)
}

/// Picks the plan's entries out of a fresh listing, in plan order.
pub(crate) fn align_to_plan<E: NamedEntry>(plan: &[E], live: Vec<E>) -> Result<Vec<E>, SyncError> {
    let mut live_by_name: HashMap<String, E> = live
        .into_iter()
        .map(|entry| (entry.name().to_string(), entry))
        .collect();
    plan.iter()
        .map(|entry| {
            live_by_name.remove(entry.name()).ok_or_else(|| {
                SyncError::Internal(format!(
                    "entry `{}` is missing from the device after reconciliation",
                    entry.name()
                ))
            })
        })
        .collect()
}
