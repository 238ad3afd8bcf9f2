use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::classify;
use crate::codec::{Client, ReadAction, UuidEntryService, call, list_or_empty};
use crate::config::ManagerConfig;
use crate::entries::{apply_changes, creation_changes, select_owned};
use crate::entry::{EntryBridge, Ownership, UuidEntry};
use crate::error::{Stage, SyncError};
use crate::location::Location;
use crate::ordering;
use crate::position::Placement;

/// Plan entries present in `state` carry the uuid recorded there.
fn inherit_uuids<E: UuidEntry>(state: &[E], plan: &[E]) -> Vec<E> {
    let known: HashMap<&str, &str> = state
        .iter()
        .filter_map(|e| e.uuid().map(|uuid| (e.name(), uuid)))
        .collect();
    plan.iter()
        .map(|entry| {
            let mut entry = entry.clone();
            if entry.uuid().is_none()
                && let Some(uuid) = known.get(entry.name())
            {
                entry.set_uuid(Some(uuid.to_string()));
            }
            entry
        })
        .collect()
}

fn ensure_uuids<E: UuidEntry>(entries: &[E]) -> Result<(), SyncError> {
    match entries.iter().find(|e| e.uuid().is_none()) {
        Some(entry) => Err(SyncError::MissingUuid(entry.name().to_string())),
        None => Ok(()),
    }
}

/// Reconciles an ordered collection whose entries carry device-assigned
/// uuids, keeping the managed entries together at the requested placement.
pub struct UuidObjectManager<E, L, C: ?Sized, S: ?Sized> {
    client: Arc<C>,
    service: Arc<S>,
    bridge: Arc<dyn EntryBridge<E>>,
    config: ManagerConfig,
    ownership: Ownership,
    _location: PhantomData<fn() -> L>,
}

impl<E, L, C, S> UuidObjectManager<E, L, C, S>
where
    E: UuidEntry,
    L: Location,
    C: Client + ?Sized,
    S: UuidEntryService<E, L> + ?Sized,
{
    pub fn new(
        client: Arc<C>,
        service: Arc<S>,
        bridge: Arc<dyn EntryBridge<E>>,
        config: ManagerConfig,
        ownership: Ownership,
    ) -> Self {
        Self {
            client,
            service,
            bridge,
            config,
            ownership,
            _location: PhantomData,
        }
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    async fn list(&self, location: &L, cancel: &CancellationToken) -> Result<Vec<E>, SyncError> {
        list_or_empty(self.service.as_ref(), location, cancel).await
    }

    fn check_placement(&self, placement: &Placement) -> Result<(), SyncError> {
        placement.validate()?;
        if self.ownership == Ownership::Exhaustive && placement.pivot().is_some() {
            return Err(SyncError::InvalidPosition(
                "an exhaustively managed list cannot be placed relative to a pivot".into(),
            ));
        }
        Ok(())
    }

    fn check_pivot(&self, live: &[E], plan: &[E], placement: &Placement) -> Result<(), SyncError> {
        match self.ownership {
            Ownership::NonExhaustive => ordering::check_pivot(live, plan, placement),
            Ownership::Exhaustive => Ok(()),
        }
    }

    /// Aligns the fresh listing to the plan, binds uuids and moves the
    /// managed block when it is out of order or out of place.
    async fn finish(
        &self,
        location: &L,
        plan: &[E],
        placement: &Placement,
        live: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, SyncError> {
        let mut needs_move = !ordering::is_properly_sorted(&live, plan);
        if !needs_move && self.ownership == Ownership::NonExhaustive {
            needs_move = !ordering::placement_satisfied(&live, plan, placement)?;
        }

        let entries = classify::align_to_plan(plan, live)?;
        ensure_uuids(&entries)?;

        if needs_move {
            debug!(entries = entries.len(), ?placement, "moving managed entries");
            call(
                cancel,
                Stage::Move,
                self.service.move_group(location, placement, &entries),
            )
            .await?;
        }
        Ok(entries)
    }

    pub async fn read_many(
        &self,
        location: &L,
        plan: &[E],
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, SyncError> {
        let live = call(
            cancel,
            Stage::Read,
            self.service.list(location, ReadAction::Get, "", ""),
        )
        .await?;
        Ok(select_owned(live, plan, self.ownership))
    }

    pub async fn read(
        &self,
        location: &L,
        name: &str,
        action: ReadAction,
        cancel: &CancellationToken,
    ) -> Result<E, SyncError> {
        call(cancel, Stage::Read, self.service.read(location, name, action)).await
    }

    pub async fn create(
        &self,
        location: &L,
        entry: &E,
        placement: &Placement,
        cancel: &CancellationToken,
    ) -> Result<E, SyncError> {
        let mut created = self
            .create_many(location, std::slice::from_ref(entry), placement, cancel)
            .await?;
        created
            .pop()
            .ok_or_else(|| SyncError::Internal(format!("entry `{}` was not created", entry.name())))
    }

    pub async fn create_many(
        &self,
        location: &L,
        plan: &[E],
        placement: &Placement,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, SyncError> {
        self.check_placement(placement)?;
        let live = self.list(location, cancel).await?;
        self.check_pivot(&live, plan, placement)?;
        let changes = creation_changes(&live, plan, self.ownership)?;

        apply_changes(
            self.client.as_ref(),
            location,
            &changes,
            self.bridge.as_ref(),
            self.config,
            cancel,
        )
        .await?;
        let live = self.list(location, cancel).await?;
        self.finish(location, plan, placement, live, cancel).await
    }

    /// Updates the entry stored under `name` and returns it with its uuid.
    pub async fn update(
        &self,
        location: &L,
        entry: &E,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<E, SyncError> {
        call(
            cancel,
            Stage::Write,
            self.service.update(location, entry, name),
        )
        .await?;
        let updated = call(
            cancel,
            Stage::Read,
            self.service.read(location, entry.name(), ReadAction::Get),
        )
        .await?;
        ensure_uuids(std::slice::from_ref(&updated))?;
        Ok(updated)
    }

    pub async fn update_many(
        &self,
        location: &L,
        state: &[E],
        plan: &[E],
        placement: &Placement,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, SyncError> {
        self.check_placement(placement)?;
        let plan = inherit_uuids(state, plan);
        let mut classification = classify::classify(state, &plan, self.bridge.as_ref())?;

        let live = self.list(location, cancel).await?;
        self.check_pivot(&live, &plan, placement)?;
        let counterparts = classify::counterparts_by_uuid(state, &live);
        let changes = classify::resolve(
            &mut classification,
            &live,
            &counterparts,
            self.ownership,
            self.bridge.as_ref(),
        )?;

        let written = apply_changes(
            self.client.as_ref(),
            location,
            &changes,
            self.bridge.as_ref(),
            self.config,
            cancel,
        )
        .await?;
        let live = if written {
            self.list(location, cancel).await?
        } else {
            live
        };
        self.finish(location, &plan, placement, live, cancel).await
    }

    pub async fn delete(
        &self,
        location: &L,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        if names.is_empty() {
            return Ok(());
        }
        call(cancel, Stage::Delete, self.service.delete(location, names)).await
    }
}

#[cfg(test)]
#[path = "uuid_entries_tests.rs"]
mod tests;
