use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use xmlapi_core::Version;

use crate::batch::Batch;
use crate::classify::{self, Changeset};
use crate::codec::{Client, EntryService, ReadAction, call, list_or_empty};
use crate::config::ManagerConfig;
use crate::entry::{self, EntryBridge, NamedEntry, Ownership};
use crate::error::{Stage, SyncError};
use crate::location::{Location, entry_xpath};

/// Turns a changeset into a batch: deletes, renames, edits, then creates.
pub(crate) fn changeset_batch<E, L>(
    changes: &Changeset<E>,
    location: &L,
    version: Version,
    bridge: &dyn EntryBridge<E>,
    batch_size: usize,
) -> Result<Batch, SyncError>
where
    E: NamedEntry,
    L: Location,
{
    let mut batch = Batch::new(batch_size);
    for name in &changes.deletes {
        batch.delete(entry_xpath(location, version, name)?);
    }
    for (from, to) in &changes.renames {
        batch.rename(entry_xpath(location, version, from)?, to.clone());
    }
    for entry in changes.edits.iter().chain(&changes.creates) {
        let element = entry::specify(bridge, entry)?;
        batch.edit(entry_xpath(location, version, entry.name())?, element);
    }
    Ok(batch)
}

/// Flushes `changes` when there is anything to send. Returns whether the
/// device was written to.
pub(crate) async fn apply_changes<E, L, C>(
    client: &C,
    location: &L,
    changes: &Changeset<E>,
    bridge: &dyn EntryBridge<E>,
    config: ManagerConfig,
    cancel: &CancellationToken,
) -> Result<bool, SyncError>
where
    E: NamedEntry,
    L: Location,
    C: Client + ?Sized,
{
    if changes.is_empty() {
        debug!("collection already matches the plan");
        return Ok(false);
    }
    debug!(
        deletes = changes.deletes.len(),
        renames = changes.renames.len(),
        edits = changes.edits.len(),
        creates = changes.creates.len(),
        "reconciling collection"
    );
    let batch = changeset_batch(
        changes,
        location,
        client.versioning(),
        bridge,
        config.batch_size,
    )?;
    batch.flush(client, config.strict, cancel).await?;
    Ok(true)
}

/// Changes for a CreateMany: the plan lands as edits, after the live
/// collection is cleared in exhaustive mode.
pub(crate) fn creation_changes<E: NamedEntry>(
    live: &[E],
    plan: &[E],
    ownership: Ownership,
) -> Result<Changeset<E>, SyncError> {
    classify::ensure_unique_names(plan)?;
    let mut changes = Changeset::default();
    match ownership {
        Ownership::NonExhaustive => {
            let planned: HashSet<&str> = plan.iter().map(NamedEntry::name).collect();
            if let Some(taken) = live.iter().find(|e| planned.contains(e.name())) {
                return Err(SyncError::Conflict(format!(
                    "entry `{}` already exists on the device",
                    taken.name()
                )));
            }
        }
        Ownership::Exhaustive => {
            changes.deletes = live.iter().map(|e| e.name().to_string()).collect();
        }
    }
    changes.creates = plan.to_vec();
    Ok(changes)
}

/// Keeps the live entries the caller cares about, in device order.
pub(crate) fn select_owned<E: NamedEntry>(live: Vec<E>, plan: &[E], ownership: Ownership) -> Vec<E> {
    match ownership {
        Ownership::Exhaustive => live,
        Ownership::NonExhaustive => {
            let planned: HashSet<&str> = plan.iter().map(NamedEntry::name).collect();
            live.into_iter()
                .filter(|e| planned.contains(e.name()))
                .collect()
        }
    }
}

/// Reconciles an unordered collection keyed by entry name.
pub struct EntryObjectManager<E, L, C: ?Sized, S: ?Sized> {
    client: Arc<C>,
    service: Arc<S>,
    bridge: Arc<dyn EntryBridge<E>>,
    config: ManagerConfig,
    ownership: Ownership,
    _location: PhantomData<fn() -> L>,
}

impl<E, L, C, S> EntryObjectManager<E, L, C, S>
where
    E: NamedEntry,
    L: Location,
    C: Client + ?Sized,
    S: EntryService<E, L> + ?Sized,
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

    /// Lists the collection. Exhaustive managers see every entry, the others
    /// only the entries named in `plan`.
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
        cancel: &CancellationToken,
    ) -> Result<E, SyncError> {
        let live = self.list(location, cancel).await?;
        if live.iter().any(|e| e.name() == entry.name()) {
            return Err(SyncError::Conflict(format!(
                "entry `{}` already exists on the device",
                entry.name()
            )));
        }
        call(cancel, Stage::Write, self.service.create(location, entry)).await
    }

    pub async fn create_many(
        &self,
        location: &L,
        plan: &[E],
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, SyncError> {
        let live = self.list(location, cancel).await?;
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
        classify::align_to_plan(plan, live)
    }

    /// Updates the entry stored under `name`.
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
        .await
    }

    /// Brings the collection from `state` to `plan`, inferring renames from
    /// unchanged payloads.
    pub async fn update_many(
        &self,
        location: &L,
        state: &[E],
        plan: &[E],
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, SyncError> {
        let mut classification = classify::classify(state, plan, self.bridge.as_ref())?;
        let live = self.list(location, cancel).await?;
        let counterparts = classify::counterparts_by_name(state, &live);
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
        classify::align_to_plan(plan, live)
    }

    /// Deletes `names`. A missing entry surfaces as [`SyncError::NotFound`].
    pub async fn delete(
        &self,
        location: &L,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        if names.is_empty() {
            return Ok(());
        }
        let result = call(cancel, Stage::Delete, self.service.delete(location, names)).await;
        if let Err(SyncError::NotFound) = &result {
            warn!(entries = names.len(), "delete target is already gone");
        }
        result
    }
}

#[cfg(test)]
#[path = "entries_tests.rs"]
mod tests;
