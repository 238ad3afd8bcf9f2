use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::codec::{ImportableEntryService, ReadAction, call};
use crate::entry::NamedEntry;
use crate::error::{Stage, SyncError};
use crate::location::Location;

/// Entry manager for objects that must also be imported into other
/// locations (interfaces into a vsys or zone, for instance). The import
/// locations are handed to the service untouched.
pub struct ImportableEntryObjectManager<E, L, I, S: ?Sized> {
    service: Arc<S>,
    _marker: PhantomData<fn() -> (E, L, I)>,
}

impl<E, L, I, S> ImportableEntryObjectManager<E, L, I, S>
where
    E: NamedEntry,
    L: Location,
    I: Send + Sync,
    S: ImportableEntryService<E, L, I> + ?Sized,
{
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            _marker: PhantomData,
        }
    }

    /// Listing is not supported for importable entries.
    pub async fn read_many(
        &self,
        _location: &L,
        _plan: &[E],
        _cancel: &CancellationToken,
    ) -> Result<Vec<E>, SyncError> {
        Err(SyncError::Internal(
            "read_many is not supported for importable entries".into(),
        ))
    }

    pub async fn create(
        &self,
        location: &L,
        imports: &[I],
        entry: &E,
        cancel: &CancellationToken,
    ) -> Result<E, SyncError> {
        call(
            cancel,
            Stage::Write,
            self.service.create(location, imports, entry),
        )
        .await
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

    pub async fn delete(
        &self,
        location: &L,
        imports: &[I],
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        call(
            cancel,
            Stage::Delete,
            self.service.delete(location, imports, names),
        )
        .await
    }
}
