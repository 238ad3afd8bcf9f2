use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::codec::{ConfigService, ReadAction, call};
use crate::error::{Stage, SyncError};

/// CRUD for an object that exists at most once at its location.
pub struct ConfigObjectManager<E, L, S: ?Sized> {
    service: Arc<S>,
    _marker: PhantomData<fn() -> (E, L)>,
}

impl<E, L, S> ConfigObjectManager<E, L, S>
where
    E: Send + Sync,
    L: Send + Sync,
    S: ConfigService<E, L> + ?Sized,
{
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            _marker: PhantomData,
        }
    }

    pub async fn create(
        &self,
        location: &L,
        config: &E,
        cancel: &CancellationToken,
    ) -> Result<E, SyncError> {
        call(cancel, Stage::Write, self.service.create(location, config)).await
    }

    pub async fn read(
        &self,
        location: &L,
        action: ReadAction,
        cancel: &CancellationToken,
    ) -> Result<E, SyncError> {
        call(cancel, Stage::Read, self.service.read(location, action)).await
    }

    pub async fn update(
        &self,
        location: &L,
        config: &E,
        cancel: &CancellationToken,
    ) -> Result<E, SyncError> {
        call(cancel, Stage::Write, self.service.update(location, config)).await
    }

    pub async fn delete(
        &self,
        location: &L,
        config: &E,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        call(cancel, Stage::Delete, self.service.delete(location, config)).await
    }
}
