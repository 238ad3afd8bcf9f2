//! Capabilities the engine consumes from the wire codec.
//!
//! Every method reports failures as [`XmlApiError`]; the engine only
//! distinguishes the object-not-found sentinel from everything else.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use xmlapi_core::{MultiConfigResponse, Operation, Version, XmlApiError};

use crate::error::{Stage, SyncError};
use crate::position::Placement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadAction {
    /// Candidate configuration.
    #[default]
    Get,
    /// Running configuration.
    Show,
}

impl ReadAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadAction::Get => "get",
            ReadAction::Show => "show",
        }
    }
}

#[async_trait]
pub trait Client: Send + Sync {
    fn versioning(&self) -> Version;

    fn target(&self) -> Option<&str>;

    async fn chunked_multi_config(
        &self,
        chunks: &[Vec<Operation>],
        strict: bool,
        extras: &[(String, String)],
    ) -> Result<Vec<MultiConfigResponse>, XmlApiError>;
}

#[async_trait]
pub trait EntryService<E, L>: Send + Sync
where
    E: Send + Sync,
    L: Send + Sync,
{
    async fn list(
        &self,
        location: &L,
        action: ReadAction,
        filter: &str,
        quote: &str,
    ) -> Result<Vec<E>, XmlApiError>;

    async fn read(&self, location: &L, name: &str, action: ReadAction) -> Result<E, XmlApiError>;

    async fn create(&self, location: &L, entry: &E) -> Result<E, XmlApiError>;

    /// Updates the entry currently stored under `name`, renaming it when
    /// `entry` carries a different name.
    async fn update(&self, location: &L, entry: &E, name: &str) -> Result<E, XmlApiError>;

    async fn delete(&self, location: &L, names: &[String]) -> Result<(), XmlApiError>;
}

#[async_trait]
pub trait UuidEntryService<E, L>: EntryService<E, L>
where
    E: Send + Sync,
    L: Send + Sync,
{
    /// Moves `entries` as one contiguous block, in the given order.
    async fn move_group(
        &self,
        location: &L,
        placement: &Placement,
        entries: &[E],
    ) -> Result<(), XmlApiError>;
}

#[async_trait]
pub trait ConfigService<E, L>: Send + Sync
where
    E: Send + Sync,
    L: Send + Sync,
{
    async fn create(&self, location: &L, config: &E) -> Result<E, XmlApiError>;

    async fn read(&self, location: &L, action: ReadAction) -> Result<E, XmlApiError>;

    async fn update(&self, location: &L, config: &E) -> Result<E, XmlApiError>;

    async fn delete(&self, location: &L, config: &E) -> Result<(), XmlApiError>;
}

#[async_trait]
pub trait ImportableEntryService<E, L, I>: Send + Sync
where
    E: Send + Sync,
    L: Send + Sync,
    I: Send + Sync,
{
    async fn create(&self, location: &L, imports: &[I], entry: &E) -> Result<E, XmlApiError>;

    async fn read(&self, location: &L, name: &str, action: ReadAction) -> Result<E, XmlApiError>;

    async fn update(&self, location: &L, entry: &E, name: &str) -> Result<E, XmlApiError>;

    async fn delete(&self, location: &L, imports: &[I], names: &[String])
    -> Result<(), XmlApiError>;
}

/// Awaits a codec call unless `cancel` fires first.
pub(crate) async fn call<T, F>(cancel: &CancellationToken, stage: Stage, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, XmlApiError>>,
{
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        result = fut => result.map_err(|err| SyncError::from_codec(stage, err)),
    }
}

/// Lists a collection, treating a missing container as empty.
pub(crate) async fn list_or_empty<E, L, S>(
    service: &S,
    location: &L,
    cancel: &CancellationToken,
) -> Result<Vec<E>, SyncError>
where
    E: Send + Sync,
    L: Send + Sync,
    S: EntryService<E, L> + ?Sized,
{
    match call(cancel, Stage::Read, service.list(location, ReadAction::Get, "", "")).await {
        Ok(entries) => Ok(entries),
        Err(SyncError::NotFound) => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}
