//! Declarative reconciliation of device configuration collections.
//!
//! Managers take a desired plan, the state recorded by the caller and the
//! device's live listing, and derive one ordered batch of edits, renames and
//! deletes (plus a group move for ordered collections) that brings the device
//! in line with the plan.

mod batch;
mod classify;
mod codec;
mod config;
mod entries;
mod entry;
mod error;
pub mod http;
mod importable;
mod location;
mod ordering;
mod position;
mod singleton;
mod uuid_entries;

#[cfg(test)]
mod testing;

pub use batch::{Batch, DEFAULT_BATCH_SIZE};
pub use codec::{
    Client, ConfigService, EntryService, ImportableEntryService, ReadAction, UuidEntryService,
};
pub use config::ManagerConfig;
pub use entries::EntryObjectManager;
pub use entry::{EntryBridge, NamedEntry, Ownership, UuidEntry};
pub use error::{ErrorKind, Stage, SyncError};
pub use importable::ImportableEntryObjectManager;
pub use location::{
    DEFAULT_DEVICE, EntrySelector, Location, ObjectKind, ObjectLocation, Rulebase, Scope,
};
pub use position::{LegacyPosition, Placement};
pub use singleton::ConfigObjectManager;
pub use uuid_entries::UuidObjectManager;
