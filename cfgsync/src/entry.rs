use xmlapi_core::Element;

use crate::error::SyncError;

/// An object in a named collection. The name is the collection's key.
pub trait NamedEntry: Clone + Send + Sync + 'static {
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
}

/// An entry of an ordered collection. The device assigns the uuid.
pub trait UuidEntry: NamedEntry {
    fn uuid(&self) -> Option<&str>;
    fn set_uuid(&mut self, uuid: Option<String>);
}

/// Converts entries into wire payloads and compares them semantically.
///
/// `matches` must ignore identity fields (name, uuid); the engine uses it both
/// for drift detection and for rename inference.
pub trait EntryBridge<E>: Send + Sync {
    fn specify(&self, entry: &E) -> Result<Element, String>;
    fn matches(&self, left: &E, right: &E) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ownership {
    /// The plan describes the whole collection.
    Exhaustive,
    /// The plan describes a subset; foreign entries are left alone.
    #[default]
    NonExhaustive,
}

pub(crate) fn specify<E: NamedEntry>(
    bridge: &dyn EntryBridge<E>,
    entry: &E,
) -> Result<Element, SyncError> {
    bridge.specify(entry).map_err(|message| SyncError::Marshaling {
        name: entry.name().to_string(),
        message,
    })
}
