//! Codec implementations backed by [`XmlApiClient`].

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use xmlapi_core::{
    Element, MoveWhere, MultiConfigResponse, Operation, Version, XmlApiClient, XmlApiError, xpath,
};

use crate::codec::{Client, ConfigService, EntryService, ReadAction, UuidEntryService};
use crate::entry::{EntryBridge, NamedEntry};
use crate::location::{EntrySelector, Location};
use crate::position::Placement;

#[async_trait]
impl Client for XmlApiClient {
    fn versioning(&self) -> Version {
        self.version()
    }

    fn target(&self) -> Option<&str> {
        XmlApiClient::target(self)
    }

    async fn chunked_multi_config(
        &self,
        chunks: &[Vec<Operation>],
        strict: bool,
        extras: &[(String, String)],
    ) -> Result<Vec<MultiConfigResponse>, XmlApiError> {
        XmlApiClient::chunked_multi_config(self, chunks, strict, extras).await
    }
}

/// An entry with a fixed `<entry name="..">` XML form.
pub trait XmlEntry: NamedEntry {
    fn to_element(&self) -> Element;
    fn from_element(element: &Element) -> Result<Self, XmlApiError>;
}

/// A singleton config node.
pub trait XmlConfig: Clone + Send + Sync + 'static {
    fn to_element(&self) -> Element;
    fn from_element(element: &Element) -> Result<Self, XmlApiError>;
}

/// Bridge over the XML form: two entries match when their elements are
/// equal once `name` and `uuid` are stripped.
pub struct XmlEntryBridge<E>(PhantomData<fn() -> E>);

impl<E> Default for XmlEntryBridge<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

fn without_identity(mut element: Element) -> Element {
    element.remove_attribute("name");
    element.remove_attribute("uuid");
    element
}

impl<E: XmlEntry> EntryBridge<E> for XmlEntryBridge<E> {
    fn specify(&self, entry: &E) -> Result<Element, String> {
        let element = entry.to_element();
        match element.attribute("name") {
            Some(name) if name == entry.name() => Ok(element),
            _ => Err(format!(
                "element for `{}` does not carry its name",
                entry.name()
            )),
        }
    }

    fn matches(&self, left: &E, right: &E) -> bool {
        without_identity(left.to_element()) == without_identity(right.to_element())
    }
}

fn location_path<L: Location>(
    location: &L,
    version: Version,
    selector: EntrySelector<'_>,
) -> Result<String, XmlApiError> {
    location
        .xpath(version, selector)
        .map(|segments| xpath::join(&segments))
        .map_err(|err| XmlApiError::Config(err.to_string()))
}

fn parse_entries<E: XmlEntry>(nodes: &[Element]) -> Result<Vec<E>, XmlApiError> {
    nodes
        .iter()
        .filter(|node| node.name == "entry")
        .map(E::from_element)
        .collect()
}

/// Entry service speaking the XML API directly.
///
/// `list` treats a non-empty `filter` as an xpath predicate on the entry
/// nodes and lets the device evaluate it; `quote` is not needed for that and
/// is ignored.
pub struct XmlEntryService<E> {
    client: Arc<XmlApiClient>,
    strict: bool,
    _entry: PhantomData<fn() -> E>,
}

impl<E> XmlEntryService<E> {
    pub fn new(client: Arc<XmlApiClient>) -> Self {
        Self {
            client,
            strict: true,
            _entry: PhantomData,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn version(&self) -> Version {
        self.client.version()
    }
}

impl<E: XmlEntry> XmlEntryService<E> {
    async fn fetch<L: Location>(&self, location: &L, name: &str) -> Result<E, XmlApiError> {
        let path = location_path(location, self.version(), EntrySelector::Name(name))?;
        E::from_element(&self.client.get_config(&path).await?)
    }

    async fn submit(&self, operations: Vec<Operation>) -> Result<(), XmlApiError> {
        if operations.is_empty() {
            return Ok(());
        }
        let response = self
            .client
            .multi_config(&operations, self.strict, &[])
            .await?;
        response.ensure_success()
    }
}

#[async_trait]
impl<E, L> EntryService<E, L> for XmlEntryService<E>
where
    E: XmlEntry,
    L: Location,
{
    async fn list(
        &self,
        location: &L,
        action: ReadAction,
        filter: &str,
        _quote: &str,
    ) -> Result<Vec<E>, XmlApiError> {
        let container = location_path(location, self.version(), EntrySelector::Container)?;
        if filter.is_empty() {
            let node = self.client.read_config(action.as_str(), &container).await?;
            return parse_entries(&node.children);
        }
        let selection = format!("{container}/entry[{filter}]");
        match self.client.read_nodes(action.as_str(), &selection).await {
            Ok(nodes) => parse_entries(&nodes),
            Err(XmlApiError::ObjectNotFound) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    async fn read(&self, location: &L, name: &str, action: ReadAction) -> Result<E, XmlApiError> {
        let path = location_path(location, self.version(), EntrySelector::Name(name))?;
        E::from_element(&self.client.read_config(action.as_str(), &path).await?)
    }

    async fn create(&self, location: &L, entry: &E) -> Result<E, XmlApiError> {
        let path = location_path(location, self.version(), EntrySelector::Name(entry.name()))?;
        self.client.edit_config(&path, &entry.to_element()).await?;
        self.fetch(location, entry.name()).await
    }

    async fn update(&self, location: &L, entry: &E, name: &str) -> Result<E, XmlApiError> {
        if name != entry.name() {
            let current = location_path(location, self.version(), EntrySelector::Name(name))?;
            self.client.rename_config(&current, entry.name()).await?;
        }
        let path = location_path(location, self.version(), EntrySelector::Name(entry.name()))?;
        self.client.edit_config(&path, &entry.to_element()).await?;
        self.fetch(location, entry.name()).await
    }

    async fn delete(&self, location: &L, names: &[String]) -> Result<(), XmlApiError> {
        let operations = names
            .iter()
            .map(|name| {
                Ok(Operation::Delete {
                    xpath: location_path(location, self.version(), EntrySelector::Name(name))?,
                })
            })
            .collect::<Result<Vec<_>, XmlApiError>>()?;
        self.submit(operations).await
    }
}

#[async_trait]
impl<E, L> UuidEntryService<E, L> for XmlEntryService<E>
where
    E: XmlEntry,
    L: Location,
{
    /// Moves the first entry as `placement` says and chains every other one
    /// directly after its predecessor, all in one multi-config.
    async fn move_group(
        &self,
        location: &L,
        placement: &Placement,
        entries: &[E],
    ) -> Result<(), XmlApiError> {
        let mut operations = Vec::with_capacity(entries.len());
        let mut previous: Option<&str> = None;
        for entry in entries {
            let xpath = location_path(location, self.version(), EntrySelector::Name(entry.name()))?;
            let (position, destination) = match previous {
                None => placement.move_where(),
                Some(prev) => (MoveWhere::After, Some(prev)),
            };
            operations.push(Operation::Move {
                xpath,
                position,
                destination: destination.map(str::to_string),
            });
            previous = Some(entry.name());
        }
        debug!(entries = operations.len(), "moving entry group");
        self.submit(operations).await
    }
}

/// Singleton service: the config lives at the location's container path.
pub struct XmlConfigService<E> {
    client: Arc<XmlApiClient>,
    _config: PhantomData<fn() -> E>,
}

impl<E> XmlConfigService<E> {
    pub fn new(client: Arc<XmlApiClient>) -> Self {
        Self {
            client,
            _config: PhantomData,
        }
    }

    fn path<L: Location>(&self, location: &L) -> Result<String, XmlApiError> {
        location_path(location, self.client.version(), EntrySelector::Container)
    }
}

#[async_trait]
impl<E, L> ConfigService<E, L> for XmlConfigService<E>
where
    E: XmlConfig,
    L: Location,
{
    async fn create(&self, location: &L, config: &E) -> Result<E, XmlApiError> {
        let path = self.path(location)?;
        self.client.set_config(&path, &config.to_element()).await?;
        E::from_element(&self.client.get_config(&path).await?)
    }

    async fn read(&self, location: &L, action: ReadAction) -> Result<E, XmlApiError> {
        let path = self.path(location)?;
        E::from_element(&self.client.read_config(action.as_str(), &path).await?)
    }

    async fn update(&self, location: &L, config: &E) -> Result<E, XmlApiError> {
        let path = self.path(location)?;
        self.client.edit_config(&path, &config.to_element()).await?;
        E::from_element(&self.client.get_config(&path).await?)
    }

    async fn delete(&self, location: &L, _config: &E) -> Result<(), XmlApiError> {
        let path = self.path(location)?;
        self.client.delete_config(&path).await
    }
}
