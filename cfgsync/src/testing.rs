//! In-memory device used by the engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use xmlapi_core::{
    Element, MoveWhere, MultiConfigResponse, Operation, OperationResult, Version, XmlApiError,
    xpath,
};

use crate::codec::{
    Client, ConfigService, EntryService, ImportableEntryService, ReadAction, UuidEntryService,
};
use crate::entry::{EntryBridge, NamedEntry, UuidEntry};
use crate::location::{EntrySelector, Location, ObjectKind, ObjectLocation};
use crate::position::Placement;

pub(crate) const DEVICE_VERSION: Version = Version::new(10, 2, 0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Item {
    pub name: String,
    pub uuid: Option<String>,
    pub value: String,
}

impl Item {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            uuid: None,
            value: value.to_string(),
        }
    }

    fn from_element(element: &Element) -> Self {
        Self {
            name: element.attribute("name").unwrap_or_default().to_string(),
            uuid: element.attribute("uuid").map(str::to_string),
            value: element.child_text("value").unwrap_or_default().to_string(),
        }
    }
}

impl NamedEntry for Item {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl UuidEntry for Item {
    fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    fn set_uuid(&mut self, uuid: Option<String>) {
        self.uuid = uuid;
    }
}

pub(crate) fn items(pairs: &[(&str, &str)]) -> Vec<Item> {
    pairs
        .iter()
        .map(|(name, value)| Item::new(name, value))
        .collect()
}

pub(crate) fn names(entries: &[Item]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

/// Compares values; values starting with `!` cannot be marshaled.
pub(crate) struct ValueBridge;

impl EntryBridge<Item> for ValueBridge {
    fn specify(&self, entry: &Item) -> Result<Element, String> {
        if entry.value.starts_with('!') {
            return Err(format!("value `{}` is not representable", entry.value));
        }
        Ok(Element::new("entry")
            .with_attribute("name", entry.name.clone())
            .with_child(Element::new("value").with_text(entry.value.clone())))
    }

    fn matches(&self, left: &Item, right: &Item) -> bool {
        left.value == right.value
    }
}

pub(crate) fn tag_location() -> ObjectLocation {
    ObjectLocation::shared(ObjectKind::TAG)
}

pub(crate) fn rule_location() -> ObjectLocation {
    ObjectLocation::vsys(ObjectKind::SECURITY_RULE, "vsys1")
}

fn container_of(location: &ObjectLocation) -> Result<String, XmlApiError> {
    location
        .xpath(DEVICE_VERSION, EntrySelector::Container)
        .map(|segments| xpath::join(&segments))
        .map_err(|err| XmlApiError::Config(err.to_string()))
}

fn api_error(message: impl Into<String>) -> XmlApiError {
    XmlApiError::Api {
        code: Some(12),
        message: message.into(),
    }
}

#[derive(Default)]
struct DeviceState {
    collections: HashMap<String, Vec<Item>>,
    singletons: HashMap<String, Item>,
    imports: HashMap<String, Vec<String>>,
    operations: Vec<String>,
    multi_config_calls: usize,
    move_group_calls: usize,
    next_uuid: usize,
    fail_writes: Option<String>,
    cancel_on_write: Option<CancellationToken>,
}

impl DeviceState {
    fn assign_uuid(&mut self) -> String {
        self.next_uuid += 1;
        format!("uuid-{}", self.next_uuid)
    }

    fn collection(&mut self, container: &str) -> &mut Vec<Item> {
        self.collections.entry(container.to_string()).or_default()
    }

    fn upsert(&mut self, container: &str, mut item: Item) {
        let existing = self
            .collection(container)
            .iter()
            .position(|e| e.name == item.name);
        match existing {
            Some(idx) => {
                let slot = &mut self.collection(container)[idx];
                item.uuid = slot.uuid.clone();
                *slot = item;
            }
            None => {
                item.uuid = Some(self.assign_uuid());
                self.collection(container).push(item);
            }
        }
    }

    fn rename(&mut self, container: &str, from: &str, to: &str) -> Result<(), XmlApiError> {
        let entries = self.collection(container);
        if entries.iter().any(|e| e.name == to) {
            return Err(api_error(format!("{to} already exists")));
        }
        let entry = entries
            .iter_mut()
            .find(|e| e.name == from)
            .ok_or(XmlApiError::ObjectNotFound)?;
        entry.name = to.to_string();
        Ok(())
    }

    fn place(
        &mut self,
        container: &str,
        position: MoveWhere,
        destination: Option<&str>,
        moved: &[String],
    ) -> Result<(), XmlApiError> {
        let entries = self.collection(container);
        let mut block = Vec::with_capacity(moved.len());
        for name in moved {
            let idx = entries
                .iter()
                .position(|e| &e.name == name)
                .ok_or(XmlApiError::ObjectNotFound)?;
            block.push(entries.remove(idx));
        }
        let pivot = |entries: &Vec<Item>| {
            let dst = destination.unwrap_or_default();
            entries
                .iter()
                .position(|e| e.name == dst)
                .ok_or_else(|| api_error(format!("pivot {dst} does not exist")))
        };
        let at = match position {
            MoveWhere::Top => 0,
            MoveWhere::Bottom => entries.len(),
            MoveWhere::Before => pivot(&*entries)?,
            MoveWhere::After => pivot(&*entries)? + 1,
        };
        entries.splice(at..at, block);
        Ok(())
    }

    fn apply(&mut self, op: &Operation) -> Result<(), XmlApiError> {
        let (container, name) = xpath::split_entry(op.xpath())
            .ok_or_else(|| api_error(format!("unsupported xpath {}", op.xpath())))?;
        match op {
            Operation::Edit { element, .. } => {
                self.upsert(container, Item::from_element(element));
                self.operations.push(format!("edit {name}"));
            }
            Operation::Delete { .. } => {
                self.collection(container).retain(|e| e.name != name);
                self.operations.push(format!("delete {name}"));
            }
            Operation::Rename { new_name, .. } => {
                self.rename(container, name, new_name)?;
                self.operations.push(format!("rename {name} {new_name}"));
            }
            Operation::Move {
                position,
                destination,
                ..
            } => {
                self.place(
                    container,
                    *position,
                    destination.as_deref(),
                    &[name.to_string()],
                )?;
                self.operations.push(format!("move {name}"));
            }
        }
        Ok(())
    }
}

/// A device holding collections keyed by container xpath.
#[derive(Default)]
pub(crate) struct FakeDevice {
    state: Mutex<DeviceState>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    /// Stores `entries` at `location`, assigning uuids to those without one.
    pub fn seed(&self, location: &ObjectLocation, entries: &[Item]) {
        let container = container_of(location).unwrap();
        let mut state = self.lock();
        for entry in entries {
            let mut entry = entry.clone();
            if entry.uuid.is_none() {
                entry.uuid = Some(state.assign_uuid());
            }
            state.collection(&container).push(entry);
        }
    }

    pub fn entries(&self, location: &ObjectLocation) -> Vec<Item> {
        let container = container_of(location).unwrap();
        self.lock()
            .collections
            .get(&container)
            .cloned()
            .unwrap_or_default()
    }

    /// Drops the uuids stored at `location`, as a misbehaving device would.
    pub fn forget_uuids(&self, location: &ObjectLocation) {
        let container = container_of(location).unwrap();
        for entry in self.lock().collection(&container).iter_mut() {
            entry.uuid = None;
        }
    }

    /// Renames an entry behind the engine's back.
    pub fn rename_out_of_band(&self, location: &ObjectLocation, from: &str, to: &str) {
        let container = container_of(location).unwrap();
        self.lock().rename(&container, from, to).unwrap();
    }

    pub fn operations(&self) -> Vec<String> {
        self.lock().operations.clone()
    }

    pub fn multi_config_calls(&self) -> usize {
        self.lock().multi_config_calls
    }

    pub fn move_group_calls(&self) -> usize {
        self.lock().move_group_calls
    }

    pub fn imports(&self, import: &str) -> Vec<String> {
        self.lock().imports.get(import).cloned().unwrap_or_default()
    }

    pub fn fail_writes(&self, message: &str) {
        self.lock().fail_writes = Some(message.to_string());
    }

    /// Cancels `token` once a write arrives and then never answers it.
    pub fn cancel_on_write(&self, token: CancellationToken) {
        self.lock().cancel_on_write = Some(token);
    }
}

#[async_trait]
impl Client for FakeDevice {
    fn versioning(&self) -> Version {
        DEVICE_VERSION
    }

    fn target(&self) -> Option<&str> {
        None
    }

    async fn chunked_multi_config(
        &self,
        chunks: &[Vec<Operation>],
        _strict: bool,
        _extras: &[(String, String)],
    ) -> Result<Vec<MultiConfigResponse>, XmlApiError> {
        let cancel = self.lock().cancel_on_write.take();
        if let Some(token) = cancel {
            token.cancel();
            std::future::pending::<()>().await;
        }

        let mut state = self.lock();
        if let Some(message) = state.fail_writes.clone() {
            return Err(api_error(message));
        }
        let mut responses = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            state.multi_config_calls += 1;
            let mut results = Vec::with_capacity(chunk.len());
            for (id, op) in chunk.iter().enumerate() {
                state.apply(op)?;
                results.push(OperationResult {
                    id: Some((id + 1).to_string()),
                    status: "success".into(),
                    message: None,
                });
            }
            responses.push(MultiConfigResponse {
                status: "success".into(),
                code: Some(20),
                results,
            });
        }
        Ok(responses)
    }
}

#[async_trait]
impl EntryService<Item, ObjectLocation> for FakeDevice {
    async fn list(
        &self,
        location: &ObjectLocation,
        _action: ReadAction,
        _filter: &str,
        _quote: &str,
    ) -> Result<Vec<Item>, XmlApiError> {
        let container = container_of(location)?;
        self.lock()
            .collections
            .get(&container)
            .cloned()
            .ok_or(XmlApiError::ObjectNotFound)
    }

    async fn read(
        &self,
        location: &ObjectLocation,
        name: &str,
        _action: ReadAction,
    ) -> Result<Item, XmlApiError> {
        let container = container_of(location)?;
        self.lock()
            .collections
            .get(&container)
            .and_then(|entries| entries.iter().find(|e| e.name == name).cloned())
            .ok_or(XmlApiError::ObjectNotFound)
    }

    async fn create(&self, location: &ObjectLocation, entry: &Item) -> Result<Item, XmlApiError> {
        let container = container_of(location)?;
        let mut state = self.lock();
        if state.collection(&container).iter().any(|e| e.name == entry.name) {
            return Err(api_error(format!("{} already exists", entry.name)));
        }
        state.upsert(&container, entry.clone());
        state.operations.push(format!("create {}", entry.name));
        state
            .collection(&container)
            .iter()
            .find(|e| e.name == entry.name)
            .cloned()
            .ok_or(XmlApiError::ObjectNotFound)
    }

    async fn update(
        &self,
        location: &ObjectLocation,
        entry: &Item,
        name: &str,
    ) -> Result<Item, XmlApiError> {
        let container = container_of(location)?;
        let mut state = self.lock();
        if name != entry.name {
            state.rename(&container, name, &entry.name)?;
        }
        let current = state
            .collection(&container)
            .iter_mut()
            .find(|e| e.name == entry.name)
            .ok_or(XmlApiError::ObjectNotFound)?;
        current.value = entry.value.clone();
        let updated = current.clone();
        state.operations.push(format!("update {}", entry.name));
        Ok(updated)
    }

    async fn delete(&self, location: &ObjectLocation, names: &[String]) -> Result<(), XmlApiError> {
        let container = container_of(location)?;
        let mut state = self.lock();
        let entries = state.collection(&container);
        if names.iter().any(|name| !entries.iter().any(|e| &e.name == name)) {
            return Err(XmlApiError::ObjectNotFound);
        }
        entries.retain(|e| !names.contains(&e.name));
        for name in names {
            state.operations.push(format!("delete {name}"));
        }
        Ok(())
    }
}

#[async_trait]
impl UuidEntryService<Item, ObjectLocation> for FakeDevice {
    async fn move_group(
        &self,
        location: &ObjectLocation,
        placement: &Placement,
        entries: &[Item],
    ) -> Result<(), XmlApiError> {
        let container = container_of(location)?;
        let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        let (position, destination) = placement.move_where();
        let mut state = self.lock();
        state.move_group_calls += 1;
        state.place(&container, position, destination, &names)?;
        state.operations.push(format!("move {}", names.join(",")));
        Ok(())
    }
}

#[async_trait]
impl ConfigService<Item, ObjectLocation> for FakeDevice {
    async fn create(&self, location: &ObjectLocation, config: &Item) -> Result<Item, XmlApiError> {
        let container = container_of(location)?;
        self.lock().singletons.insert(container, config.clone());
        Ok(config.clone())
    }

    async fn read(
        &self,
        location: &ObjectLocation,
        _action: ReadAction,
    ) -> Result<Item, XmlApiError> {
        let container = container_of(location)?;
        self.lock()
            .singletons
            .get(&container)
            .cloned()
            .ok_or(XmlApiError::ObjectNotFound)
    }

    async fn update(&self, location: &ObjectLocation, config: &Item) -> Result<Item, XmlApiError> {
        let container = container_of(location)?;
        let mut state = self.lock();
        let current = state
            .singletons
            .get_mut(&container)
            .ok_or(XmlApiError::ObjectNotFound)?;
        *current = config.clone();
        Ok(config.clone())
    }

    async fn delete(&self, location: &ObjectLocation, _config: &Item) -> Result<(), XmlApiError> {
        let container = container_of(location)?;
        self.lock()
            .singletons
            .remove(&container)
            .map(|_| ())
            .ok_or(XmlApiError::ObjectNotFound)
    }
}

#[async_trait]
impl ImportableEntryService<Item, ObjectLocation, String> for FakeDevice {
    async fn create(
        &self,
        location: &ObjectLocation,
        imports: &[String],
        entry: &Item,
    ) -> Result<Item, XmlApiError> {
        let created = EntryService::create(self, location, entry).await?;
        let mut state = self.lock();
        for import in imports {
            state
                .imports
                .entry(import.clone())
                .or_default()
                .push(entry.name.clone());
        }
        Ok(created)
    }

    async fn read(
        &self,
        location: &ObjectLocation,
        name: &str,
        action: ReadAction,
    ) -> Result<Item, XmlApiError> {
        EntryService::read(self, location, name, action).await
    }

    async fn update(
        &self,
        location: &ObjectLocation,
        entry: &Item,
        name: &str,
    ) -> Result<Item, XmlApiError> {
        EntryService::update(self, location, entry, name).await
    }

    async fn delete(
        &self,
        location: &ObjectLocation,
        imports: &[String],
        names: &[String],
    ) -> Result<(), XmlApiError> {
        {
            let mut state = self.lock();
            for import in imports {
                if let Some(members) = state.imports.get_mut(import) {
                    members.retain(|member| !names.contains(member));
                }
            }
        }
        EntryService::delete(self, location, names).await
    }
}
