//! Rooms and light groups.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::cache::{CacheEnvelope, CachedEntity, read_through};
use crate::capability::{Capability, Operation};
use crate::errors::Error;
use crate::lights::Lights;
use crate::runtime::Mutex;
use crate::transport::Transport;
use crate::types::{Alert, ColorMode, Effect};

type Result<T> = std::result::Result<T, Error>;

/// The group variants this client manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// A room; its lights belong to no other room.
    Room,
    /// A free-form set of lights.
    LightGroup,
}

impl GroupKind {
    pub fn from_type(type_name: &str) -> Option<Self> {
        match type_name {
            "Room" => Some(GroupKind::Room),
            "LightGroup" => Some(GroupKind::LightGroup),
            _ => None,
        }
    }
}

/// Aggregate on/off state of a group's lights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GroupState {
    pub all_on: bool,
    pub any_on: bool,
}

/// The last action sent to a group.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroupAction {
    pub on: bool,
    pub bri: Option<u8>,
    pub alert: Alert,
    pub hue: Option<u16>,
    pub sat: Option<u8>,
    pub effect: Option<Effect>,
    pub xy: Option<[f64; 2]>,
    pub ct: Option<u16>,
    pub colormode: Option<ColorMode>,
}

/// One entry of `GET groups` or the body of `GET groups/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupData {
    pub name: String,
    /// Member light ids.
    #[serde(default)]
    pub lights: Vec<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub state: GroupState,
    #[serde(default)]
    pub action: GroupAction,
    /// Room classification, e.g. `Living room`. Rooms only.
    pub class: Option<String>,
    /// Whether the bridge may delete the group on its own. Light groups only.
    pub recycle: Option<bool>,
}

/// A group on the bridge and the lights it references.
///
/// Member lights are shared with the bridge's [`Lights`]; the group's own
/// capability table is fixed when the group is built.
pub struct Group {
    id: String,
    kind: GroupKind,
    name: String,
    members: Lights,
    transport: Arc<dyn Transport>,
    cache: Mutex<CacheEnvelope<GroupData>>,
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("members", &self.members.len())
            .finish()
    }
}

impl Group {
    /// Builds a group from its data, or `None` for unsupported group types.
    ///
    /// Member ids without a matching light in `lights` are left out.
    pub(crate) fn from_data(
        id: &str,
        data: GroupData,
        lights: &Lights,
        transport: Arc<dyn Transport>,
        ttl: Duration,
    ) -> Option<Self> {
        let Some(kind) = GroupKind::from_type(&data.type_name) else {
            debug!("skipping group {id}: unsupported type {:?}", data.type_name);
            return None;
        };
        let members = Lights::from_lights(
            data.lights
                .iter()
                .filter_map(|light_id| lights.by_id(light_id).cloned()),
        );

        Some(Group {
            id: id.to_string(),
            kind,
            name: data.name.clone(),
            members,
            transport,
            cache: Mutex::new(CacheEnvelope::fresh(data, ttl)),
        })
    }

    /// Fetches `GET groups/{id}` and builds the group.
    pub async fn load(
        id: &str,
        lights: &Lights,
        transport: Arc<dyn Transport>,
        ttl: Duration,
    ) -> Result<Self> {
        let data = fetch(transport.as_ref(), id).await?;
        Self::from_data(id, data, lights, transport, ttl)
            .ok_or_else(|| Error::GroupNotFound(id.to_string()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name at the time the group was built.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Member lights, looked up the same way as the bridge's lights.
    pub fn lights(&self) -> &Lights {
        &self.members
    }

    pub async fn data(&self) -> Result<GroupData> {
        self.refresh(false).await
    }

    pub async fn state(&self) -> Result<GroupState> {
        Ok(self.data().await?.state)
    }

    pub async fn all_on(&self) -> Result<bool> {
        Ok(self.state().await?.all_on)
    }

    pub async fn any_on(&self) -> Result<bool> {
        Ok(self.state().await?.any_on)
    }

    pub async fn action(&self) -> Result<GroupAction> {
        Ok(self.data().await?.action)
    }

    pub async fn class(&self) -> Result<Option<String>> {
        Ok(self.data().await?.class)
    }

    pub async fn recycle(&self) -> Result<Option<bool>> {
        Ok(self.data().await?.recycle)
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.members.supports(capability)
    }

    /// Applies `operation` to every member light supporting it.
    pub async fn apply(&self, operation: &Operation) -> Result<usize> {
        self.members.apply(operation).await
    }
}

async fn fetch(transport: &dyn Transport, id: &str) -> Result<GroupData> {
    let reply = transport.get(&format!("groups/{id}")).await?;
    serde_json::from_value(reply).map_err(Error::JsonLoad)
}

impl CachedEntity for Group {
    type Snapshot = GroupData;

    async fn refresh(&self, force: bool) -> Result<GroupData> {
        if force {
            self.force_refresh().await;
        }
        read_through(&self.cache, || fetch(self.transport.as_ref(), &self.id)).await
    }

    async fn force_refresh(&self) {
        self.cache.lock().await.invalidate();
    }
}

/// Groups keyed by name.
#[derive(Debug, Default)]
pub struct Groups {
    by_name: BTreeMap<String, Arc<Group>>,
}

impl Groups {
    /// Fetches `GET groups` and builds every room and light group.
    pub async fn scan(
        transport: Arc<dyn Transport>,
        lights: &Lights,
        ttl: Duration,
    ) -> Result<Self> {
        let reply = transport.get("groups").await?;
        let entries: BTreeMap<String, GroupData> =
            serde_json::from_value(reply).map_err(Error::JsonLoad)?;

        let mut groups = Groups::default();
        for (id, data) in entries {
            if let Some(group) = Group::from_data(&id, data, lights, Arc::clone(&transport), ttl) {
                groups.insert(group);
            }
        }
        info!("scanned {} group(s)", groups.len());
        Ok(groups)
    }

    /// Registers `group`, replacing any group of the same name.
    pub fn insert(&mut self, group: Group) -> Arc<Group> {
        let group = Arc::new(group);
        let name = group.name().to_string();
        if let Some(previous) = self.by_name.insert(name, Arc::clone(&group)) {
            warn!(
                "group {} replaces group {} named {:?}",
                group.id(),
                previous.id(),
                previous.name()
            );
        }
        group
    }

    /// Removes the group with the given id, dropping its capability table.
    pub fn remove_by_id(&mut self, id: &str) -> Option<Arc<Group>> {
        let name = self
            .by_name
            .iter()
            .find(|(_, group)| group.id() == id)
            .map(|(name, _)| name.clone())?;
        self.by_name.remove(&name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Group>> {
        self.by_name.get(name)
    }

    pub fn by_id(&self, id: &str) -> Option<&Arc<Group>> {
        self.by_name.values().find(|group| group.id() == id)
    }

    /// Looks a group up by name, failing with [`Error::GroupNotFound`].
    pub fn try_get(&self, name: &str) -> Result<&Arc<Group>> {
        self.get(name)
            .ok_or_else(|| Error::GroupNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Group>> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
