//! A paired bridge with its lights and groups.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::info;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::BridgeConfig;
use crate::discovery::{DiscoverySession, Established};
use crate::errors::Error;
use crate::group::{Group, Groups};
use crate::lights::Lights;
use crate::session::SessionRecord;
use crate::ssdp::BridgeDescriptor;
use crate::transport::{Transport, check_outcomes, first_outcome};

type Result<T> = std::result::Result<T, Error>;

/// A credential on the bridge's whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WhitelistEntry {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(rename = "create date", default)]
    pub created: String,
    #[serde(rename = "last use date", default)]
    pub last_used: String,
}

/// Entry point: an authorized bridge session plus the scanned lights and groups.
///
/// # Example
///
/// ```no_run
/// use hue_bridge_rs::{Bridge, BridgeConfig, Operation};
///
/// # async fn run() -> hue_bridge_rs::Result<()> {
/// let bridge = Bridge::connect(BridgeConfig::default()).await?;
/// for name in bridge.lights().names() {
///     println!("{name}");
/// }
/// bridge.lights().apply(&Operation::TurnOn).await?;
/// # Ok(())
/// # }
/// ```
pub struct Bridge {
    config: BridgeConfig,
    record: SessionRecord,
    descriptor: BridgeDescriptor,
    transport: Arc<dyn Transport>,
    lights: Lights,
    groups: Groups,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("address", &self.record.address())
            .field("descriptor", &self.descriptor)
            .field("lights", &self.lights.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl Bridge {
    /// Establishes a session from the configured session file, then scans.
    pub async fn connect(config: BridgeConfig) -> Result<Self> {
        Self::connect_with(DiscoverySession::new(config)).await
    }

    /// Like [`Bridge::connect`] with a caller-built discovery session.
    pub async fn connect_with(discovery: DiscoverySession) -> Result<Self> {
        let established = discovery.establish_stored().await?;
        Self::open(established, discovery.config().clone()).await
    }

    /// Scans lights, then groups, over an established session.
    pub async fn open(established: Established, config: BridgeConfig) -> Result<Self> {
        let Established {
            record,
            descriptor,
            transport,
        } = established;
        let lights = Lights::scan(Arc::clone(&transport), config.cache_ttl).await?;
        let groups = Groups::scan(Arc::clone(&transport), &lights, config.cache_ttl).await?;
        info!(
            "bridge {} ready: {} light(s), {} group(s)",
            record.address(),
            lights.len(),
            groups.len()
        );
        Ok(Bridge {
            config,
            record,
            descriptor,
            transport,
            lights,
            groups,
        })
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn descriptor(&self) -> &BridgeDescriptor {
        &self.descriptor
    }

    pub fn model_number(&self) -> Option<&str> {
        self.descriptor.model_number.as_deref()
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.descriptor.serial_number.as_deref()
    }

    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    /// Creates a light group from light ids and returns its id.
    ///
    /// The bridge picks a name when `name` is `None`.
    pub async fn create_group(
        &mut self,
        light_ids: &[&str],
        name: Option<&str>,
    ) -> Result<String> {
        let mut body = json!({ "lights": light_ids });
        if let Some(name) = name {
            body["name"] = Value::from(name);
        }

        let reply = self.transport.post("groups", body).await?;
        let success = first_outcome(&reply)?;
        let id = success
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("group reply without id: {success}"))
            })?
            .to_string();

        let group = Group::load(
            &id,
            &self.lights,
            Arc::clone(&self.transport),
            self.config.cache_ttl,
        )
        .await?;
        info!("created group {id} ({})", group.name());
        self.groups.insert(group);
        Ok(id)
    }

    /// Deletes the group on the bridge, then forgets it locally.
    ///
    /// A failed request leaves the group registered.
    pub async fn delete_group(&mut self, id: &str) -> Result<()> {
        if self.groups.by_id(id).is_none() {
            return Err(Error::GroupNotFound(id.to_string()));
        }
        let reply = self.transport.delete(&format!("groups/{id}")).await?;
        check_outcomes(&reply)?;
        self.groups.remove_by_id(id);
        info!("deleted group {id}");
        Ok(())
    }

    /// Requests one new credential; succeeds only while the link button is active.
    pub async fn create_user(&self) -> Result<String> {
        let reply = self.transport.create_user(&self.config.device_type).await?;
        let success = first_outcome(&reply)?;
        success
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("user reply without username: {success}"))
            })
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let reply = self
            .transport
            .delete(&format!("config/whitelist/{id}"))
            .await?;
        check_outcomes(&reply)
    }

    /// The credentials on the bridge's whitelist, in id order.
    pub async fn users(&self) -> Result<Vec<WhitelistEntry>> {
        let config = self.transport.get("config").await?;
        let Some(whitelist) = config.get("whitelist") else {
            return Err(Error::UnexpectedResponse(format!(
                "config without whitelist: {config}"
            )));
        };
        let entries: BTreeMap<String, WhitelistEntry> =
            serde_json::from_value(whitelist.clone()).map_err(Error::JsonLoad)?;
        Ok(entries
            .into_iter()
            .map(|(id, entry)| WhitelistEntry { id, ..entry })
            .collect())
    }
}
