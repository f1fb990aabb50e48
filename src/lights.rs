//! The bridge's light collection.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde_json::Value;

use crate::capability::{Capability, CapabilityTable, Operation};
use crate::errors::Error;
use crate::light::{Light, LightData};
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// Lights keyed by name, in name order.
#[derive(Debug, Default)]
pub struct Lights {
    by_name: BTreeMap<String, Arc<Light>>,
    table: CapabilityTable<Light>,
}

impl Lights {
    /// Fetches `GET lights` and builds one [`Light`] per supported device.
    pub async fn scan(transport: Arc<dyn Transport>, ttl: Duration) -> Result<Self> {
        let reply = transport.get("lights").await?;
        let lights = Self::from_value(reply, &transport, ttl)?;
        info!("scanned {} light(s)", lights.len());
        Ok(lights)
    }

    pub(crate) fn from_value(
        reply: Value,
        transport: &Arc<dyn Transport>,
        ttl: Duration,
    ) -> Result<Self> {
        let entries: BTreeMap<String, LightData> =
            serde_json::from_value(reply).map_err(Error::JsonLoad)?;
        let lights = entries.into_iter().filter_map(|(id, data)| {
            Light::from_data(&id, data, Arc::clone(transport), ttl).map(Arc::new)
        });
        Ok(Self::from_lights(lights))
    }

    /// Keys `lights` by name. A later light replaces an earlier one of the same name.
    pub(crate) fn from_lights(lights: impl IntoIterator<Item = Arc<Light>>) -> Self {
        let mut by_name: BTreeMap<String, Arc<Light>> = BTreeMap::new();
        for light in lights {
            let id = light.id().to_string();
            if let Some(previous) = by_name.insert(light.name().to_string(), light) {
                warn!(
                    "light {} replaces light {} named {:?}",
                    id,
                    previous.id(),
                    previous.name()
                );
            }
        }
        let table = CapabilityTable::build(by_name.values());
        Lights { by_name, table }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Light>> {
        self.by_name.get(name)
    }

    pub fn by_id(&self, id: &str) -> Option<&Arc<Light>> {
        self.by_name.values().find(|light| light.id() == id)
    }

    /// Looks a light up by name, failing with [`Error::LightNotFound`].
    pub fn try_get(&self, name: &str) -> Result<&Arc<Light>> {
        self.get(name)
            .ok_or_else(|| Error::LightNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Light>> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Whether at least one light supports `capability`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.table.supports(capability)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.table.capabilities()
    }

    /// Applies `operation` to every light supporting it, in name order.
    ///
    /// Stops at the first failing light. Returns how many lights were called.
    pub async fn apply(&self, operation: &Operation) -> Result<usize> {
        self.table.dispatch(operation).await
    }
}

impl<'a> IntoIterator for &'a Lights {
    type Item = &'a Arc<Light>;
    type IntoIter = std::collections::btree_map::Values<'a, String, Arc<Light>>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_name.values()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::light::tests::light_json;
    use crate::transport::mock::{MockTransport, Verb};
    use crate::types::Color;

    fn ok() -> Value {
        json!([{"success": {}}])
    }

    async fn scanned(mock: &Arc<MockTransport>) -> Lights {
        mock.json(
            Verb::Get,
            "lights",
            json!({
                "1": light_json("Kitchen", "Dimmable light", "LWB004", true),
                "2": light_json("Desk", "Extended color light", "LCT001", false),
                "3": light_json("Porch plug", "On/Off plug-in unit", "LOM001", true),
            }),
        );
        let transport: Arc<dyn Transport> = mock.clone();
        Lights::scan(transport, Duration::from_secs(5)).await.unwrap()
    }

    #[tokio::test]
    async fn test_scan_keeps_supported_lights() {
        let mock = Arc::new(MockTransport::new());
        let lights = scanned(&mock).await;

        assert_eq!(lights.len(), 2);
        assert_eq!(lights.names().collect::<Vec<_>>(), ["Desk", "Kitchen"]);
        assert_eq!(lights.by_id("1").map(|l| l.name()), Some("Kitchen"));
        assert!(lights.get("Porch plug").is_none());
        assert!(matches!(
            lights.try_get("Hall"),
            Err(Error::LightNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_color_operation_reaches_only_color_lights() {
        let mock = Arc::new(MockTransport::new());
        mock.json(Verb::Put, "lights/1/state", ok());
        mock.json(Verb::Put, "lights/2/state", ok());
        let lights = scanned(&mock).await;

        assert!(lights.supports(Capability::SetColor));
        let called = lights
            .apply(&Operation::SetColor(Color::rgb(255, 255, 255)))
            .await
            .unwrap();
        assert_eq!(called, 1);
        assert_eq!(mock.count(Verb::Put, "lights/2/state"), 2);
        assert_eq!(mock.count(Verb::Put, "lights/1/state"), 0);
    }

    #[tokio::test]
    async fn test_turn_off_stops_at_first_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.json(
            Verb::Put,
            "lights/2/state",
            json!([{"error": {
                "type": 201,
                "address": "/lights/2/state/on",
                "description": "unreachable"
            }}]),
        );
        mock.json(Verb::Put, "lights/1/state", ok());
        let lights = scanned(&mock).await;

        // "Desk" (id 2) sorts before "Kitchen" (id 1).
        assert!(lights.apply(&Operation::TurnOff).await.is_err());
        assert_eq!(mock.count(Verb::Put, "lights/2/state"), 1);
        assert_eq!(mock.count(Verb::Put, "lights/1/state"), 0);
    }

    #[tokio::test]
    async fn test_duplicate_names_keep_the_later_light() {
        let mock = Arc::new(MockTransport::new());
        mock.json(
            Verb::Get,
            "lights",
            json!({
                "1": light_json("Lamp", "Dimmable light", "LWB004", false),
                "2": light_json("Lamp", "Extended color light", "LCT014", false),
            }),
        );
        mock.json(Verb::Put, "lights/2/state", ok());
        let transport: Arc<dyn Transport> = mock.clone();
        let lights = Lights::scan(transport, Duration::from_secs(5)).await.unwrap();

        assert_eq!(lights.len(), 1);
        assert_eq!(lights.get("Lamp").unwrap().id(), "2");
        assert!(lights.by_id("1").is_none());
        assert_eq!(lights.apply(&Operation::TurnOn).await.unwrap(), 1);
        assert_eq!(mock.count(Verb::Put, "lights/1/state"), 0);
    }
}
