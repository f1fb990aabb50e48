//! Individual light control.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::cache::{CacheEnvelope, CachedEntity, read_through};
use crate::capability::{Capability, Controllable, Operation};
use crate::errors::Error;
use crate::gamut::{Gamut, GamutClass};
use crate::runtime::Mutex;
use crate::transport::{Transport, check_outcomes};
use crate::types::{
    Alert, Brightness, Color, ColorMode, Effect, HueSaturation, Mired, Saturation, XyPoint,
};

type Result<T> = std::result::Result<T, Error>;

const DIMMABLE: &[Capability] = &[
    Capability::TurnOn,
    Capability::TurnOff,
    Capability::SetBrightness,
    Capability::SetAlert,
];

const COLOR: &[Capability] = &[
    Capability::TurnOn,
    Capability::TurnOff,
    Capability::SetBrightness,
    Capability::SetAlert,
    Capability::SetHue,
    Capability::SetSaturation,
    Capability::SetHueSaturation,
    Capability::SetEffect,
    Capability::SetXy,
    Capability::SetColor,
];

const EXTENDED_COLOR: &[Capability] = &[
    Capability::TurnOn,
    Capability::TurnOff,
    Capability::SetBrightness,
    Capability::SetAlert,
    Capability::SetHue,
    Capability::SetSaturation,
    Capability::SetHueSaturation,
    Capability::SetEffect,
    Capability::SetXy,
    Capability::SetColor,
    Capability::SetColorTemperature,
];

/// The light variants this client controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Dimmable,
    Color,
    ExtendedColor,
}

impl LightKind {
    /// Maps the bridge's `type` field. Other device types are not controlled.
    pub fn from_type(type_name: &str) -> Option<Self> {
        match type_name {
            "Dimmable light" => Some(LightKind::Dimmable),
            "Color light" => Some(LightKind::Color),
            "Extended color light" => Some(LightKind::ExtendedColor),
            _ => None,
        }
    }

    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            LightKind::Dimmable => DIMMABLE,
            LightKind::Color => COLOR,
            LightKind::ExtendedColor => EXTENDED_COLOR,
        }
    }

    pub fn has_color(self) -> bool {
        !matches!(self, LightKind::Dimmable)
    }
}

/// Remote state of a light. Color fields are absent on dimmable lights.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightState {
    pub on: bool,
    pub bri: u8,
    pub alert: Alert,
    pub reachable: bool,
    pub hue: Option<u16>,
    pub sat: Option<u8>,
    pub effect: Option<Effect>,
    pub xy: Option<[f64; 2]>,
    pub ct: Option<u16>,
    pub colormode: Option<ColorMode>,
}

/// One entry of `GET lights` or the body of `GET lights/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LightData {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub modelid: String,
    #[serde(default)]
    pub manufacturername: String,
    #[serde(default)]
    pub uniqueid: String,
    #[serde(default)]
    pub swversion: String,
    #[serde(default)]
    pub state: LightState,
}

/// Identity of a light, read once when the light is scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightDescriptor {
    pub name: String,
    pub type_name: String,
    pub model_id: String,
    pub manufacturer: String,
    pub unique_id: String,
    pub sw_version: String,
}

#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
struct StateUpdate {
    on: Option<bool>,
    bri: Option<Brightness>,
    hue: Option<u16>,
    sat: Option<Saturation>,
    effect: Option<Effect>,
    xy: Option<[f64; 2]>,
    ct: Option<Mired>,
    alert: Option<Alert>,
}

/// A light on the bridge.
///
/// Reads go through a state snapshot refetched once it is older than the
/// cache TTL. Writes send one request and leave the snapshot alone, so a
/// write is only visible after the TTL elapses or after
/// [`CachedEntity::force_refresh`].
pub struct Light {
    id: String,
    kind: LightKind,
    descriptor: LightDescriptor,
    gamut: Option<&'static Gamut>,
    transport: Arc<dyn Transport>,
    cache: Mutex<CacheEnvelope<LightState>>,
}

impl std::fmt::Debug for Light {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Light")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.descriptor.name)
            .finish()
    }
}

impl Light {
    /// Builds a light from scan data, or `None` for unsupported device types.
    pub(crate) fn from_data(
        id: &str,
        data: LightData,
        transport: Arc<dyn Transport>,
        ttl: Duration,
    ) -> Option<Self> {
        let Some(kind) = LightKind::from_type(&data.type_name) else {
            debug!("skipping light {id}: unsupported type {:?}", data.type_name);
            return None;
        };
        let gamut = if kind.has_color() {
            GamutClass::for_model(&data.modelid).map(GamutClass::gamut)
        } else {
            None
        };

        Some(Light {
            id: id.to_string(),
            kind,
            descriptor: LightDescriptor {
                name: data.name,
                type_name: data.type_name,
                model_id: data.modelid,
                manufacturer: data.manufacturername,
                unique_id: data.uniqueid,
                sw_version: data.swversion,
            },
            gamut,
            transport,
            cache: Mutex::new(CacheEnvelope::fresh(data.state, ttl)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn descriptor(&self) -> &LightDescriptor {
        &self.descriptor
    }

    pub fn gamut(&self) -> Option<&'static Gamut> {
        self.gamut
    }

    /// The current state snapshot.
    pub async fn state(&self) -> Result<LightState> {
        self.refresh(false).await
    }

    pub async fn is_on(&self) -> Result<bool> {
        Ok(self.state().await?.on)
    }

    pub async fn brightness(&self) -> Result<u8> {
        Ok(self.state().await?.bri)
    }

    pub async fn alert(&self) -> Result<Alert> {
        Ok(self.state().await?.alert)
    }

    pub async fn is_reachable(&self) -> Result<bool> {
        Ok(self.state().await?.reachable)
    }

    pub async fn hue(&self) -> Result<Option<u16>> {
        Ok(self.state().await?.hue)
    }

    pub async fn saturation(&self) -> Result<Option<u8>> {
        Ok(self.state().await?.sat)
    }

    pub async fn effect(&self) -> Result<Option<Effect>> {
        Ok(self.state().await?.effect)
    }

    pub async fn xy(&self) -> Result<Option<XyPoint>> {
        Ok(self.state().await?.xy.map(XyPoint::from))
    }

    pub async fn color_mode(&self) -> Result<Option<ColorMode>> {
        Ok(self.state().await?.colormode)
    }

    /// Color temperature in mired, on extended color lights.
    pub async fn color_temperature(&self) -> Result<Option<u16>> {
        Ok(self.state().await?.ct)
    }

    pub async fn turn_on(&self) -> Result<()> {
        self.write(
            Capability::TurnOn,
            StateUpdate {
                on: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.write(
            Capability::TurnOff,
            StateUpdate {
                on: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_brightness(&self, brightness: Brightness) -> Result<()> {
        self.write(
            Capability::SetBrightness,
            StateUpdate {
                bri: Some(brightness),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_alert(&self, alert: Alert) -> Result<()> {
        self.write(
            Capability::SetAlert,
            StateUpdate {
                alert: Some(alert),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_hue(&self, hue: u16) -> Result<()> {
        self.write(
            Capability::SetHue,
            StateUpdate {
                hue: Some(hue),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_saturation(&self, saturation: Saturation) -> Result<()> {
        self.write(
            Capability::SetSaturation,
            StateUpdate {
                sat: Some(saturation),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_hue_saturation(&self, hs: HueSaturation) -> Result<()> {
        self.write(
            Capability::SetHueSaturation,
            StateUpdate {
                hue: Some(hs.hue()),
                sat: Some(hs.saturation()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_effect(&self, effect: Effect) -> Result<()> {
        self.write(
            Capability::SetEffect,
            StateUpdate {
                effect: Some(effect),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_xy(&self, xy: XyPoint) -> Result<()> {
        self.write(
            Capability::SetXy,
            StateUpdate {
                xy: Some(xy.into()),
                ..Default::default()
            },
        )
        .await
    }

    /// Sets an RGB color through the light's gamut.
    ///
    /// Sends the xy write, then the brightness write.
    pub async fn set_color(&self, color: Color) -> Result<()> {
        self.require(Capability::SetColor)?;
        let gamut = self.gamut.ok_or_else(|| Error::NoGamut {
            light: self.descriptor.name.clone(),
            model_id: self.descriptor.model_id.clone(),
        })?;

        let (xy, bri) = gamut.xy_and_brightness(color);
        debug!("light {} color {color:?} -> {xy:?} bri {bri}", self.id);
        self.put_state(StateUpdate {
            xy: Some(xy.into()),
            ..Default::default()
        })
        .await?;
        self.put_state(StateUpdate {
            bri: Some(Brightness::saturating(bri)),
            ..Default::default()
        })
        .await
    }

    pub async fn set_color_temperature(&self, mired: Mired) -> Result<()> {
        self.write(
            Capability::SetColorTemperature,
            StateUpdate {
                ct: Some(mired),
                ..Default::default()
            },
        )
        .await
    }

    fn require(&self, capability: Capability) -> Result<()> {
        if self.kind.capabilities().contains(&capability) {
            Ok(())
        } else {
            Err(Error::unsupported(&self.descriptor.name, capability))
        }
    }

    async fn write(&self, capability: Capability, update: StateUpdate) -> Result<()> {
        self.require(capability)?;
        self.put_state(update).await
    }

    async fn put_state(&self, update: StateUpdate) -> Result<()> {
        let body = serde_json::to_value(&update).map_err(Error::JsonDump)?;
        let path = format!("lights/{}/state", self.id);
        let reply = self.transport.put(&path, body).await?;
        check_outcomes(&reply)
    }

    async fn fetch_state(&self) -> Result<LightState> {
        let reply = self.transport.get(&format!("lights/{}", self.id)).await?;
        let data: LightData = serde_json::from_value(reply).map_err(Error::JsonLoad)?;
        Ok(data.state)
    }
}

impl CachedEntity for Light {
    type Snapshot = LightState;

    async fn refresh(&self, force: bool) -> Result<LightState> {
        if force {
            self.force_refresh().await;
        }
        read_through(&self.cache, || self.fetch_state()).await
    }

    async fn force_refresh(&self) {
        self.cache.lock().await.invalidate();
    }
}

impl Controllable for Light {
    fn capabilities(&self) -> &'static [Capability] {
        self.kind.capabilities()
    }

    async fn apply(&self, operation: &Operation) -> Result<()> {
        match *operation {
            Operation::TurnOn => self.turn_on().await,
            Operation::TurnOff => self.turn_off().await,
            Operation::SetBrightness(brightness) => self.set_brightness(brightness).await,
            Operation::SetAlert(alert) => self.set_alert(alert).await,
            Operation::SetHue(hue) => self.set_hue(hue).await,
            Operation::SetSaturation(saturation) => self.set_saturation(saturation).await,
            Operation::SetHueSaturation(hs) => self.set_hue_saturation(hs).await,
            Operation::SetEffect(effect) => self.set_effect(effect).await,
            Operation::SetXy(xy) => self.set_xy(xy).await,
            Operation::SetColor(color) => self.set_color(color).await,
            Operation::SetColorTemperature(mired) => self.set_color_temperature(mired).await,
        }
    }
}
