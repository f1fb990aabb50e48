//! Capability tags and aggregate dispatch over heterogeneous members.
//!
//! Every light kind declares the [`Capability`] tags it supports. A
//! [`CapabilityTable`] groups the members of a collection by tag once, when the
//! collection is built, and [`CapabilityTable::dispatch`] runs an
//! [`Operation`] on exactly the members tagged for it.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use strum_macros::{Display, EnumIter, EnumString};

use crate::errors::Error;
use crate::types::{Alert, Brightness, Color, Effect, HueSaturation, Mired, Saturation, XyPoint};

type Result<T> = std::result::Result<T, Error>;

/// A control operation a light kind may or may not support.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    TurnOn,
    TurnOff,
    SetBrightness,
    SetAlert,
    SetHue,
    SetSaturation,
    SetHueSaturation,
    SetEffect,
    SetXy,
    SetColor,
    SetColorTemperature,
}

/// A control operation together with its arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    TurnOn,
    TurnOff,
    SetBrightness(Brightness),
    SetAlert(Alert),
    /// Hue on the full 0..=65535 wheel.
    SetHue(u16),
    SetSaturation(Saturation),
    SetHueSaturation(HueSaturation),
    SetEffect(Effect),
    SetXy(XyPoint),
    SetColor(Color),
    SetColorTemperature(Mired),
}

impl Operation {
    pub fn capability(&self) -> Capability {
        match self {
            Operation::TurnOn => Capability::TurnOn,
            Operation::TurnOff => Capability::TurnOff,
            Operation::SetBrightness(_) => Capability::SetBrightness,
            Operation::SetAlert(_) => Capability::SetAlert,
            Operation::SetHue(_) => Capability::SetHue,
            Operation::SetSaturation(_) => Capability::SetSaturation,
            Operation::SetHueSaturation(_) => Capability::SetHueSaturation,
            Operation::SetEffect(_) => Capability::SetEffect,
            Operation::SetXy(_) => Capability::SetXy,
            Operation::SetColor(_) => Capability::SetColor,
            Operation::SetColorTemperature(_) => Capability::SetColorTemperature,
        }
    }
}

/// An entity that accepts [`Operation`]s for its declared capabilities.
pub trait Controllable: Send + Sync {
    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Runs one operation. Operations outside [`Self::capabilities`] fail
    /// with [`Error::Unsupported`].
    fn apply(&self, operation: &Operation) -> impl Future<Output = Result<()>> + Send;
}

/// Members grouped by the capabilities they declare, in member order.
#[derive(Debug)]
pub struct CapabilityTable<E> {
    members: BTreeMap<Capability, Vec<Arc<E>>>,
}

impl<E> Default for CapabilityTable<E> {
    fn default() -> Self {
        CapabilityTable {
            members: BTreeMap::new(),
        }
    }
}

impl<E: Controllable> CapabilityTable<E> {
    /// Builds the table from `members` in iteration order.
    pub fn build<'a, I>(members: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<E>>,
        E: 'a,
    {
        let mut table = Self::default();
        for member in members {
            for capability in member.capabilities() {
                table
                    .members
                    .entry(*capability)
                    .or_default()
                    .push(Arc::clone(member));
            }
        }
        table
    }

    /// Capabilities at least one member supports.
    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.members.keys().copied()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.members.contains_key(&capability)
    }

    pub fn members(&self, capability: Capability) -> &[Arc<E>] {
        self.members
            .get(&capability)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Applies `operation` to every member supporting it, one after another.
    ///
    /// Stops at the first member that fails; later members are not called.
    /// Returns how many members were called.
    pub async fn dispatch(&self, operation: &Operation) -> Result<usize> {
        let members = self.members(operation.capability());
        for member in members {
            member.apply(operation).await?;
        }
        Ok(members.len())
    }
}
