//! Color temperature control.

use serde::{Deserialize, Serialize};

/// Color temperature in mired, with valid values from 153 (6500K) to 500 (2000K).
///
/// Lower values produce cooler (more blue) light, higher values warmer light.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Mired {
    pub(crate) value: u16,
}

impl Mired {
    pub const MIN: u16 = 153;
    pub const MAX: u16 = 500;

    /// Returns `None` if value is outside the valid range (153-500).
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_bridge_rs::Mired;
    ///
    /// assert!(Mired::create(152).is_none());
    /// assert!(Mired::create(153).is_some());
    /// assert!(Mired::create(500).is_some());
    /// assert!(Mired::create(501).is_none());
    /// ```
    pub fn create(value: u16) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Some(Mired { value })
        } else {
            None
        }
    }

    /// Converts a Kelvin temperature, clamping into the supported range.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_bridge_rs::Mired;
    ///
    /// assert_eq!(Mired::from_kelvin(6500).value(), 153);
    /// assert_eq!(Mired::from_kelvin(2000).value(), 500);
    /// assert_eq!(Mired::from_kelvin(1000).value(), 500);
    /// ```
    pub fn from_kelvin(kelvin: u16) -> Self {
        let mired = 1_000_000 / u32::from(kelvin.max(1));
        let value = mired.clamp(u32::from(Self::MIN), u32::from(Self::MAX)) as u16;
        Mired { value }
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn kelvin(&self) -> u16 {
        (1_000_000 / u32::from(self.value)) as u16
    }
}
