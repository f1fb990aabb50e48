//! Hue and saturation as the bridge understands them.

use serde::{Deserialize, Serialize};

/// Saturation from 0 (white) to 254 (fully colored).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Saturation {
    pub(crate) value: u8,
}

impl Saturation {
    pub const MAX: u8 = 254;

    /// Returns None if value is above 254.
    pub fn create(value: u8) -> Option<Self> {
        if value <= Self::MAX {
            Some(Saturation { value })
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }
}

/// Combined hue and saturation setting.
///
/// The hue wraps around the color wheel over the full `u16` range:
/// red is 0 (and 65535), green 25500, blue 46920.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HueSaturation {
    hue: u16,
    saturation: Saturation,
}

impl HueSaturation {
    /// Create a new HueSaturation.
    ///
    /// Returns `None` if saturation is outside 0-254.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_bridge_rs::HueSaturation;
    ///
    /// assert!(HueSaturation::create(0, 254).is_some());
    /// assert!(HueSaturation::create(65535, 0).is_some());
    /// assert!(HueSaturation::create(46920, 255).is_none());
    /// ```
    pub fn create(hue: u16, saturation: u8) -> Option<Self> {
        Saturation::create(saturation).map(|saturation| HueSaturation { hue, saturation })
    }

    pub fn hue(&self) -> u16 {
        self.hue
    }

    pub fn saturation(&self) -> Saturation {
        self.saturation
    }
}
