//! Brightness control for Hue lights.

use serde::{Deserialize, Serialize};

/// Brightness level from 1 (minimum, not off) to 254 (maximum).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Brightness {
    pub(crate) value: u8,
}

impl Default for Brightness {
    fn default() -> Self {
        Self::new()
    }
}

impl Brightness {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 254;

    pub fn new() -> Self {
        Brightness { value: Self::MAX }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Returns None if value is outside valid range (1-254).
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_bridge_rs::Brightness;
    ///
    /// assert!(Brightness::create(0).is_none());
    /// assert!(Brightness::create(1).is_some());
    /// assert!(Brightness::create(254).is_some());
    /// assert!(Brightness::create(255).is_none());
    /// ```
    pub fn create(value: u8) -> Option<Self> {
        if Self::is_valid(value) {
            Some(Brightness { value })
        } else {
            None
        }
    }

    /// Clamps into the valid range instead of rejecting.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_bridge_rs::Brightness;
    ///
    /// assert_eq!(Brightness::saturating(0).value(), 1);
    /// assert_eq!(Brightness::saturating(255).value(), 254);
    /// ```
    pub fn saturating(value: u8) -> Self {
        Brightness {
            value: value.clamp(Self::MIN, Self::MAX),
        }
    }

    fn is_valid(value: u8) -> bool {
        (Self::MIN..=Self::MAX).contains(&value)
    }
}
