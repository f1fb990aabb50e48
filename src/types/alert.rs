//! Alert and effect modes.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Temporary alert effect of a light.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display, EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Alert {
    /// Stop performing an alert effect.
    #[default]
    None,
    /// Blink once.
    Select,
    /// Blink for 15 seconds or until an alert `none` is received.
    LSelect,
}

/// Dynamic effect of a color light.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display, EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Effect {
    #[default]
    None,
    /// Cycle through all hues until effect `none` is received.
    ColorLoop,
}

/// How the current color of a light was last set.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ColorMode {
    /// From hue and saturation.
    Hs,
    /// From CIE xy coordinates.
    Xy,
    /// From color temperature.
    Ct,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_alert_wire_names() {
        assert_eq!(serde_json::to_value(Alert::LSelect).unwrap(), "lselect");
        assert_eq!(Alert::from_str("select").unwrap(), Alert::Select);
        assert_eq!(Alert::None.to_string(), "none");
    }

    #[test]
    fn test_effect_wire_names() {
        assert_eq!(
            serde_json::to_value(Effect::ColorLoop).unwrap(),
            "colorloop"
        );
        let effect: Effect = serde_json::from_value(serde_json::json!("none")).unwrap();
        assert_eq!(effect, Effect::None);
    }
}
