//! Value types for light control parameters.

mod alert;
mod brightness;
mod color;
mod hue_saturation;
mod mired;

pub use alert::{Alert, ColorMode, Effect};
pub use brightness::Brightness;
pub use color::{Color, XyPoint};
pub use hue_saturation::{HueSaturation, Saturation};
pub use mired::Mired;
