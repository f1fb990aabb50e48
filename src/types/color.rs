//! RGB colors and CIE xy chromaticity coordinates.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::Error;

/// An RGB color with red, green, and blue components (0-255 each).
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub(crate) red: u8,
    pub(crate) green: u8,
    pub(crate) blue: u8,
}

impl Color {
    /// Create a color with the given RGB values.
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn red(&self) -> u8 {
        self.red
    }

    pub fn green(&self) -> u8 {
        self.green
    }

    pub fn blue(&self) -> u8 {
        self.blue
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parse from comma-separated string (e.g., "255,128,0").
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr;
    /// use hue_bridge_rs::Color;
    ///
    /// let color = Color::from_str("37, 171, 186").unwrap();
    /// assert_eq!(color, Color::rgb(37, 171, 186));
    /// assert!(Color::from_str("256,0,0").is_err());
    /// assert!(Color::from_str("1,2").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Error> {
        let parts = s
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| Error::InvalidColorString(s.to_string()))?;
        match parts.as_slice() {
            [red, green, blue] => Ok(Self::rgb(*red, *green, *blue)),
            _ => Err(Error::InvalidColorString(s.to_string())),
        }
    }
}

/// A point in CIE 1931 xy chromaticity space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct XyPoint {
    pub x: f64,
    pub y: f64,
}

impl XyPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        XyPoint { x, y }
    }
}

impl From<[f64; 2]> for XyPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        XyPoint { x, y }
    }
}

impl From<XyPoint> for [f64; 2] {
    fn from(point: XyPoint) -> Self {
        [point.x, point.y]
    }
}
