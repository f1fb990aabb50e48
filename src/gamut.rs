//! Color gamut geometry and RGB to xy conversion.
//!
//! Each color light model can reproduce a triangle of the CIE xy plane. The
//! bridge accepts any xy pair, so colors are converted from sRGB and moved to
//! the nearest reproducible point before they are written.

use strum_macros::{Display, EnumIter, EnumString};

use crate::types::{Color, XyPoint};

/// Tolerance of the containment test. Vertices and edge projections land
/// within rounding error of the boundary lines.
const EPSILON: f64 = 1e-9;

/// White point returned for black, where the xy projection is undefined.
pub const WHITE_POINT: XyPoint = XyPoint::new(0.3227, 0.329);

/// The three gamut classes of Hue color lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum GamutClass {
    A,
    B,
    C,
}

impl GamutClass {
    /// Looks up the gamut class of a light model id.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_bridge_rs::GamutClass;
    ///
    /// assert_eq!(GamutClass::for_model("LCT001"), Some(GamutClass::B));
    /// assert_eq!(GamutClass::for_model("LST001"), Some(GamutClass::A));
    /// assert_eq!(GamutClass::for_model("LWB004"), None);
    /// ```
    pub fn for_model(model_id: &str) -> Option<Self> {
        match model_id {
            "LLC006" | "LLC007" | "LLC010" | "LLC011" | "LLC012" | "LLC013" | "LST001" => {
                Some(GamutClass::A)
            }
            "LCT001" | "LCT002" | "LCT003" | "LCT007" | "LMM001" => Some(GamutClass::B),
            "LCT010" | "LCT011" | "LCT014" | "LLC020" | "LST002" => Some(GamutClass::C),
            _ => None,
        }
    }

    /// The shared triangle for this class.
    pub fn gamut(self) -> &'static Gamut {
        match self {
            GamutClass::A => &GAMUT_A,
            GamutClass::B => &GAMUT_B,
            GamutClass::C => &GAMUT_C,
        }
    }
}

pub static GAMUT_A: Gamut = Gamut::new(
    GamutClass::A,
    XyPoint::new(0.704, 0.296),
    XyPoint::new(0.2151, 0.7106),
    XyPoint::new(0.138, 0.08),
);

pub static GAMUT_B: Gamut = Gamut::new(
    GamutClass::B,
    XyPoint::new(0.675, 0.322),
    XyPoint::new(0.409, 0.518),
    XyPoint::new(0.167, 0.04),
);

pub static GAMUT_C: Gamut = Gamut::new(
    GamutClass::C,
    XyPoint::new(0.692, 0.308),
    XyPoint::new(0.17, 0.7),
    XyPoint::new(0.153, 0.048),
);

/// A line `y = m * x + b`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Line {
    m: f64,
    b: f64,
}

impl Line {
    const fn through(p1: XyPoint, p2: XyPoint) -> Self {
        Line {
            m: (p2.y - p1.y) / (p2.x - p1.x),
            b: (p1.y * p2.x - p1.x * p2.y) / (p2.x - p1.x),
        }
    }

    /// Signed vertical offset of the point from the line.
    fn side(&self, p: XyPoint) -> f64 {
        p.y - self.m * p.x - self.b
    }

    fn distance(&self, p: XyPoint) -> f64 {
        (self.m * p.x - p.y + self.b).abs() * (1.0 / (self.m * self.m + 1.0)).sqrt()
    }

    fn project(&self, p: XyPoint) -> XyPoint {
        let Line { m, b } = *self;
        let d = m * m + 1.0;
        XyPoint::new((p.x + m * p.y - m * b) / d, (m * m * p.y + m * p.x + b) / d)
    }
}

/// A triangle of reproducible colors, with its red, green and blue vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Gamut {
    class: GamutClass,
    red: XyPoint,
    green: XyPoint,
    blue: XyPoint,
    red_green: Line,
    green_blue: Line,
    blue_red: Line,
}

impl Gamut {
    pub const fn new(class: GamutClass, red: XyPoint, green: XyPoint, blue: XyPoint) -> Self {
        Gamut {
            class,
            red,
            green,
            blue,
            red_green: Line::through(red, green),
            green_blue: Line::through(green, blue),
            blue_red: Line::through(blue, red),
        }
    }

    pub fn class(&self) -> GamutClass {
        self.class
    }

    pub fn red(&self) -> XyPoint {
        self.red
    }

    pub fn green(&self) -> XyPoint {
        self.green
    }

    pub fn blue(&self) -> XyPoint {
        self.blue
    }

    /// Whether the point lies inside the triangle or on its boundary.
    ///
    /// The interior is below the red-green and green-blue lines and above the
    /// blue-red line.
    pub fn contains(&self, p: XyPoint) -> bool {
        self.red_green.side(p) <= EPSILON
            && self.green_blue.side(p) <= EPSILON
            && self.blue_red.side(p) >= -EPSILON
    }

    /// The point on the nearest edge closest to `p`.
    ///
    /// The perpendicular projection onto the nearest boundary line is clamped
    /// to the edge between its two vertices.
    pub fn nearest_point(&self, p: XyPoint) -> XyPoint {
        let edges = [
            (self.red_green, self.red, self.green),
            (self.green_blue, self.green, self.blue),
            (self.blue_red, self.blue, self.red),
        ];
        let (line, v1, v2) = edges
            .into_iter()
            .min_by(|(a, ..), (b, ..)| a.distance(p).total_cmp(&b.distance(p)))
            .unwrap_or(edges[0]);

        let mut ends = [line.project(p), v1, v2];
        ends.sort_by(|a, b| a.x.total_cmp(&b.x));
        ends[1]
    }

    /// Returns `p` unchanged when reproducible, its nearest in-gamut point otherwise.
    pub fn clamp(&self, p: XyPoint) -> XyPoint {
        if self.contains(p) {
            p
        } else {
            self.nearest_point(p)
        }
    }

    /// Converts an sRGB color to an in-gamut xy point and a brightness.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_bridge_rs::{Color, GAMUT_B};
    ///
    /// let (xy, bri) = GAMUT_B.xy_and_brightness(Color::rgb(255, 255, 255));
    /// assert!((xy.x - 0.3227).abs() < 1e-4);
    /// assert!((xy.y - 0.329).abs() < 1e-4);
    /// assert_eq!(bri, 254);
    /// ```
    pub fn xy_and_brightness(&self, color: Color) -> (XyPoint, u8) {
        let red = linearize(color.red);
        let green = linearize(color.green);
        let blue = linearize(color.blue);

        let x = red * 0.664511 + green * 0.154324 + blue * 0.162028;
        let y = red * 0.283881 + green * 0.668433 + blue * 0.047685;
        let z = red * 0.000088 + green * 0.072310 + blue * 0.986039;

        let sum = x + y + z;
        if sum == 0.0 {
            return (WHITE_POINT, 1);
        }

        let point = XyPoint::new(x / sum, y / sum);
        (self.clamp(point), (y * 255.0) as u8)
    }
}

/// Converts an RGB triple to xy and brightness within the given gamut.
pub fn to_xy_and_brightness(gamut: &Gamut, red: u8, green: u8, blue: u8) -> (XyPoint, u8) {
    gamut.xy_and_brightness(Color::rgb(red, green, blue))
}

/// Inverse sRGB companding.
fn linearize(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}
