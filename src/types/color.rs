//! RGB color representation and color input parsing.

use std::fmt;
use std::str::FromStr;

use palette::{FromColor, Hsl, Hsv, Srgb};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// An RGB color with red, green, and blue components (0-255 each).
///
/// Serializes to the `{"r":..,"g":..,"b":..}` shape used on the wire.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    #[serde(rename = "r")]
    pub(crate) red: u8,
    #[serde(rename = "g")]
    pub(crate) green: u8,
    #[serde(rename = "b")]
    pub(crate) blue: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Create a color with the given RGB values.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Create a color from arbitrary integers, clamping each channel to 0-255.
    ///
    /// # Examples
    ///
    /// ```
    /// use govee_lan_rs::Color;
    ///
    /// assert_eq!(Color::clamped(300, -4, 17), Color::rgb(255, 0, 17));
    /// ```
    pub fn clamped(red: i64, green: i64, blue: i64) -> Self {
        let channel = |v: i64| v.clamp(0, 255) as u8;
        Self::rgb(channel(red), channel(green), channel(blue))
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

    /// Perceived brightness in `[0, 1]`, weighting channels by ITU-R BT.601 luma.
    pub fn perceived_brightness(&self) -> f64 {
        let luma = self.red as f64 * 299.0 + self.green as f64 * 587.0 + self.blue as f64 * 114.0;
        luma / 1000.0 / 255.0
    }

    pub fn is_light(&self) -> bool {
        self.perceived_brightness() >= 0.5
    }

    pub fn is_dark(&self) -> bool {
        !self.is_light()
    }

    fn parse_hex(input: &str) -> Option<Self> {
        let digits = input.strip_prefix('#')?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Srgb::<u8>::from_str(input).ok().map(Self::from)
    }

    fn parse_named(name: &str) -> Option<Self> {
        palette::named::from_str(name).map(Self::from)
    }

    fn parse_channels(list: &str) -> Option<Self> {
        let parts = list
            .split(',')
            .map(|c| c.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()?;
        match parts.as_slice() {
            [r, g, b] => Some(Self::clamped(
                r.round() as i64,
                g.round() as i64,
                b.round() as i64,
            )),
            _ => None,
        }
    }

    /// Parse `h, s%, x%` where the hue is in degrees and the other two are
    /// percentages. Separators may be commas or spaces.
    fn parse_hue_args(list: &str) -> Option<(f32, f32, f32)> {
        let parts: Vec<&str> = list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        let [hue, a, b] = parts.as_slice() else {
            return None;
        };
        let number = |v: &str| v.parse::<f32>().ok().filter(|v| v.is_finite());
        let percent = |v: &str| {
            number(v.strip_suffix('%').unwrap_or(v)).map(|p| p.clamp(0.0, 100.0) / 100.0)
        };
        let hue = number(hue.strip_suffix("deg").unwrap_or(hue))?;
        Some((hue, percent(a)?, percent(b)?))
    }

    fn parse_hsl(list: &str) -> Option<Self> {
        let (hue, saturation, lightness) = Self::parse_hue_args(list)?;
        let hsl: Hsl = Hsl::new(hue, saturation, lightness);
        let rgb: Srgb = Srgb::from_color(hsl);
        Some(Self::from(rgb.into_format::<u8>()))
    }

    fn parse_hsv(list: &str) -> Option<Self> {
        let (hue, saturation, value) = Self::parse_hue_args(list)?;
        let hsv: Hsv = Hsv::new(hue, saturation, value);
        let rgb: Srgb = Srgb::from_color(hsv);
        Some(Self::from(rgb.into_format::<u8>()))
    }
}

/// Arguments of a functional notation such as `rgb(..)`.
fn call_args<'a>(input: &'a str, name: &str) -> Option<&'a str> {
    input
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parse a color from `"r,g,b"`, `"rgb(r, g, b)"`, `"#rgb"`, `"#rrggbb"`,
    /// `"hsl(h, s%, l%)"`, `"hsv(h, s%, v%)"` or any CSS color name.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr;
    /// use govee_lan_rs::Color;
    ///
    /// assert_eq!(Color::from_str("255,128,0").unwrap(), Color::rgb(255, 128, 0));
    /// assert_eq!(Color::from_str("#ff8000").unwrap(), Color::rgb(255, 128, 0));
    /// assert_eq!(Color::from_str("rgb(0, 0, 255)").unwrap(), Color::rgb(0, 0, 255));
    /// assert_eq!(Color::from_str("Red").unwrap(), Color::rgb(255, 0, 0));
    /// assert_eq!(Color::from_str("hsl(240, 100%, 50%)").unwrap(), Color::rgb(0, 0, 255));
    /// assert!(Color::from_str("not a color").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim().to_ascii_lowercase();

        let parsed = if input.starts_with('#') {
            Self::parse_hex(&input)
        } else if let Some(inner) = call_args(&input, "rgb") {
            Self::parse_channels(inner)
        } else if let Some(inner) = call_args(&input, "hsl") {
            Self::parse_hsl(inner)
        } else if let Some(inner) = call_args(&input, "hsv") {
            Self::parse_hsv(inner)
        } else if input.contains(',') {
            Self::parse_channels(&input)
        } else {
            Self::parse_named(&input)
        };

        parsed.ok_or_else(|| Error::invalid_color(s))
    }
}

impl From<Srgb<u8>> for Color {
    fn from(rgb: Srgb<u8>) -> Self {
        Self::rgb(rgb.red, rgb.green, rgb.blue)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((red, green, blue): (u8, u8, u8)) -> Self {
        Self::rgb(red, green, blue)
    }
}

/// Anything a command operation accepts as a color.
///
/// Conversion happens before any datagram is sent, so an invalid input never
/// produces a partial command.
pub trait IntoColor {
    fn into_color(self) -> Result<Color>;
}

impl IntoColor for Color {
    fn into_color(self) -> Result<Color> {
        Ok(self)
    }
}

impl IntoColor for &Color {
    fn into_color(self) -> Result<Color> {
        Ok(*self)
    }
}

impl IntoColor for (u8, u8, u8) {
    fn into_color(self) -> Result<Color> {
        Ok(Color::from(self))
    }
}

impl IntoColor for &str {
    fn into_color(self) -> Result<Color> {
        self.parse()
    }
}

impl IntoColor for String {
    fn into_color(self) -> Result<Color> {
        self.parse()
    }
}

impl IntoColor for &String {
    fn into_color(self) -> Result<Color> {
        self.parse()
    }
}
