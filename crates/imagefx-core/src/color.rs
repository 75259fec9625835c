//! Hex colour parsing.
//!
//! Every effect that paints a solid area (border, padding, letterbox margins,
//! watermark text) takes its colour as a hex string from the host
//! configuration. Accepted forms are `#RRGGBB` and the shorthand `#RGB`; the
//! leading `#` is optional and digits are case-insensitive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a colour string is not a valid hex colour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex colour '{0}'")]
pub struct ColorError(pub String);

/// An 8-bit RGBA colour. Parsed colours are always opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Create an opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a colour with an explicit alpha (255 = opaque).
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a `#RRGGBB` or `#RGB` string.
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let digits = hex.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        let invalid = || ColorError(hex.to_string());

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match digits.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16);
                Ok(Color::rgb(
                    channel(0).map_err(|_| invalid())?,
                    channel(2).map_err(|_| invalid())?,
                    channel(4).map_err(|_| invalid())?,
                ))
            }
            3 => {
                // #abc expands to #aabbcc
                let channel = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).map(|v| v * 17);
                Ok(Color::rgb(
                    channel(0).map_err(|_| invalid())?,
                    channel(1).map_err(|_| invalid())?,
                    channel(2).map_err(|_| invalid())?,
                ))
            }
            _ => Err(invalid()),
        }
    }

    /// Format as an upper-case `#RRGGBB` string (alpha is dropped).
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// The colour as an RGBA byte array.
    #[inline]
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Whether two colours share the same RGB triple, ignoring alpha.
    #[inline]
    pub fn same_rgb(self, other: Color) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }
}

impl From<[u8; 4]> for Color {
    fn from(px: [u8; 4]) -> Self {
        Color::rgba(px[0], px[1], px[2], px[3])
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
