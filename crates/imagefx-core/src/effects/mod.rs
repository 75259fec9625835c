//! The seven image effects.
//!
//! Each effect is a function of the shape
//! `fn(Canvas, &Spec) -> Result<Canvas>`: it takes ownership of the working
//! canvas and hands back a new one, or fails with an
//! [`EffectError`](crate::EffectError) without exposing a half-written buffer.
//!
//! Arguments arrive as `*Args` records (signed, serde-friendly, mirroring the
//! host configuration keys) and are checked by `validate()` into `*Spec`
//! records whose fields are already range-checked.
//!
//! | Effect | Args | Function |
//! |---|---|---|
//! | Resize | [`ResizeArgs`] | [`resize`] |
//! | Border | [`BorderArgs`] | [`add_border`] |
//! | Padding | [`PaddingArgs`] | [`add_padding`] |
//! | Corner | [`CornerArgs`] | [`round_corners`] |
//! | Overlay | [`OverlayArgs`] | [`overlay`] |
//! | Filter | [`FilterArgs`] | [`apply_filter`] |
//! | Watermark | [`WatermarkArgs`] | [`watermark`] |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{EffectError, Result};

pub mod border;
pub mod corner;
pub mod filter;
pub mod overlay;
pub mod padding;
pub mod resize;
pub mod watermark;

pub use border::{add_border, BorderArgs, BorderSpec};
pub use corner::{round_corners, CornerArgs, CornerSpec};
pub use filter::{apply_filter, Filter, FilterArgs, FilterKind, FilterSpec};
pub use overlay::{overlay, OverlayArgs, OverlaySpec};
pub use padding::{add_padding, PaddingArgs, PaddingSpec};
pub use resize::{resize, ResizeArgs, ResizeSpec};
pub use watermark::{watermark, WatermarkArgs, WatermarkSpec};

/// Identifies an effect in configuration, errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Resize,
    Border,
    Padding,
    Corner,
    Overlay,
    Filter,
    Watermark,
}

impl EffectKind {
    pub const ALL: [EffectKind; 7] = [
        EffectKind::Resize,
        EffectKind::Border,
        EffectKind::Padding,
        EffectKind::Corner,
        EffectKind::Overlay,
        EffectKind::Filter,
        EffectKind::Watermark,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EffectKind::Resize => "resize",
            EffectKind::Border => "border",
            EffectKind::Padding => "padding",
            EffectKind::Corner => "corner",
            EffectKind::Overlay => "overlay",
            EffectKind::Filter => "filter",
            EffectKind::Watermark => "watermark",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        EffectKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown effect '{}'", s))
    }
}

/// `value > 0`, as a pixel count.
pub(crate) fn require_positive(op: EffectKind, field: &str, value: i32) -> Result<u32> {
    if value <= 0 {
        return Err(EffectError::validation(
            op,
            format!("{} must be greater than 0, got {}", field, value),
        ));
    }
    Ok(value as u32)
}

/// `value >= 0`, as a pixel count.
pub(crate) fn require_non_negative(op: EffectKind, field: &str, value: i32) -> Result<u32> {
    if value < 0 {
        return Err(EffectError::validation(
            op,
            format!("{} must not be negative, got {}", field, value),
        ));
    }
    Ok(value as u32)
}

pub(crate) fn require_color(op: EffectKind, field: &str, value: &str) -> Result<Color> {
    Color::from_hex(value)
        .map_err(|e| EffectError::validation(op, format!("{}: {}", field, e)))
}

/// Four insets around an interior rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Insets {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Insets {
    /// Interior size left after removing the insets, if any remains.
    pub fn interior(&self, (width, height): (u32, u32)) -> Option<(u32, u32)> {
        let w = (width as i64) - (self.left as i64) - (self.right as i64);
        let h = (height as i64) - (self.top as i64) - (self.bottom as i64);
        if w <= 0 || h <= 0 {
            return None;
        }
        Some((w as u32, h as u32))
    }
}

// Serde default helpers shared by the argument records.
pub(crate) fn default_white() -> String {
    "#FFFFFF".to_string()
}

pub(crate) fn default_ten() -> i32 {
    10
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::canvas::Canvas;
    use crate::color::Color;

    /// Create a gradient test canvas so placement mistakes show up in pixel values.
    pub fn gradient(width: u32, height: u32) -> Canvas {
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                rgb.push(((x * 255) / width.max(1)) as u8); // R
                rgb.push(((y * 255) / height.max(1)) as u8); // G
                rgb.push(128); // B
            }
        }
        Canvas::from_rgb(width, height, &rgb).unwrap()
    }

    pub fn solid(width: u32, height: u32, hex: &str) -> Canvas {
        Canvas::filled(width, height, Color::from_hex(hex).unwrap()).unwrap()
    }

    pub fn rgb_at(canvas: &Canvas, x: u32, y: u32) -> [u8; 3] {
        let px = canvas.pixel(x, y);
        [px[0], px[1], px[2]]
    }
}
