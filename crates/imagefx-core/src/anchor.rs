//! Placement anchors.
//!
//! An [`Anchor`] decides where a rectangle of one size lands inside (or is
//! cut from) a rectangle of another size. The nine named anchors use the same
//! identifiers as the host configuration (`top_left` … `bottom_right`);
//! `coordinate` takes explicit `x`/`y` values supplied alongside it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Horizontal component of a named anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

/// Vertical component of a named anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

/// Rule for positioning one rectangle relative to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    #[default]
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
    /// Explicit offset, in pixels.
    Coordinate { x: u32, y: u32 },
}

/// Position names as they appear in configuration, in form order.
pub const POSITION_NAMES: [&str; 10] = [
    "top_left",
    "top_center",
    "top_right",
    "middle_left",
    "middle_center",
    "middle_right",
    "bottom_left",
    "bottom_center",
    "bottom_right",
    "coordinate",
];

/// Named position without coordinate values, as stored in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    #[default]
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
    Coordinate,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        POSITION_NAMES[self as usize]
    }

    /// Resolve to an [`Anchor`], attaching `(x, y)` for `Coordinate`.
    pub fn to_anchor(self, x: u32, y: u32) -> Anchor {
        match self {
            Position::TopLeft => Anchor::TopLeft,
            Position::TopCenter => Anchor::TopCenter,
            Position::TopRight => Anchor::TopRight,
            Position::MiddleLeft => Anchor::MiddleLeft,
            Position::MiddleCenter => Anchor::MiddleCenter,
            Position::MiddleRight => Anchor::MiddleRight,
            Position::BottomLeft => Anchor::BottomLeft,
            Position::BottomCenter => Anchor::BottomCenter,
            Position::BottomRight => Anchor::BottomRight,
            Position::Coordinate => Anchor::Coordinate { x, y },
        }
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Position; 10] = [
            Position::TopLeft,
            Position::TopCenter,
            Position::TopRight,
            Position::MiddleLeft,
            Position::MiddleCenter,
            Position::MiddleRight,
            Position::BottomLeft,
            Position::BottomCenter,
            Position::BottomRight,
            Position::Coordinate,
        ];
        ALL.into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown position '{}'", s))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Anchor {
    /// Split a named anchor into its components. `None` for `Coordinate`.
    pub fn alignment(self) -> Option<(HorizontalAlign, VerticalAlign)> {
        use HorizontalAlign::*;
        use VerticalAlign::*;
        match self {
            Anchor::TopLeft => Some((Left, Top)),
            Anchor::TopCenter => Some((Center, Top)),
            Anchor::TopRight => Some((Right, Top)),
            Anchor::MiddleLeft => Some((Left, Middle)),
            Anchor::MiddleCenter => Some((Center, Middle)),
            Anchor::MiddleRight => Some((Right, Middle)),
            Anchor::BottomLeft => Some((Left, Bottom)),
            Anchor::BottomCenter => Some((Center, Bottom)),
            Anchor::BottomRight => Some((Right, Bottom)),
            Anchor::Coordinate { .. } => None,
        }
    }

    /// Offset at which an `inner` rectangle is drawn inside an `outer` one.
    ///
    /// For an inner rectangle smaller than the outer one the offset is
    /// non-negative (a margin); for a larger one it is non-positive (the
    /// inner rectangle is cropped). `Coordinate` treats `(x, y)` as the crop
    /// origin inside `inner`, so the offset is `(-x, -y)`.
    ///
    /// Centering divides the difference by two, truncating toward zero.
    pub fn offset(self, inner: (u32, u32), outer: (u32, u32)) -> (i64, i64) {
        let dx = outer.0 as i64 - inner.0 as i64;
        let dy = outer.1 as i64 - inner.1 as i64;

        match self.alignment() {
            Some((h, v)) => {
                let x = match h {
                    HorizontalAlign::Left => 0,
                    HorizontalAlign::Center => dx / 2,
                    HorizontalAlign::Right => dx,
                };
                let y = match v {
                    VerticalAlign::Top => 0,
                    VerticalAlign::Middle => dy / 2,
                    VerticalAlign::Bottom => dy,
                };
                (x, y)
            }
            None => match self {
                Anchor::Coordinate { x, y } => (-(x as i64), -(y as i64)),
                _ => (0, 0),
            },
        }
    }
}
