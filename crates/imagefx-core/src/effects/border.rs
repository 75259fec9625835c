//! Solid border.
//!
//! The output keeps the input size: the frame is painted inside it and the
//! original is cover-resized into the remaining interior.

use serde::{Deserialize, Serialize};

use super::resize::{resize, ResizeSpec};
use super::{require_color, require_positive, EffectKind, Insets};
use crate::anchor::Anchor;
use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{EffectError, Result};

const OP: EffectKind = EffectKind::Border;

fn default_border_color() -> String {
    "#EDEDED".to_string()
}

fn default_thickness() -> i32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderArgs {
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default = "default_thickness")]
    pub border_thick_top: i32,
    #[serde(default = "default_thickness")]
    pub border_thick_right: i32,
    #[serde(default = "default_thickness")]
    pub border_thick_bottom: i32,
    #[serde(default = "default_thickness")]
    pub border_thick_left: i32,
}

impl Default for BorderArgs {
    fn default() -> Self {
        Self {
            border_color: default_border_color(),
            border_thick_top: default_thickness(),
            border_thick_right: default_thickness(),
            border_thick_bottom: default_thickness(),
            border_thick_left: default_thickness(),
        }
    }
}

impl BorderArgs {
    pub fn validate(&self) -> Result<BorderSpec> {
        Ok(BorderSpec {
            color: require_color(OP, "border_color", &self.border_color)?,
            thickness: Insets {
                top: require_positive(OP, "border_thick_top", self.border_thick_top)?,
                right: require_positive(OP, "border_thick_right", self.border_thick_right)?,
                bottom: require_positive(OP, "border_thick_bottom", self.border_thick_bottom)?,
                left: require_positive(OP, "border_thick_left", self.border_thick_left)?,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderSpec {
    pub color: Color,
    pub thickness: Insets,
}

/// Frame `canvas` with a solid border, keeping its dimensions.
///
/// # Errors
///
/// `Geometry` when the thicknesses leave no interior.
#[tracing::instrument(
    level = "debug",
    skip(canvas),
    fields(width = canvas.width(), height = canvas.height())
)]
pub fn add_border(canvas: Canvas, spec: &BorderSpec) -> Result<Canvas> {
    let t = spec.thickness;
    let (inner_w, inner_h) = t.interior(canvas.dimensions()).ok_or_else(|| {
        EffectError::geometry(
            OP,
            format!(
                "border {}/{}/{}/{} leaves no interior in a {}x{} image",
                t.top,
                t.right,
                t.bottom,
                t.left,
                canvas.width(),
                canvas.height()
            ),
        )
    })?;

    let (width, height) = canvas.dimensions();
    let format = canvas.format();

    let inner = resize(
        canvas,
        &ResizeSpec {
            width: inner_w,
            height: inner_h,
            blank_margin: false,
            margin_color: spec.color,
            anchor: Anchor::MiddleCenter,
        },
    )?;

    let mut out = Canvas::filled(width, height, spec.color)
        .map_err(|e| EffectError::geometry(OP, e.to_string()))?;
    out.set_format(format);
    out.copy_from(&inner, t.left as i64, t.top as i64);

    Ok(out)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: output dimensions equal input dimensions.
        #[test]
        fn prop_border_keeps_size(
            width in 1u32..=64,
            height in 1u32..=64,
            top in 1u32..=8,
            right in 1u32..=8,
            bottom in 1u32..=8,
            left in 1u32..=8,
        ) {
            let canvas = Canvas::filled(width, height, Color::rgb(9, 9, 9)).unwrap();
            let spec = BorderSpec {
                color: Color::WHITE,
                thickness: Insets { top, right, bottom, left },
            };
            match add_border(canvas, &spec) {
                Ok(out) => prop_assert_eq!(out.dimensions(), (width, height)),
                Err(e) => {
                    prop_assert!(left + right >= width || top + bottom >= height);
                    prop_assert!(matches!(e, EffectError::Geometry { .. }), "unexpected error: {:?}", e);
                }
            }
        }
    }
}
