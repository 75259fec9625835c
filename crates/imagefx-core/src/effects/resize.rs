//! Resize with alignment.
//!
//! Produces a canvas of exactly the requested size in one of two modes:
//!
//! - **Cover** (default): the source is scaled uniformly until it covers the
//!   whole box, then the anchor picks which part is kept. Nothing is
//!   letterboxed.
//! - **Blank margin**: the source is scaled uniformly (upscaling allowed) to
//!   fit inside the box, and the anchor places it on a margin-coloured
//!   background.
//!
//! Aspect ratios are rounded to 8 decimals before comparison so that
//! sources whose ratio matches the target exactly are not tipped into the
//! wrong branch by floating-point noise.

use serde::{Deserialize, Serialize};

use super::{default_white, require_color, require_non_negative, require_positive, EffectKind};
use crate::anchor::{Anchor, Position};
use crate::canvas::{Canvas, PixelFormat};
use crate::color::Color;
use crate::error::{EffectError, Result};

const OP: EffectKind = EffectKind::Resize;

/// Resize arguments as configured by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeArgs {
    /// Target width. Required.
    pub width: Option<i32>,
    /// Target height. Required.
    pub height: Option<i32>,
    /// Letterbox instead of cropping.
    #[serde(default)]
    pub blank_margin: bool,
    #[serde(default = "default_white")]
    pub blank_margin_bg_color: String,
    #[serde(default)]
    pub position: Position,
    /// Crop origin for `position = coordinate`.
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl ResizeArgs {
    /// Arguments for a resize to `width x height` with every other field at
    /// its default.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            blank_margin: false,
            blank_margin_bg_color: default_white(),
            position: Position::default(),
            x: 0,
            y: 0,
        }
    }

    pub fn validate(&self) -> Result<ResizeSpec> {
        let width = self
            .width
            .ok_or_else(|| EffectError::validation(OP, "width is required"))?;
        let height = self
            .height
            .ok_or_else(|| EffectError::validation(OP, "height is required"))?;

        let width = require_positive(OP, "width", width)?;
        let height = require_positive(OP, "height", height)?;
        let x = require_non_negative(OP, "x", self.x)?;
        let y = require_non_negative(OP, "y", self.y)?;
        let margin_color = require_color(OP, "blank_margin_bg_color", &self.blank_margin_bg_color)?;

        Ok(ResizeSpec {
            width,
            height,
            blank_margin: self.blank_margin,
            margin_color,
            anchor: self.position.to_anchor(x, y),
        })
    }
}

/// Validated resize parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeSpec {
    pub width: u32,
    pub height: u32,
    pub blank_margin: bool,
    pub margin_color: Color,
    pub anchor: Anchor,
}

impl ResizeSpec {
    /// Size of the canvas this resize produces.
    pub fn output_dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Round to 8 decimal places.
#[inline]
fn round8(v: f64) -> f64 {
    (v * 1e8).round() / 1e8
}

/// Dimensions that fit inside `target` while preserving the source aspect
/// ratio. Upscaling is allowed.
pub fn fit_dimensions(src: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (src.0 as f64, src.1 as f64);
    let (w, h) = (target.0 as f64, target.1 as f64);
    let aspect = src_h / src_w;

    if aspect < h / w {
        // Width-bound
        (target.0, ((w * aspect).round() as u32).max(1))
    } else {
        // Height-bound
        (((h / aspect).round() as u32).max(1), target.1)
    }
}

/// Dimensions that cover `target` while preserving the source aspect ratio.
///
/// One side matches the target exactly, the other is at least as large.
pub fn cover_dimensions(src: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let src_ratio = round8(src.0 as f64 / src.1 as f64);
    let dst_ratio = round8(target.0 as f64 / target.1 as f64);

    // Tolerate the 8-decimal rounding when taking the ceiling.
    let ceil = |v: f64| (v - 1e-4).ceil().max(1.0) as u32;

    if src_ratio > dst_ratio {
        // Source is wider: match height, overflow width
        let w = ceil(target.1 as f64 * src_ratio).max(target.0);
        (w, target.1)
    } else {
        // Source is taller (or equal): match width, overflow height
        let h = ceil(target.0 as f64 / src_ratio).max(target.1);
        (target.0, h)
    }
}

/// Size the source is scaled to before placement.
pub fn scaled_dimensions(src: (u32, u32), spec: &ResizeSpec) -> (u32, u32) {
    let target = spec.output_dimensions();
    if spec.blank_margin {
        fit_dimensions(src, target)
    } else {
        cover_dimensions(src, target)
    }
}

/// Resize `canvas` to `spec.width x spec.height`, cropping or letterboxing
/// according to `spec`.
///
/// # Errors
///
/// `Geometry` when the placed image would not overlap the output at all,
/// which only happens for a `Coordinate` crop origin beyond the scaled image.
#[tracing::instrument(
    level = "debug",
    skip(canvas),
    fields(src_width = canvas.width(), src_height = canvas.height())
)]
pub fn resize(canvas: Canvas, spec: &ResizeSpec) -> Result<Canvas> {
    let target = spec.output_dimensions();
    let scaled_size = scaled_dimensions(canvas.dimensions(), spec);
    let (offset_x, offset_y) = spec.anchor.offset(scaled_size, target);

    tracing::debug!(
        scaled_width = scaled_size.0,
        scaled_height = scaled_size.1,
        offset_x,
        offset_y,
        "resize placement"
    );

    let overlaps = offset_x < target.0 as i64
        && offset_y < target.1 as i64
        && offset_x + scaled_size.0 as i64 > 0
        && offset_y + scaled_size.1 as i64 > 0;
    if !overlaps {
        return Err(EffectError::geometry(
            OP,
            format!(
                "crop origin ({}, {}) lies outside the scaled {}x{} image",
                -offset_x, -offset_y, scaled_size.0, scaled_size.1
            ),
        ));
    }

    let scaled = canvas
        .resample(scaled_size.0, scaled_size.1)
        .map_err(|e| EffectError::geometry(OP, e.to_string()))?;

    let mut dst = Canvas::filled(target.0, target.1, spec.margin_color)
        .map_err(|e| EffectError::geometry(OP, e.to_string()))?;
    if canvas.format() == PixelFormat::Rgba {
        dst.set_format(PixelFormat::Rgba);
    }
    dst.copy_from(&scaled, offset_x, offset_y);

    Ok(dst)
}


// ============================================================================
// Property-Based Tests
// ============================================================================
