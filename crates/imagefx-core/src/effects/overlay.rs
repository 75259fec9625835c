//! Overlay compositing.
//!
//! A named overlay bitmap (frame, badge, texture) is cropped by
//! `overlay_offset` on every side, stretched over the working image inset by
//! `bg_offset`, and alpha-blended on top.

use serde::{Deserialize, Serialize};

use super::{require_non_negative, EffectKind};
use crate::canvas::Canvas;
use crate::error::{EffectError, Result};

const OP: EffectKind = EffectKind::Overlay;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayArgs {
    /// Name the overlay bitmap is registered under.
    #[serde(default)]
    pub overlay_name: String,
    #[serde(default)]
    pub overlay_offset: i32,
    #[serde(default)]
    pub bg_offset: i32,
}

impl OverlayArgs {
    pub fn validate(&self) -> Result<OverlaySpec> {
        if self.overlay_name.trim().is_empty() {
            return Err(EffectError::validation(OP, "overlay_name is required"));
        }
        Ok(OverlaySpec {
            overlay_name: self.overlay_name.clone(),
            overlay_offset: require_non_negative(OP, "overlay_offset", self.overlay_offset)?,
            bg_offset: require_non_negative(OP, "bg_offset", self.bg_offset)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    pub overlay_name: String,
    pub overlay_offset: u32,
    pub bg_offset: u32,
}

/// Shrink `(width, height)` by `inset` on every side.
fn inset_region((width, height): (u32, u32), inset: u32) -> Option<(u32, u32)> {
    let w = width as i64 - 2 * inset as i64;
    let h = height as i64 - 2 * inset as i64;
    (w > 0 && h > 0).then_some((w as u32, h as u32))
}

/// Composite `overlay_image` over `canvas`.
///
/// # Errors
///
/// `Geometry` when either offset consumes the whole overlay or canvas.
#[tracing::instrument(
    level = "debug",
    skip(canvas, overlay_image),
    fields(
        width = canvas.width(),
        height = canvas.height(),
        overlay_width = overlay_image.width(),
        overlay_height = overlay_image.height()
    )
)]
pub fn overlay(canvas: Canvas, overlay_image: &Canvas, spec: &OverlaySpec) -> Result<Canvas> {
    let (src_w, src_h) = inset_region(overlay_image.dimensions(), spec.overlay_offset)
        .ok_or_else(|| {
            EffectError::geometry(
                OP,
                format!(
                    "overlay_offset {} leaves nothing of the {}x{} overlay",
                    spec.overlay_offset,
                    overlay_image.width(),
                    overlay_image.height()
                ),
            )
        })?;
    let (dst_w, dst_h) = inset_region(canvas.dimensions(), spec.bg_offset).ok_or_else(|| {
        EffectError::geometry(
            OP,
            format!(
                "bg_offset {} leaves nothing of the {}x{} image",
                spec.bg_offset,
                canvas.width(),
                canvas.height()
            ),
        )
    })?;

    let layer = overlay_image
        .crop(spec.overlay_offset, spec.overlay_offset, src_w, src_h)
        .and_then(|region| region.resample(dst_w, dst_h))
        .map_err(|e| EffectError::geometry(OP, e.to_string()))?;

    let mut out = canvas;
    out.composite(&layer, spec.bg_offset as i64, spec.bg_offset as i64);
    Ok(out)
}
