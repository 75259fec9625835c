//! Text measurement and rotated text rendering.
//!
//! Fonts are reached through the [`TextFont`] trait so layout code does not
//! depend on a particular rasterizer. [`FontHandle`] is the production
//! implementation, backed by `ab_glyph`.
//!
//! # Coordinate System
//!
//! - Angles are in degrees, positive = counter-clockwise on screen
//! - Text is positioned by its baseline origin (left end of the baseline)
//! - Screen y grows downward, so "above the baseline" is negative y
//!
//! Rotation uses inverse mapping, the same approach as image rotation: for
//! each destination pixel we find the point of the unrotated coverage mask
//! that lands there and sample it bilinearly. For a text-space offset
//! `(u, v)` and angle θ:
//!
//! ```text
//! screen_x =  u * cos(θ) + v * sin(θ)
//! screen_y = -u * sin(θ) + v * cos(θ)
//! ```

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};

use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{EffectError, Result};

/// Rendering resolution the point sizes are specified against.
pub const RENDER_DPI: f32 = 96.0;

/// Convert a font size in points to pixels at [`RENDER_DPI`].
#[inline]
pub fn points_to_pixels(points: f32) -> f32 {
    points * RENDER_DPI / 72.0
}

/// Vertical metrics of a font at a given pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    /// Distance from baseline to the top of the line (positive).
    pub ascent: f32,
    /// Distance from baseline to the bottom of the line (positive).
    pub descent: f32,
}

impl LineMetrics {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Anti-aliased glyph coverage for a run of text, unrotated.
#[derive(Debug, Clone)]
pub struct CoverageMask {
    pub width: u32,
    pub height: u32,
    /// Position of the baseline origin inside the mask, in pixels.
    pub origin_x: f32,
    pub origin_y: f32,
    /// Row-major coverage values, 0.0 to 1.0.
    pub coverage: Vec<f32>,
}

impl CoverageMask {
    /// An empty mask with room for `width x height` pixels.
    pub fn new(width: u32, height: u32, origin_x: f32, origin_y: f32) -> Self {
        Self {
            width,
            height,
            origin_x,
            origin_y,
            coverage: vec![0.0; width as usize * height as usize],
        }
    }

    /// Accumulate coverage at integer coordinates, ignoring out-of-range ones.
    pub fn add(&mut self, x: i64, y: i64, value: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.coverage[idx] = (self.coverage[idx] + value).min(1.0);
    }

    #[inline]
    fn get(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0.0;
        }
        self.coverage[y as usize * self.width as usize + x as usize]
    }

    /// Sample coverage with bilinear interpolation.
    ///
    /// `x`, `y` are in pixel-index space (pixel centres at integers);
    /// everything outside the mask has zero coverage.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        if x <= -1.0 || y <= -1.0 || x >= self.width as f32 || y >= self.height as f32 {
            return 0.0;
        }

        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;

        // Fractional distances
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let p00 = self.get(x0, y0);
        let p10 = self.get(x0 + 1, y0);
        let p01 = self.get(x0, y0 + 1);
        let p11 = self.get(x0 + 1, y0 + 1);

        p00 * (1.0 - fx) * (1.0 - fy) + p10 * fx * (1.0 - fy) + p01 * (1.0 - fx) * fy + p11 * fx * fy
    }
}

/// A font that can measure and rasterize single lines of text.
pub trait TextFont: Send + Sync {
    /// Vertical metrics at `px` pixels.
    fn metrics(&self, px: f32) -> LineMetrics;

    /// Horizontal advance of `text` at `px` pixels, including kerning.
    fn advance(&self, text: &str, px: f32) -> f32;

    /// Rasterize `text` unrotated at `px` pixels.
    fn rasterize(&self, text: &str, px: f32) -> CoverageMask;
}

/// A parsed TrueType/OpenType font.
#[derive(Clone)]
pub struct FontHandle {
    name: String,
    font: FontArc,
}

impl FontHandle {
    /// Parse font bytes supplied by the host.
    ///
    /// `name` identifies the font in error messages and logs.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| EffectError::resource(name.clone(), e.to_string()))?;
        Ok(Self { name, font })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontHandle").field("name", &self.name).finish()
    }
}

impl TextFont for FontHandle {
    fn metrics(&self, px: f32) -> LineMetrics {
        let scaled = self.font.as_scaled(PxScale::from(px));
        LineMetrics {
            ascent: scaled.ascent(),
            descent: -scaled.descent(),
        }
    }

    fn advance(&self, text: &str, px: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(px));
        let mut width = 0.0;
        let mut prev = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    fn rasterize(&self, text: &str, px: f32) -> CoverageMask {
        let scale = PxScale::from(px);
        let scaled = self.font.as_scaled(scale);
        let metrics = self.metrics(px);

        // Glyph ink can overhang the advance box; leave a margin.
        let margin = (px * 0.25).ceil();
        let width = (self.advance(text, px) + 2.0 * margin).ceil().max(1.0) as u32;
        let height = (metrics.height() + 2.0 * margin).ceil().max(1.0) as u32;
        let origin_x = margin;
        let origin_y = margin + metrics.ascent;
        let mut mask = CoverageMask::new(width, height, origin_x, origin_y);

        let mut cursor_x = origin_x;
        let mut prev = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                cursor_x += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(scale, point(cursor_x, origin_y));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, c| {
                    mask.add(
                        bounds.min.x as i64 + gx as i64,
                        bounds.min.y as i64 + gy as i64,
                        c,
                    );
                });
            }
            cursor_x += scaled.h_advance(id);
            prev = Some(id);
        }

        mask
    }
}

/// Rotated bounding box of a line of text, relative to its baseline origin.
///
/// Corners are listed lower-left, lower-right, upper-right, upper-left, in
/// the order of the text's own axes before rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    pub corners: [(f32, f32); 4],
}

impl TextBox {
    /// Horizontal distance between the lower-left and lower-right corners.
    pub fn width(&self) -> f32 {
        (self.corners[1].0 - self.corners[0].0).abs()
    }

    /// Vertical distance between the lower-right and upper-right corners.
    pub fn height(&self) -> f32 {
        (self.corners[2].1 - self.corners[1].1).abs()
    }
}

/// Rotate a text-space offset onto the screen.
#[inline]
fn rotate(u: f32, v: f32, cos: f32, sin: f32) -> (f32, f32) {
    (u * cos + v * sin, -u * sin + v * cos)
}

/// Measure `text` at `px` pixels rotated by `angle_degrees`.
pub fn measure(font: &dyn TextFont, text: &str, px: f32, angle_degrees: f32) -> TextBox {
    let metrics = font.metrics(px);
    let advance = font.advance(text, px);
    let (sin, cos) = angle_degrees.to_radians().sin_cos();

    TextBox {
        corners: [
            rotate(0.0, metrics.descent, cos, sin),
            rotate(advance, metrics.descent, cos, sin),
            rotate(advance, -metrics.ascent, cos, sin),
            rotate(0.0, -metrics.ascent, cos, sin),
        ],
    }
}

/// Draw one line of text with its baseline origin at `(x, y)`, rotated by
/// `angle_degrees` around that origin. Pixels outside the canvas are clipped.
pub fn draw_text(
    canvas: &mut Canvas,
    font: &dyn TextFont,
    text: &str,
    px: f32,
    angle_degrees: f32,
    (x, y): (f32, f32),
    color: Color,
) {
    if text.is_empty() {
        return;
    }

    let mask = font.rasterize(text, px);
    let (sin, cos) = angle_degrees.to_radians().sin_cos();

    // Screen-space bounds of the rotated mask
    let mask_corners = [
        (-mask.origin_x, -mask.origin_y),
        (mask.width as f32 - mask.origin_x, -mask.origin_y),
        (mask.width as f32 - mask.origin_x, mask.height as f32 - mask.origin_y),
        (-mask.origin_x, mask.height as f32 - mask.origin_y),
    ];
    let mut min = (f32::MAX, f32::MAX);
    let mut max = (f32::MIN, f32::MIN);
    for (u, v) in mask_corners {
        let (sx, sy) = rotate(u, v, cos, sin);
        min = (min.0.min(sx + x), min.1.min(sy + y));
        max = (max.0.max(sx + x), max.1.max(sy + y));
    }

    let x0 = min.0.floor().max(0.0) as u32;
    let y0 = min.1.floor().max(0.0) as u32;
    let x1 = (max.0.ceil().max(0.0) as u32).min(canvas.width());
    let y1 = (max.1.ceil().max(0.0) as u32).min(canvas.height());

    for py in y0..y1 {
        for px_x in x0..x1 {
            // Translate destination pixel centre to the baseline origin
            let dx = px_x as f32 + 0.5 - x;
            let dy = py as f32 + 0.5 - y;

            // Apply inverse rotation to find mask coordinates
            let u = dx * cos - dy * sin;
            let v = dx * sin + dy * cos;

            let c = mask.sample_bilinear(u + mask.origin_x - 0.5, v + mask.origin_y - 0.5);
            if c > 0.001 {
                canvas.blend_pixel(px_x, py, color, c);
            }
        }
    }
}

/// Fixed-pitch block font for layout tests: every character advances
/// `0.6 * px` and non-space characters render as a solid bar.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub struct BlockFont;

    impl TextFont for BlockFont {
        fn metrics(&self, px: f32) -> LineMetrics {
            LineMetrics {
                ascent: 0.8 * px,
                descent: 0.2 * px,
            }
        }

        fn advance(&self, text: &str, px: f32) -> f32 {
            text.chars().count() as f32 * 0.6 * px
        }

        fn rasterize(&self, text: &str, px: f32) -> CoverageMask {
            let metrics = self.metrics(px);
            let width = self.advance(text, px).ceil().max(1.0) as u32;
            let height = metrics.height().ceil() as u32;
            let mut mask = CoverageMask::new(width, height, 0.0, metrics.ascent);

            for (i, ch) in text.chars().enumerate() {
                if ch == ' ' {
                    continue;
                }
                let left = (i as f32 * 0.6 * px + 0.1 * px).round() as i64;
                let right = (i as f32 * 0.6 * px + 0.5 * px).round() as i64;
                let top = (metrics.ascent - 0.7 * px).round() as i64;
                let bottom = metrics.ascent.round() as i64;
                for yy in top..bottom {
                    for xx in left..right {
                        mask.add(xx, yy, 1.0);
                    }
                }
            }
            mask
        }
    }
}
