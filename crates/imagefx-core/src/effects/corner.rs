//! Rounded corners.
//!
//! The corners are cut on a working canvas supersampled by [`SUPERSAMPLE`].
//! An arc is drawn in each corner and everything between the arc and the
//! image edge is flood-filled with a marker. The marker is either a key
//! colour that does not occur anywhere in the source, or (when no such
//! colour turns up within [`MAX_KEY_ATTEMPTS`] draws) a cleared alpha
//! channel. Downsampling the marked canvas yields anti-aliased corner alpha.

use serde::{Deserialize, Serialize};

use super::{default_ten, require_non_negative, EffectKind};
use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{EffectError, Result};
use crate::rng::SimpleRng;

const OP: EffectKind = EffectKind::Corner;

/// Working canvas scale factor.
pub const SUPERSAMPLE: u32 = 2;

/// Random draws spent looking for a key colour before falling back to alpha.
pub const MAX_KEY_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornerArgs {
    #[serde(default = "default_ten")]
    pub radius: i32,
}

impl Default for CornerArgs {
    fn default() -> Self {
        Self {
            radius: default_ten(),
        }
    }
}

impl CornerArgs {
    pub fn validate(&self) -> Result<CornerSpec> {
        Ok(CornerSpec {
            radius: require_non_negative(OP, "radius", self.radius)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerSpec {
    /// Corner radius in output pixels, before clamping to the image.
    pub radius: u32,
}

/// How masked pixels are recognised on the working canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    /// Masked pixels are painted with a colour absent from the source.
    Key(Color),
    /// Masked pixels have their alpha cleared.
    Transparent,
}

/// Draw random colours until one is found that the canvas does not contain.
pub(crate) fn find_key_color(canvas: &Canvas, rng: &mut SimpleRng) -> Option<Color> {
    let present = canvas.color_set();
    if present.is_full() {
        return None;
    }

    (0..MAX_KEY_ATTEMPTS)
        .map(|_| Color::rgb(rng.next_u8(), rng.next_u8(), rng.next_u8()))
        .find(|c| !present.contains(*c))
}

#[derive(Debug, Clone, Copy)]
enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Map a point from the top-left frame into this corner of a
    /// `width x height` canvas.
    #[inline]
    fn place(self, lx: u32, ly: u32, (width, height): (u32, u32)) -> (u32, u32) {
        match self {
            Corner::TopLeft => (lx, ly),
            Corner::TopRight => (width - 1 - lx, ly),
            Corner::BottomLeft => (lx, height - 1 - ly),
            Corner::BottomRight => (width - 1 - lx, height - 1 - ly),
        }
    }
}

/// Pixels of the top-left quarter arc of radius `r` centred on `(r-1, r-1)`,
/// clipped to the `r x r` corner square.
///
/// Only the first half of the sweep is computed; the second half is its
/// transpose, so the arc is symmetric about the diagonal.
fn canonical_arc(r: u32) -> Vec<(u32, u32)> {
    let radius = r as f64;
    let center = radius - 1.0;
    let steps = 4 * r.max(2);

    let mut points = Vec::with_capacity(steps as usize + 2);
    for i in 0..=steps / 2 {
        let theta = (180.0 + 90.0 * i as f64 / steps as f64).to_radians();
        let x = (center + radius * theta.cos()).round() as i64;
        let y = (center + radius * theta.sin()).round() as i64;
        for (px, py) in [(x, y), (y, x)] {
            if px >= 0 && py >= 0 && px < r as i64 && py < r as i64 {
                points.push((px as u32, py as u32));
            }
        }
    }
    points.sort_unstable();
    points.dedup();
    points
}

struct Working {
    canvas: Canvas,
    marker: Marker,
}

impl Working {
    /// Nearest-neighbour upscale of `source`, fully opaque.
    fn new(source: &Canvas, marker: Marker) -> Result<Self> {
        let (w, h) = source.dimensions();
        let (ww, wh) = (w * SUPERSAMPLE, h * SUPERSAMPLE);

        let mut pixels = Vec::with_capacity(ww as usize * wh as usize * 4);
        for y in 0..wh {
            for x in 0..ww {
                let px = source.pixel(x / SUPERSAMPLE, y / SUPERSAMPLE);
                pixels.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }

        let canvas = Canvas::from_rgba(ww, wh, pixels)
            .map_err(|e| EffectError::geometry(OP, e.to_string()))?;
        Ok(Self { canvas, marker })
    }

    #[inline]
    fn is_masked(&self, x: u32, y: u32) -> bool {
        let px = self.canvas.pixel(x, y);
        match self.marker {
            Marker::Key(key) => key.same_rgb(Color::from(px)),
            Marker::Transparent => px[3] == 0,
        }
    }

    #[inline]
    fn mark(&mut self, x: u32, y: u32) {
        let px = match self.marker {
            Marker::Key(key) => [key.r, key.g, key.b, 255],
            Marker::Transparent => {
                let mut px = self.canvas.pixel(x, y);
                px[3] = 0;
                px
            }
        };
        self.canvas.put_pixel(x, y, px);
    }

    /// Draw the arc into every corner and fill the area outside it.
    fn cut_corners(&mut self, r: u32) {
        let arc = canonical_arc(r);
        for corner in Corner::ALL {
            for &(lx, ly) in &arc {
                let (x, y) = corner.place(lx, ly, self.canvas.dimensions());
                self.mark(x, y);
            }
            self.fill_from_corner(corner, r);
        }
    }

    /// 4-connected fill from the corner pixel, bounded by the marked arc and
    /// the `r x r` corner square.
    fn fill_from_corner(&mut self, corner: Corner, r: u32) {
        let dims = self.canvas.dimensions();
        let mut stack = vec![(0u32, 0u32)];

        while let Some((lx, ly)) = stack.pop() {
            let (x, y) = corner.place(lx, ly, dims);
            if self.is_masked(x, y) {
                continue;
            }
            self.mark(x, y);

            if lx > 0 {
                stack.push((lx - 1, ly));
            }
            if lx + 1 < r {
                stack.push((lx + 1, ly));
            }
            if ly > 0 {
                stack.push((lx, ly - 1));
            }
            if ly + 1 < r {
                stack.push((lx, ly + 1));
            }
        }
    }

    /// Unmasked samples in the block behind output pixel `(x, y)`.
    fn unmasked_samples(&self, x: u32, y: u32) -> u32 {
        let mut count = 0;
        for dy in 0..SUPERSAMPLE {
            for dx in 0..SUPERSAMPLE {
                if !self.is_masked(x * SUPERSAMPLE + dx, y * SUPERSAMPLE + dy) {
                    count += 1;
                }
            }
        }
        count
    }
}

fn apply_mask(canvas: Canvas, radius: u32, marker: Marker) -> Result<Canvas> {
    let mut working = Working::new(&canvas, marker)?;
    working.cut_corners(radius * SUPERSAMPLE);

    let samples = SUPERSAMPLE * SUPERSAMPLE;
    let dims = canvas.dimensions();
    let mut out = canvas.with_alpha();

    // The corner squares are disjoint because radius <= min(w, h) / 2.
    for corner in Corner::ALL {
        for ly in 0..radius {
            for lx in 0..radius {
                let (x, y) = corner.place(lx, ly, dims);
                let unmasked = working.unmasked_samples(x, y);
                if unmasked == samples {
                    continue;
                }
                let mut px = out.pixel(x, y);
                px[3] = ((px[3] as u32 * unmasked + samples / 2) / samples) as u8;
                out.put_pixel(x, y, px);
            }
        }
    }

    Ok(out)
}

/// Round the corners of `canvas` by making them transparent.
///
/// `rng` drives the key colour search; pass a fixed seed for reproducible
/// output. The output always has an alpha channel.
#[tracing::instrument(
    level = "debug",
    skip(canvas, rng),
    fields(width = canvas.width(), height = canvas.height())
)]
pub fn round_corners(canvas: Canvas, spec: &CornerSpec, rng: &mut SimpleRng) -> Result<Canvas> {
    let (w, h) = canvas.dimensions();
    let radius = spec.radius.min(w.min(h) / 2);
    if radius == 0 {
        return Ok(canvas.with_alpha());
    }

    let marker = match find_key_color(&canvas, rng) {
        Some(key) => {
            tracing::debug!(key = %key, radius, "corner key colour");
            Marker::Key(key)
        }
        None => {
            tracing::warn!(
                attempts = MAX_KEY_ATTEMPTS,
                width = w,
                height = h,
                "no free key colour found, masking corners through alpha"
            );
            Marker::Transparent
        }
    };

    apply_mask(canvas, radius, marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelFormat;
    use crate::effects::testing::{gradient, solid};

    fn alpha(canvas: &Canvas, x: u32, y: u32) -> u8 {
        canvas.pixel(x, y)[3]
    }

    #[test]
    fn test_defaults_and_validation() {
        let args: CornerArgs = serde_json::from_str("{}").unwrap();
        assert_eq!(args.validate().unwrap().radius, 10);
        assert!(CornerArgs { radius: 0 }.validate().is_ok());
        assert!(matches!(
            CornerArgs { radius: -3 }.validate(),
            Err(EffectError::Validation {
                operation: EffectKind::Corner,
                ..
            })
        ));
    }

    #[test]
    fn test_radius_zero_is_opaque_rgba() {
        let src = gradient(20, 10);
        let out = round_corners(src.clone(), &CornerSpec { radius: 0 }, &mut SimpleRng::new(1)).unwrap();
        assert_eq!(out.format(), PixelFormat::Rgba);
        assert_eq!(out.pixels(), src.pixels());
        assert!(out.pixels().chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_corners_transparent_interior_opaque() {
        let src = solid(60, 40, "#3366CC");
        let out = round_corners(src, &CornerSpec { radius: 10 }, &mut SimpleRng::new(7)).unwrap();

        assert_eq!(out.dimensions(), (60, 40));
        assert_eq!(out.format(), PixelFormat::Rgba);
        for (x, y) in [(0, 0), (59, 0), (0, 39), (59, 39), (1, 1), (58, 38)] {
            assert_eq!(alpha(&out, x, y), 0, "corner pixel ({}, {})", x, y);
        }
        for (x, y) in [(10, 10), (30, 0), (0, 20), (30, 20), (49, 29)] {
            assert_eq!(alpha(&out, x, y), 255, "pixel ({}, {})", x, y);
        }
        // Colour is untouched
        assert_eq!(&out.pixel(30, 20)[..3], &[0x33, 0x66, 0xCC]);
    }

    #[test]
    fn test_corner_edge_is_antialiased() {
        let src = solid(60, 60, "#000000");
        let out = round_corners(src, &CornerSpec { radius: 20 }, &mut SimpleRng::new(3)).unwrap();
        let partial = (0..20)
            .flat_map(|y| (0..20).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let a = alpha(&out, x, y);
                a > 0 && a < 255
            })
            .count();
        assert!(partial > 0);
    }

    #[test]
    fn test_corner_masks_are_mirror_images() {
        let src = solid(41, 33, "#808080");
        let out = round_corners(src, &CornerSpec { radius: 12 }, &mut SimpleRng::new(11)).unwrap();
        let (w, h) = out.dimensions();

        for y in 0..12 {
            for x in 0..12 {
                let a = alpha(&out, x, y);
                assert_eq!(a, alpha(&out, w - 1 - x, y));
                assert_eq!(a, alpha(&out, x, h - 1 - y));
                assert_eq!(a, alpha(&out, w - 1 - x, h - 1 - y));
                // Each corner is also symmetric about its diagonal
                assert_eq!(a, alpha(&out, y, x));
            }
        }
    }

    #[test]
    fn test_radius_is_clamped() {
        let src = solid(10, 30, "#FFFFFF");
        let out = round_corners(src, &CornerSpec { radius: 100 }, &mut SimpleRng::new(5)).unwrap();
        // Clamped to 5: the middle of the long edge stays opaque
        assert_eq!(alpha(&out, 0, 15), 255);
        assert_eq!(alpha(&out, 0, 0), 0);
    }

    #[test]
    fn test_small_radius_does_not_leak() {
        let src = solid(4, 4, "#FF0000");
        let out = round_corners(src, &CornerSpec { radius: 1 }, &mut SimpleRng::new(9)).unwrap();
        assert!(alpha(&out, 0, 0) < 255);
        assert_eq!(alpha(&out, 1, 1), 255);
        assert_eq!(alpha(&out, 1, 0), 255);
    }

    #[test]
    fn test_key_and_alpha_markers_agree() {
        let src = gradient(48, 36);
        let key = find_key_color(&src, &mut SimpleRng::new(21)).unwrap();
        assert!(!src.color_set().contains(key));

        let keyed = apply_mask(src.clone(), 9, Marker::Key(key)).unwrap();
        let cleared = apply_mask(src, 9, Marker::Transparent).unwrap();
        assert_eq!(keyed, cleared);
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = round_corners(gradient(30, 30), &CornerSpec { radius: 6 }, &mut SimpleRng::new(4)).unwrap();
        let b = round_corners(gradient(30, 30), &CornerSpec { radius: 6 }, &mut SimpleRng::new(4)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_existing_alpha_is_scaled_not_replaced() {
        let mut src = solid(20, 20, "#000000").with_alpha();
        for y in 0..20 {
            for x in 0..20 {
                src.put_pixel(x, y, [0, 0, 0, 100]);
            }
        }
        let out = round_corners(src, &CornerSpec { radius: 5 }, &mut SimpleRng::new(2)).unwrap();
        assert_eq!(alpha(&out, 10, 10), 100);
        assert_eq!(alpha(&out, 0, 0), 0);
    }

    #[test]
    fn test_canonical_arc_is_symmetric() {
        for r in [2, 3, 7, 20] {
            let arc = canonical_arc(r);
            assert!(!arc.is_empty());
            for &(x, y) in &arc {
                assert!(arc.contains(&(y, x)));
                assert!(x < r && y < r);
            }
        }
    }
}
