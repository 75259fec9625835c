//! The owned pixel buffer every effect consumes and produces.
//!
//! A [`Canvas`] always stores RGBA pixels (4 bytes per pixel, row-major).
//! Its [`PixelFormat`] records whether the alpha channel carries information:
//! sources handed over as RGB are `Rgb` and stay fully opaque until an effect
//! such as rounded corners switches them to `Rgba`.
//!
//! Effects never mutate a canvas they were handed in place in a way the host
//! can observe half-done: they take the canvas by value and return a new one.

use image::imageops::FilterType;
use image::{RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Color;

/// Errors raised by canvas constructors and region operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanvasError {
    /// Width or height is zero.
    #[error("canvas dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    /// Pixel buffer does not match the dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// A region reaches outside the canvas.
    #[error("region {width}x{height} at ({x}, {y}) is outside the {canvas_width}x{canvas_height} canvas")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },
}

/// Whether the alpha channel of a canvas is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Opaque RGB; alpha is always 255.
    #[default]
    Rgb,
    /// RGB with a meaningful alpha channel.
    Rgba,
}

/// An owned RGBA pixel buffer with non-zero dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Wrap an RGBA buffer (4 bytes per pixel). The result has format `Rgba`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CanvasError> {
        check_dimensions(width, height)?;
        let expected = buffer_len(width, height, 4);
        if pixels.len() != expected {
            return Err(CanvasError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format: PixelFormat::Rgba,
            pixels,
        })
    }

    /// Copy an RGB buffer (3 bytes per pixel). The result has format `Rgb`.
    pub fn from_rgb(width: u32, height: u32, rgb: &[u8]) -> Result<Self, CanvasError> {
        check_dimensions(width, height)?;
        let expected = buffer_len(width, height, 3);
        if rgb.len() != expected {
            return Err(CanvasError::BufferSizeMismatch {
                expected,
                actual: rgb.len(),
            });
        }

        let mut pixels = Vec::with_capacity(buffer_len(width, height, 4));
        for chunk in rgb.chunks_exact(3) {
            pixels.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
        }

        Ok(Self {
            width,
            height,
            format: PixelFormat::Rgb,
            pixels,
        })
    }

    /// Create a canvas filled with a single colour.
    ///
    /// The format is `Rgb` for opaque colours and `Rgba` otherwise.
    pub fn filled(width: u32, height: u32, color: Color) -> Result<Self, CanvasError> {
        check_dimensions(width, height)?;
        let px = color.to_array();
        let pixels = px
            .iter()
            .copied()
            .cycle()
            .take(buffer_len(width, height, 4))
            .collect();
        let format = if color.a == 255 {
            PixelFormat::Rgb
        } else {
            PixelFormat::Rgba
        };
        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// Create a canvas from an image::RgbImage.
    pub fn from_rgb_image(img: &RgbImage) -> Result<Self, CanvasError> {
        let (width, height) = img.dimensions();
        Self::from_rgb(width, height, img.as_raw())
    }

    /// Create a canvas from an image::RgbaImage.
    pub fn from_rgba_image(img: RgbaImage) -> Result<Self, CanvasError> {
        let (width, height) = img.dimensions();
        Self::from_rgba(width, height, img.into_raw())
    }

    /// Convert to an image::RgbaImage for further processing.
    pub fn to_rgba_image(&self) -> RgbaImage {
        // Length is checked on construction, so from_raw cannot fail here.
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    /// Convert to an image::RgbImage, dropping alpha.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.to_rgb_bytes())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// RGB bytes (3 per pixel), dropping alpha.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(buffer_len(self.width, self.height, 3));
        for px in self.pixels.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
        rgb
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Mark the alpha channel as significant.
    pub fn with_alpha(mut self) -> Self {
        self.format = PixelFormat::Rgba;
        self
    }

    pub(crate) fn set_format(&mut self, format: PixelFormat) {
        self.format = format;
    }

    /// RGBA pixel data in row-major order.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Consume the canvas, returning the RGBA buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Read a pixel. Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Write a pixel. Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = self.index(x, y);
        self.pixels[i..i + 4].copy_from_slice(&px);
    }

    /// Fill a rectangle, clipped to the canvas. No blending.
    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip(x, y, width, height) else {
            return;
        };
        let px = color.to_array();
        for row in y0..y1 {
            for col in x0..x1 {
                self.put_pixel(col, row, px);
            }
        }
    }

    /// Copy `src` onto this canvas with its top-left corner at `(dst_x, dst_y)`.
    ///
    /// Pixels are replaced, not blended; the part of `src` falling outside
    /// this canvas is clipped. Negative offsets crop the source.
    pub fn copy_from(&mut self, src: &Canvas, dst_x: i64, dst_y: i64) {
        let Some((x0, y0, x1, y1)) = self.clip(dst_x, dst_y, src.width, src.height) else {
            return;
        };

        // Copy pixel data row by row for efficiency
        let row_bytes = (x1 - x0) as usize * 4;
        for y in y0..y1 {
            let src_x = (x0 as i64 - dst_x) as u32;
            let src_y = (y as i64 - dst_y) as u32;
            let src_start = src.index(src_x, src_y);
            let dst_start = self.index(x0, y);
            self.pixels[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src.pixels[src_start..src_start + row_bytes]);
        }
    }

    /// Alpha-composite `src` over this canvas at `(dst_x, dst_y)`, clipped.
    pub fn composite(&mut self, src: &Canvas, dst_x: i64, dst_y: i64) {
        let Some((x0, y0, x1, y1)) = self.clip(dst_x, dst_y, src.width, src.height) else {
            return;
        };

        for y in y0..y1 {
            for x in x0..x1 {
                let sx = (x as i64 - dst_x) as u32;
                let sy = (y as i64 - dst_y) as u32;
                let s = src.pixel(sx, sy);
                self.blend_pixel(x, y, Color::from(s), 1.0);
            }
        }
    }

    /// Blend `color` over one pixel with the given coverage (0.0 to 1.0).
    ///
    /// The effective source alpha is `color.a / 255 * coverage`. Out-of-range
    /// coordinates are ignored.
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Color, coverage: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let sa = (color.a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return;
        }

        let dst = self.pixel(x, y);
        let da = dst[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);

        let mix = |s: u8, d: u8| -> u8 {
            if out_a <= 0.0 {
                return 0;
            }
            let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
            v.round().clamp(0.0, 255.0) as u8
        };

        let alpha = match self.format {
            PixelFormat::Rgb => 255,
            PixelFormat::Rgba => (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
        };
        self.put_pixel(
            x,
            y,
            [
                mix(color.r, dst[0]),
                mix(color.g, dst[1]),
                mix(color.b, dst[2]),
                alpha,
            ],
        );
    }

    /// Extract a sub-region. The region must lie entirely inside the canvas.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Canvas, CanvasError> {
        check_dimensions(width, height)?;
        let fits = x as u64 + width as u64 <= self.width as u64
            && y as u64 + height as u64 <= self.height as u64;
        if !fits {
            return Err(CanvasError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                canvas_width: self.width,
                canvas_height: self.height,
            });
        }

        // Fast path: full crop returns a clone
        if x == 0 && y == 0 && width == self.width && height == self.height {
            return Ok(self.clone());
        }

        let mut output = Vec::with_capacity(buffer_len(width, height, 4));
        let row_bytes = width as usize * 4;
        for row in y..y + height {
            let start = self.index(x, row);
            output.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }

        Ok(Canvas {
            width,
            height,
            format: self.format,
            pixels: output,
        })
    }

    /// Resize to exact dimensions with bilinear (triangle) filtering.
    pub fn resample(&self, width: u32, height: u32) -> Result<Canvas, CanvasError> {
        check_dimensions(width, height)?;

        // Fast path: if dimensions match, just clone
        if self.width == width && self.height == height {
            return Ok(self.clone());
        }

        let resized =
            image::imageops::resize(&self.to_rgba_image(), width, height, FilterType::Triangle);
        let mut out = Canvas::from_rgba_image(resized)?;
        out.format = self.format;
        if self.format == PixelFormat::Rgb {
            // Filters may leave rounding noise in an alpha channel that must stay opaque.
            for px in out.pixels.chunks_exact_mut(4) {
                px[3] = 255;
            }
        }
        Ok(out)
    }

    /// Build the set of RGB triples present in this canvas.
    pub fn color_set(&self) -> ColorSet {
        let mut set = ColorSet::new();
        for px in self.pixels.chunks_exact(4) {
            set.insert(Color::rgb(px[0], px[1], px[2]));
        }
        set
    }

    /// Intersect a rectangle with the canvas, returning `(x0, y0, x1, y1)`.
    fn clip(&self, x: i64, y: i64, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i64).min(self.width as i64);
        let y1 = (y + height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Membership set over the 2^24 RGB triples, one bit per colour.
#[derive(Clone)]
pub struct ColorSet {
    bits: Vec<u64>,
    len: usize,
}

impl ColorSet {
    const WORDS: usize = (1 << 24) / 64;

    pub fn new() -> Self {
        Self {
            bits: vec![0; Self::WORDS],
            len: 0,
        }
    }

    #[inline]
    fn slot(color: Color) -> (usize, u64) {
        let key = (color.r as usize) << 16 | (color.g as usize) << 8 | color.b as usize;
        (key / 64, 1u64 << (key % 64))
    }

    pub fn insert(&mut self, color: Color) {
        let (word, mask) = Self::slot(color);
        if self.bits[word] & mask == 0 {
            self.bits[word] |= mask;
            self.len += 1;
        }
    }

    #[inline]
    pub fn contains(&self, color: Color) -> bool {
        let (word, mask) = Self::slot(color);
        self.bits[word] & mask != 0
    }

    /// Number of distinct colours.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every RGB triple is present.
    pub fn is_full(&self) -> bool {
        self.len == 1 << 24
    }
}

impl Default for ColorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ColorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorSet").field("len", &self.len).finish()
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), CanvasError> {
    if width == 0 || height == 0 {
        return Err(CanvasError::EmptyDimensions { width, height });
    }
    Ok(())
}

#[inline]
fn buffer_len(width: u32, height: u32, channels: usize) -> usize {
    width as usize * height as usize * channels
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a test canvas where each pixel has a unique value based on position.
    fn test_canvas(width: u32, height: u32) -> Canvas {
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((y * width + x) % 256) as u8;
                rgb.extend_from_slice(&[v, v, v]);
            }
        }
        Canvas::from_rgb(width, height, &rgb).unwrap()
    }

    #[test]
    fn test_canvas_creation() {
        let canvas = Canvas::from_rgb(100, 50, &vec![0u8; 100 * 50 * 3]).unwrap();

        assert_eq!(canvas.dimensions(), (100, 50));
        assert_eq!(canvas.pixel_count(), 5000);
        assert_eq!(canvas.pixels().len(), 20000);
        assert_eq!(canvas.format(), PixelFormat::Rgb);
        assert_eq!(canvas.pixel(99, 49), [0, 0, 0, 255]);
    }

    #[test]
    fn test_empty_dimensions_rejected() {
        assert_eq!(
            Canvas::from_rgba(0, 10, vec![]),
            Err(CanvasError::EmptyDimensions {
                width: 0,
                height: 10
            })
        );
        assert!(Canvas::filled(10, 0, Color::WHITE).is_err());
    }

    #[test]
    fn test_buffer_mismatch_rejected() {
        let err = Canvas::from_rgb(2, 2, &[0u8; 11]).unwrap_err();
        assert_eq!(
            err,
            CanvasError::BufferSizeMismatch {
                expected: 12,
                actual: 11
            }
        );
    }

    #[test]
    fn test_filled_format_follows_alpha() {
        let opaque = Canvas::filled(3, 3, Color::rgb(1, 2, 3)).unwrap();
        assert_eq!(opaque.format(), PixelFormat::Rgb);
        assert_eq!(opaque.pixel(2, 2), [1, 2, 3, 255]);

        let clear = Canvas::filled(3, 3, Color::rgba(0, 0, 0, 0)).unwrap();
        assert_eq!(clear.format(), PixelFormat::Rgba);
    }

    #[test]
    fn test_rgb_round_trip_through_image_types() {
        let canvas = test_canvas(7, 5);
        let img = canvas.to_rgb_image();
        let back = Canvas::from_rgb_image(&img).unwrap();
        assert_eq!(back, canvas);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = Canvas::filled(10, 10, Color::BLACK).unwrap();
        canvas.fill_rect(-5, 8, 8, 10, Color::WHITE);

        assert_eq!(canvas.pixel(0, 8), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(2, 9), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(3, 9), [0, 0, 0, 255]);
        assert_eq!(canvas.pixel(0, 7), [0, 0, 0, 255]);
    }

    #[test]
    fn test_copy_from_with_negative_offset_crops_source() {
        let src = test_canvas(10, 10);
        let mut dst = Canvas::filled(4, 4, Color::BLACK).unwrap();
        dst.copy_from(&src, -2, -3);

        // dst (0,0) comes from src (2,3) = 3*10+2 = 32
        assert_eq!(dst.pixel(0, 0)[0], 32);
        assert_eq!(dst.pixel(3, 3)[0], 65);
    }

    #[test]
    fn test_copy_from_positive_offset_leaves_margin() {
        let src = Canvas::filled(2, 2, Color::WHITE).unwrap();
        let mut dst = Canvas::filled(4, 4, Color::BLACK).unwrap();
        dst.copy_from(&src, 1, 1);

        assert_eq!(dst.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(dst.pixel(1, 1), [255, 255, 255, 255]);
        assert_eq!(dst.pixel(2, 2), [255, 255, 255, 255]);
        assert_eq!(dst.pixel(3, 3), [0, 0, 0, 255]);
    }

    #[test]
    fn test_copy_from_fully_outside_is_noop() {
        let src = Canvas::filled(2, 2, Color::WHITE).unwrap();
        let mut dst = Canvas::filled(4, 4, Color::BLACK).unwrap();
        let before = dst.clone();
        dst.copy_from(&src, 10, 0);
        dst.copy_from(&src, -2, 0);
        assert_eq!(dst, before);
    }

    #[test]
    fn test_composite_respects_source_alpha() {
        let mut dst = Canvas::filled(2, 1, Color::BLACK).unwrap();
        let mut src = Canvas::filled(2, 1, Color::WHITE).unwrap().with_alpha();
        src.put_pixel(1, 0, [255, 255, 255, 0]);
        dst.composite(&src, 0, 0);

        assert_eq!(dst.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(dst.pixel(1, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_blend_pixel_half_coverage() {
        let mut canvas = Canvas::filled(1, 1, Color::BLACK).unwrap();
        canvas.blend_pixel(0, 0, Color::WHITE, 0.5);
        let px = canvas.pixel(0, 0);
        assert!(px[0] >= 127 && px[0] <= 128, "got {}", px[0]);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_blend_pixel_ignores_out_of_bounds() {
        let mut canvas = Canvas::filled(1, 1, Color::BLACK).unwrap();
        canvas.blend_pixel(5, 5, Color::WHITE, 1.0);
        assert_eq!(canvas.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_crop() {
        let canvas = test_canvas(10, 10);
        let result = canvas.crop(2, 2, 6, 6).unwrap();

        assert_eq!(result.dimensions(), (6, 6));
        // First pixel should be from position (2, 2) in the original
        // Value at (2, 2) = (2 * 10 + 2) % 256 = 22
        assert_eq!(result.pixel(0, 0)[0], 22);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let canvas = test_canvas(10, 10);
        assert!(matches!(
            canvas.crop(8, 8, 5, 5),
            Err(CanvasError::RegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_resample_dimensions() {
        let canvas = test_canvas(40, 20);
        let out = canvas.resample(10, 30).unwrap();
        assert_eq!(out.dimensions(), (10, 30));
        assert_eq!(out.format(), PixelFormat::Rgb);
        assert!(out.pixels().chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_resample_uniform_stays_uniform() {
        let canvas = Canvas::filled(7, 3, Color::rgb(255, 0, 0)).unwrap();
        let out = canvas.resample(30, 11).unwrap();
        assert!(out
            .pixels()
            .chunks_exact(4)
            .all(|px| px == [255, 0, 0, 255]));
    }

    #[test]
    fn test_color_set() {
        let mut canvas = Canvas::filled(4, 4, Color::BLACK).unwrap();
        canvas.put_pixel(1, 1, [10, 20, 30, 255]);
        let set = canvas.color_set();

        assert_eq!(set.len(), 2);
        assert!(set.contains(Color::BLACK));
        assert!(set.contains(Color::rgb(10, 20, 30)));
        assert!(!set.contains(Color::WHITE));
        assert!(!set.is_full());
    }
}
