//! Pixel filters.
//!
//! Twelve filters, selectable by name (`"brightness"`) or by the legacy
//! numeric identifier used in stored configurations (`"2"` or `2`).
//!
//! | Id | Name | Arguments |
//! |---|---|---|
//! | 0 | `negate` | |
//! | 1 | `grayscale` | |
//! | 2 | `brightness` | arg1: level added to each channel |
//! | 3 | `contrast` | arg1: -100 (more) to 100 (less) |
//! | 4 | `colorize` | arg1..arg3: channel deltas, arg4: alpha 0..=127 |
//! | 5 | `edge_detect` | |
//! | 6 | `emboss` | |
//! | 7 | `gaussian_blur` | |
//! | 8 | `selective_blur` | |
//! | 9 | `mean_removal` | |
//! | 10 | `smooth` | arg1: centre weight |
//! | 11 | `pixelate` | arg1: block size, arg2: non-zero to average |
//!
//! Every filter leaves alpha alone except `colorize`, and every result is
//! clamped to `0..=255`. `repeat` applies the filter that many times.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::EffectKind;
use crate::canvas::{Canvas, PixelFormat};
use crate::error::{EffectError, Result};

const OP: EffectKind = EffectKind::Filter;

/// Neighbours further than this (Euclidean RGB distance) from the centre
/// pixel are left out of a selective blur.
pub const SELECTIVE_BLUR_THRESHOLD: f32 = 64.0;

/// Filter identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Negate,
    Grayscale,
    Brightness,
    Contrast,
    Colorize,
    EdgeDetect,
    Emboss,
    GaussianBlur,
    SelectiveBlur,
    MeanRemoval,
    Smooth,
    Pixelate,
}

impl FilterKind {
    /// All filters, indexed by legacy id.
    pub const ALL: [FilterKind; 12] = [
        FilterKind::Negate,
        FilterKind::Grayscale,
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Colorize,
        FilterKind::EdgeDetect,
        FilterKind::Emboss,
        FilterKind::GaussianBlur,
        FilterKind::SelectiveBlur,
        FilterKind::MeanRemoval,
        FilterKind::Smooth,
        FilterKind::Pixelate,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: i64) -> Option<Self> {
        usize::try_from(id)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Negate => "negate",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Colorize => "colorize",
            FilterKind::EdgeDetect => "edge_detect",
            FilterKind::Emboss => "emboss",
            FilterKind::GaussianBlur => "gaussian_blur",
            FilterKind::SelectiveBlur => "selective_blur",
            FilterKind::MeanRemoval => "mean_removal",
            FilterKind::Smooth => "smooth",
            FilterKind::Pixelate => "pixelate",
        }
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Self::from_id(id).ok_or_else(|| format!("unknown filter id {}", id));
        }
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown filter '{}'", s))
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accept `"brightness"`, `"2"` or `2` for `filter_name`.
fn name_or_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NameOrId {
        Name(String),
        Id(i64),
    }

    Ok(match NameOrId::deserialize(deserializer)? {
        NameOrId::Name(name) => name,
        NameOrId::Id(id) => id.to_string(),
    })
}

fn default_repeat() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterArgs {
    #[serde(default, deserialize_with = "name_or_id")]
    pub filter_name: String,
    #[serde(default = "default_repeat")]
    pub repeat: i32,
    #[serde(default)]
    pub arg1: i32,
    #[serde(default)]
    pub arg2: i32,
    #[serde(default)]
    pub arg3: i32,
    #[serde(default)]
    pub arg4: i32,
}

impl FilterArgs {
    /// Arguments for `filter` applied once, all numeric arguments zero.
    pub fn new(filter: FilterKind) -> Self {
        Self {
            filter_name: filter.as_str().to_string(),
            repeat: 1,
            arg1: 0,
            arg2: 0,
            arg3: 0,
            arg4: 0,
        }
    }

    pub fn validate(&self) -> Result<FilterSpec> {
        if self.filter_name.trim().is_empty() {
            return Err(EffectError::validation(OP, "filter_name is required"));
        }
        let kind: FilterKind = self
            .filter_name
            .parse()
            .map_err(|e: String| EffectError::validation(OP, e))?;

        if self.repeat < 1 {
            return Err(EffectError::validation(
                OP,
                format!("repeat must be at least 1, got {}", self.repeat),
            ));
        }

        let filter = match kind {
            FilterKind::Negate => Filter::Negate,
            FilterKind::Grayscale => Filter::Grayscale,
            FilterKind::Brightness => Filter::Brightness(self.arg1),
            FilterKind::Contrast => Filter::Contrast(self.arg1),
            FilterKind::Colorize => {
                for (field, value) in [("arg1", self.arg1), ("arg2", self.arg2), ("arg3", self.arg3)] {
                    if !(-255..=255).contains(&value) {
                        return Err(EffectError::validation(
                            OP,
                            format!("{} must be within -255..=255, got {}", field, value),
                        ));
                    }
                }
                if !(0..=127).contains(&self.arg4) {
                    return Err(EffectError::validation(
                        OP,
                        format!("arg4 must be within 0..=127, got {}", self.arg4),
                    ));
                }
                Filter::Colorize {
                    red: self.arg1 as i16,
                    green: self.arg2 as i16,
                    blue: self.arg3 as i16,
                    alpha: self.arg4 as u8,
                }
            }
            FilterKind::EdgeDetect => Filter::EdgeDetect,
            FilterKind::Emboss => Filter::Emboss,
            FilterKind::GaussianBlur => Filter::GaussianBlur,
            FilterKind::SelectiveBlur => Filter::SelectiveBlur,
            FilterKind::MeanRemoval => Filter::MeanRemoval,
            FilterKind::Smooth => Filter::Smooth(self.arg1),
            FilterKind::Pixelate => {
                if self.arg1 < 1 {
                    return Err(EffectError::validation(
                        OP,
                        format!("pixelate block size (arg1) must be at least 1, got {}", self.arg1),
                    ));
                }
                Filter::Pixelate {
                    block_size: self.arg1 as u32,
                    average: self.arg2 != 0,
                }
            }
        };

        Ok(FilterSpec {
            filter,
            repeat: self.repeat as u32,
        })
    }
}

/// A filter together with its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Negate,
    Grayscale,
    Brightness(i32),
    Contrast(i32),
    Colorize {
        red: i16,
        green: i16,
        blue: i16,
        /// 0 (unchanged) to 127 (fully transparent).
        alpha: u8,
    },
    EdgeDetect,
    Emboss,
    GaussianBlur,
    SelectiveBlur,
    MeanRemoval,
    /// Centre weight of the smoothing kernel.
    Smooth(i32),
    Pixelate {
        block_size: u32,
        average: bool,
    },
}

impl Filter {
    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Negate => FilterKind::Negate,
            Filter::Grayscale => FilterKind::Grayscale,
            Filter::Brightness(_) => FilterKind::Brightness,
            Filter::Contrast(_) => FilterKind::Contrast,
            Filter::Colorize { .. } => FilterKind::Colorize,
            Filter::EdgeDetect => FilterKind::EdgeDetect,
            Filter::Emboss => FilterKind::Emboss,
            Filter::GaussianBlur => FilterKind::GaussianBlur,
            Filter::SelectiveBlur => FilterKind::SelectiveBlur,
            Filter::MeanRemoval => FilterKind::MeanRemoval,
            Filter::Smooth(_) => FilterKind::Smooth,
            Filter::Pixelate { .. } => FilterKind::Pixelate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    pub filter: Filter,
    pub repeat: u32,
}

/// 3x3 convolution kernel with divisor and offset.
struct Kernel {
    weights: [[f32; 3]; 3],
    divisor: f32,
    offset: f32,
}

impl Kernel {
    const GAUSSIAN: Kernel = Kernel {
        weights: [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]],
        divisor: 16.0,
        offset: 0.0,
    };
    const EDGE_DETECT: Kernel = Kernel {
        weights: [[-1.0, 0.0, -1.0], [0.0, 4.0, 0.0], [-1.0, 0.0, -1.0]],
        divisor: 1.0,
        offset: 127.0,
    };
    const EMBOSS: Kernel = Kernel {
        weights: [[1.5, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, -1.5]],
        divisor: 1.0,
        offset: 127.0,
    };
    const MEAN_REMOVAL: Kernel = Kernel {
        weights: [[-1.0, -1.0, -1.0], [-1.0, 9.0, -1.0], [-1.0, -1.0, -1.0]],
        divisor: 1.0,
        offset: 0.0,
    };

    fn smooth(weight: i32) -> Kernel {
        let w = weight as f32;
        Kernel {
            weights: [[1.0, 1.0, 1.0], [1.0, w, 1.0], [1.0, 1.0, 1.0]],
            divisor: w + 8.0,
            offset: 0.0,
        }
    }
}

#[inline]
fn clamp_channel(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Apply `spec.filter` to `canvas`, `spec.repeat` times.
#[tracing::instrument(
    level = "debug",
    skip(canvas),
    fields(width = canvas.width(), height = canvas.height())
)]
pub fn apply_filter(canvas: Canvas, spec: &FilterSpec) -> Result<Canvas> {
    let mut canvas = canvas;
    for _ in 0..spec.repeat {
        apply_once(&mut canvas, spec.filter);
    }
    Ok(canvas)
}

fn apply_once(canvas: &mut Canvas, filter: Filter) {
    match filter {
        Filter::Negate => map_rgb(canvas, |c| 255 - c),
        Filter::Grayscale => apply_grayscale(canvas),
        Filter::Brightness(level) => map_rgb(canvas, |c| clamp_channel(c as f32 + level as f32)),
        Filter::Contrast(level) => {
            let factor = ((100.0 - level as f32) / 100.0).powi(2);
            map_rgb(canvas, |c| {
                clamp_channel(((c as f32 / 255.0 - 0.5) * factor + 0.5) * 255.0)
            })
        }
        Filter::Colorize {
            red,
            green,
            blue,
            alpha,
        } => apply_colorize(canvas, [red, green, blue], alpha),
        Filter::EdgeDetect => convolve(canvas, &Kernel::EDGE_DETECT),
        Filter::Emboss => convolve(canvas, &Kernel::EMBOSS),
        Filter::GaussianBlur => convolve(canvas, &Kernel::GAUSSIAN),
        Filter::SelectiveBlur => apply_selective_blur(canvas),
        Filter::MeanRemoval => convolve(canvas, &Kernel::MEAN_REMOVAL),
        Filter::Smooth(weight) => convolve(canvas, &Kernel::smooth(weight)),
        Filter::Pixelate {
            block_size,
            average,
        } => apply_pixelate(canvas, block_size, average),
    }
}

/// Apply a per-channel function to R, G and B.
fn map_rgb(canvas: &mut Canvas, f: impl Fn(u8) -> u8) {
    for px in canvas.pixels_mut().chunks_exact_mut(4) {
        px[0] = f(px[0]);
        px[1] = f(px[1]);
        px[2] = f(px[2]);
    }
}

fn apply_grayscale(canvas: &mut Canvas) {
    for px in canvas.pixels_mut().chunks_exact_mut(4) {
        let y = (0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32) as u8;
        px[0] = y;
        px[1] = y;
        px[2] = y;
    }
}

fn apply_colorize(canvas: &mut Canvas, deltas: [i16; 3], alpha: u8) {
    let alpha_drop = (alpha as u32 * 255 + 63) / 127;
    for px in canvas.pixels_mut().chunks_exact_mut(4) {
        for (c, d) in px[..3].iter_mut().zip(deltas) {
            *c = (*c as i16 + d).clamp(0, 255) as u8;
        }
        px[3] = (px[3] as u32).saturating_sub(alpha_drop) as u8;
    }
    if alpha > 0 {
        canvas.set_format(PixelFormat::Rgba);
    }
}

/// Clamped neighbour coordinates of `(x, y)` at offset `(dx, dy)`.
#[inline]
fn neighbour(x: u32, y: u32, dx: i64, dy: i64, (w, h): (u32, u32)) -> (u32, u32) {
    let nx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
    let ny = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
    (nx, ny)
}

/// 3x3 convolution over RGB with edge clamping; alpha is kept from the
/// centre pixel. A zero divisor counts as 1.
fn convolve(canvas: &mut Canvas, kernel: &Kernel) {
    let src = canvas.clone();
    let dims = src.dimensions();
    let divisor = if kernel.divisor == 0.0 { 1.0 } else { kernel.divisor };

    for y in 0..dims.1 {
        for x in 0..dims.0 {
            let mut sum = [0.0f32; 3];
            for (j, row) in kernel.weights.iter().enumerate() {
                for (i, &weight) in row.iter().enumerate() {
                    if weight == 0.0 {
                        continue;
                    }
                    let (nx, ny) = neighbour(x, y, i as i64 - 1, j as i64 - 1, dims);
                    let px = src.pixel(nx, ny);
                    for c in 0..3 {
                        sum[c] += px[c] as f32 * weight;
                    }
                }
            }

            let alpha = src.pixel(x, y)[3];
            canvas.put_pixel(
                x,
                y,
                [
                    clamp_channel(sum[0] / divisor + kernel.offset),
                    clamp_channel(sum[1] / divisor + kernel.offset),
                    clamp_channel(sum[2] / divisor + kernel.offset),
                    alpha,
                ],
            );
        }
    }
}

/// Blur that averages only neighbours of similar colour, weighted by
/// `1 - distance / max_distance`.
fn apply_selective_blur(canvas: &mut Canvas) {
    const MAX_DISTANCE: f32 = 441.672_96; // 255 * sqrt(3)

    let src = canvas.clone();
    let dims = src.dimensions();

    for y in 0..dims.1 {
        for x in 0..dims.0 {
            let center = src.pixel(x, y);
            let mut sum = [0.0f32; 3];
            let mut total = 0.0f32;

            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = neighbour(x, y, dx, dy, dims);
                    let px = src.pixel(nx, ny);
                    let distance = (0..3)
                        .map(|c| {
                            let d = px[c] as f32 - center[c] as f32;
                            d * d
                        })
                        .sum::<f32>()
                        .sqrt();
                    if distance > SELECTIVE_BLUR_THRESHOLD {
                        continue;
                    }
                    let weight = 1.0 - distance / MAX_DISTANCE;
                    for c in 0..3 {
                        sum[c] += px[c] as f32 * weight;
                    }
                    total += weight;
                }
            }

            // The centre pixel always contributes with weight 1.
            canvas.put_pixel(
                x,
                y,
                [
                    clamp_channel((sum[0] / total).round()),
                    clamp_channel((sum[1] / total).round()),
                    clamp_channel((sum[2] / total).round()),
                    center[3],
                ],
            );
        }
    }
}

fn apply_pixelate(canvas: &mut Canvas, block_size: u32, average: bool) {
    if block_size <= 1 {
        return;
    }
    let (w, h) = canvas.dimensions();

    for by in (0..h).step_by(block_size as usize) {
        for bx in (0..w).step_by(block_size as usize) {
            let x1 = (bx + block_size).min(w);
            let y1 = (by + block_size).min(h);

            let fill = if average {
                let mut sum = [0u64; 4];
                for y in by..y1 {
                    for x in bx..x1 {
                        let px = canvas.pixel(x, y);
                        for c in 0..4 {
                            sum[c] += px[c] as u64;
                        }
                    }
                }
                let n = ((x1 - bx) * (y1 - by)) as u64;
                sum.map(|s| ((s + n / 2) / n) as u8)
            } else {
                canvas.pixel(bx, by)
            };

            for y in by..y1 {
                for x in bx..x1 {
                    canvas.put_pixel(x, y, fill);
                }
            }
        }
    }
}
