//! Rotated, wrapped watermark text.
//!
//! Layout is a heuristic, not real shaping: the rotated bounding box of the
//! whole text is divided by its character count to get an average character
//! width, the text is chunked into lines of as many characters as fit the
//! padded width, and each line is placed by its baseline origin according to
//! the anchor.
//!
//! Angles are given clockwise in degrees (the default `-45` runs the text up
//! and to the right) and sizes in points at [`RENDER_DPI`](crate::text::RENDER_DPI).

use serde::{Deserialize, Serialize};

use super::{default_ten, default_white, require_color, require_non_negative, EffectKind, Insets};
use crate::anchor::{HorizontalAlign, Position, VerticalAlign};
use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{EffectError, Result};
use crate::text::{draw_text, measure, points_to_pixels, TextFont};

const OP: EffectKind = EffectKind::Watermark;

fn default_size() -> f32 {
    24.0
}

fn default_angle() -> f32 {
    -45.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkArgs {
    #[serde(default)]
    pub text: String,
    /// Name the font is registered under.
    #[serde(default)]
    pub font: String,
    #[serde(default = "default_white")]
    pub color: String,
    /// Font size in points.
    #[serde(default = "default_size")]
    pub size: f32,
    /// Clockwise rotation in degrees.
    #[serde(default = "default_angle")]
    pub angle: f32,
    #[serde(default)]
    pub position: Position,
    #[serde(default = "default_ten")]
    pub padding_top: i32,
    #[serde(default = "default_ten")]
    pub padding_right: i32,
    #[serde(default = "default_ten")]
    pub padding_bottom: i32,
    #[serde(default = "default_ten")]
    pub padding_left: i32,
}

impl WatermarkArgs {
    /// `text` in `font` with every other field at its default.
    pub fn new(text: impl Into<String>, font: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: font.into(),
            color: default_white(),
            size: default_size(),
            angle: default_angle(),
            position: Position::default(),
            padding_top: default_ten(),
            padding_right: default_ten(),
            padding_bottom: default_ten(),
            padding_left: default_ten(),
        }
    }

    pub fn validate(&self) -> Result<WatermarkSpec> {
        if self.text.is_empty() {
            return Err(EffectError::validation(OP, "text is required"));
        }
        if self.font.trim().is_empty() {
            return Err(EffectError::validation(OP, "font is required"));
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(EffectError::validation(
                OP,
                format!("size must be greater than 0, got {}", self.size),
            ));
        }
        if !self.angle.is_finite() {
            return Err(EffectError::validation(
                OP,
                format!("angle must be a finite number, got {}", self.angle),
            ));
        }

        let color = require_color(OP, "color", &self.color)?;
        let padding = Insets {
            top: require_non_negative(OP, "padding_top", self.padding_top)?,
            right: require_non_negative(OP, "padding_right", self.padding_right)?,
            bottom: require_non_negative(OP, "padding_bottom", self.padding_bottom)?,
            left: require_non_negative(OP, "padding_left", self.padding_left)?,
        };

        let (horizontal, vertical) = self.position.to_anchor(0, 0).alignment().ok_or_else(|| {
            EffectError::validation(
                OP,
                format!("position '{}' is not supported for watermarks", self.position),
            )
        })?;

        Ok(WatermarkSpec {
            text: self.text.clone(),
            font: self.font.clone(),
            color,
            size: self.size,
            angle: self.angle,
            horizontal,
            vertical,
            padding,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub text: String,
    pub font: String,
    pub color: Color,
    /// Points.
    pub size: f32,
    /// Clockwise degrees.
    pub angle: f32,
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub padding: Insets,
}

impl WatermarkSpec {
    /// Counter-clockwise rendering angle.
    pub fn render_angle(&self) -> f32 {
        360.0 - self.angle
    }

    pub fn pixel_size(&self) -> f32 {
        points_to_pixels(self.size)
    }
}

/// A line of text with its baseline origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Estimated width of one character.
    pub char_width: u32,
    pub line_height: u32,
    pub chars_per_line: usize,
    pub lines: Vec<PlacedLine>,
}

/// Split `text` into chunks of at most `chars_per_line` characters.
pub fn wrap_lines(text: &str, chars_per_line: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chars_per_line.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Lay out the watermark text on a canvas of size `(width, height)`.
///
/// Returns no lines when the text has no measurable width at this angle.
pub fn layout_text(font: &dyn TextFont, (width, height): (u32, u32), spec: &WatermarkSpec) -> TextLayout {
    let px = spec.pixel_size();
    let angle = spec.render_angle();
    let pad = spec.padding;

    // Bounding boxes are whole pixels.
    let bbox = measure(font, &spec.text, px, angle);
    let bbox_width = bbox.width().round();
    let bbox_height = bbox.height().round();

    let char_count = spec.text.chars().count().max(1);
    let char_width = (bbox_width / char_count as f32).ceil() as u32;
    let line_height = bbox_height.ceil() as u32;

    if char_width == 0 {
        return TextLayout {
            char_width,
            line_height,
            chars_per_line: 0,
            lines: Vec::new(),
        };
    }

    let available = width as i64 - 2 * pad.left.max(pad.right) as i64;
    let chars_per_line = (available.max(0) / char_width as i64).max(1) as usize;
    let texts = wrap_lines(&spec.text, chars_per_line);

    let (w, h) = (width as f32, height as f32);
    let lh = line_height as f32;
    let line_count = texts.len() as f32;

    // y is a baseline; line i occupies [y - lh, y].
    let first_y = match spec.vertical {
        VerticalAlign::Top => pad.top as f32 + lh,
        VerticalAlign::Middle => h / 2.0 - lh * line_count / 2.0 + lh,
        VerticalAlign::Bottom => h - pad.bottom as f32 - lh * (line_count - 1.0),
    };

    let lines = texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let x = match spec.horizontal {
                HorizontalAlign::Left => pad.left as f32,
                HorizontalAlign::Center => {
                    (w - (char_width as usize * text.chars().count()) as f32) / 2.0
                }
                HorizontalAlign::Right => {
                    let line_width = measure(font, &text, px, angle).width().round();
                    w - line_width - pad.right as f32
                }
            };
            PlacedLine {
                text,
                x,
                y: first_y + lh * i as f32,
            }
        })
        .collect();

    TextLayout {
        char_width,
        line_height,
        chars_per_line,
        lines,
    }
}

/// Draw the watermark text onto `canvas`.
#[tracing::instrument(
    level = "debug",
    skip(canvas, font),
    fields(width = canvas.width(), height = canvas.height())
)]
pub fn watermark(canvas: Canvas, font: &dyn TextFont, spec: &WatermarkSpec) -> Result<Canvas> {
    let layout = layout_text(font, canvas.dimensions(), spec);
    tracing::debug!(
        char_width = layout.char_width,
        line_height = layout.line_height,
        chars_per_line = layout.chars_per_line,
        lines = layout.lines.len(),
        "watermark layout"
    );

    let mut out = canvas;
    let (px, angle) = (spec.pixel_size(), spec.render_angle());
    for line in &layout.lines {
        draw_text(&mut out, font, &line.text, px, angle, (line.x, line.y), spec.color);
    }
    Ok(out)
}
