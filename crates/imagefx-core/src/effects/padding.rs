//! Padding: like a border, but the original is letterboxed into the interior
//! so none of it is cropped.

use serde::{Deserialize, Serialize};

use super::resize::{resize, ResizeSpec};
use super::{default_ten, default_white, require_color, require_non_negative, EffectKind, Insets};
use crate::anchor::Anchor;
use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{EffectError, Result};

const OP: EffectKind = EffectKind::Padding;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddingArgs {
    #[serde(default = "default_ten")]
    pub padding_top: i32,
    #[serde(default = "default_ten")]
    pub padding_right: i32,
    #[serde(default = "default_ten")]
    pub padding_bottom: i32,
    #[serde(default = "default_ten")]
    pub padding_left: i32,
    #[serde(default = "default_white")]
    pub bg_color: String,
}

impl Default for PaddingArgs {
    fn default() -> Self {
        Self {
            padding_top: default_ten(),
            padding_right: default_ten(),
            padding_bottom: default_ten(),
            padding_left: default_ten(),
            bg_color: default_white(),
        }
    }
}

impl PaddingArgs {
    pub fn validate(&self) -> Result<PaddingSpec> {
        Ok(PaddingSpec {
            background: require_color(OP, "bg_color", &self.bg_color)?,
            padding: Insets {
                top: require_non_negative(OP, "padding_top", self.padding_top)?,
                right: require_non_negative(OP, "padding_right", self.padding_right)?,
                bottom: require_non_negative(OP, "padding_bottom", self.padding_bottom)?,
                left: require_non_negative(OP, "padding_left", self.padding_left)?,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddingSpec {
    pub background: Color,
    pub padding: Insets,
}

/// Pad `canvas` with the background colour, keeping its dimensions.
///
/// # Errors
///
/// `Geometry` when the padding leaves no interior.
#[tracing::instrument(
    level = "debug",
    skip(canvas),
    fields(width = canvas.width(), height = canvas.height())
)]
pub fn add_padding(canvas: Canvas, spec: &PaddingSpec) -> Result<Canvas> {
    let p = spec.padding;
    let (inner_w, inner_h) = p.interior(canvas.dimensions()).ok_or_else(|| {
        EffectError::geometry(
            OP,
            format!(
                "padding {}/{}/{}/{} leaves no interior in a {}x{} image",
                p.top,
                p.right,
                p.bottom,
                p.left,
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
            blank_margin: true,
            margin_color: spec.background,
            anchor: Anchor::MiddleCenter,
        },
    )?;

    let mut out = Canvas::filled(width, height, spec.background)
        .map_err(|e| EffectError::geometry(OP, e.to_string()))?;
    out.set_format(format);
    out.copy_from(&inner, p.left as i64, p.top as i64);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelFormat;
    use crate::effects::testing::{rgb_at, solid};

    #[test]
    fn test_defaults() {
        let args: PaddingArgs = serde_json::from_str("{}").unwrap();
        assert_eq!(args, PaddingArgs::default());
        let spec = args.validate().unwrap();
        assert_eq!(spec.background, Color::WHITE);
        assert_eq!(spec.padding.top, 10);
    }

    #[test]
    fn test_zero_padding_allowed_negative_rejected() {
        let args = PaddingArgs {
            padding_left: 0,
            ..PaddingArgs::default()
        };
        assert_eq!(args.validate().unwrap().padding.left, 0);

        let args = PaddingArgs {
            padding_bottom: -1,
            ..PaddingArgs::default()
        };
        assert!(matches!(
            args.validate(),
            Err(EffectError::Validation {
                operation: EffectKind::Padding,
                ..
            })
        ));
    }

    #[test]
    fn test_red_image_with_default_padding() {
        // 180x80 interior; 200x100 letterboxes to 160x80 at (10 + 10, 10)
        let src = solid(200, 100, "#FF0000");
        let spec = PaddingArgs::default().validate().unwrap();
        let out = add_padding(src, &spec).unwrap();

        assert_eq!(out.dimensions(), (200, 100));
        assert_eq!(rgb_at(&out, 5, 50), [255, 255, 255]);
        assert_eq!(rgb_at(&out, 15, 50), [255, 255, 255]);
        assert_eq!(rgb_at(&out, 19, 50), [255, 255, 255]);
        assert_eq!(rgb_at(&out, 20, 50), [255, 0, 0]);
        assert_eq!(rgb_at(&out, 100, 50), [255, 0, 0]);
        assert_eq!(rgb_at(&out, 179, 50), [255, 0, 0]);
        assert_eq!(rgb_at(&out, 180, 50), [255, 255, 255]);
        assert_eq!(rgb_at(&out, 100, 5), [255, 255, 255]);
        assert_eq!(rgb_at(&out, 100, 95), [255, 255, 255]);
    }

    #[test]
    fn test_zero_padding_is_identity_for_same_size() {
        let src = solid(30, 20, "#336699");
        let spec = PaddingSpec {
            background: Color::BLACK,
            padding: Insets::default(),
        };
        let out = add_padding(src.clone(), &spec).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn test_padding_too_large() {
        let spec = PaddingSpec {
            background: Color::WHITE,
            padding: Insets {
                top: 0,
                right: 0,
                bottom: 25,
                left: 0,
            },
        };
        let err = add_padding(solid(40, 25, "#000000"), &spec).unwrap_err();
        assert!(matches!(err, EffectError::Geometry { .. }));
    }

    #[test]
    fn test_keeps_alpha_format() {
        // Default 10px padding leaves a 20x20 interior
        let src = solid(40, 40, "#00FF00").with_alpha();
        let out = add_padding(src, &PaddingArgs::default().validate().unwrap()).unwrap();
        assert_eq!(out.format(), PixelFormat::Rgba);
        assert_eq!(out.dimensions(), (40, 40));
        assert_eq!(rgb_at(&out, 20, 20), [0, 255, 0]);
        assert_eq!(out.pixel(5, 5), [255, 255, 255, 255]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: output dimensions equal input dimensions whenever an
        /// interior remains.
        #[test]
        fn prop_padding_keeps_size(
            width in 1u32..=64,
            height in 1u32..=64,
            top in 0u32..=8,
            right in 0u32..=8,
            bottom in 0u32..=8,
            left in 0u32..=8,
        ) {
            prop_assume!(left + right < width && top + bottom < height);
            let canvas = Canvas::filled(width, height, Color::rgb(200, 10, 10)).unwrap();
            let spec = PaddingSpec {
                background: Color::WHITE,
                padding: Insets { top, right, bottom, left },
            };
            let out = add_padding(canvas, &spec).unwrap();
            prop_assert_eq!(out.dimensions(), (width, height));
        }
    }
}
