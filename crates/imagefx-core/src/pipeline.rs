//! Ordered effect chains.
//!
//! A [`Pipeline`] is built from a list of [`Effect`]s (the host
//! configuration, usually JSON), validates every one of them up front, and
//! then runs them in order over a canvas:
//!
//! ```json
//! {
//!   "seed": 42,
//!   "effects": [
//!     { "effect": "resize", "width": 320, "height": 240, "position": "top_center" },
//!     { "effect": "corner", "radius": 12 },
//!     { "effect": "watermark", "text": "(c) imagefx", "font": "sans" }
//!   ]
//! }
//! ```
//!
//! The seed drives the rounded-corner key colour search, so a pipeline with a
//! fixed seed is fully reproducible.

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::effects::{
    add_border, add_padding, apply_filter, overlay, resize, round_corners, watermark, BorderArgs,
    BorderSpec, CornerArgs, CornerSpec, EffectKind, FilterArgs, FilterSpec, OverlayArgs,
    OverlaySpec, PaddingArgs, PaddingSpec, ResizeArgs, ResizeSpec, WatermarkArgs, WatermarkSpec,
};
use crate::error::Result;
use crate::resources::ResourceProvider;
use crate::rng::SimpleRng;

/// Seed used when the configuration does not name one.
pub const DEFAULT_SEED: u64 = 0x5eed;

/// One configured effect, as it appears in the host configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Resize(ResizeArgs),
    Border(BorderArgs),
    Padding(PaddingArgs),
    Corner(CornerArgs),
    Overlay(OverlayArgs),
    Filter(FilterArgs),
    Watermark(WatermarkArgs),
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Resize(_) => EffectKind::Resize,
            Effect::Border(_) => EffectKind::Border,
            Effect::Padding(_) => EffectKind::Padding,
            Effect::Corner(_) => EffectKind::Corner,
            Effect::Overlay(_) => EffectKind::Overlay,
            Effect::Filter(_) => EffectKind::Filter,
            Effect::Watermark(_) => EffectKind::Watermark,
        }
    }

    /// Check the arguments and resolve the operation to run.
    pub fn validate(&self) -> Result<Operation> {
        Ok(match self {
            Effect::Resize(args) => Operation::Resize(args.validate()?),
            Effect::Border(args) => Operation::Border(args.validate()?),
            Effect::Padding(args) => Operation::Padding(args.validate()?),
            Effect::Corner(args) => Operation::Corner(args.validate()?),
            Effect::Overlay(args) => Operation::Overlay(args.validate()?),
            Effect::Filter(args) => Operation::Filter(args.validate()?),
            Effect::Watermark(args) => Operation::Watermark(args.validate()?),
        })
    }

    /// Size of the image this effect produces from one of `dimensions`.
    ///
    /// Only resize changes the size. Invalid resize arguments leave the
    /// dimensions unchanged; they are reported when the effect is validated.
    pub fn output_dimensions(&self, dimensions: (u32, u32)) -> (u32, u32) {
        match self {
            Effect::Resize(ResizeArgs {
                width: Some(w),
                height: Some(h),
                ..
            }) if *w > 0 && *h > 0 => (*w as u32, *h as u32),
            _ => dimensions,
        }
    }
}

/// A validated effect, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Resize(ResizeSpec),
    Border(BorderSpec),
    Padding(PaddingSpec),
    Corner(CornerSpec),
    Overlay(OverlaySpec),
    Filter(FilterSpec),
    Watermark(WatermarkSpec),
}

impl Operation {
    pub fn kind(&self) -> EffectKind {
        match self {
            Operation::Resize(_) => EffectKind::Resize,
            Operation::Border(_) => EffectKind::Border,
            Operation::Padding(_) => EffectKind::Padding,
            Operation::Corner(_) => EffectKind::Corner,
            Operation::Overlay(_) => EffectKind::Overlay,
            Operation::Filter(_) => EffectKind::Filter,
            Operation::Watermark(_) => EffectKind::Watermark,
        }
    }

    /// Name of the overlay or font this operation needs, if any.
    pub fn resource_name(&self) -> Option<&str> {
        match self {
            Operation::Overlay(spec) => Some(&spec.overlay_name),
            Operation::Watermark(spec) => Some(&spec.font),
            _ => None,
        }
    }

    pub fn output_dimensions(&self, dimensions: (u32, u32)) -> (u32, u32) {
        match self {
            Operation::Resize(spec) => spec.output_dimensions(),
            _ => dimensions,
        }
    }

    /// Run this operation on `canvas`.
    pub fn apply(
        &self,
        canvas: Canvas,
        resources: &dyn ResourceProvider,
        rng: &mut SimpleRng,
    ) -> Result<Canvas> {
        match self {
            Operation::Resize(spec) => resize(canvas, spec),
            Operation::Border(spec) => add_border(canvas, spec),
            Operation::Padding(spec) => add_padding(canvas, spec),
            Operation::Corner(spec) => round_corners(canvas, spec, rng),
            Operation::Overlay(spec) => {
                let image = resources.overlay(&spec.overlay_name)?;
                overlay(canvas, &image, spec)
            }
            Operation::Filter(spec) => apply_filter(canvas, spec),
            Operation::Watermark(spec) => {
                let font = resources.font(&spec.font)?;
                watermark(canvas, font.as_ref(), spec)
            }
        }
    }
}

/// Pipeline document accepted by [`Pipeline::from_json`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub effects: Vec<Effect>,
}

/// A validated, ordered chain of operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    operations: Vec<Operation>,
    seed: u64,
}

impl Pipeline {
    /// Validate `effects` and build a pipeline.
    ///
    /// # Errors
    ///
    /// The first `Validation` failure among the effects.
    pub fn new(effects: Vec<Effect>) -> Result<Self> {
        let operations = effects
            .iter()
            .map(Effect::validate)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            operations,
            seed: DEFAULT_SEED,
        })
    }

    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let pipeline = Self::new(config.effects)?;
        Ok(match config.seed {
            Some(seed) => pipeline.with_seed(seed),
            None => pipeline,
        })
    }

    /// Parse and validate a JSON pipeline document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Size of the image the pipeline produces from one of `dimensions`.
    pub fn output_dimensions(&self, dimensions: (u32, u32)) -> (u32, u32) {
        self.operations
            .iter()
            .fold(dimensions, |dims, op| op.output_dimensions(dims))
    }

    /// Run every operation in order.
    ///
    /// Stops at the first failure, which is logged and returned.
    #[tracing::instrument(
        skip_all,
        fields(
            width = canvas.width(),
            height = canvas.height(),
            operations = self.operations.len()
        )
    )]
    pub fn run(&self, canvas: Canvas, resources: &dyn ResourceProvider) -> Result<Canvas> {
        let mut rng = SimpleRng::new(self.seed);
        let mut canvas = canvas;

        for (index, op) in self.operations.iter().enumerate() {
            let (width, height) = canvas.dimensions();
            canvas = op.apply(canvas, resources, &mut rng).map_err(|err| {
                tracing::error!(
                    operation = %op.kind(),
                    index,
                    width,
                    height,
                    resource = op.resource_name().unwrap_or("-"),
                    error = %err,
                    "effect failed"
                );
                err
            })?;
        }

        tracing::debug!(
            width = canvas.width(),
            height = canvas.height(),
            "pipeline finished"
        );
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::canvas::PixelFormat;
    use crate::color::Color;
    use crate::effects::testing::gradient;
    use crate::effects::{Filter, FilterKind};
    use crate::error::{EffectError, FailureKind};
    use crate::resources::ResourceRegistry;
    use crate::text::testing::BlockFont;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn registry() -> ResourceRegistry {
        let mut frame = Canvas::filled(20, 20, Color::rgba(0, 0, 0, 0)).unwrap();
        frame.fill_rect(0, 0, 20, 2, Color::rgb(255, 0, 0));

        let mut registry = ResourceRegistry::new();
        registry
            .add_overlay("frame", frame)
            .add_font("block", Arc::new(BlockFont));
        registry
    }

    const FULL_PIPELINE: &str = r##"{
        "seed": 7,
        "effects": [
            { "effect": "resize", "width": 120, "height": 80, "position": "top_center" },
            { "effect": "padding", "bg_color": "#000000" },
            { "effect": "border", "border_thick_top": 2, "border_thick_right": 2,
              "border_thick_bottom": 2, "border_thick_left": 2 },
            { "effect": "filter", "filter_name": "brightness", "arg1": 10, "repeat": 2 },
            { "effect": "overlay", "overlay_name": "frame", "bg_offset": 3 },
            { "effect": "watermark", "text": "imagefx", "font": "block", "size": 12 },
            { "effect": "corner", "radius": 8 }
        ]
    }"##;

    #[test]
    fn test_full_pipeline_from_json() {
        init_tracing();
        let pipeline = Pipeline::from_json(FULL_PIPELINE).unwrap();
        assert_eq!(pipeline.seed(), 7);
        assert_eq!(pipeline.operations().len(), 7);
        assert_eq!(pipeline.output_dimensions((400, 300)), (120, 80));

        let out = pipeline.run(gradient(400, 300), &registry()).unwrap();
        assert_eq!(out.dimensions(), (120, 80));
        assert_eq!(out.format(), PixelFormat::Rgba);
        assert_eq!(out.pixel(0, 0)[3], 0);
        assert_eq!(out.pixel(60, 40)[3], 255);
    }

    #[test]
    fn test_same_seed_same_output() {
        let pipeline = Pipeline::from_json(FULL_PIPELINE).unwrap();
        let a = pipeline.run(gradient(64, 64), &registry()).unwrap();
        let b = pipeline.run(gradient(64, 64), &registry()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation_happens_at_construction() {
        let err = Pipeline::new(vec![
            Effect::Corner(CornerArgs::default()),
            Effect::Border(BorderArgs {
                border_thick_top: 0,
                ..BorderArgs::default()
            }),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            EffectError::Validation {
                operation: EffectKind::Border,
                ..
            }
        ));

        let err = Pipeline::new(vec![Effect::Resize(ResizeArgs::new(-1, 10))]).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Validation);
    }

    #[test]
    fn test_bad_documents_rejected() {
        let err = Pipeline::from_json(r#"{"effects": [{"effect": "sharpen"}]}"#).unwrap_err();
        assert!(matches!(err, EffectError::Config(_)));

        let err = Pipeline::from_json("[1, 2").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Validation);

        let err = Pipeline::from_json(r#"{"effects": [{"effect": "resize", "width": 10}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("height is required"), "{}", err);
    }

    #[test]
    fn test_missing_resource_fails_run() {
        init_tracing();
        let pipeline = Pipeline::new(vec![
            Effect::Filter(FilterArgs::new(FilterKind::Negate)),
            Effect::Overlay(OverlayArgs {
                overlay_name: "nope".into(),
                ..OverlayArgs::default()
            }),
        ])
        .unwrap();
        let err = pipeline.run(gradient(10, 10), &registry()).unwrap_err();
        assert!(matches!(err, EffectError::Resource { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_geometry_failure_propagates() {
        let pipeline = Pipeline::new(vec![
            Effect::Resize(ResizeArgs::new(10, 10)),
            Effect::Padding(PaddingArgs::default()),
        ])
        .unwrap();
        let err = pipeline.run(gradient(50, 50), &registry()).unwrap_err();
        assert!(matches!(
            err,
            EffectError::Geometry {
                operation: EffectKind::Padding,
                ..
            }
        ));
    }

    #[test]
    fn test_effect_serde() {
        let effect: Effect =
            serde_json::from_str(r#"{"effect": "filter", "filter_name": 11, "arg1": 4}"#).unwrap();
        assert_eq!(effect.kind(), EffectKind::Filter);
        match effect.validate().unwrap() {
            Operation::Filter(spec) => assert_eq!(
                spec.filter,
                Filter::Pixelate {
                    block_size: 4,
                    average: false
                }
            ),
            other => panic!("unexpected operation {:?}", other),
        }

        let json = serde_json::to_string(&Effect::Corner(CornerArgs { radius: 3 })).unwrap();
        assert_eq!(json, r#"{"effect":"corner","radius":3}"#);
    }

    #[test]
    fn test_output_dimensions() {
        assert_eq!(
            Effect::Resize(ResizeArgs::new(30, 20)).output_dimensions((100, 100)),
            (30, 20)
        );
        assert_eq!(
            Effect::Resize(ResizeArgs::new(0, 20)).output_dimensions((100, 100)),
            (100, 100)
        );
        assert_eq!(
            Effect::Border(BorderArgs::default()).output_dimensions((64, 48)),
            (64, 48)
        );

        let pipeline = Pipeline::new(vec![
            Effect::Resize(ResizeArgs::new(30, 20)),
            Effect::Corner(CornerArgs::default()),
            Effect::Resize(ResizeArgs::new(8, 9)),
        ])
        .unwrap();
        assert_eq!(pipeline.output_dimensions((1, 1)), (8, 9));
        assert_eq!(pipeline.seed(), DEFAULT_SEED);
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = Pipeline::from_json("{}").unwrap();
        let src = gradient(9, 7);
        assert_eq!(pipeline.run(src.clone(), &ResourceRegistry::new()).unwrap(), src);
    }
}
