//! imagefx Core - Raster image effects
//!
//! This crate provides the pixel work behind image derivatives: aligned
//! resizing, borders, padding, rounded corners, overlays, filters and
//! rotated watermark text, plus a [`Pipeline`] that chains them from a JSON
//! configuration.
//!
//! Decoding and encoding stay with the host: effects consume and produce an
//! owned [`Canvas`] of RGBA pixels.
//!
//! ```ignore
//! use imagefx_core::{Canvas, Pipeline, ResourceRegistry};
//!
//! let pipeline = Pipeline::from_json(r#"{"effects": [
//!     {"effect": "resize", "width": 200, "height": 200},
//!     {"effect": "corner", "radius": 16}
//! ]}"#)?;
//! let thumbnail = pipeline.run(canvas, &ResourceRegistry::new())?;
//! ```

pub mod anchor;
pub mod canvas;
pub mod color;
pub mod effects;
pub mod error;
pub mod pipeline;
pub mod resources;
pub mod rng;
pub mod text;

pub use anchor::{Anchor, HorizontalAlign, Position, VerticalAlign};
pub use canvas::{Canvas, CanvasError, ColorSet, PixelFormat};
pub use color::{Color, ColorError};
pub use effects::EffectKind;
pub use error::{EffectError, FailureKind, Result};
pub use pipeline::{Effect, Operation, Pipeline, PipelineConfig};
pub use resources::{ResourceProvider, ResourceRegistry};
pub use rng::SimpleRng;
pub use text::{FontHandle, LineMetrics, TextFont};
