//! Named overlay bitmaps and fonts.
//!
//! Effects refer to overlays and fonts by name. The host decides where those
//! names come from (files shipped with a theme, uploads, a CDN) and hands the
//! decoded data over through a [`ResourceProvider`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::canvas::Canvas;
use crate::error::{EffectError, Result};
use crate::text::{FontHandle, TextFont};

/// Resolves overlay and font names for the pipeline.
pub trait ResourceProvider {
    /// The overlay bitmap registered under `name`.
    fn overlay(&self, name: &str) -> Result<Canvas>;

    /// The font registered under `name`.
    fn font(&self, name: &str) -> Result<Arc<dyn TextFont>>;
}

/// In-memory [`ResourceProvider`].
#[derive(Default, Clone)]
pub struct ResourceRegistry {
    overlays: HashMap<String, Canvas>,
    fonts: HashMap<String, Arc<dyn TextFont>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoded overlay bitmap, replacing any previous one.
    pub fn add_overlay(&mut self, name: impl Into<String>, overlay: Canvas) -> &mut Self {
        self.overlays.insert(name.into(), overlay);
        self
    }

    pub fn add_font(&mut self, name: impl Into<String>, font: Arc<dyn TextFont>) -> &mut Self {
        self.fonts.insert(name.into(), font);
        self
    }

    /// Parse TrueType/OpenType bytes and register the font.
    ///
    /// # Errors
    ///
    /// `Resource` when the bytes are not a usable font.
    pub fn load_font(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<&mut Self> {
        let name = name.into();
        let handle = FontHandle::from_bytes(name.clone(), bytes)?;
        tracing::debug!(font = %name, "font registered");
        Ok(self.add_font(name, Arc::new(handle)))
    }

    pub fn overlay_names(&self) -> impl Iterator<Item = &str> {
        self.overlays.keys().map(String::as_str)
    }

    pub fn font_names(&self) -> impl Iterator<Item = &str> {
        self.fonts.keys().map(String::as_str)
    }
}

impl ResourceProvider for ResourceRegistry {
    fn overlay(&self, name: &str) -> Result<Canvas> {
        self.overlays
            .get(name)
            .cloned()
            .ok_or_else(|| EffectError::resource(name, "no overlay registered under this name"))
    }

    fn font(&self, name: &str) -> Result<Arc<dyn TextFont>> {
        self.fonts
            .get(name)
            .cloned()
            .ok_or_else(|| EffectError::resource(name, "no font registered under this name"))
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut overlays: Vec<_> = self.overlay_names().collect();
        let mut fonts: Vec<_> = self.font_names().collect();
        overlays.sort_unstable();
        fonts.sort_unstable();
        f.debug_struct("ResourceRegistry")
            .field("overlays", &overlays)
            .field("fonts", &fonts)
            .finish()
    }
}
