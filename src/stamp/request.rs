//! Render request passed from the caller through the cache to the tint engine

use std::sync::Arc;

use super::bitmap::Bitmap;
use super::cache::CacheKey;
use super::color::Color;

/// Everything needed to produce one on-screen stamp image.
///
/// The tint color travels inside the request; no component keeps its own
/// notion of the "current" color.
#[derive(Clone, Debug)]
pub struct RenderRequest {
    /// Unscaled, untinted stamp image
    pub source: Arc<Bitmap>,
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Tint color, `None` renders the stamp unmodified
    pub color: Option<Color>,
}

impl RenderRequest {
    #[must_use]
    pub fn new(source: Arc<Bitmap>, width: u32, height: u32, color: Option<Color>) -> Self {
        Self {
            source,
            width,
            height,
            color,
        }
    }

    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            source: self.source.id(),
            width: self.width,
            height: self.height,
            color: self.color,
        }
    }
}
