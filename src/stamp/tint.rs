//! Recoloring of dark stamp content
//!
//! Tinting is a binary per-pixel rule: opaque near-black pixels take the
//! tint color, everything else is left as it was. Light backgrounds and
//! colored artwork therefore survive a tint untouched.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use super::bitmap::Bitmap;
use super::color::Color;

/// Channel value below which a pixel counts as "near-black" (out of 255)
pub const DEFAULT_TINT_THRESHOLD: u8 = 30;

/// Stateless tinting engine. Safe to share across threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TintEngine {
    threshold: u8,
}

impl Default for TintEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TINT_THRESHOLD)
    }
}

impl TintEngine {
    #[must_use]
    pub const fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Whether every color channel is below the threshold
    #[inline]
    #[must_use]
    pub fn is_near_black(&self, [r, g, b, _]: [u8; 4]) -> bool {
        r < self.threshold && g < self.threshold && b < self.threshold
    }

    /// Tint a single RGBA pixel
    #[inline]
    #[must_use]
    pub fn tint_pixel(&self, pixel: [u8; 4], color: Color) -> [u8; 4] {
        let alpha = pixel[3];
        if alpha == 0 {
            [0, 0, 0, 0]
        } else if self.is_near_black(pixel) {
            [color.r, color.g, color.b, alpha]
        } else {
            pixel
        }
    }

    /// Tint `source`, returning a new bitmap.
    ///
    /// Without a color the source itself is returned.
    #[must_use]
    pub fn tint(&self, source: &Arc<Bitmap>, color: Option<Color>) -> Arc<Bitmap> {
        match color {
            None => Arc::clone(source),
            Some(color) => Arc::new(self.tint_with(source, color)),
        }
    }

    /// Tint `source` with `color` into a freshly allocated bitmap
    #[must_use]
    pub fn tint_with(&self, source: &Bitmap, color: Color) -> Bitmap {
        let (width, height) = source.dimensions();
        let out = RgbaImage::from_fn(width, height, |x, y| {
            Rgba(self.tint_pixel(source.pixel(x, y), color))
        });
        Bitmap::from_rgba_image(out)
    }
}
