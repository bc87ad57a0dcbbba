//! Stamp placements stored in viewport-relative coordinates

use std::sync::Arc;

use super::geometry::{Point, Rect, RelativeRect, Size};
use super::tracker::{ToAbsolute, ToRelative};
use crate::error::{Result, StampError};
use crate::stamp::{Bitmap, Color, RenderRequest};

/// Width in pixels a dropped stamp gets before the user resizes it
pub const DEFAULT_STAMP_WIDTH: f64 = 100.0;

/// One stamp instance placed on a page.
///
/// Geometry is kept only as fractions of the viewport. Whenever an
/// absolute rectangle is needed it is derived from the viewport size
/// passed in at that moment.
#[derive(Clone, Debug)]
pub struct StampPlacement {
    /// Page the stamp sits on (0-indexed)
    pub page: usize,
    stamp: Arc<Bitmap>,
    rect: RelativeRect,
    color: Option<Color>,
}

impl StampPlacement {
    /// Create a placement; components are clamped into [0.0, 1.0]
    #[must_use]
    pub fn new(page: usize, stamp: Arc<Bitmap>, rect: RelativeRect) -> Self {
        Self {
            page,
            stamp,
            rect: rect.clamped(),
            color: None,
        }
    }

    /// Place `stamp` centered on a drop point.
    ///
    /// The stamp gets `width` pixels and the height that keeps the stamp
    /// image's aspect ratio, both converted with the viewport size at drop
    /// time. A stamp larger than the viewport is scaled down to fit.
    pub fn dropped_at(
        page: usize,
        stamp: Arc<Bitmap>,
        drop: Point,
        width: f64,
        viewport: Size,
    ) -> Result<Self> {
        let (stamp_w, stamp_h) = stamp.dimensions();
        if stamp_w == 0 || stamp_h == 0 {
            return Err(StampError::InvalidDimension {
                width: stamp_w,
                height: stamp_h,
            });
        }

        let height = width * f64::from(stamp_h) / f64::from(stamp_w);
        // Oversized stamps shrink to fit with their aspect ratio intact.
        let fit = (viewport.width / width).min(viewport.height / height).min(1.0);
        let (width, height) = if fit > 0.0 {
            (width * fit, height * fit)
        } else {
            (width, height)
        };
        let rect = Rect::new(drop.x - width / 2.0, drop.y - height / 2.0, width, height);
        let relative = rect.to_relative(viewport)?;

        Ok(Self::new(page, stamp, relative.kept_inside()))
    }

    #[must_use]
    pub fn stamp(&self) -> &Arc<Bitmap> {
        &self.stamp
    }

    #[must_use]
    pub fn relative_rect(&self) -> RelativeRect {
        self.rect
    }

    pub fn set_relative_rect(&mut self, rect: RelativeRect) {
        self.rect = rect.clamped();
    }

    /// On-screen rectangle for the current viewport size
    pub fn absolute_rect(&self, viewport: Size) -> Result<Rect> {
        self.rect.to_absolute(viewport)
    }

    /// Store a new on-screen rectangle, converted with `viewport`
    pub fn set_absolute_rect(&mut self, rect: Rect, viewport: Size) -> Result<()> {
        self.rect = rect.to_relative(viewport)?.clamped();
        Ok(())
    }

    #[must_use]
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Set the tint color. Returns true when it actually changed.
    pub fn set_color(&mut self, color: Color) -> bool {
        let changed = self.color != Some(color);
        self.color = Some(color);
        changed
    }

    /// Drop the tint so the stamp renders unmodified. Returns true when a
    /// color was set before.
    pub fn reset_color(&mut self) -> bool {
        self.color.take().is_some()
    }

    /// Image request for drawing this placement into `viewport`
    pub fn render_request(&self, viewport: Size) -> Result<RenderRequest> {
        let (width, height) = self.absolute_rect(viewport)?.pixel_size();
        Ok(RenderRequest::new(
            Arc::clone(&self.stamp),
            width,
            height,
            self.color,
        ))
    }
}
