//! Conversion between viewport pixels and viewport fractions
//!
//! Placements store only relative geometry. Absolute rectangles are derived
//! on demand from the viewport size current at that moment, so nothing has
//! to be rewritten when the viewport resizes.

use log::{debug, warn};

use super::geometry::{Point, Rect, RelativePoint, RelativeRect, Size};
use super::placement::StampPlacement;
use crate::error::{Result, StampError};

/// Geometry that can be expressed as a fraction of a viewport
pub trait ToRelative {
    type Output;

    fn to_relative(self, viewport: Size) -> Result<Self::Output>;
}

/// Relative geometry that can be resolved against a viewport
pub trait ToAbsolute {
    type Output;

    fn to_absolute(self, viewport: Size) -> Result<Self::Output>;
}

fn check_viewport(viewport: Size) -> Result<()> {
    if viewport.is_degenerate() {
        warn!(
            "Refusing to map coordinates against degenerate viewport {}x{}",
            viewport.width, viewport.height
        );
        return Err(StampError::DegenerateViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }
    Ok(())
}

impl ToRelative for Point {
    type Output = RelativePoint;

    fn to_relative(self, viewport: Size) -> Result<RelativePoint> {
        check_viewport(viewport)?;
        Ok(RelativePoint::new(
            self.x / viewport.width,
            self.y / viewport.height,
        ))
    }
}

impl ToRelative for Rect {
    type Output = RelativeRect;

    fn to_relative(self, viewport: Size) -> Result<RelativeRect> {
        check_viewport(viewport)?;
        Ok(RelativeRect::new(
            self.x / viewport.width,
            self.y / viewport.height,
            self.width / viewport.width,
            self.height / viewport.height,
        ))
    }
}

impl ToAbsolute for RelativePoint {
    type Output = Point;

    fn to_absolute(self, viewport: Size) -> Result<Point> {
        check_viewport(viewport)?;
        Ok(Point::new(self.x * viewport.width, self.y * viewport.height))
    }
}

impl ToAbsolute for RelativeRect {
    type Output = Rect;

    fn to_absolute(self, viewport: Size) -> Result<Rect> {
        check_viewport(viewport)?;
        Ok(Rect::new(
            self.x * viewport.width,
            self.y * viewport.height,
            self.width * viewport.width,
            self.height * viewport.height,
        ))
    }
}

/// Express a point or rectangle as viewport fractions
pub fn to_relative<T: ToRelative>(value: T, viewport: Size) -> Result<T::Output> {
    value.to_relative(viewport)
}

/// Resolve a relative point or rectangle against the current viewport
pub fn to_absolute<T: ToAbsolute>(value: T, viewport: Size) -> Result<T::Output> {
    value.to_absolute(viewport)
}

/// Handle a viewport resize.
///
/// Placements are only borrowed: their relative geometry stays as it is.
/// The returned rectangles are the placements' absolute positions for the
/// new size, in the same order.
pub fn on_resize<'a>(
    old: Size,
    new: Size,
    placements: impl IntoIterator<Item = &'a StampPlacement>,
) -> Result<Vec<Rect>> {
    let rects = placements
        .into_iter()
        .map(|placement| placement.absolute_rect(new))
        .collect::<Result<Vec<_>>>()?;
    debug!(
        "Viewport resized from {}x{} to {}x{} ({} placements)",
        old.width,
        old.height,
        new.width,
        new.height,
        rects.len()
    );
    Ok(rects)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx(a: Rect, b: Rect) -> bool {
        (a.x - b.x).abs() < EPS
            && (a.y - b.y).abs() < EPS
            && (a.width - b.width).abs() < EPS
            && (a.height - b.height).abs() < EPS
    }

    #[test]
    fn rect_round_trip() {
        let sizes = [
            Size::new(800.0, 600.0),
            Size::new(1.0, 1.0),
            Size::new(1366.0, 17.5),
            Size::new(0.25, 4096.0),
        ];
        let rects = [
            Rect::new(0.0, 0.0, 0.0, 0.0),
            Rect::new(12.5, 7.25, 100.0, 33.3),
            Rect::new(799.0, 599.0, 1.0, 1.0),
            Rect::new(-5.0, 2000.0, 3.0, 9.0),
        ];
        for size in sizes {
            for rect in rects {
                let back = to_absolute(to_relative(rect, size).unwrap(), size).unwrap();
                assert!(approx(back, rect), "{rect:?} at {size:?} came back as {back:?}");
            }
        }
    }

    #[test]
    fn point_round_trip() {
        let size = Size::new(1024.0, 768.0);
        let p = Point::new(333.3, 12.0);
        let back = to_absolute(to_relative(p, size).unwrap(), size).unwrap();
        assert!((back.x - p.x).abs() < EPS && (back.y - p.y).abs() < EPS);
    }

    #[test]
    fn degenerate_viewport_is_rejected_both_ways() {
        for size in [
            Size::new(0.0, 600.0),
            Size::new(800.0, 0.0),
            Size::new(-1.0, 600.0),
        ] {
            assert!(matches!(
                to_relative(Point::new(1.0, 1.0), size),
                Err(StampError::DegenerateViewport { .. })
            ));
            assert!(matches!(
                to_absolute(RelativeRect::new(0.1, 0.1, 0.1, 0.1), size),
                Err(StampError::DegenerateViewport { .. })
            ));
        }
    }

    #[test]
    fn width_and_height_scale_independently() {
        let rel = RelativeRect::new(0.25, 0.25, 0.5, 0.5);
        let wide = to_absolute(rel, Size::new(1000.0, 100.0)).unwrap();
        let tall = to_absolute(rel, Size::new(100.0, 1000.0)).unwrap();
        assert_eq!(wide, Rect::new(250.0, 25.0, 500.0, 50.0));
        assert_eq!(tall, Rect::new(25.0, 250.0, 50.0, 500.0));
    }
}
