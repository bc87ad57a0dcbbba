//! Viewport-relative stamp placement

mod annotations;
mod geometry;
mod placement;
mod tracker;

pub use annotations::{
    Annotations, EditLimits, HANDLE_SIZE, HistoryChange, MIN_STAMP_SIZE, PlacementId, ResizeHandle,
};
pub use geometry::{Point, Rect, RelativePoint, RelativeRect, Size};
pub use placement::{DEFAULT_STAMP_WIDTH, StampPlacement};
pub use tracker::{ToAbsolute, ToRelative, on_resize, to_absolute, to_relative};
