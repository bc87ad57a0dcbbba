//! Stamp image pipeline: bitmaps, tinting, scaling and the image cache

mod bitmap;
mod cache;
mod color;
mod request;
mod scale;
mod tint;

pub use bitmap::{Bitmap, BitmapId};
pub use cache::{CacheKey, CacheStats, DEFAULT_CACHE_CAPACITY, ImageCache};
pub use color::{Color, DEFAULT_COLOR};
pub use request::RenderRequest;
pub use scale::{ResizeFilter, scale};
pub use tint::{DEFAULT_TINT_THRESHOLD, TintEngine};
