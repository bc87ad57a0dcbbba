//! Immutable RGBA pixel buffers with a process-unique identity

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::error::{Result, StampError};

static NEXT_BITMAP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a bitmap, used to key cached derivatives of it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitmapId(u64);

impl BitmapId {
    fn next() -> Self {
        Self(NEXT_BITMAP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// RGBA8 stamp image.
///
/// A bitmap never changes after construction. Every derived image
/// (scaled, tinted) is a new allocation with a new [`BitmapId`], so the id
/// is enough to tell two sources apart in the cache.
pub struct Bitmap {
    id: BitmapId,
    image: RgbaImage,
}

impl Bitmap {
    /// Wrap an already decoded RGBA image
    #[must_use]
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        Self {
            id: BitmapId::next(),
            image,
        }
    }

    /// Build a bitmap from a raw interleaved buffer.
    ///
    /// `channels` is 4 for RGBA or 3 for RGB. Pixels without an alpha
    /// channel are treated as fully opaque.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * channels as usize;
        let actual = data.len();
        let size_error = || StampError::BufferSize {
            width,
            height,
            channels,
            actual,
        };

        if !matches!(channels, 3 | 4) || actual != expected {
            return Err(size_error());
        }

        let image: RgbaImage = if channels == 4 {
            ImageBuffer::from_raw(width, height, data).ok_or_else(size_error)?
        } else {
            let rgba: Vec<u8> = data
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
                .collect();
            ImageBuffer::from_raw(width, height, rgba).ok_or_else(size_error)?
        };

        Ok(Self::from_rgba_image(image))
    }

    /// Build a bitmap from a list of RGBA pixels in row-major order
    pub fn from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> Result<Self> {
        let data = pixels.iter().flatten().copied().collect();
        Self::from_raw(width, height, 4, data)
    }

    /// Decode an encoded stamp image (PNG, JPEG, ...) and convert it to RGBA
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::from_rgba_image(decoded.to_rgba8()))
    }

    /// Write the bitmap to disk; the format follows the file extension
    pub fn save(&self, path: &Path) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> BitmapId {
        self.id
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// RGBA value at (x, y). Panics when out of bounds, like indexing.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Iterate over pixels in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.image.pixels().map(|p: &Rgba<u8>| p.0)
    }

    /// Raw interleaved RGBA bytes
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[must_use]
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}
