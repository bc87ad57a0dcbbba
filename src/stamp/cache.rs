//! Memoization of scaled and tinted stamp images

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use lru::LruCache;

use super::bitmap::{Bitmap, BitmapId};
use super::color::Color;
use super::request::RenderRequest;
use super::scale::{ResizeFilter, scale};
use super::tint::TintEngine;
use crate::error::{Result, StampError};

/// Default number of cached stamp images
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Cache key for rendered stamps
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Identity of the unscaled source bitmap
    pub source: BitmapId,
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Tint color, `None` for the untinted image
    pub color: Option<Color>,
}

/// Hit/miss counters since construction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Cache of scaled, tinted stamp images.
///
/// Owned by a document session; `clear()` must be called when a stamp's
/// color changes or is reset and when the document closes or reloads.
/// Results are immutable and shared, so callers get an `Arc` and must not
/// expect a private copy.
pub struct ImageCache {
    entries: Mutex<LruCache<CacheKey, Arc<Bitmap>>>,
    engine: TintEngine,
    filter: ResizeFilter,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, TintEngine::default(), ResizeFilter::default())
    }
}

impl ImageCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize, engine: TintEngine, filter: ResizeFilter) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            engine,
            filter,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Scale `source` to `width` x `height`, then tint it with `color`.
    pub fn get_scaled_tinted_image(
        &self,
        source: &Arc<Bitmap>,
        width: u32,
        height: u32,
        color: Option<Color>,
    ) -> Result<Arc<Bitmap>> {
        self.render(&RenderRequest::new(Arc::clone(source), width, height, color))
    }

    /// Produce the image for `request`, reusing a cached result when present
    pub fn render(&self, request: &RenderRequest) -> Result<Arc<Bitmap>> {
        if request.width == 0 || request.height == 0 {
            return Err(StampError::InvalidDimension {
                width: request.width,
                height: request.height,
            });
        }

        let key = request.cache_key();
        if let Some(hit) = self.lock().get(&key).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Stamp cache hit for {key:?}");
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Stamp cache miss for {key:?}");

        // Scale first so the threshold sees final-resolution pixels.
        let scaled = scale(&request.source, request.width, request.height, self.filter)?;
        let tinted = self.engine.tint(&scaled, request.color);

        let mut entries = self.lock();
        if let Some(existing) = entries.get(&key) {
            // Another thread finished the same request first.
            return Ok(Arc::clone(existing));
        }
        entries.put(key, Arc::clone(&tinted));
        Ok(tinted)
    }

    /// Evict every cached image
    pub fn clear(&self) {
        let mut entries = self.lock();
        debug!("Clearing stamp cache ({} entries)", entries.len());
        entries.clear();
    }

    /// Evict every cached derivative of one source bitmap
    pub fn invalidate_source(&self, source: BitmapId) {
        let mut entries = self.lock();
        let keys_to_remove: Vec<_> = entries
            .iter()
            .filter(|(k, _)| k.source == source)
            .map(|(k, _)| k.clone())
            .collect();

        for key in keys_to_remove {
            entries.pop(&key);
        }
    }

    /// Check if a key is in the cache without promoting it
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn engine(&self) -> TintEngine {
        self.engine
    }

    #[must_use]
    pub fn filter(&self) -> ResizeFilter {
        self.filter
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Arc<Bitmap>>> {
        // Entries are immutable Arcs; a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
