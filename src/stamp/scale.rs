//! Resampling of stamp bitmaps to their on-screen size

use std::num::NonZeroU32;
use std::sync::Arc;

use fast_image_resize as fir;
use image::RgbaImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::bitmap::Bitmap;
use crate::error::{Result, StampError};

/// Resampling filter used when a stamp is scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    #[default]
    Lanczos3,
}

impl ResizeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeFilter::Nearest => "nearest",
            ResizeFilter::Bilinear => "bilinear",
            ResizeFilter::CatmullRom => "catmull_rom",
            ResizeFilter::Lanczos3 => "lanczos3",
        }
    }

    fn resize_alg(self) -> fir::ResizeAlg {
        match self {
            ResizeFilter::Nearest => fir::ResizeAlg::Nearest,
            ResizeFilter::Bilinear => fir::ResizeAlg::Convolution(fir::FilterType::Bilinear),
            ResizeFilter::CatmullRom => fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom),
            ResizeFilter::Lanczos3 => fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3),
        }
    }

    fn image_filter(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Scale `source` to exactly `width` x `height`.
///
/// A request for the source's own size returns the source. Resampling runs
/// on premultiplied alpha; fully transparent output pixels are (0,0,0,0).
pub fn scale(
    source: &Arc<Bitmap>,
    width: u32,
    height: u32,
    filter: ResizeFilter,
) -> Result<Arc<Bitmap>> {
    if width == 0 || height == 0 {
        return Err(StampError::InvalidDimension { width, height });
    }

    let (src_width, src_height) = source.dimensions();
    if src_width == 0 || src_height == 0 {
        return Err(StampError::InvalidDimension {
            width: src_width,
            height: src_height,
        });
    }

    if (src_width, src_height) == (width, height) {
        return Ok(Arc::clone(source));
    }

    debug!(
        "Scaling {:?} from {src_width}x{src_height} to {width}x{height} ({})",
        source.id(),
        filter.as_str()
    );

    let scaled = match resize_fast(source, width, height, filter) {
        Ok(image) => image,
        Err(e) => {
            warn!("Fast resize failed for {:?}: {e}, falling back to slow resize", source.id());
            image::imageops::resize(source.as_image(), width, height, filter.image_filter())
        }
    };

    Ok(Arc::new(Bitmap::from_rgba_image(scaled)))
}

fn resize_fast(source: &Bitmap, width: u32, height: u32, filter: ResizeFilter) -> Result<RgbaImage> {
    let nz = |v: u32, what: &str| {
        NonZeroU32::new(v).ok_or_else(|| StampError::resize(format!("invalid {what}")))
    };

    let mut src_buf = source.as_raw().to_vec();
    premultiply_rgba(&mut src_buf);

    let src = fir::Image::from_vec_u8(
        nz(source.width(), "source width")?,
        nz(source.height(), "source height")?,
        src_buf,
        fir::PixelType::U8x4,
    )
    .map_err(|e| StampError::resize(format!("source buffer: {e}")))?;
    let mut dst = fir::Image::new(
        nz(width, "target width")?,
        nz(height, "target height")?,
        fir::PixelType::U8x4,
    );

    let mut resizer = fir::Resizer::new(filter.resize_alg());
    resizer
        .resize(&src.view(), &mut dst.view_mut())
        .map_err(|e| StampError::resize(e.to_string()))?;

    let mut out = dst.into_vec();
    unpremultiply_rgba(&mut out);

    RgbaImage::from_raw(width, height, out)
        .ok_or_else(|| StampError::resize("resize produced invalid buffer"))
}

fn premultiply_rgba(data: &mut [u8]) {
    for pixel in data.chunks_mut(4) {
        let a = pixel[3] as u32;
        pixel[0] = ((pixel[0] as u32 * a + 127) / 255) as u8;
        pixel[1] = ((pixel[1] as u32 * a + 127) / 255) as u8;
        pixel[2] = ((pixel[2] as u32 * a + 127) / 255) as u8;
    }
}

fn unpremultiply_rgba(data: &mut [u8]) {
    for pixel in data.chunks_mut(4) {
        let alpha = pixel[3];
        if alpha == 0 {
            pixel[0] = 0;
            pixel[1] = 0;
            pixel[2] = 0;
            continue;
        }
        let a = alpha as u32;
        pixel[0] = ((pixel[0] as u32 * 255 + a / 2) / a).min(255) as u8;
        pixel[1] = ((pixel[1] as u32 * 255 + a / 2) / a).min(255) as u8;
        pixel[2] = ((pixel[2] as u32 * 255 + a / 2) / a).min(255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, px: [u8; 4]) -> Arc<Bitmap> {
        Arc::new(Bitmap::from_rgba_image(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba(px),
        )))
    }

    #[test]
    fn rejects_zero_target() {
        let src = solid(4, 4, [0, 0, 0, 255]);
        assert!(matches!(
            scale(&src, 0, 10, ResizeFilter::default()),
            Err(StampError::InvalidDimension { width: 0, height: 10 })
        ));
        assert!(matches!(
            scale(&src, 10, 0, ResizeFilter::default()),
            Err(StampError::InvalidDimension { width: 10, height: 0 })
        ));
    }

    #[test]
    fn same_size_returns_source() {
        let src = solid(4, 3, [1, 2, 3, 4]);
        let out = scale(&src, 4, 3, ResizeFilter::Lanczos3).unwrap();
        assert!(Arc::ptr_eq(&src, &out));
    }

    #[test]
    fn solid_color_survives_every_filter() {
        let src = solid(8, 6, [40, 80, 120, 255]);
        for filter in [
            ResizeFilter::Nearest,
            ResizeFilter::Bilinear,
            ResizeFilter::CatmullRom,
            ResizeFilter::Lanczos3,
        ] {
            let out = scale(&src, 20, 3, filter).unwrap();
            assert_eq!(out.dimensions(), (20, 3));
            for [r, g, b, a] in out.pixels() {
                assert!(r.abs_diff(40) <= 2 && g.abs_diff(80) <= 2 && b.abs_diff(120) <= 2);
                assert!(a >= 254, "filter {}", filter.as_str());
            }
        }
    }

    #[test]
    fn transparent_source_stays_transparent_black() {
        let src = solid(5, 5, [255, 255, 255, 0]);
        let out = scale(&src, 9, 9, ResizeFilter::Lanczos3).unwrap();
        assert!(out.pixels().all(|p| p == [0, 0, 0, 0]));
    }

    #[test]
    fn premultiply_roundtrip_on_opaque_is_lossless() {
        let mut data = vec![12, 200, 77, 255, 0, 0, 0, 255];
        let original = data.clone();
        premultiply_rgba(&mut data);
        unpremultiply_rgba(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn filter_names_match_serde() {
        for filter in [
            ResizeFilter::Nearest,
            ResizeFilter::Bilinear,
            ResizeFilter::CatmullRom,
            ResizeFilter::Lanczos3,
        ] {
            let parsed: ResizeFilter = serde_yaml::from_str(filter.as_str()).unwrap();
            assert_eq!(parsed, filter);
        }
    }
}
