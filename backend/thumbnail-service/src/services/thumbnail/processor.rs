//! Thumbnail processor - cover-resizes and center-crops images to a fixed size
//!
//! The source is scaled (up or down) until it covers the target rectangle on
//! both axes, then cropped around its center to exactly `width x height`.
//! The result is re-encoded in the source format unless an output format is
//! configured.
//!
//! The crop window is mapped back into source pixels and applied before
//! scaling, so memory never exceeds the source plus the target.
//!
//! Rounding: the scaled side is rounded half-up, the source crop size is
//! rounded up, crop origins are floored.

use crate::error::ThumbnailError;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Configuration for thumbnail generation
#[derive(Clone, Debug, PartialEq)]
pub struct ThumbnailConfig {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// When false, images no larger than the target on both axes are returned untouched
    pub upscale_small_images: bool,
    /// Encoding for the output; `None` keeps the source format
    pub output_format: Option<ImageFormat>,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            upscale_small_images: true,
            output_format: None,
            jpeg_quality: 85,
        }
    }
}

/// Cover-resize size and center-crop origin, in resized pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoverGeometry {
    pub resize_width: u64,
    pub resize_height: u64,
    pub crop_x: u64,
    pub crop_y: u64,
}

/// The part of the source that ends up in the thumbnail, in source pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceCrop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of thumbnail generation
#[derive(Debug)]
pub struct ThumbnailResult {
    /// Encoded image data
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// False when the source was passed through unchanged
    pub resized: bool,
}

impl ThumbnailResult {
    pub fn content_type(&self) -> &'static str {
        content_type(self.format)
    }
}

/// Thumbnail processor
pub struct ThumbnailProcessor {
    config: ThumbnailConfig,
}

impl ThumbnailProcessor {
    /// Create a new processor with the given configuration
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    /// Generate a thumbnail from the given image data (blocking version)
    ///
    /// **Note:** This method performs CPU-intensive operations and should not be called
    /// directly from async code. Use `generate_async` instead.
    pub fn generate(&self, original_data: &[u8]) -> Result<ThumbnailResult, ThumbnailError> {
        let source_format =
            image::guess_format(original_data).map_err(|e| ThumbnailError::Decode(e.to_string()))?;
        let img = image::load_from_memory_with_format(original_data, source_format)
            .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

        let (orig_w, orig_h) = img.dimensions();
        if orig_w == 0 || orig_h == 0 {
            return Err(ThumbnailError::Decode(format!(
                "image has no pixels ({orig_w}x{orig_h})"
            )));
        }
        debug!(
            original_width = orig_w,
            original_height = orig_h,
            source_format = ?source_format,
            "Processing image for thumbnail"
        );

        let (target_w, target_h) = (self.config.width, self.config.height);

        if !self.config.upscale_small_images && orig_w <= target_w && orig_h <= target_h {
            debug!("Image already within target dimensions, passing through");
            return Ok(ThumbnailResult {
                data: Bytes::copy_from_slice(original_data),
                width: orig_w,
                height: orig_h,
                format: source_format,
                resized: false,
            });
        }

        let geometry = self.cover_geometry(orig_w, orig_h);
        let crop = self.source_crop(orig_w, orig_h)?;
        debug!(
            resize_width = geometry.resize_width,
            resize_height = geometry.resize_height,
            crop_x = geometry.crop_x,
            crop_y = geometry.crop_y,
            source_crop = ?crop,
            "Computed cover geometry"
        );

        let cropped = img
            .crop_imm(crop.x, crop.y, crop.width, crop.height)
            .resize_exact(target_w, target_h, FilterType::Triangle);
        if cropped.dimensions() != (target_w, target_h) {
            let (w, h) = cropped.dimensions();
            return Err(ThumbnailError::Resize(format!(
                "expected {target_w}x{target_h}, got {w}x{h}"
            )));
        }

        let output_format = self.config.output_format.unwrap_or(source_format);
        let data = self.encode(&cropped, output_format)?;

        debug!(
            width = target_w,
            height = target_h,
            size = data.len(),
            "Thumbnail generated"
        );

        Ok(ThumbnailResult {
            data,
            width: target_w,
            height: target_h,
            format: output_format,
            resized: true,
        })
    }

    /// Generate a thumbnail asynchronously using a blocking thread pool
    pub async fn generate_async(
        self: Arc<Self>,
        original_data: Bytes,
    ) -> Result<ThumbnailResult, ThumbnailError> {
        tokio::task::spawn_blocking(move || self.generate(&original_data))
            .await
            .map_err(|e| ThumbnailError::TaskFailed(e.to_string()))?
    }

    /// Compute the cover-resize size and the center-crop origin.
    ///
    /// Aspect ratios are compared by cross-multiplication to stay exact.
    pub fn cover_geometry(&self, width: u32, height: u32) -> CoverGeometry {
        let (w, h) = (width as u64, height as u64);
        let (tw, th) = (self.config.width as u64, self.config.height as u64);

        let (resize_w, resize_h) = if h * tw > th * w {
            // relatively taller than the target: match width
            let scaled_h = (2 * h * tw + w) / (2 * w);
            (tw, scaled_h.max(th))
        } else {
            let scaled_w = (2 * w * th + h) / (2 * h);
            (scaled_w.max(tw), th)
        };

        CoverGeometry {
            resize_width: resize_w,
            resize_height: resize_h,
            crop_x: (resize_w - tw) / 2,
            crop_y: (resize_h - th) / 2,
        }
    }

    /// Map the centered target window back onto the source image.
    ///
    /// The window keeps the full extent of the axis that matches the target
    /// and is centered on the other one.
    pub fn source_crop(&self, width: u32, height: u32) -> Result<SourceCrop, ThumbnailError> {
        if width == 0 || height == 0 {
            return Err(ThumbnailError::Resize(format!(
                "cannot crop an empty image ({width}x{height})"
            )));
        }
        let (w, h) = (width as u64, height as u64);
        let (tw, th) = (self.config.width as u64, self.config.height as u64);

        let (crop_w, crop_h) = if h * tw > th * w {
            (w, (th * w).div_ceil(tw).clamp(1, h))
        } else {
            ((tw * h).div_ceil(th).clamp(1, w), h)
        };

        Ok(SourceCrop {
            x: to_pixels((w - crop_w) / 2)?,
            y: to_pixels((h - crop_h) / 2)?,
            width: to_pixels(crop_w)?,
            height: to_pixels(crop_h)?,
        })
    }

    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Bytes, ThumbnailError> {
        let mut buf = Vec::new();
        let mut cursor = Cursor::new(&mut buf);

        match ImageOutputFormat::from(format) {
            ImageOutputFormat::Jpeg(_) => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                rgb.write_to(&mut cursor, ImageOutputFormat::Jpeg(self.config.jpeg_quality))
            }
            ImageOutputFormat::Unsupported(name) => {
                return Err(ThumbnailError::UnsupportedFormat(name));
            }
            output => img.write_to(&mut cursor, output),
        }
        .map_err(|e| ThumbnailError::Encode(e.to_string()))?;

        Ok(Bytes::from(buf))
    }
}

fn to_pixels(value: u64) -> Result<u32, ThumbnailError> {
    u32::try_from(value)
        .map_err(|_| ThumbnailError::Resize(format!("dimension {value} out of range")))
}

/// MIME type written alongside the thumbnail
pub fn content_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}
