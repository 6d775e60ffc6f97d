//! Decode, transform and re-encode stored images in place.
//!
//! Images are decoded to RGBA before any resampling. The result is encoded
//! back in the format the file was read as and swapped in with a rename, so a
//! failed encode never leaves a truncated file behind.

use std::io::{BufWriter, Write};
use std::path::Path;

use ic_core::config::{ImagingConfig, ResampleFilter};
use ic_core::{CropPolicy, Error, Result, ThumbnailBounds};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use tempfile::NamedTempFile;

use crate::geometry;

/// Result of [`ImageCodec::shrink_to_fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShrinkOutcome {
    /// The image already satisfied every bound; the file was not touched.
    WithinBounds,
    /// The file was rewritten at the new size.
    Resized { width: u32, height: u32 },
}

/// Image encoder/resampler settings.
#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
    quality: u8,
    filter: FilterType,
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new(100, FilterType::Lanczos3)
    }
}

impl ImageCodec {
    /// Create a codec. `quality` is clamped to 1-100.
    pub fn new(quality: u8, filter: FilterType) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            filter,
        }
    }

    pub fn from_config(config: &ImagingConfig) -> Self {
        Self::new(config.quality, filter_type(config.filter))
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    /// Cover-crop the image at `path` to exactly the policy's size,
    /// overwriting the file. Returns the written dimensions.
    pub fn crop_to_cover(&self, path: &Path, policy: CropPolicy) -> Result<(u32, u32)> {
        let (image, format) = self.open(path)?;
        let cropped = self
            .cover(&image, policy.width(), policy.height())
            .ok_or_else(|| Error::image(path, "image has a zero dimension"))?;
        let dims = cropped.dimensions();
        self.write(cropped, format, path)?;
        tracing::info!(
            "Cover-cropped {} from {}x{} to {}x{}",
            path.display(),
            image.width(),
            image.height(),
            dims.0,
            dims.1
        );
        Ok(dims)
    }

    /// Shrink the image at `path` so it fits within `bounds`, overwriting the
    /// file. `width` and `height` are the file's current dimensions; when
    /// they already satisfy the bounds the file is left byte-for-byte intact.
    pub fn shrink_to_fit(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        bounds: ThumbnailBounds,
    ) -> Result<ShrinkOutcome> {
        let Some((target_w, target_h)) = geometry::shrink_target(width, height, &bounds) else {
            tracing::debug!("{} is within bounds; leaving it untouched", path.display());
            return Ok(ShrinkOutcome::WithinBounds);
        };

        let (image, format) = self.open(path)?;
        let shrunk = imageops::resize(&image, target_w, target_h, self.filter);
        let (new_w, new_h) = shrunk.dimensions();
        self.write(shrunk, format, path)?;
        tracing::info!(
            "Shrunk {} from {}x{} to {}x{}",
            path.display(),
            image.width(),
            image.height(),
            new_w,
            new_h
        );
        Ok(ShrinkOutcome::Resized {
            width: new_w,
            height: new_h,
        })
    }

    /// Scale `image` to cover the target box and crop the centered box out.
    pub fn cover(
        &self,
        image: &RgbaImage,
        target_width: u32,
        target_height: u32,
    ) -> Option<RgbaImage> {
        let plan = geometry::cover_crop(image.width(), image.height(), target_width, target_height)?;
        let scaled = imageops::resize(image, plan.scaled_width, plan.scaled_height, self.filter);
        Some(imageops::crop_imm(&scaled, plan.x, plan.y, plan.width, plan.height).to_image())
    }

    /// Fit `image` inside the box keeping its aspect ratio, never enlarging.
    pub fn fit_within(&self, image: &RgbaImage, box_width: u32, box_height: u32) -> RgbaImage {
        let (w, h) = geometry::bounded_fit(image.width(), image.height(), box_width, box_height);
        if (w, h) == image.dimensions() {
            return image.clone();
        }
        imageops::resize(image, w, h, self.filter)
    }

    /// Decode the file at `path` to RGBA, returning the detected format.
    pub fn open(&self, path: &Path) -> Result<(RgbaImage, ImageFormat)> {
        let bytes = std::fs::read(path)?;
        let format = image::guess_format(&bytes)
            .or_else(|_| ImageFormat::from_path(path))
            .map_err(|e| Error::image(path, e))?;
        let image = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| Error::image(path, e))?;
        Ok((image.to_rgba8(), format))
    }

    /// Encode `image` as `format` and atomically replace the file at `path`.
    ///
    /// JPEG has no alpha channel, so alpha is dropped and the configured
    /// quality applies; every other format is written losslessly as RGBA.
    pub fn write(&self, image: RgbaImage, format: ImageFormat, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;

        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            let encoded = match format {
                ImageFormat::Jpeg => {
                    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
                    let encoder = JpegEncoder::new_with_quality(&mut writer, self.quality);
                    DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)
                }
                other => DynamicImage::ImageRgba8(image).write_to(&mut writer, other),
            };
            encoded.map_err(|e| Error::image(path, e))?;
            writer.flush()?;
        }

        tmp.persist(path).map_err(|e| Error::from(e.error))?;
        Ok(())
    }
}

/// Pixel dimensions of the image at `path`, read from its header.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).map_err(|e| Error::image(path, e))
}

/// Map the configured filter to the resampler's filter type.
pub fn filter_type(filter: ResampleFilter) -> FilterType {
    match filter {
        ResampleFilter::Nearest => FilterType::Nearest,
        ResampleFilter::Triangle => FilterType::Triangle,
        ResampleFilter::CatmullRom => FilterType::CatmullRom,
        ResampleFilter::Gaussian => FilterType::Gaussian,
        ResampleFilter::Lanczos3 => FilterType::Lanczos3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        })
    }

    fn write_fixture(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        DynamicImage::ImageRgba8(gradient(width, height))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn cover_produces_exact_target() {
        let codec = ImageCodec::default();
        let out = codec.cover(&gradient(200, 50), 100, 100).unwrap();
        assert_eq!(out.dimensions(), (100, 100));
    }

    #[test]
    fn fit_within_never_enlarges() {
        let codec = ImageCodec::default();
        let out = codec.fit_within(&gradient(40, 30), 400, 300);
        assert_eq!(out.dimensions(), (40, 30));
    }

    #[test]
    fn crop_to_cover_rewrites_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "wide.png", 200, 50);

        let dims = ImageCodec::default()
            .crop_to_cover(&path, CropPolicy::new(100, 100).unwrap())
            .unwrap();
        assert_eq!(dims, (100, 100));
        assert_eq!(image::image_dimensions(&path).unwrap(), (100, 100));
        assert_eq!(image::open(&path).unwrap().color(), image::ColorType::Rgba8);
    }

    #[test]
    fn crop_to_cover_rewrites_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        DynamicImage::ImageRgba8(gradient(120, 90))
            .to_rgb8()
            .save(&path)
            .unwrap();

        ImageCodec::new(90, FilterType::Triangle)
            .crop_to_cover(&path, CropPolicy::new(30, 60).unwrap())
            .unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (30, 60));
    }

    #[test]
    fn shrink_within_bounds_leaves_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "small.png", 50, 50);
        let before = std::fs::read(&path).unwrap();

        let outcome = ImageCodec::default()
            .shrink_to_fit(&path, 50, 50, ThumbnailBounds::new(Some(100), None))
            .unwrap();
        assert_eq!(outcome, ShrinkOutcome::WithinBounds);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn shrink_over_bound_resizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "big.png", 300, 200);

        let outcome = ImageCodec::default()
            .shrink_to_fit(&path, 300, 200, ThumbnailBounds::new(Some(100), Some(100)))
            .unwrap();
        assert_eq!(
            outcome,
            ShrinkOutcome::Resized {
                width: 100,
                height: 66
            }
        );
        assert_eq!(image::image_dimensions(&path).unwrap(), (100, 66));
    }

    #[test]
    fn undecodable_file_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = ImageCodec::default()
            .crop_to_cover(&path, CropPolicy::new(10, 10).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::Image { .. }), "got {err:?}");
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(ImageCodec::new(0, FilterType::Nearest).quality(), 1);
        assert_eq!(ImageCodec::new(255, FilterType::Nearest).quality(), 100);
    }

    #[test]
    fn from_config_maps_filter() {
        let config = ImagingConfig {
            quality: 80,
            filter: ResampleFilter::Gaussian,
        };
        let codec = ImageCodec::from_config(&config);
        assert_eq!(codec.quality(), 80);
        assert_eq!(codec.filter(), FilterType::Gaussian);
    }
}
