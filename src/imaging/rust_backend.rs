//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG only) | `image::ImageReader` with format sniffing and `image::Limits` |
//! | Crop | `DynamicImage::crop_imm` after an explicit bounds check |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Overlay | `image::imageops::overlay` on an RGBA8 copy |
//! | Encode → PNG | `DynamicImage::write_to` with `ImageFormat::Png` |

use super::backend::{BackendError, ImageBackend};
use super::geometry::CropRect;
use super::params::DecodeLimits;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], limits: DecodeLimits) -> Result<DynamicImage, BackendError> {
        let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;

        match reader.format() {
            Some(ImageFormat::Png) => {}
            Some(other) => {
                return Err(BackendError::UnsupportedFormat(format!("{other:?}")));
            }
            None => {
                return Err(BackendError::Decode("unrecognized image data".into()));
            }
        }

        reader.limits(limits.to_image_limits());
        reader.decode().map_err(|e| match e {
            ImageError::Limits(_) => BackendError::LimitsExceeded(e.to_string()),
            other => BackendError::Decode(other.to_string()),
        })
    }

    fn crop(&self, image: &DynamicImage, rect: &CropRect) -> Result<DynamicImage, BackendError> {
        let (width, height) = image.dimensions();
        if rect.is_empty() || !rect.fits_within(width, height) {
            return Err(BackendError::OutOfBounds {
                rect: *rect,
                width,
                height,
            });
        }
        Ok(image.crop_imm(rect.left, rect.top, rect.width, rect.height))
    }

    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        if image.dimensions() == (width, height) {
            return Ok(image.clone());
        }
        Ok(image.resize_exact(width, height, FilterType::Lanczos3))
    }

    fn overlay(
        &self,
        base: &DynamicImage,
        logo: &DynamicImage,
        x: u32,
        y: u32,
    ) -> Result<DynamicImage, BackendError> {
        let (base_w, base_h) = base.dimensions();
        let (logo_w, logo_h) = logo.dimensions();
        if logo_w > base_w || logo_h > base_h {
            return Err(BackendError::ProcessingFailed(format!(
                "overlay {logo_w}x{logo_h} is larger than base {base_w}x{base_h}"
            )));
        }

        let mut canvas = base.to_rgba8();
        image::imageops::overlay(&mut canvas, &logo.to_rgba8(), i64::from(x), i64::from(y));
        Ok(DynamicImage::ImageRgba8(canvas))
    }

    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {e}")))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{solid_png, split_png};
    use image::Rgba;

    fn decode(bytes: &[u8]) -> DynamicImage {
        RustBackend::new()
            .decode(bytes, DecodeLimits::default())
            .unwrap()
    }

    #[test]
    fn decode_synthetic_png() {
        let img = decode(&solid_png(64, 48, [1, 2, 3, 255]));
        assert_eq!(img.dimensions(), (64, 48));
    }

    #[test]
    fn decode_garbage_errors() {
        let err = RustBackend::new()
            .decode(b"definitely not an image", DecodeLimits::default())
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[test]
    fn decode_truncated_png_errors() {
        let png = solid_png(64, 64, [9, 9, 9, 255]);
        let err = RustBackend::new()
            .decode(&png[..png.len() / 2], DecodeLimits::default())
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[test]
    fn decode_non_png_is_unsupported() {
        // Minimal GIF header: recognised by sniffing, but not a PNG
        let err = RustBackend::new()
            .decode(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;", DecodeLimits::default())
            .unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedFormat(_)));
    }

    #[test]
    fn decode_enforces_dimension_limits() {
        let limits = DecodeLimits {
            max_width: 32,
            max_height: 32,
            ..DecodeLimits::default()
        };
        let err = RustBackend::new()
            .decode(&solid_png(64, 16, [0, 0, 0, 255]), limits)
            .unwrap_err();
        assert!(matches!(err, BackendError::LimitsExceeded(_)));
    }

    #[test]
    fn crop_extracts_region() {
        // Left half red, right half blue
        let img = decode(&split_png(100, 50));
        let rect = CropRect {
            left: 60,
            top: 10,
            width: 30,
            height: 20,
        };
        let cropped = RustBackend::new().crop(&img, &rect).unwrap();
        assert_eq!(cropped.dimensions(), (30, 20));
        assert_eq!(cropped.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn crop_out_of_bounds_errors() {
        let img = decode(&solid_png(100, 50, [0, 0, 0, 255]));
        let rect = CropRect {
            left: 80,
            top: 0,
            width: 21,
            height: 50,
        };
        let err = RustBackend::new().crop(&img, &rect).unwrap_err();
        assert!(matches!(
            err,
            BackendError::OutOfBounds {
                width: 100,
                height: 50,
                ..
            }
        ));
    }

    #[test]
    fn crop_empty_region_errors() {
        let img = decode(&solid_png(10, 10, [0, 0, 0, 255]));
        let rect = CropRect {
            left: 0,
            top: 0,
            width: 0,
            height: 5,
        };
        assert!(RustBackend::new().crop(&img, &rect).is_err());
    }

    #[test]
    fn resize_is_exact() {
        let img = decode(&solid_png(100, 50, [0, 0, 0, 255]));
        let resized = RustBackend::new().resize(&img, 7, 30).unwrap();
        assert_eq!(resized.dimensions(), (7, 30));
    }

    #[test]
    fn resize_to_zero_errors() {
        let img = decode(&solid_png(10, 10, [0, 0, 0, 255]));
        assert!(RustBackend::new().resize(&img, 0, 5).is_err());
    }

    #[test]
    fn overlay_draws_opaque_logo() {
        let backend = RustBackend::new();
        let base = decode(&solid_png(50, 50, [255, 255, 255, 255]));
        let logo = decode(&solid_png(10, 10, [0, 128, 0, 255]));

        let out = backend.overlay(&base, &logo, 5, 7).unwrap();
        assert_eq!(out.get_pixel(5, 7), Rgba([0, 128, 0, 255]));
        assert_eq!(out.get_pixel(14, 16), Rgba([0, 128, 0, 255]));
        assert_eq!(out.get_pixel(15, 17), Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(4, 7), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn overlay_respects_transparency() {
        let backend = RustBackend::new();
        let base = decode(&solid_png(20, 20, [200, 10, 10, 255]));
        let logo = decode(&solid_png(5, 5, [0, 0, 0, 0]));

        let out = backend.overlay(&base, &logo, 0, 0).unwrap();
        assert_eq!(out.get_pixel(2, 2), Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn overlay_larger_than_base_errors() {
        let backend = RustBackend::new();
        let base = decode(&solid_png(10, 10, [0, 0, 0, 255]));
        let logo = decode(&solid_png(11, 4, [0, 0, 0, 255]));
        assert!(backend.overlay(&base, &logo, 0, 0).is_err());
    }

    #[test]
    fn encode_png_round_trips_dimensions() {
        let backend = RustBackend::new();
        let img = decode(&solid_png(33, 21, [4, 5, 6, 255]));
        let bytes = backend.encode_png(&img).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        assert_eq!(decode(&bytes).dimensions(), (33, 21));
    }
}
