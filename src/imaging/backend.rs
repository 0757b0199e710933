//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the five pixel operations the
//! compositor needs: decode, crop, resize, overlay, and PNG encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests swap in a recording mock that can be told to fail individual
//! steps.

use super::geometry::CropRect;
use super::params::DecodeLimits;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Image exceeds decode limits: {0}")]
    LimitsExceeded(String),
    #[error("Region {rect:?} does not fit inside {width}x{height} image")]
    OutOfBounds {
        rect: CropRect,
        width: u32,
        height: u32,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image processing backends.
///
/// Implementations must be stateless across calls: every method works only on
/// the buffers it is handed, so one backend can serve concurrent requests.
pub trait ImageBackend: Sync {
    /// Decode PNG bytes, enforcing `limits` before any large allocation.
    fn decode(&self, bytes: &[u8], limits: DecodeLimits) -> Result<DynamicImage, BackendError>;

    /// Extract `rect`. Fails with [`BackendError::OutOfBounds`] when the rect
    /// is empty or reaches past the image edge.
    fn crop(&self, image: &DynamicImage, rect: &CropRect) -> Result<DynamicImage, BackendError>;

    /// Resize to exactly `width × height`, ignoring aspect ratio.
    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, BackendError>;

    /// Alpha-composite `logo` onto a copy of `base` with its top-left corner
    /// at `(x, y)`.
    fn overlay(
        &self,
        base: &DynamicImage,
        logo: &DynamicImage,
        x: u32,
        y: u32,
    ) -> Result<DynamicImage, BackendError>;

    /// Encode as PNG.
    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>, BackendError>;
}
