//! The crop-and-composite pipeline.
//!
//! ```text
//! decode source → crop → [logo stage] → [preview downscale] → encode PNG
//! ```
//!
//! Failures on the primary image are returned to the caller. The logo stage
//! is best-effort: it either ends in [`LogoStage::Applied`] or
//! [`LogoStage::Skipped`], and a skipped logo produces exactly the bytes a
//! call without any logo configuration would.

use super::backend::{BackendError, ImageBackend};
use super::geometry::{CropRect, GeometryError, preview_dimensions};
use super::params::{DecodeLimits, LogoConfig, OutputMode};
use super::placement::{Placement, place_logo};
use super::rust_backend::RustBackend;
use image::{DynamicImage, GenericImageView};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid crop coordinates: {0}")]
    InvalidGeometry(#[from] GeometryError),
    #[error("Source image could not be decoded: {0}")]
    Decode(String),
    #[error("Source image is too large: {0}")]
    TooLarge(String),
    #[error("Crop region {rect:?} does not fit inside the {width}x{height} source")]
    RegionOutOfBounds {
        rect: CropRect,
        width: u32,
        height: u32,
    },
    #[error("Image processing failed: {0}")]
    Internal(BackendError),
}

impl PipelineError {
    /// Classify a backend failure on the primary image.
    fn from_source(err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => PipelineError::Decode(msg),
            BackendError::UnsupportedFormat(fmt) => {
                PipelineError::Decode(format!("expected PNG, found {fmt}"))
            }
            BackendError::LimitsExceeded(msg) => PipelineError::TooLarge(msg),
            BackendError::OutOfBounds {
                rect,
                width,
                height,
            } => PipelineError::RegionOutOfBounds {
                rect,
                width,
                height,
            },
            other => PipelineError::Internal(other),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Outcome of the logo stage for one render.
#[derive(Debug, Clone, PartialEq)]
pub enum LogoStage {
    /// No configuration, or a configuration without logo bytes.
    NotRequested,
    /// Logo composited with this placement (relative to the cropped image).
    Applied(Placement),
    /// Logo attempted but abandoned; the output carries no logo.
    Skipped(String),
}

/// A rendered image plus what happened along the way.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// PNG-encoded output.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mode: OutputMode,
    pub logo: LogoStage,
}

/// Runs the pipeline over a stateless [`ImageBackend`].
///
/// A compositor holds no per-request state, so a single instance can be
/// shared by reference across threads.
#[derive(Debug, Clone)]
pub struct Compositor<B = RustBackend> {
    backend: B,
    limits: DecodeLimits,
}

impl Default for Compositor<RustBackend> {
    fn default() -> Self {
        Self::with_limits(DecodeLimits::default())
    }
}

impl Compositor<RustBackend> {
    pub fn with_limits(limits: DecodeLimits) -> Self {
        Self::new(RustBackend::new(), limits)
    }
}

impl<B: ImageBackend> Compositor<B> {
    pub fn new(backend: B, limits: DecodeLimits) -> Self {
        Self { backend, limits }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// Crop, stamp, and shrink to 5% of the crop rect.
    pub fn produce_preview(
        &self,
        source: &[u8],
        crop: &CropRect,
        logo: Option<&LogoConfig>,
    ) -> Result<Vec<u8>> {
        self.render(source, crop, logo, OutputMode::Preview)
            .map(|r| r.bytes)
    }

    /// Crop and stamp at full crop resolution.
    pub fn produce_final(
        &self,
        source: &[u8],
        crop: &CropRect,
        logo: Option<&LogoConfig>,
    ) -> Result<Vec<u8>> {
        self.render(source, crop, logo, OutputMode::Final)
            .map(|r| r.bytes)
    }

    /// Run the full pipeline and report the logo stage alongside the bytes.
    #[tracing::instrument(skip(self, source, logo), fields(source_bytes = source.len()))]
    pub fn render(
        &self,
        source: &[u8],
        crop: &CropRect,
        logo: Option<&LogoConfig>,
        mode: OutputMode,
    ) -> Result<Rendered> {
        let decoded = self
            .backend
            .decode(source, self.limits)
            .map_err(PipelineError::from_source)?;
        let cropped = self
            .backend
            .crop(&decoded, crop)
            .map_err(PipelineError::from_source)?;
        drop(decoded);

        let (composited, logo_stage) = match logo.filter(|c| c.has_logo()) {
            None => (cropped, LogoStage::NotRequested),
            Some(config) => match self.apply_logo(&cropped, config) {
                Ok((stamped, placement)) => {
                    debug!(?placement, "logo applied");
                    (stamped, LogoStage::Applied(placement))
                }
                Err(e) => {
                    warn!(error = %e, "logo overlay skipped");
                    (cropped, LogoStage::Skipped(e.to_string()))
                }
            },
        };

        let output = match mode {
            OutputMode::Final => composited,
            OutputMode::Preview => {
                let (w, h) = preview_dimensions(crop);
                self.backend
                    .resize(&composited, w, h)
                    .map_err(PipelineError::Internal)?
            }
        };

        let (width, height) = output.dimensions();
        let bytes = self
            .backend
            .encode_png(&output)
            .map_err(PipelineError::Internal)?;

        debug!(width, height, encoded = bytes.len(), "render complete");
        Ok(Rendered {
            bytes,
            width,
            height,
            mode,
            logo: logo_stage,
        })
    }

    /// Decode, size, and composite the logo onto `base`.
    fn apply_logo(
        &self,
        base: &DynamicImage,
        config: &LogoConfig,
    ) -> std::result::Result<(DynamicImage, Placement), BackendError> {
        let bytes = config.logo_bytes.as_deref().unwrap_or_default();
        let logo = self.backend.decode(bytes, self.limits)?;

        let placement = place_logo(
            base.dimensions(),
            logo.dimensions(),
            config.scale_down,
            config.position,
        );
        if placement.is_degenerate() {
            return Err(BackendError::ProcessingFailed(format!(
                "logo sized to {}x{}",
                placement.render_width, placement.render_height
            )));
        }

        let sized = self
            .backend
            .resize(&logo, placement.render_width, placement.render_height)?;
        let stamped = self
            .backend
            .overlay(base, &sized, placement.offset_x, placement.offset_y)?;
        Ok((stamped, placement))
    }
}
