//! Parameter types for the crop pipeline.
//!
//! These structs describe *what* to produce, not *how*. They are the interface
//! between callers (the [`service`](crate::service) boundary, the CLI) and the
//! [`compositor`](super::compositor), which drives the
//! [`backend`](super::backend) to do the pixel work.
//!
//! ## Types
//!
//! - [`LogoConfig`]: Immutable snapshot of a stored logo configuration.
//! - [`OutputMode`]: Full-resolution output or the 5% preview.
//! - [`DecodeLimits`]: Upper bounds applied while decoding untrusted bytes.

use super::placement::Position;

/// Snapshot of a logo configuration handed to a single pipeline call.
///
/// The store owns the record; the pipeline only ever sees this copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogoConfig {
    /// Requested shrink factor. `None` (or anything ≥ 1) keeps the logo's
    /// native size before the area cap is applied.
    pub scale_down: Option<f64>,
    pub position: Position,
    pub logo_bytes: Option<Vec<u8>>,
    pub mime_type: Option<String>,
}

impl LogoConfig {
    /// Whether there is anything to composite.
    pub fn has_logo(&self) -> bool {
        self.logo_bytes.as_ref().is_some_and(|b| !b.is_empty())
    }
}

/// Which rendition the compositor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Downscaled to 5% of the crop rect for cheap client-side review.
    Preview,
    /// Full crop resolution.
    Final,
}

/// Bounds applied to every decode so hostile headers cannot force huge
/// allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_width: u32,
    pub max_height: u32,
    /// Maximum bytes the decoder may allocate.
    pub max_alloc: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_width: 16_384,
            max_height: 16_384,
            max_alloc: 512 * 1024 * 1024,
        }
    }
}

impl DecodeLimits {
    pub fn to_image_limits(self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits.max_alloc = Some(self.max_alloc);
        limits
    }
}
