//! Crop geometry: turning caller coordinates into pixel rectangles.
//!
//! All functions here are pure and testable without any images.

use serde_json::Value;
use thiserror::Error;

/// Preview renditions are this fraction of the crop rect on each axis.
pub const PREVIEW_SCALE: f64 = 0.05;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("expected [x, y, width, height], got {0} value(s)")]
    TooFewValues(usize),
    #[error("crop value #{index} is not a number: {found}")]
    NotNumeric { index: usize, found: String },
    /// The value cannot be expressed as an unsigned pixel coordinate at all
    /// (negative origin, non-finite, or past `u32::MAX`). Such a rect is
    /// malformed input rather than a region that misses a particular image,
    /// so it never reaches the extract step.
    #[error("crop {axis} {value} is outside the addressable pixel range")]
    OutOfRange { axis: &'static str, value: f64 },
}

/// Axis-aligned pixel rectangle retained from the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Build a rect from raw `[x, y, width, height]` coordinates.
    ///
    /// Values are rounded half away from zero. Width and height are clamped to
    /// zero; a negative origin cannot be represented and is rejected.
    pub fn from_coords(coords: [f64; 4]) -> Result<Self, GeometryError> {
        let [x, y, w, h] = coords;
        Ok(Self {
            left: round_origin("left", x)?,
            top: round_origin("top", y)?,
            width: round_extent("width", w)?,
            height: round_extent("height", h)?,
        })
    }

    /// Whether the rect lies entirely inside a `width × height` raster.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        u64::from(self.left) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.top) + u64::from(self.height) <= u64::from(height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn to_pixel(axis: &'static str, value: f64) -> Result<u32, GeometryError> {
    if !value.is_finite() || value > f64::from(u32::MAX) {
        return Err(GeometryError::OutOfRange { axis, value });
    }
    Ok(value as u32)
}

fn round_origin(axis: &'static str, value: f64) -> Result<u32, GeometryError> {
    let rounded = value.round();
    if rounded < 0.0 {
        return Err(GeometryError::OutOfRange { axis, value });
    }
    to_pixel(axis, rounded)
}

fn round_extent(axis: &'static str, value: f64) -> Result<u32, GeometryError> {
    to_pixel(axis, value.round().max(0.0))
}

/// Resolve a caller-supplied coordinate list into a [`CropRect`].
///
/// The list is `[x, y, width, height]`. Anything past the fourth value is
/// ignored; fewer than four values, or a non-numeric value among the first
/// four, is an error. No bounds checking against the source happens here.
pub fn resolve_crop(raw: &[Value]) -> Result<CropRect, GeometryError> {
    if raw.len() < 4 {
        return Err(GeometryError::TooFewValues(raw.len()));
    }

    let mut coords = [0.0f64; 4];
    for (index, (slot, value)) in coords.iter_mut().zip(raw).enumerate() {
        *slot = value.as_f64().ok_or_else(|| GeometryError::NotNumeric {
            index,
            found: value.to_string(),
        })?;
    }

    CropRect::from_coords(coords)
}

/// Output dimensions of a preview for the given crop rect.
///
/// Each axis is `round(extent * 0.05)`, never below one pixel.
pub fn preview_dimensions(crop: &CropRect) -> (u32, u32) {
    let scale = |extent: u32| ((f64::from(extent) * PREVIEW_SCALE).round() as u32).max(1);
    (scale(crop.width), scale(crop.height))
}
