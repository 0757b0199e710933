//! Logo placement math.
//!
//! Pure functions that decide how large a logo is drawn and where its top-left
//! corner lands on the cropped image. No pixels are touched here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gap between the logo and the nearest image edge.
pub const MARGIN: u32 = 10;

/// A logo may cover at most this fraction of each image dimension.
pub const AREA_CAP: f64 = 0.3;

/// Anchor for the logo on the target image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
        Position::Center,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
            Position::Center => "center",
        }
    }

    /// Case-insensitive exact match on the keyword.
    pub fn parse_strict(keyword: &str) -> Option<Self> {
        let keyword = keyword.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(keyword))
    }

    /// Lenient parse used when rendering: anything unrecognized is `top-left`.
    pub fn from_keyword(keyword: &str) -> Self {
        Self::parse_strict(keyword).unwrap_or_default()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how large the logo is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub render_width: u32,
    pub render_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Placement {
    pub fn is_degenerate(&self) -> bool {
        self.render_width == 0 || self.render_height == 0
    }
}

fn to_u32(value: f64) -> u32 {
    value.max(0.0).min(f64::from(u32::MAX)) as u32
}

/// Size a logo against the area cap.
///
/// A finite `scale_down` below 1 shrinks the native size first; the result is
/// then fit (aspect preserved) inside `floor(source * 0.3)` on both axes.
pub fn calculate_logo_size(
    source: (u32, u32),
    logo_native: (u32, u32),
    scale_down: Option<f64>,
) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (native_w, native_h) = logo_native;

    let (mut w, mut h) = match scale_down {
        Some(s) if s.is_finite() && s < 1.0 => (
            (f64::from(native_w) * s).round(),
            (f64::from(native_h) * s).round(),
        ),
        _ => (f64::from(native_w), f64::from(native_h)),
    };

    let max_w = (f64::from(src_w) * AREA_CAP).floor();
    let max_h = (f64::from(src_h) * AREA_CAP).floor();

    if w > max_w || h > max_h {
        let ratio = (max_w / w).min(max_h / h);
        w = (w * ratio).round().max(1.0);
        h = (h * ratio).round().max(1.0);
    }

    (to_u32(w), to_u32(h))
}

/// Top-left offset of a `logo`-sized box anchored at `position`.
///
/// Edge anchors keep [`MARGIN`] pixels of clearance; offsets that would go
/// negative are pinned to zero.
pub fn calculate_offset(source: (u32, u32), logo: (u32, u32), position: Position) -> (u32, u32) {
    let (src_w, src_h) = (i64::from(source.0), i64::from(source.1));
    let (logo_w, logo_h) = (i64::from(logo.0), i64::from(logo.1));
    let margin = i64::from(MARGIN);

    let far_x = (src_w - logo_w - margin).max(0);
    let far_y = (src_h - logo_h - margin).max(0);

    let (x, y) = match position {
        Position::TopLeft => (margin, margin),
        Position::TopRight => (far_x, margin),
        Position::BottomLeft => (margin, far_y),
        Position::BottomRight => (far_x, far_y),
        Position::Center => (
            (((src_w - logo_w) as f64 / 2.0).round() as i64).max(0),
            (((src_h - logo_h) as f64 / 2.0).round() as i64).max(0),
        ),
    };

    (x as u32, y as u32)
}

/// Compute the full placement of a logo on a `source`-sized image.
pub fn place_logo(
    source: (u32, u32),
    logo_native: (u32, u32),
    scale_down: Option<f64>,
    position: Position,
) -> Placement {
    let (render_width, render_height) = calculate_logo_size(source, logo_native, scale_down);
    let (offset_x, offset_y) = calculate_offset(source, (render_width, render_height), position);
    Placement {
        render_width,
        render_height,
        offset_x,
        offset_y,
    }
}
