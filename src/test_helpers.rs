//! Shared test utilities for the cropmark test suite.
//!
//! Builds small synthetic PNGs in memory so no fixture files are needed, and
//! opens throwaway configuration stores.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let png = gradient_png(200, 100);
//! let out = Compositor::default().produce_final(&png, &rect, None).unwrap();
//! assert_eq!(decode_png(&out).dimensions(), (rect.width, rect.height));
//! ```

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use crate::store::SqliteStore;

// =========================================================================
// Synthetic images
// =========================================================================

fn encode(img: RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// A single-colour RGBA PNG.
pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

/// Left half opaque red, right half opaque blue.
pub fn split_png(width: u32, height: u32) -> Vec<u8> {
    encode(RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    }))
}

/// A PNG with a distinct colour at most pixels, so crops and resizes that
/// pick the wrong region show up as byte differences.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    encode(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    }))
}

/// Decode PNG output back into pixels. Panics on anything else.
pub fn decode_png(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory_with_format(bytes, ImageFormat::Png).unwrap()
}

// =========================================================================
// Stores
// =========================================================================

/// An empty in-memory configuration store with the schema applied.
pub fn memory_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}
