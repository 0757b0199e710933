//! Image processing: crop, logo overlay, preview, PNG encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (PNG, bounded by [`DecodeLimits`]) |
//! | **Crop** | `DynamicImage::crop_imm` |
//! | **Logo resize / preview** | `resize_exact` with Lanczos3 |
//! | **Composite** | `image::imageops::overlay` |
//! | **Encode** | PNG via `DynamicImage::write_to` |
//!
//! The module is split into:
//! - **Geometry**: crop rect resolution and preview sizing (pure)
//! - **Placement**: logo size and offset math (pure)
//! - **Parameters**: value objects passed into the pipeline
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Compositor**: the pipeline combining geometry, placement and backend

pub mod backend;
pub mod compositor;
pub mod geometry;
mod params;
pub mod placement;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use compositor::{Compositor, LogoStage, PipelineError, Rendered};
pub use geometry::{CropRect, GeometryError, preview_dimensions, resolve_crop};
pub use params::{DecodeLimits, LogoConfig, OutputMode};
pub use placement::{Placement, Position, place_logo};
pub use rust_backend::RustBackend;
