//! Request boundary between a transport layer and the pipeline.
//!
//! A transport (HTTP handler, CLI, test) hands over loosely-typed inputs: an
//! optional upload, a crop-coordinate value that may be JSON or a
//! JSON-encoded string, and an optional configuration id. This module turns
//! them into typed values, looks the configuration up for the caller's
//! identity, runs the [`Compositor`], and classifies every failure into a
//! [`ResponseStatus`].
//!
//! | Failure | Status |
//! |---|---|
//! | no image uploaded, or upload over the size limit | 400 |
//! | crop coordinates missing, unparsable, or malformed | 400 |
//! | source undecodable, too large, or crop out of bounds | 400 |
//! | configuration id unknown or owned by someone else | 404 |
//! | anything else | 500 |

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::imaging::{
    Compositor, CropRect, ImageBackend, LogoConfig, LogoStage, OutputMode, PipelineError,
    Position, RustBackend, resolve_crop,
};
use crate::store::{ConfigGateway, LogoAsset, StoreError};

pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Upload ceiling for source images and logos.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Response category a transport should map an error onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    BadRequest,
    NotFound,
    ServerError,
}

impl ResponseStatus {
    pub fn code(self) -> u16 {
        match self {
            ResponseStatus::BadRequest => 400,
            ResponseStatus::NotFound => 404,
            ResponseStatus::ServerError => 500,
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No image file provided")]
    MissingFile,
    #[error("File too large. Maximum size is {}MB.", .limit / (1024 * 1024))]
    FileTooLarge { size: u64, limit: u64 },
    #[error("Crop coordinates are required")]
    MissingCropCoords,
    #[error("Invalid crop coordinates format: {0}")]
    InvalidCropFormat(String),
    #[error("Configuration not found or access denied")]
    ConfigNotFound(i64),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn status(&self) -> ResponseStatus {
        match self {
            ServiceError::MissingFile
            | ServiceError::FileTooLarge { .. }
            | ServiceError::MissingCropCoords
            | ServiceError::InvalidCropFormat(_)
            | ServiceError::Validation(_) => ResponseStatus::BadRequest,
            ServiceError::ConfigNotFound(_) => ResponseStatus::NotFound,
            ServiceError::Pipeline(PipelineError::Internal(_)) => ResponseStatus::ServerError,
            ServiceError::Pipeline(_) => ResponseStatus::BadRequest,
            ServiceError::Store(StoreError::Validation(_)) => ResponseStatus::BadRequest,
            ServiceError::Store(_) => ResponseStatus::ServerError,
        }
    }

    /// JSON error body. Server errors hide their details.
    pub fn body(&self) -> ErrorBody {
        let error = match self.status() {
            ResponseStatus::ServerError => "Internal server error".to_string(),
            _ => self.to_string(),
        };
        ErrorBody {
            success: false,
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// Inputs of a preview or generate request, as received.
#[derive(Debug, Clone, Default)]
pub struct ImageRequest {
    /// The uploaded PNG, if any.
    pub image: Option<Vec<u8>>,
    /// `[x, y, width, height]` as a JSON array or a string containing one.
    pub crop_coords: Option<Value>,
    pub config_id: Option<i64>,
}

/// A successful image response.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub content_type: &'static str,
    /// `Some` for downloads.
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// The crop rect resolved from the request.
    pub crop: CropRect,
    pub logo: LogoStage,
}

/// Parse crop coordinates that may arrive as a JSON array or as a string
/// holding a JSON array.
pub fn parse_crop_coords(value: &Value) -> Result<CropRect, ServiceError> {
    let parsed;
    let value = match value {
        Value::Null => return Err(ServiceError::MissingCropCoords),
        Value::String(s) if s.trim().is_empty() => return Err(ServiceError::MissingCropCoords),
        Value::String(s) => {
            parsed = serde_json::from_str::<Value>(s)
                .map_err(|e| ServiceError::InvalidCropFormat(e.to_string()))?;
            &parsed
        }
        other => other,
    };

    match value {
        Value::Array(items) => Ok(resolve_crop(items).map_err(PipelineError::from)?),
        other => Err(ServiceError::InvalidCropFormat(format!(
            "expected [x, y, width, height], got {other}"
        ))),
    }
}

/// Strict position keyword parsing for configuration input.
pub fn parse_position(keyword: &str) -> Result<Position, ServiceError> {
    Position::parse_strict(keyword).ok_or_else(|| {
        let valid: Vec<&str> = Position::ALL.iter().map(|p| p.as_str()).collect();
        ServiceError::Validation(format!(
            "unknown logo position '{keyword}', expected one of {}",
            valid.join(", ")
        ))
    })
}

fn check_upload_size(data: &[u8], limit: u64) -> Result<(), ServiceError> {
    let size = data.len() as u64;
    if size > limit {
        return Err(ServiceError::FileTooLarge { size, limit });
    }
    Ok(())
}

/// Accept a logo upload of at most `max_bytes`. Only PNG data is allowed.
pub fn logo_upload(
    data: Vec<u8>,
    file_name: Option<String>,
    max_bytes: u64,
) -> Result<LogoAsset, ServiceError> {
    check_upload_size(&data, max_bytes)?;
    match image::guess_format(&data) {
        Ok(image::ImageFormat::Png) => Ok(LogoAsset {
            data,
            mime_type: PNG_CONTENT_TYPE.to_string(),
            file_name,
        }),
        _ => Err(ServiceError::Validation(
            "Only PNG images are allowed for logo".into(),
        )),
    }
}

/// The preview/generate operations bound to a configuration gateway.
pub struct CropService<'g, G: ?Sized, B = RustBackend> {
    compositor: Compositor<B>,
    gateway: &'g G,
    download_filename: String,
    max_upload_bytes: u64,
}

impl<'g, G, B> CropService<'g, G, B>
where
    G: ConfigGateway + ?Sized,
    B: ImageBackend,
{
    pub fn new(compositor: Compositor<B>, gateway: &'g G, download_filename: String) -> Self {
        Self {
            compositor,
            gateway,
            download_filename,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Override the upload ceiling.
    pub fn with_max_upload(mut self, max_bytes: u64) -> Self {
        self.max_upload_bytes = max_bytes;
        self
    }

    /// 5% preview, served inline.
    pub fn preview(
        &self,
        identity: &str,
        request: ImageRequest,
    ) -> Result<ImageResponse, ServiceError> {
        self.handle(identity, request, OutputMode::Preview)
    }

    /// Full-resolution crop, served as a download.
    pub fn generate(
        &self,
        identity: &str,
        request: ImageRequest,
    ) -> Result<ImageResponse, ServiceError> {
        self.handle(identity, request, OutputMode::Final)
    }

    fn handle(
        &self,
        identity: &str,
        request: ImageRequest,
        mode: OutputMode,
    ) -> Result<ImageResponse, ServiceError> {
        let image = request
            .image
            .filter(|b| !b.is_empty())
            .ok_or(ServiceError::MissingFile)?;
        check_upload_size(&image, self.max_upload_bytes)?;
        let coords = request
            .crop_coords
            .ok_or(ServiceError::MissingCropCoords)?;
        let crop = parse_crop_coords(&coords)?;

        let logo = match request.config_id {
            Some(id) => Some(self.lookup(id, identity)?),
            None => None,
        };

        let rendered = self
            .compositor
            .render(&image, &crop, logo.as_ref(), mode)?;
        info!(
            ?mode,
            width = rendered.width,
            height = rendered.height,
            logo = ?rendered.logo,
            "image request served"
        );

        let content_disposition = match mode {
            OutputMode::Final => Some(format!(
                "attachment; filename=\"{}\"",
                self.download_filename
            )),
            OutputMode::Preview => None,
        };

        Ok(ImageResponse {
            content_type: PNG_CONTENT_TYPE,
            content_disposition,
            body: rendered.bytes,
            width: rendered.width,
            height: rendered.height,
            crop,
            logo: rendered.logo,
        })
    }

    fn lookup(&self, id: i64, identity: &str) -> Result<LogoConfig, ServiceError> {
        let config = self.gateway.fetch_by_id(id, identity)?;
        debug!(id, found = config.is_some(), "configuration lookup");
        config.ok_or(ServiceError::ConfigNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::GeometryError;
    use crate::store::NewConfig;
    use crate::test_helpers::{decode_png, gradient_png, memory_store, solid_png};
    use image::GenericImageView;
    use serde_json::json;

    fn service(store: &crate::store::SqliteStore) -> CropService<'_, crate::store::SqliteStore> {
        CropService::new(Compositor::default(), store, "cropped-image.png".into())
    }

    fn request(coords: Value) -> ImageRequest {
        ImageRequest {
            image: Some(gradient_png(200, 100)),
            crop_coords: Some(coords),
            config_id: None,
        }
    }

    // =========================================================================
    // parse_crop_coords
    // =========================================================================

    #[test]
    fn coords_accept_array_or_encoded_string() {
        let expected = CropRect {
            left: 1,
            top: 2,
            width: 3,
            height: 4,
        };
        assert_eq!(parse_crop_coords(&json!([1, 2, 3, 4])).unwrap(), expected);
        assert_eq!(
            parse_crop_coords(&json!("[1.2, 2, 2.5, 4]")).unwrap(),
            expected
        );
    }

    #[test]
    fn coords_reject_bad_json_string() {
        let err = parse_crop_coords(&json!("[1, 2,")).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCropFormat(_)));
        assert_eq!(err.status(), ResponseStatus::BadRequest);
    }

    #[test]
    fn coords_reject_non_array() {
        let err = parse_crop_coords(&json!({"x": 1})).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCropFormat(_)));
        let err = parse_crop_coords(&json!("42")).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCropFormat(_)));
    }

    #[test]
    fn coords_short_array_is_invalid_geometry() {
        let err = parse_crop_coords(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Pipeline(PipelineError::InvalidGeometry(GeometryError::TooFewValues(3)))
        ));
        assert_eq!(err.status(), ResponseStatus::BadRequest);
    }

    #[test]
    fn null_or_blank_coords_are_missing() {
        assert!(matches!(
            parse_crop_coords(&Value::Null),
            Err(ServiceError::MissingCropCoords)
        ));
        assert!(matches!(
            parse_crop_coords(&json!("  ")),
            Err(ServiceError::MissingCropCoords)
        ));
    }

    // =========================================================================
    // preview / generate
    // =========================================================================

    #[test]
    fn missing_file_is_bad_request() {
        let store = memory_store();
        let err = service(&store)
            .preview(
                "alice",
                ImageRequest {
                    crop_coords: Some(json!([0, 0, 1, 1])),
                    ..ImageRequest::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingFile));
        assert_eq!(err.status().code(), 400);
    }

    #[test]
    fn missing_coords_is_bad_request() {
        let store = memory_store();
        let err = service(&store)
            .generate(
                "alice",
                ImageRequest {
                    image: Some(gradient_png(10, 10)),
                    ..ImageRequest::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingCropCoords));
    }

    #[test]
    fn generate_is_a_png_download() {
        let store = memory_store();
        let response = service(&store)
            .generate("alice", request(json!("[10, 10, 120, 80]")))
            .unwrap();

        assert_eq!(response.content_type, "image/png");
        assert_eq!(
            response.content_disposition.as_deref(),
            Some("attachment; filename=\"cropped-image.png\"")
        );
        assert_eq!(decode_png(&response.body).dimensions(), (120, 80));
        assert_eq!(
            response.crop,
            CropRect {
                left: 10,
                top: 10,
                width: 120,
                height: 80
            }
        );
        assert_eq!(response.logo, LogoStage::NotRequested);
    }

    #[test]
    fn preview_is_inline_and_small() {
        let store = memory_store();
        let response = service(&store)
            .preview("alice", request(json!([0, 0, 200, 100])))
            .unwrap();
        assert!(response.content_disposition.is_none());
        assert_eq!((response.width, response.height), (10, 5));
    }

    #[test]
    fn out_of_bounds_crop_is_bad_request() {
        let store = memory_store();
        let err = service(&store)
            .generate("alice", request(json!([150, 0, 51, 10])))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Pipeline(PipelineError::RegionOutOfBounds { .. })
        ));
        assert_eq!(err.status(), ResponseStatus::BadRequest);
    }

    #[test]
    fn undecodable_upload_is_bad_request() {
        let store = memory_store();
        let err = service(&store)
            .generate(
                "alice",
                ImageRequest {
                    image: Some(b"GIF89a".to_vec()),
                    crop_coords: Some(json!([0, 0, 1, 1])),
                    config_id: None,
                },
            )
            .unwrap_err();
        assert_eq!(err.status(), ResponseStatus::BadRequest);
    }

    #[test]
    fn owned_config_applies_logo() {
        let store = memory_store();
        let record = store
            .create(
                "alice",
                NewConfig {
                    position: Some(Position::TopRight),
                    logo: Some(
                        logo_upload(
                            solid_png(20, 10, [0, 0, 0, 255]),
                            None,
                            DEFAULT_MAX_UPLOAD_BYTES,
                        )
                        .unwrap(),
                    ),
                    ..NewConfig::default()
                },
            )
            .unwrap();

        let response = service(&store)
            .generate(
                "alice",
                ImageRequest {
                    config_id: Some(record.id),
                    ..request(json!([0, 0, 200, 100]))
                },
            )
            .unwrap();
        assert!(matches!(response.logo, LogoStage::Applied(_)));
    }

    #[test]
    fn foreign_config_is_not_found_and_pipeline_does_not_run() {
        let store = memory_store();
        let record = store.create("alice", NewConfig::default()).unwrap();

        let err = service(&store)
            .generate(
                "mallory",
                ImageRequest {
                    config_id: Some(record.id),
                    ..request(json!([0, 0, 10, 10]))
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::ConfigNotFound(id) if id == record.id));
        assert_eq!(err.status().code(), 404);
    }

    #[test]
    fn deleted_config_is_not_found() {
        let store = memory_store();
        let record = store.create("alice", NewConfig::default()).unwrap();
        store.soft_delete(record.id, "alice").unwrap();

        let err = service(&store)
            .preview(
                "alice",
                ImageRequest {
                    config_id: Some(record.id),
                    ..request(json!([0, 0, 10, 10]))
                },
            )
            .unwrap_err();
        assert_eq!(err.status(), ResponseStatus::NotFound);
    }

    // =========================================================================
    // Config input helpers and error bodies
    // =========================================================================

    #[test]
    fn logo_upload_requires_png() {
        let asset = logo_upload(
            solid_png(2, 2, [0, 0, 0, 255]),
            Some("a.png".into()),
            DEFAULT_MAX_UPLOAD_BYTES,
        )
        .unwrap();
        assert_eq!(asset.mime_type, "image/png");
        assert_eq!(asset.file_name.as_deref(), Some("a.png"));

        let err = logo_upload(b"GIF89a....".to_vec(), None, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert_eq!(err.status(), ResponseStatus::BadRequest);
    }

    #[test]
    fn oversized_logo_upload_is_rejected() {
        let png = solid_png(8, 8, [0, 0, 0, 255]);
        let limit = png.len() as u64 - 1;
        let err = logo_upload(png, None, limit).unwrap_err();
        assert!(matches!(err, ServiceError::FileTooLarge { limit: l, .. } if l == limit));
        assert_eq!(err.status(), ResponseStatus::BadRequest);
    }

    #[test]
    fn oversized_source_is_rejected_before_decoding() {
        let store = memory_store();
        let source = gradient_png(200, 100);
        let limit = source.len() as u64 - 1;
        let err = service(&store)
            .with_max_upload(limit)
            .generate("alice", request(json!([0, 0, 10, 10])))
            .unwrap_err();
        assert!(matches!(err, ServiceError::FileTooLarge { size, .. } if size == limit + 1));
        assert_eq!(err.status().code(), 400);
    }

    #[test]
    fn upload_limit_message_is_in_megabytes() {
        let err = ServiceError::FileTooLarge {
            size: DEFAULT_MAX_UPLOAD_BYTES + 1,
            limit: DEFAULT_MAX_UPLOAD_BYTES,
        };
        assert_eq!(err.to_string(), "File too large. Maximum size is 50MB.");
    }

    #[test]
    fn position_keywords_are_strict() {
        assert_eq!(parse_position("Bottom-Left").unwrap(), Position::BottomLeft);
        assert!(matches!(
            parse_position("middle"),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn server_error_body_hides_details() {
        let err = ServiceError::Store(StoreError::Lock("poisoned by panic".into()));
        assert_eq!(err.status(), ResponseStatus::ServerError);
        let body = err.body();
        assert!(!body.success);
        assert_eq!(body.error, "Internal server error");

        let err = ServiceError::MissingFile;
        assert_eq!(err.body().error, "No image file provided");
    }

    #[test]
    fn store_validation_is_bad_request() {
        let err = ServiceError::from(StoreError::Validation("scaleDown".into()));
        assert_eq!(err.status(), ResponseStatus::BadRequest);
    }
}
