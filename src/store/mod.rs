//! Logo configuration storage.
//!
//! The pipeline only needs one capability from storage: look up a logo
//! configuration by id for a given identity. That is the [`ConfigGateway`]
//! trait. [`SqliteStore`] implements it on top of a relational table and also
//! provides the management operations (create, update, list, soft delete).
//!
//! Every read and write is scoped to the owning identity. A record belonging
//! to someone else is indistinguishable from a record that does not exist.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::imaging::{LogoConfig, Position};
use serde::Serialize;
use thiserror::Error;

/// Largest accepted `scale_down` value.
pub const MAX_SCALE_DOWN: f64 = 0.25;

/// Default page size for [`SqliteStore::list`].
pub const DEFAULT_LIST_LIMIT: u32 = 50;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
    #[error("Store lock poisoned: {0}")]
    Lock(String),
}

/// Read-only lookup used by the request boundary before running the pipeline.
pub trait ConfigGateway: Send + Sync {
    /// Fetch an active configuration owned by `identity`.
    ///
    /// Returns `Ok(None)` for unknown ids, deleted records, and records owned
    /// by another identity.
    fn fetch_by_id(&self, id: i64, identity: &str) -> Result<Option<LogoConfig>, StoreError>;
}

/// Logo image attached to a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoAsset {
    pub data: Vec<u8>,
    pub mime_type: String,
    /// Original upload name, kept for display only.
    pub file_name: Option<String>,
}

impl LogoAsset {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A stored configuration row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigRecord {
    pub id: i64,
    pub user_id: String,
    pub scale_down: Option<f64>,
    pub position: Position,
    pub description: Option<String>,
    pub logo: Option<LogoAsset>,
    pub is_active: bool,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub updated_at: i64,
}

impl ConfigRecord {
    /// Immutable snapshot handed to the pipeline.
    pub fn to_logo_config(&self) -> LogoConfig {
        LogoConfig {
            scale_down: self.scale_down,
            position: self.position,
            logo_bytes: self.logo.as_ref().map(|l| l.data.clone()),
            mime_type: self.logo.as_ref().map(|l| l.mime_type.clone()),
        }
    }

    /// API-facing view without the logo payload.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            id: self.id,
            scale_down: self.scale_down,
            logo_position: self.position,
            logo_file_name: self.logo.as_ref().and_then(|l| l.file_name.clone()),
            logo_file_size: self.logo.as_ref().map(LogoAsset::size),
            logo_mime_type: self.logo.as_ref().map(|l| l.mime_type.clone()),
            has_logo: self.logo.is_some(),
            is_active: self.is_active,
            created_at: format_millis(self.created_at),
            updated_at: format_millis(self.updated_at),
            description: self.description.clone(),
        }
    }
}

fn format_millis(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

/// JSON shape returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub id: i64,
    pub scale_down: Option<f64>,
    pub logo_position: Position,
    pub logo_file_name: Option<String>,
    pub logo_file_size: Option<usize>,
    pub logo_mime_type: Option<String>,
    pub has_logo: bool,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub description: Option<String>,
}

/// Fields for a new configuration. Position defaults to `top-left`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewConfig {
    pub scale_down: Option<f64>,
    pub position: Option<Position>,
    pub description: Option<String>,
    pub logo: Option<LogoAsset>,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigUpdate {
    pub scale_down: Option<f64>,
    pub position: Option<Position>,
    pub description: Option<String>,
    pub logo: Option<LogoAsset>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.scale_down.is_none()
            && self.position.is_none()
            && self.description.is_none()
            && self.logo.is_none()
    }
}

/// `scale_down`, when present, must be a finite number in `(0, 0.25]`.
pub fn validate_scale_down(scale_down: Option<f64>) -> Result<(), StoreError> {
    match scale_down {
        Some(s) if !s.is_finite() || s <= 0.0 || s > MAX_SCALE_DOWN => {
            Err(StoreError::Validation(format!(
                "scaleDown must be a number in (0, {MAX_SCALE_DOWN}], got {s}"
            )))
        }
        _ => Ok(()),
    }
}
