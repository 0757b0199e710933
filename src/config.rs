//! Application settings.
//!
//! Handles loading, validating, and merging `cropmark.toml`. Stock defaults are
//! serialized to a TOML table, the user file is merged on top, and the result
//! is deserialized with unknown keys rejected.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [database]
//! path = "cropmark.db"          # SQLite file holding logo configurations
//!
//! [limits]
//! max_width = 16384             # Largest accepted image width in pixels
//! max_height = 16384            # Largest accepted image height in pixels
//! max_alloc_mb = 512            # Decoder allocation ceiling
//! max_upload_mb = 50            # Largest accepted upload (source or logo)
//!
//! [output]
//! download_filename = "cropped-image.png"
//! ```
//!
//! Config files are sparse: override just the values you want.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::imaging::DecodeLimits;
use crate::service::DEFAULT_MAX_UPLOAD_BYTES;

/// File name looked up in the working directory when `--settings` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "cropmark.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings loaded from `cropmark.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub limits: LimitsConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_width == 0 || self.limits.max_height == 0 {
            return Err(ConfigError::Validation(
                "limits.max_width and limits.max_height must be non-zero".into(),
            ));
        }
        if self.limits.max_alloc_mb == 0 || self.limits.max_upload_mb == 0 {
            return Err(ConfigError::Validation(
                "limits.max_alloc_mb and limits.max_upload_mb must be non-zero".into(),
            ));
        }
        let name = &self.output.download_filename;
        if name.trim().is_empty() || !name.to_ascii_lowercase().ends_with(".png") {
            return Err(ConfigError::Validation(
                "output.download_filename must be a non-empty .png file name".into(),
            ));
        }
        if name.contains(['"', '/', '\\']) {
            return Err(ConfigError::Validation(
                "output.download_filename must not contain quotes or path separators".into(),
            ));
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.limits.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits {
            max_width: self.limits.max_width,
            max_height: self.limits.max_height,
            max_alloc: self.limits.max_alloc_mb.saturating_mul(1024 * 1024),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite database file.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cropmark.db"),
        }
    }
}

/// Decode bounds for uploaded images and logos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub max_alloc_mb: u64,
    /// Byte ceiling for uploaded sources and logos, in MiB.
    pub max_upload_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = DecodeLimits::default();
        Self {
            max_width: limits.max_width,
            max_height: limits.max_height,
            max_alloc_mb: limits.max_alloc / (1024 * 1024),
            max_upload_mb: DEFAULT_MAX_UPLOAD_BYTES / (1024 * 1024),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Suggested file name for full-resolution downloads.
    pub download_filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_filename: "cropped-image.png".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge user TOML text over stock defaults, deserialize, and validate.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value()?, overlay);
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load settings from `path`.
///
/// A missing file yields the stock defaults; an unreadable or invalid file is
/// an error.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `cropmark.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# cropmark configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Configuration store
# ---------------------------------------------------------------------------
[database]
# SQLite file holding per-user logo configurations.
path = "cropmark.db"

# ---------------------------------------------------------------------------
# Decode limits
# ---------------------------------------------------------------------------
# Uploaded images and stored logos larger than this are rejected before
# their pixels are allocated.
[limits]
max_width = 16384
max_height = 16384
max_alloc_mb = 512
# Uploads (source images and logos) larger than this many MiB are rejected.
max_upload_mb = 50

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# File name suggested to clients when downloading the full-resolution crop.
download_filename = "cropped-image.png"
"##
}
