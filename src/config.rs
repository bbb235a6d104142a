//! Converter configuration.
//!
//! Handles loading, validating, and merging `dropconvert.toml`. A user file
//! is sparse: stock defaults are the base layer and the file overrides just
//! the keys it names. Command-line flags override both.
//!
//! ## Config File Location
//!
//! `--config FILE` names the file explicitly. Without it, `dropconvert.toml`
//! in the working directory is used when present.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! format = "JPG"                  # JPG | JPEG | PNG | WEBP | TIFF | BMP
//! quality = 90                    # JPEG and WebP quality (1-100)
//! keep_exif = true                # Carry EXIF over when both formats allow it
//! suffix = "_converted"           # Appended to the source file stem
//! output_dir = "converted_output" # Where converted files are written
//! background = "#ffffff"          # Fill under transparent pixels for JPEG
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::convert::ConvertOptions;
use crate::formats::TargetFormat;
use crate::imaging::{Background, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "dropconvert.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `dropconvert.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Output format preselected for a batch.
    pub format: TargetFormat,
    /// JPEG encoding quality (1-100).
    pub quality: u32,
    /// Carry EXIF metadata into formats that can hold it.
    pub keep_exif: bool,
    /// Appended to the source stem when naming outputs.
    pub suffix: String,
    /// Directory converted files are written to.
    pub output_dir: String,
    /// `#rrggbb` color painted under transparency for JPEG output.
    pub background: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            format: TargetFormat::Jpg,
            quality: 90,
            keep_exif: true,
            suffix: "_converted".to_string(),
            output_dir: "converted_output".to_string(),
            background: "#ffffff".to_string(),
        }
    }
}

impl ConverterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        self.background
            .parse::<Background>()
            .map_err(|e| ConfigError::Validation(format!("background: {e}")))?;
        if self.output_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output_dir must not be empty".into(),
            ));
        }
        if self.suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "suffix must not contain path separators".into(),
            ));
        }
        Ok(())
    }

    /// Conversion options for a batch. Call on a validated config.
    pub fn to_options(&self) -> Result<ConvertOptions, ConfigError> {
        let background = self
            .background
            .parse::<Background>()
            .map_err(|e| ConfigError::Validation(format!("background: {e}")))?;
        Ok(ConvertOptions {
            output_dir: PathBuf::from(&self.output_dir),
            quality: Quality::new(self.quality),
            keep_exif: self.keep_exif,
            suffix: self.suffix.clone(),
            background,
        })
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ConverterConfig::default())?)
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

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ConverterConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConverterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config.
///
/// An explicit file must exist. Otherwise `dropconvert.toml` in `dir` is used
/// if present, and stock defaults if not.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<ConverterConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => Some(load_raw_config(path)?),
        None => {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                Some(load_raw_config(&candidate)?)
            } else {
                None
            }
        }
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `dropconvert.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# dropconvert configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override them.
# Unknown keys will cause an error.

# Output format: JPG, JPEG, PNG, WEBP, TIFF or BMP.
# JPG and JPEG produce the same file and differ only in extension.
format = "JPG"

# JPEG and WebP encoding quality (1 = worst, 100 = best).
# PNG, TIFF and BMP are lossless and ignore this.
quality = 90

# Copy EXIF metadata (camera, date, GPS...) into the output.
# Not possible for BMP.
keep_exif = true

# Appended to the original file name: photo.png -> photo_converted.jpg
# Must not contain "/" or "\".
suffix = "_converted"

# Directory converted files are written to (created when needed).
output_dir = "converted_output"

# JPEG has no transparency; transparent pixels are painted this color.
background = "#ffffff"
"##
}
