#![forbid(unsafe_code)]

//! Sizing configuration as data.
//!
//! A [`SizingConfig`] holds the global sizing defaults for both axes and can
//! be loaded from TOML or JSON at startup.
//!
//! ```toml
//! dpi = 144
//!
//! [columns]
//! default_size = 120
//! default_min_size = 24
//! percentage_sizing = true
//!
//! [rows]
//! resizable = false
//! ```
//!
//! ```rust,ignore
//! let config = SizingConfig::from_toml_file("tabula.toml")?;
//! let columns = config.build_allocator(Axis::Column);
//! ```
//!
//! Every field is optional. Omitted fields keep the defaults, which match
//! [`SizeAllocator::new`] with a 100 px column and a 20 px row.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tabula_core::{Axis, BASE_DPI};
use thiserror::Error;

use crate::allocator::SizeAllocator;

/// Default column width in logical pixels.
pub const DEFAULT_COLUMN_SIZE: u32 = 100;
/// Default row height in logical pixels.
pub const DEFAULT_ROW_SIZE: u32 = 20;

/// Global sizing defaults for both axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Column defaults.
    pub columns: AxisSizing,
    /// Row defaults.
    pub rows: AxisSizing,
    /// Display density in dots per inch.
    pub dpi: u32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            columns: AxisSizing::default(),
            rows: AxisSizing::default(),
            dpi: BASE_DPI,
        }
    }
}

/// Sizing defaults for one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisSizing {
    /// Default size in logical pixels. `None` uses the axis default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_size: Option<u32>,
    /// Minimum applied to every position without its own.
    pub default_min_size: u32,
    /// Whether positions accept resizes by default.
    pub resizable: bool,
    /// Whether the axis shares its space by percentage.
    pub percentage_sizing: bool,
}

impl Default for AxisSizing {
    fn default() -> Self {
        Self {
            default_size: None,
            default_min_size: 0,
            resizable: true,
            percentage_sizing: false,
        }
    }
}

impl AxisSizing {
    /// Effective default size on `axis`.
    #[must_use]
    pub fn default_size_for(&self, axis: Axis) -> u32 {
        self.default_size.unwrap_or(match axis {
            Axis::Column => DEFAULT_COLUMN_SIZE,
            Axis::Row => DEFAULT_ROW_SIZE,
        })
    }

    fn validate_into(&self, axis: Axis, errors: &mut Vec<String>) {
        let name = match axis {
            Axis::Column => "columns",
            Axis::Row => "rows",
        };
        let size = self.default_size_for(axis);
        if size == 0 {
            errors.push(format!("{name}.default_size must be > 0"));
        }
        if self.default_min_size > size {
            errors.push(format!(
                "{name}.default_min_size ({}) exceeds default_size ({size})",
                self.default_min_size
            ));
        }
    }
}

impl SizingConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Serialize to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(vec![e.to_string()]))
    }

    /// Defaults for `axis`.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &AxisSizing {
        match axis {
            Axis::Column => &self.columns,
            Axis::Row => &self.rows,
        }
    }

    /// Validate every parameter.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.dpi == 0 {
            errors.push("dpi must be > 0".to_string());
        }
        self.columns.validate_into(Axis::Column, &mut errors);
        self.rows.validate_into(Axis::Row, &mut errors);
        errors
    }

    /// `self` if it validates, else every validation error.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// A fresh allocator for `axis` carrying these defaults.
    #[must_use]
    pub fn build_allocator(&self, axis: Axis) -> SizeAllocator {
        let sizing = self.axis(axis);
        let mut allocator = SizeAllocator::new(sizing.default_size_for(axis));
        allocator.set_default_min_size(sizing.default_min_size);
        allocator.set_default_resizable(sizing.resizable);
        allocator.set_percentage_sizing(sizing.percentage_sizing);
        allocator.set_dpi(self.dpi);
        allocator
    }
}

/// Errors that can occur when loading a sizing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// Validation errors.
    #[error("validation errors: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validates_clean() {
        let errors = SizingConfig::default().validate();
        assert!(errors.is_empty(), "default should validate: {errors:?}");
    }

    #[test]
    fn axis_defaults_differ() {
        let config = SizingConfig::default();
        assert_eq!(config.columns.default_size_for(Axis::Column), 100);
        assert_eq!(config.rows.default_size_for(Axis::Row), 20);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SizingConfig::from_toml_str(
            r"
            dpi = 144

            [rows]
            resizable = false
            ",
        )
        .unwrap();
        assert_eq!(config.dpi, 144);
        assert!(!config.rows.resizable);
        assert_eq!(config.rows.default_size_for(Axis::Row), 20);
        assert!(config.columns.resizable);
        assert!(!config.columns.percentage_sizing);
    }

    #[test]
    fn json_overrides() {
        let config = SizingConfig::from_json_str(
            r#"{"columns": {"default_size": 80, "percentage_sizing": true}}"#,
        )
        .unwrap();
        assert_eq!(config.columns.default_size, Some(80));
        assert!(config.columns.percentage_sizing);
        assert_eq!(config.dpi, BASE_DPI);
    }

    #[test]
    fn malformed_input_is_reported() {
        assert!(matches!(
            SizingConfig::from_toml_str("dpi = \"high\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            SizingConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            SizingConfig::from_toml_file("/nonexistent/tabula.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn multiple_validation_errors_collected() {
        let mut config = SizingConfig::default();
        config.dpi = 0;
        config.columns.default_size = Some(0);
        config.rows.default_min_size = 50;
        let errors = config.validate();
        assert_eq!(errors.len(), 3, "should catch every error: {errors:?}");
        assert!(errors.iter().any(|e| e.contains("rows.default_min_size")));

        let err = config.validated().unwrap_err();
        assert!(err.to_string().starts_with("validation errors: "));
    }

    #[test]
    fn build_allocator_applies_defaults() {
        let mut config = SizingConfig::default();
        config.dpi = 192;
        config.rows.default_min_size = 30;
        config.rows.resizable = false;

        let mut rows = config.build_allocator(Axis::Row);
        assert_eq!(rows.get_size(0), 60);
        assert!(!rows.set_size(0, 10));

        let columns = config.build_allocator(Axis::Column);
        assert_eq!(columns.get_size(0), 200);
        assert!(!columns.uses_percentages());
    }

    #[test]
    fn config_files_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("sizing.toml");
        std::fs::write(&toml_path, "[columns]\ndefault_size = 64\n").unwrap();
        let config = SizingConfig::from_toml_file(&toml_path).unwrap();
        assert_eq!(config.columns.default_size, Some(64));

        let json_path = dir.path().join("sizing.json");
        std::fs::write(&json_path, r#"{"rows": {"default_min_size": 8}}"#).unwrap();
        let config = SizingConfig::from_json_file(&json_path).unwrap();
        assert_eq!(config.rows.default_min_size, 8);
    }

    #[test]
    fn toml_round_trip() {
        let mut config = SizingConfig::default();
        config.columns.percentage_sizing = true;
        config.rows.default_size = Some(24);
        let text = config.to_toml_string().unwrap();
        assert_eq!(SizingConfig::from_toml_str(&text).unwrap(), config);
    }
}
