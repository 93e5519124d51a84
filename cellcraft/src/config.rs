//! Workbook-wide behaviour switches

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options read by worksheets when dispatching writes and by the package
/// layer when converting dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookConfig {
    /// Store numeric-looking text passed to `write` as numbers
    pub strings_to_numbers: bool,
    /// Store URL-looking text passed to `write` as hyperlinks
    pub strings_to_hyperlinks: bool,
    /// Use the 1904 date system
    pub date1904: bool,
    /// Row height in points written to `sheetFormatPr`
    pub default_row_height: f64,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            strings_to_numbers: true,
            strings_to_hyperlinks: true,
            date1904: false,
            default_row_height: 15.0,
        }
    }
}

impl WorkbookConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: WorkbookConfig = toml::from_str(content).context("Invalid workbook configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkbookConfig::default();
        assert!(config.strings_to_numbers);
        assert!(config.strings_to_hyperlinks);
        assert!(!config.date1904);
        assert_eq!(config.default_row_height, 15.0);
    }

    #[test]
    fn test_partial_toml() {
        let config = WorkbookConfig::from_toml("strings_to_numbers = false\ndate1904 = true\n").unwrap();
        assert!(!config.strings_to_numbers);
        assert!(config.strings_to_hyperlinks);
        assert!(config.date1904);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cellcraft.toml");
        fs::write(&path, "default_row_height = 20.5\n").unwrap();
        let config = WorkbookConfig::from_file(&path).unwrap();
        assert_eq!(config.default_row_height, 20.5);
        assert!(WorkbookConfig::from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(WorkbookConfig::from_toml("strings_to_numbers = \"yes\"").is_err());
    }
}
