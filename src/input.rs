//! # Input Configuration Module
//!
//! Job configuration for batch loads, read from JSON or YAML files.
//!
//! ## Configuration Structure
//!
//! - **input_dir**: directory holding the rasters
//! - **pattern**: glob matched against file names (default `*.tif`)
//! - **year**: year extraction strategy (default `first_four_digits`)
//! - **on_error**: `collect` (default) or `abort`
//! - **sort_paths**: load in lexicographic order (default `false`)
//!
//! ## Example Usage
//!
//! ```rust
//! use raster_tools::input::JobConfig;
//!
//! let json = r#"
//! {
//!   "input_dir": "data/dems",
//!   "pattern": "*.tif",
//!   "year": { "kind": "regex", "pattern": "_(\\d{4})\\.tif$" },
//!   "on_error": "abort"
//! }"#;
//! let config = JobConfig::from_json(json)?;
//! assert_eq!(config.pattern, "*.tif");
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::loader::{FailurePolicy, LoadOptions};
use crate::year::YearConfig;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration of one batch load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Directory containing the rasters
    pub input_dir: PathBuf,
    /// Glob matched against file names
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Year extraction strategy
    #[serde(default)]
    pub year: YearConfig,
    /// Per-file failure policy
    #[serde(default)]
    pub on_error: FailurePolicy,
    /// Load files in lexicographic path order
    #[serde(default)]
    pub sort_paths: bool,
}

pub fn default_pattern() -> String {
    "*.tif".to_string()
}

impl JobConfig {
    pub fn new<P: Into<PathBuf>>(input_dir: P) -> Self {
        JobConfig {
            input_dir: input_dir.into(),
            pattern: default_pattern(),
            year: YearConfig::default(),
            on_error: FailurePolicy::default(),
            sort_paths: false,
        }
    }

    /// Loads a job configuration from a JSON or YAML file.
    ///
    /// The format is chosen by extension (`.yaml`/`.yml` for YAML, anything
    /// else is parsed as JSON).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        };
        config.with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: JobConfig = serde_json::from_str(json_str).context("Failed to parse JSON configuration")?;
        Ok(config)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let config: JobConfig = serde_yaml::from_str(yaml_str).context("Failed to parse YAML configuration")?;
        Ok(config)
    }

    /// Checks everything that can be checked without reading rasters.
    pub fn validate(&self) -> Result<()> {
        if self.input_dir.as_os_str().is_empty() {
            bail!("input_dir must not be empty");
        }
        if self.pattern.trim().is_empty() {
            bail!("pattern must not be empty");
        }
        if self.pattern.contains('/') || self.pattern.contains(std::path::MAIN_SEPARATOR) {
            bail!(
                "pattern '{}' is matched against file names and cannot contain a path separator",
                self.pattern
            );
        }
        glob::Pattern::new(&self.pattern)
            .with_context(|| format!("Invalid file pattern '{}'", self.pattern))?;
        self.year
            .to_extractor()
            .context("Invalid year extraction strategy")?;
        Ok(())
    }

    /// Builds loader options from this configuration
    pub fn to_load_options(&self, show_progress: bool) -> Result<LoadOptions> {
        let year = self.year.to_extractor()?;
        Ok(LoadOptions::default()
            .with_year_boxed(year)
            .on_error(self.on_error)
            .sorted(self.sort_paths)
            .progress(show_progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = JobConfig::from_json(r#"{"input_dir": "dems"}"#).unwrap();
        assert_eq!(config, JobConfig::new("dems"));
        assert_eq!(config.pattern, "*.tif");
        assert_eq!(config.on_error, FailurePolicy::Collect);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = "input_dir: /data/dems\npattern: '*.tiff'\non_error: abort\nsort_paths: true\nyear:\n  kind: none\n";
        let config = JobConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("/data/dems"));
        assert_eq!(config.pattern, "*.tiff");
        assert_eq!(config.on_error, FailurePolicy::Abort);
        assert!(config.sort_paths);
        assert_eq!(config.year, YearConfig::None);
    }

    #[test]
    fn test_missing_input_dir_is_error() {
        assert!(JobConfig::from_json(r#"{"pattern": "*.tif"}"#).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = JobConfig::new("dems");
        assert!(config.validate().is_ok());

        config.pattern = "sub/*.tif".to_string();
        assert!(config.validate().is_err());

        config.pattern = "[".to_string();
        assert!(config.validate().is_err());

        config.pattern = "*.tif".to_string();
        config.year = YearConfig::Regex {
            pattern: "(".to_string(),
        };
        assert!(config.validate().is_err());
    }
}
