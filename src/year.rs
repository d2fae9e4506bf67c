//! # Year Extraction
//!
//! Strategies for pulling a year token out of a raster file name. The batch
//! loader takes any [`YearExtractor`]; the strategy only ever sees the file
//! name, never the directory part of the path.

use crate::error::{RasterError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Extracts a year attribute from a file name.
pub trait YearExtractor {
    /// Returns the year token, or `None` when the name carries none
    fn extract(&self, file_name: &str) -> Option<String>;

    /// Short identifier used in logs and summaries
    fn name(&self) -> &str;
}

/// First run of four consecutive ASCII digits, by position.
///
/// `data_1998_v2.tif` yields `1998`; `data_v2.tif` yields nothing. Names
/// carrying other four-digit numbers (resolutions, versions) before the
/// year will misfire; use [`RegexYear`] for those.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFourDigits;

impl YearExtractor for FirstFourDigits {
    fn extract(&self, file_name: &str) -> Option<String> {
        let bytes = file_name.as_bytes();
        bytes
            .windows(4)
            .position(|w| w.iter().all(u8::is_ascii_digit))
            .map(|start| file_name[start..start + 4].to_string())
    }

    fn name(&self) -> &str {
        "first_four_digits"
    }
}

/// User-supplied regular expression.
///
/// The first capture group is the year; a pattern without groups uses the
/// whole match.
#[derive(Debug, Clone)]
pub struct RegexYear {
    regex: Regex,
}

impl RegexYear {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| RasterError::InvalidRegex(e.to_string()))?;
        Ok(Self { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl YearExtractor for RegexYear {
    fn extract(&self, file_name: &str) -> Option<String> {
        let captures = self.regex.captures(file_name)?;
        captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str().to_string())
    }

    fn name(&self) -> &str {
        "regex"
    }
}

/// Never extracts a year.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYear;

impl YearExtractor for NoYear {
    fn extract(&self, _file_name: &str) -> Option<String> {
        None
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Serializable choice of year strategy, as found in job configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YearConfig {
    #[default]
    FirstFourDigits,
    Regex {
        pattern: String,
    },
    None,
}

impl YearConfig {
    /// Builds the strategy this configuration names
    pub fn to_extractor(&self) -> Result<Box<dyn YearExtractor>> {
        match self {
            YearConfig::FirstFourDigits => Ok(Box::new(FirstFourDigits)),
            YearConfig::Regex { pattern } => Ok(Box::new(RegexYear::new(pattern)?)),
            YearConfig::None => Ok(Box::new(NoYear)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            YearConfig::FirstFourDigits => "first_four_digits",
            YearConfig::Regex { .. } => "regex",
            YearConfig::None => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_four_digits() {
        let year = FirstFourDigits;
        assert_eq!(year.extract("data_1998_v2.tif"), Some("1998".to_string()));
        assert_eq!(year.extract("data_v2.tif"), None);
        assert_eq!(year.extract("dem2020.tif"), Some("2020".to_string()));
        assert_eq!(year.extract("123.tif"), None);
        // first run by position, even inside a longer number
        assert_eq!(year.extract("tile_198765.tif"), Some("1987".to_string()));
    }

    #[test]
    fn test_first_four_digits_misfires_on_resolution_tags() {
        let year = FirstFourDigits;
        assert_eq!(
            year.extract("dem_1024px_2015.tif"),
            Some("1024".to_string())
        );
    }

    #[test]
    fn test_regex_year_capture_group() {
        let year = RegexYear::new(r"_(\d{4})\.tif$").unwrap();
        assert_eq!(
            year.extract("dem_1024px_2015.tif"),
            Some("2015".to_string())
        );
        assert_eq!(year.extract("dem_1024px.tif"), None);
    }

    #[test]
    fn test_regex_year_whole_match() {
        let year = RegexYear::new(r"(?:19|20)\d\d").unwrap();
        assert_eq!(year.extract("v1234_2003.tif"), Some("2003".to_string()));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            RegexYear::new("(unclosed"),
            Err(RasterError::InvalidRegex(_))
        ));
    }

    #[test]
    fn test_no_year() {
        assert_eq!(NoYear.extract("data_1998.tif"), None);
    }

    #[test]
    fn test_year_config_from_json() {
        let config: YearConfig = serde_json::from_str(r#"{"kind": "regex", "pattern": "(\\d{4})"}"#).unwrap();
        assert_eq!(config.kind(), "regex");
        let extractor = config.to_extractor().unwrap();
        assert_eq!(extractor.extract("a_2001.tif"), Some("2001".to_string()));

        let config: YearConfig = serde_json::from_str(r#"{"kind": "none"}"#).unwrap();
        assert_eq!(config, YearConfig::None);
    }
}
