//! # CLI Module
//!
//! This module provides the command-line interface for raster-tools, including:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML)
//! - Environment variable support with the RASTER_TOOLS_ prefix
//! - Merging of command-line values over configuration file values
//! - Template generation for job configuration files

use crate::input::{JobConfig, default_pattern};
use crate::loader::FailurePolicy;
use crate::year::{RegexYear, YearConfig};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Batch GeoTIFF loading and inspection
#[derive(Parser, Debug)]
#[command(name = "raster-tools")]
#[command(about = "Load, inspect and filter single-band GeoTIFF rasters")]
#[command(version)]
#[command(long_about = "
raster-tools reads single-band GeoTIFF rasters into memory, either one file at a
time or every file of a directory matching a glob pattern.

FEATURES:
  • Batch loading: every matching raster of a directory, keyed by path
  • Year tagging: a year token taken from each file name
  • Inspection: dimensions, data type, CRS, resolution, no-data and value range
  • Negative-to-zero filter that leaves the no-data value untouched
  • Configuration files: JSON and YAML job files with templates
  • Shell completions: bash, zsh, fish and PowerShell

EXAMPLES:
  # Load every .tif of a directory
  raster-tools load data/dems

  # Custom pattern and year regex
  raster-tools load data/dems -p 'dem_*.tiff' --year-regex '_(\\d{4})\\.tiff$'

  # Inspect one file as JSON
  raster-tools info data/dems/dem_2001.tif --format json

  # Zero out negative values (writes dem_2001_bumped.tif)
  raster-tools bump data/dems/dem_2001.tif

  # Using a config file
  raster-tools load --config job.yaml
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "RASTER_TOOLS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load every matching raster of a directory
    #[command(long_about = "
Load every raster of a directory whose file name matches a glob pattern.

Only the directory itself is scanned, subdirectories are ignored. Each file
is read fully into memory and tagged with the year found in its name.
Unreadable files are reported and skipped unless --on-error abort is given.

EXAMPLES:
  # Default pattern '*.tif', year = first four consecutive digits
  raster-tools load data/dems

  # Regex year extraction, sorted, JSON summary
  raster-tools load data/dems --year-regex '_(\\d{4})\\.tif$' --sort --format json

  # Stop at the first unreadable file
  raster-tools load data/dems --on-error abort
")]
    Load {
        /// Directory containing the rasters
        #[arg(value_name = "DIR", env = "RASTER_TOOLS_INPUT_DIR")]
        dir: Option<PathBuf>,

        /// Glob matched against file names
        #[arg(short, long, env = "RASTER_TOOLS_PATTERN")]
        pattern: Option<String>,

        /// Regular expression for the year (first capture group)
        #[arg(long, env = "RASTER_TOOLS_YEAR_REGEX", value_parser = parse_year_regex)]
        year_regex: Option<String>,

        /// Do not extract a year from file names (wins over --year-regex)
        #[arg(long)]
        no_year: bool,

        /// Per-file failure policy
        #[arg(long, value_enum, env = "RASTER_TOOLS_ON_ERROR")]
        on_error: Option<FailurePolicy>,

        /// Load files in lexicographic order
        #[arg(long)]
        sort: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,

        /// Output format for the summary
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show information about a raster file
    #[command(long_about = "
Inspect a GeoTIFF file and display its profile.

Reported: dimensions, band count, data type, CRS, origin, resolution,
bounds, no-data value and the value range of band 1 (no-data excluded).

EXAMPLES:
  raster-tools info dem.tif
  raster-tools info dem.tif --format yaml
")]
    Info {
        /// Raster file path
        file: PathBuf,

        /// Output format for file information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Replace negative values with zero
    #[command(long_about = "
Read a raster, replace every value below the threshold (0 by default) that is
not the no-data value, and write the result with the source profile.

Without OUTPUT the result is written next to the input with a '_bumped'
suffix: dem.tif becomes dem_bumped.tif.

EXAMPLES:
  raster-tools bump dem.tif
  raster-tools bump dem.tif clean.tif --force
  raster-tools bump dem.tif --threshold 10 --replacement 10
")]
    Bump {
        /// Input raster file
        input: PathBuf,

        /// Output raster file (default: <input>_bumped.<ext>)
        output: Option<PathBuf>,

        /// Values strictly below this are replaced
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        threshold: f64,

        /// Value written in place of filtered cells
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        replacement: f64,

        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration file
    #[command(long_about = "
Validate a job configuration file without loading any raster.

Checks the file syntax, the glob pattern, the year regex and, with
--detailed, that the input directory exists.

EXAMPLES:
  raster-tools validate job.json
  raster-tools validate --config job.yaml --detailed
")]
    Validate {
        /// Configuration file to validate
        config_file: Option<PathBuf>,

        /// Show detailed validation report
        #[arg(long)]
        detailed: bool,
    },

    /// Generate configuration templates
    #[command(long_about = "
Generate job configuration templates.

Available templates:
• basic: directory and pattern with default year extraction
• yearly: regex year extraction, sorted, abort on first failure

EXAMPLES:
  raster-tools template basic
  raster-tools template yearly --format yaml -o job.yaml
")]
    Template {
        /// Template type to generate
        #[arg(value_enum)]
        template_type: TemplateType,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish and PowerShell.

EXAMPLES:
  raster-tools completions bash > ~/.bash_completion.d/raster-tools
  raster-tools completions zsh -o _raster-tools
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
    /// CSV output
    Csv,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum TemplateType {
    /// Directory and pattern only
    Basic,
    /// Regex year extraction
    Yearly,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

/// Values of the `load` command that can override a configuration file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOverrides {
    pub dir: Option<PathBuf>,
    pub pattern: Option<String>,
    pub year_regex: Option<String>,
    pub no_year: bool,
    pub on_error: Option<FailurePolicy>,
    pub sort: bool,
}

/// Checks a year regex at parse time
/// Format: any regular expression, the first capture group is the year
fn parse_year_regex(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("Year regex must not be empty".to_string());
    }
    RegexYear::new(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

/// Builds the job configuration for `load`.
///
/// Command-line values (including their environment variables) take
/// priority over `base`, which takes priority over the defaults. Without a
/// configuration file a directory is required.
pub fn merge_job_config(base: Option<JobConfig>, overrides: LoadOverrides) -> Result<JobConfig> {
    let mut config = match (base, overrides.dir.as_ref()) {
        (Some(config), _) => config,
        (None, Some(dir)) => JobConfig::new(dir.clone()),
        (None, None) => bail!(
            "No input directory given. Pass DIR, set RASTER_TOOLS_INPUT_DIR or use --config"
        ),
    };

    if let Some(dir) = overrides.dir {
        config.input_dir = dir;
    }
    if let Some(pattern) = overrides.pattern {
        config.pattern = pattern;
    }
    if overrides.no_year {
        config.year = YearConfig::None;
    } else if let Some(pattern) = overrides.year_regex {
        config.year = YearConfig::Regex { pattern };
    }
    if let Some(policy) = overrides.on_error {
        config.on_error = policy;
    }
    if overrides.sort {
        config.sort_paths = true;
    }
    Ok(config)
}

/// Job configuration written by `template`
pub fn generate_template(template_type: &TemplateType) -> JobConfig {
    match template_type {
        TemplateType::Basic => JobConfig {
            input_dir: PathBuf::from("data/rasters"),
            pattern: default_pattern(),
            year: YearConfig::FirstFourDigits,
            on_error: FailurePolicy::Collect,
            sort_paths: false,
        },
        TemplateType::Yearly => JobConfig {
            input_dir: PathBuf::from("data/dems"),
            pattern: "dem_*.tif".to_string(),
            year: YearConfig::Regex {
                pattern: r"_(\d{4})\.tif$".to_string(),
            },
            on_error: FailurePolicy::Abort,
            sort_paths: true,
        },
    }
}

pub fn render_template(config: &JobConfig, format: &ConfigFormat) -> Result<String> {
    match format {
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).context("Failed to serialize template to JSON")
        }
        ConfigFormat::Yaml => {
            serde_yaml::to_string(config).context("Failed to serialize template to YAML")
        }
    }
}

// Serializes tests that read or write RASTER_TOOLS_ environment variables
#[cfg(test)]
pub(crate) static ENV_TEST_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
