//! # raster-tools
//!
//! A Rust library for reading single-band GeoTIFF rasters into memory, one
//! file at a time or a whole directory at once.
//!
//! ## Features
//!
//! - **Batch loading**: every raster of a directory whose file name matches a glob pattern
//! - **Year tagging**: pluggable extraction of a year token from file names
//! - **Typed arrays**: band 1 kept in its native sample type, with its profile
//! - **Round-trip writing**: dimensions, data type, CRS, transform and no-data preserved
//! - **Negative-to-zero filter**: no-data aware pixel replacement
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use raster_tools::{process_job, input::JobConfig};
//!
//! let config = JobConfig::from_file("job.json")?;
//! let rasters = process_job(&config, false)?;
//! for record in &rasters {
//!     println!("{} -> {:?}", record.path.display(), record.year);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "input_dir": "data/dems",
//!   "pattern": "dem_*.tif",
//!   "year": { "kind": "regex", "pattern": "_(\\d{4})\\.tif$" },
//!   "on_error": "collect",
//!   "sort_paths": true
//! }
//! ```

pub mod cli;
pub mod error;
pub mod filters;
pub mod geotiff;
pub mod info;
pub mod input;
pub mod loader;
pub mod log;
pub mod raster;
pub mod year;

#[cfg(test)]
mod cli_tests;

pub use crate::error::{RasterError, Result};
pub use crate::geotiff::{read_raster, write_raster};
pub use crate::loader::{FailurePolicy, LoadOptions, RasterCollection, rasters_to_dict};
pub use crate::raster::{PixelArray, Profile, RasterRecord};

use crate::input::JobConfig;
use anyhow::Context;

/// Runs the batch loader described by a job configuration.
///
/// # Arguments
///
/// * `config` - The job configuration naming the directory, pattern and strategies
/// * `show_progress` - Draw a progress bar on stderr
///
/// # Returns
///
/// The loaded collection. With the `collect` policy, files that could not be
/// read are listed in [`RasterCollection::failures`].
///
/// # Errors
///
/// This function will return an error if:
/// - The configuration is invalid (pattern, year regex)
/// - The input directory does not exist or is not a directory
/// - A file cannot be read and the policy is `abort`
pub fn process_job(config: &JobConfig, show_progress: bool) -> anyhow::Result<RasterCollection> {
    config.validate()?;
    let options = config.to_load_options(show_progress)?;
    let collection = rasters_to_dict(&config.input_dir, &config.pattern, &options)
        .with_context(|| format!("Failed to load rasters from {}", config.input_dir.display()))?;
    Ok(collection)
}
