//! # Batch Raster Loader
//!
//! Loads every raster of a directory whose file name matches a glob pattern
//! into a [`RasterCollection`] keyed by source path.
//!
//! Files are processed sequentially in directory-scan order (or sorted, see
//! [`LoadOptions::sort_paths`]); each file is fully decoded and closed before
//! the next one is opened. What happens when a single file cannot be read is
//! decided by [`FailurePolicy`]: by default the failure is recorded in
//! [`RasterCollection::failures`] and the scan carries on.
//!
//! ## Example
//!
//! ```rust,no_run
//! use raster_tools::loader::{rasters_to_dict, LoadOptions};
//!
//! let rasters = rasters_to_dict("data/dems", "*.tif", &LoadOptions::default())?;
//! for record in &rasters {
//!     println!("{} {:?} {:?}", record.path.display(), record.profile.crs, record.year);
//! }
//! # Ok::<(), raster_tools::error::RasterError>(())
//! ```

use crate::error::{RasterError, Result};
use crate::geotiff::read_raster;
use crate::raster::RasterRecord;
use crate::year::{FirstFourDigits, YearExtractor};
use clap::ValueEnum;
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when one matched file cannot be read.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and keep loading the remaining files
    #[default]
    Collect,
    /// Stop at the first failure and return its error
    Abort,
}

/// Options for [`rasters_to_dict`].
pub struct LoadOptions {
    /// Strategy applied to every file name
    pub year: Box<dyn YearExtractor>,
    pub on_error: FailurePolicy,
    /// Load files in lexicographic path order instead of directory-scan order
    pub sort_paths: bool,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            year: Box::new(FirstFourDigits),
            on_error: FailurePolicy::Collect,
            sort_paths: false,
            show_progress: false,
        }
    }
}

impl LoadOptions {
    pub fn with_year<Y: YearExtractor + 'static>(mut self, year: Y) -> Self {
        self.year = Box::new(year);
        self
    }

    pub fn with_year_boxed(mut self, year: Box<dyn YearExtractor>) -> Self {
        self.year = year;
        self
    }

    pub fn on_error(mut self, policy: FailurePolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn sorted(mut self, sort_paths: bool) -> Self {
        self.sort_paths = sort_paths;
        self
    }

    pub fn progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// A matched file that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: RasterError,
}

/// Rasters loaded from one directory, keyed by source path.
///
/// Besides the records, the collection remembers how many regular files the
/// directory held (`scanned`) and how many matched the pattern (`matched`),
/// so an empty directory, a directory without matches and a batch whose
/// files all failed can be told apart.
#[derive(Debug, Default)]
pub struct RasterCollection {
    records: Vec<RasterRecord>,
    index: HashMap<PathBuf, usize>,
    scanned: usize,
    matched: usize,
    failures: Vec<LoadFailure>,
}

impl RasterCollection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<&RasterRecord> {
        self.index.get(path.as_ref()).map(|&i| &self.records[i])
    }

    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        self.index.contains_key(path.as_ref())
    }

    /// Records in load order
    pub fn iter(&self) -> std::slice::Iter<'_, RasterRecord> {
        self.records.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().map(|r| r.path.as_path())
    }

    pub fn into_records(self) -> Vec<RasterRecord> {
        self.records
    }

    /// Regular files found in the directory
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    /// Files whose name matched the pattern
    pub fn matched(&self) -> usize {
        self.matched
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    /// `true` when every matched file was loaded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn insert(&mut self, record: RasterRecord) {
        if let Some(&i) = self.index.get(&record.path) {
            self.records[i] = record;
            return;
        }
        self.index.insert(record.path.clone(), self.records.len());
        self.records.push(record);
    }
}

impl<'a> IntoIterator for &'a RasterCollection {
    type Item = &'a RasterRecord;
    type IntoIter = std::slice::Iter<'a, RasterRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Reads every raster in `raster_dir` whose file name matches `pattern`.
///
/// Subdirectories are not searched and only regular files are considered.
/// Zero matches is not an error: the returned collection is empty and
/// reports `matched() == 0`.
///
/// # Errors
///
/// - [`RasterError::NotFound`] if `raster_dir` does not exist
/// - [`RasterError::NotADirectory`] if it is not a directory
/// - [`RasterError::InvalidPattern`] if `pattern` is not a valid glob
/// - the first per-file error when `options.on_error` is [`FailurePolicy::Abort`]
pub fn rasters_to_dict<P: AsRef<Path>>(
    raster_dir: P,
    pattern: &str,
    options: &LoadOptions,
) -> Result<RasterCollection> {
    let raster_dir = raster_dir.as_ref();
    let metadata = fs::metadata(raster_dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RasterError::NotFound(raster_dir.to_path_buf()),
        _ => RasterError::Io(e),
    })?;
    if !metadata.is_dir() {
        return Err(RasterError::NotADirectory(raster_dir.to_path_buf()));
    }

    let matcher = Pattern::new(pattern).map_err(|e| RasterError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut collection = RasterCollection::default();
    let mut files = Vec::new();
    for entry in fs::read_dir(raster_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        collection.scanned += 1;
        let matches = path
            .file_name()
            .map(|name| matcher.matches(&name.to_string_lossy()))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    collection.matched = files.len();

    if options.sort_paths {
        files.sort();
    }

    if files.is_empty() {
        warn!(
            "No files matching '{}' in {} ({} files scanned)",
            pattern,
            raster_dir.display(),
            collection.scanned
        );
        return Ok(collection);
    }
    debug!(
        "Matched {} of {} files in {} with '{}'",
        files.len(),
        collection.scanned,
        raster_dir.display(),
        pattern
    );

    let progress = progress_bar(files.len() as u64, options.show_progress);
    for path in files {
        progress.set_message(display_name(&path));
        match load_record(&path, options.year.as_ref()) {
            Ok(record) => collection.insert(record),
            Err(error) => match options.on_error {
                FailurePolicy::Abort => {
                    progress.abandon();
                    return Err(error);
                }
                FailurePolicy::Collect => {
                    warn!("Skipping {}: {}", path.display(), error);
                    collection.failures.push(LoadFailure { path, error });
                }
            },
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!("{} rasters read to memory.", collection.len());
    if !collection.failures.is_empty() {
        warn!("{} rasters could not be read", collection.failures.len());
    }
    Ok(collection)
}

/// Reads one file and tags it with the year found in its name.
fn load_record(path: &Path, year: &dyn YearExtractor) -> Result<RasterRecord> {
    let (array, profile) = read_raster(path)?;
    let year = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| year.extract(name));
    debug!(
        "Loaded {} ({}x{} {}, year: {:?})",
        path.display(),
        profile.width,
        profile.height,
        profile.dtype,
        year
    );
    Ok(RasterRecord {
        path: path.to_path_buf(),
        array,
        profile,
        year,
    })
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("█▉▊▋▌▍▎▏  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(len).with_style(style)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
