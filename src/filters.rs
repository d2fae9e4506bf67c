//! # Pixel Filters
//!
//! In-place transformations of a band that leave no-data cells alone.
//! [`ThresholdFilter::negative_to_zero`] is the filter behind the
//! `bump` command: every negative value that is not the no-data sentinel
//! becomes `0`.

use crate::error::Result;
use crate::geotiff::{read_raster, write_raster};
use crate::raster::{Pixel, PixelArray, is_nodata, native_nodata, with_array};
use log::{debug, info};
use ndarray::Array2;
use num_traits::NumCast;
use std::path::{Path, PathBuf};

pub trait PixelFilter {
    /// Applies the filter in place, returning the number of cells changed
    fn apply(&self, pixels: &mut PixelArray, nodata: Option<f64>) -> usize;

    fn name(&self) -> &str;
}

/// Replaces every value below `threshold` with `replacement`.
///
/// Cells equal to the no-data value and NaN cells are never changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdFilter {
    pub threshold: f64,
    pub replacement: f64,
}

impl ThresholdFilter {
    pub fn new(threshold: f64, replacement: f64) -> Self {
        ThresholdFilter {
            threshold,
            replacement,
        }
    }

    pub fn negative_to_zero() -> Self {
        Self::new(0.0, 0.0)
    }

    fn apply_typed<T: Pixel>(&self, data: &mut Array2<T>, nodata: Option<f64>) -> usize {
        // A replacement the type cannot hold would corrupt the band
        let Some(replacement) = <T as NumCast>::from(self.replacement) else {
            return 0;
        };
        let nodata = native_nodata(data, nodata);
        let mut changed = 0;
        for v in data.iter_mut() {
            let value = v.widen();
            if value < self.threshold && !is_nodata(value, nodata) {
                *v = replacement;
                changed += 1;
            }
        }
        changed
    }
}

impl Default for ThresholdFilter {
    fn default() -> Self {
        Self::negative_to_zero()
    }
}

impl PixelFilter for ThresholdFilter {
    fn apply(&self, pixels: &mut PixelArray, nodata: Option<f64>) -> usize {
        with_array!(pixels, a => self.apply_typed(a, nodata))
    }

    fn name(&self) -> &str {
        "threshold"
    }
}

/// Outcome of [`bump_negative_values`].
#[derive(Debug, Clone, PartialEq)]
pub struct BumpReport {
    pub output: PathBuf,
    pub cells_changed: usize,
    /// Minimum over valid cells of the written raster
    pub min_value: Option<f64>,
}

/// Output path used when none is given: `dem.tif` becomes `dem_bumped.tif`.
pub fn bumped_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}_bumped.{}", stem, ext.to_string_lossy()),
        None => format!("{}_bumped", stem),
    };
    input.with_file_name(name)
}

/// Reads `input`, applies `filter`, and writes the result with the source profile.
pub fn bump_negative_values<P: AsRef<Path>>(
    input: P,
    output: Option<&Path>,
    filter: &dyn PixelFilter,
) -> Result<BumpReport> {
    let input = input.as_ref();
    let output = output.map(Path::to_path_buf).unwrap_or_else(|| bumped_path(input));

    let (mut pixels, profile) = read_raster(input)?;
    let cells_changed = filter.apply(&mut pixels, profile.nodata);
    debug!(
        "{} changed {} of {} cells in {}",
        filter.name(),
        cells_changed,
        pixels.len(),
        input.display()
    );

    write_raster(&pixels, &output, &profile)?;
    let min_value = pixels.valid_range(profile.nodata).map(|(min, _)| min);

    info!("New raster written to: {}", output.display());
    if let Some(min) = min_value {
        info!("Minimum value of new raster: {}", min);
    }

    Ok(BumpReport {
        output,
        cells_changed,
        min_value,
    })
}
