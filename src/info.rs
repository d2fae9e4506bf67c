//! # Raster Information Module
//!
//! Builds inspection reports for a single raster ([`RasterInfo`]) and for a
//! batch load ([`CollectionInfo`]), and prints them as human-readable text,
//! JSON, YAML or CSV.

use crate::geotiff::read_raster;
use crate::loader::RasterCollection;
use crate::raster::{PixelArray, Profile};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Information about one raster file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    pub path: String,
    pub driver: String,
    pub width: usize,
    pub height: usize,
    pub count: usize,
    pub dtype: String,
    pub crs: Option<String>,
    pub origin: (f64, f64),
    pub resolution: (f64, f64),
    /// `(min_x, min_y, max_x, max_y)`
    pub bounds: (f64, f64, f64, f64),
    pub nodata: Option<f64>,
    pub nodata_cells: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub year: Option<String>,
    pub file_size: Option<u64>,
}

impl RasterInfo {
    pub fn from_parts(path: &Path, array: &PixelArray, profile: &Profile, year: Option<String>) -> Self {
        let range = array.valid_range(profile.nodata);
        RasterInfo {
            path: path.display().to_string(),
            driver: profile.driver.clone(),
            width: profile.width,
            height: profile.height,
            count: profile.count,
            dtype: profile.dtype.to_string(),
            crs: profile.crs.map(|c| c.to_string()),
            origin: (profile.transform.origin_x, profile.transform.origin_y),
            resolution: profile.resolution(),
            bounds: profile.bounds(),
            nodata: profile.nodata,
            nodata_cells: array.count_nodata(profile.nodata),
            min: range.map(|(min, _)| min),
            max: range.map(|(_, max)| max),
            year,
            file_size: fs::metadata(path).ok().map(|m| m.len()),
        }
    }
}

/// A matched file that could not be loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub path: String,
    pub error: String,
}

/// Summary of one batch load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub directory: String,
    pub pattern: String,
    pub scanned: usize,
    pub matched: usize,
    pub loaded: usize,
    pub rasters: Vec<RasterInfo>,
    pub failures: Vec<FailureInfo>,
}

impl CollectionInfo {
    pub fn from_collection(directory: &Path, pattern: &str, collection: &RasterCollection) -> Self {
        CollectionInfo {
            directory: directory.display().to_string(),
            pattern: pattern.to_string(),
            scanned: collection.scanned(),
            matched: collection.matched(),
            loaded: collection.len(),
            rasters: collection
                .iter()
                .map(|r| RasterInfo::from_parts(&r.path, &r.array, &r.profile, r.year.clone()))
                .collect(),
            failures: collection
                .failures()
                .iter()
                .map(|f| FailureInfo {
                    path: f.path.display().to_string(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Read a raster file and build its report
pub fn get_raster_info<P: AsRef<Path>>(file_path: P) -> Result<RasterInfo> {
    let path: PathBuf = file_path.as_ref().to_path_buf();
    debug!("Opening raster file: {}", path.display());
    let (array, profile) =
        read_raster(&path).with_context(|| format!("Failed to open raster file: {}", path.display()))?;
    Ok(RasterInfo::from_parts(&path, &array, &profile, None))
}

fn format_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}

/// Print raster info in human-readable format
pub fn print_raster_info_human(info: &RasterInfo) {
    println!("Raster File Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!("  Driver: {}", info.driver);
    println!("  Size: {} x {} ({} band(s) in file)", info.width, info.height, info.count);
    println!("  Data Type: {}", info.dtype);
    println!("  CRS: {}", info.crs.as_deref().unwrap_or("none"));
    println!("  Origin: ({}, {})", info.origin.0, info.origin.1);
    println!("  Resolution: ({}, {})", info.resolution.0, info.resolution.1);
    println!(
        "  Bounds: [{}, {}, {}, {}]",
        info.bounds.0, info.bounds.1, info.bounds.2, info.bounds.3
    );
    println!("  No-data: {} ({} cells)", format_opt(info.nodata), info.nodata_cells);
    println!("  Min/Max: {} / {}", format_opt(info.min), format_opt(info.max));
    if let Some(year) = &info.year {
        println!("  Year: {}", year);
    }
}

/// Print raster info in JSON format
pub fn print_raster_info_json(info: &RasterInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

/// Print raster info in YAML format
pub fn print_raster_info_yaml(info: &RasterInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize raster info to YAML")?;
    println!("{}", yaml);
    Ok(())
}

const CSV_HEADER: &str = "path,width,height,dtype,crs,resolution_x,resolution_y,nodata,min,max,year";

fn csv_row(info: &RasterInfo) -> String {
    format!(
        "\"{}\",{},{},{},{},{},{},{},{},{},{}",
        info.path.replace('"', "\"\""),
        info.width,
        info.height,
        info.dtype,
        info.crs.as_deref().unwrap_or(""),
        info.resolution.0,
        info.resolution.1,
        info.nodata.map(|v| v.to_string()).unwrap_or_default(),
        info.min.map(|v| v.to_string()).unwrap_or_default(),
        info.max.map(|v| v.to_string()).unwrap_or_default(),
        info.year.as_deref().unwrap_or("")
    )
}

/// Print raster info in CSV format (one header, one row)
pub fn print_raster_info_csv(info: &RasterInfo) -> Result<()> {
    println!("{}", CSV_HEADER);
    println!("{}", csv_row(info));
    Ok(())
}

/// Print a batch load summary in human-readable format
pub fn print_collection_info_human(info: &CollectionInfo) {
    println!("Raster Collection:");
    println!("  Directory: {}", info.directory);
    println!("  Pattern: {}", info.pattern);
    println!(
        "  Files: {} scanned, {} matched, {} loaded",
        info.scanned, info.matched, info.loaded
    );
    for raster in &info.rasters {
        println!(
            "    {} ({} x {} {}, {}, year: {})",
            raster.path,
            raster.width,
            raster.height,
            raster.dtype,
            raster.crs.as_deref().unwrap_or("no crs"),
            raster.year.as_deref().unwrap_or("-")
        );
    }
    if !info.failures.is_empty() {
        println!("  Failures: {}", info.failures.len());
        for failure in &info.failures {
            println!("    {}: {}", failure.path, failure.error);
        }
    }
}

pub fn print_collection_info_json(info: &CollectionInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

pub fn print_collection_info_yaml(info: &CollectionInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize collection info to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Print a batch load summary in CSV format (loaded rasters only)
pub fn print_collection_info_csv(info: &CollectionInfo) -> Result<()> {
    println!("{}", CSV_HEADER);
    for raster in &info.rasters {
        println!("{}", csv_row(raster));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Crs, GeoTransform};
    use ndarray::array;

    fn sample() -> RasterInfo {
        let array = PixelArray::from(array![[-9999.0f32, 1.0], [2.5, 4.0]]);
        let profile = Profile::for_array(&array)
            .with_crs(Crs::projected(32633))
            .with_transform(GeoTransform::new(500000.0, 4100000.0, 30.0, -30.0))
            .with_nodata(-9999.0);
        RasterInfo::from_parts(Path::new("/nonexistent/dem_2001.tif"), &array, &profile, Some("2001".into()))
    }

    #[test]
    fn test_raster_info_from_parts() {
        let info = sample();
        assert_eq!(info.width, 2);
        assert_eq!(info.height, 2);
        assert_eq!(info.dtype, "float32");
        assert_eq!(info.crs.as_deref(), Some("EPSG:32633"));
        assert_eq!(info.resolution, (30.0, 30.0));
        assert_eq!(info.bounds, (500000.0, 4099940.0, 500060.0, 4100000.0));
        assert_eq!(info.nodata_cells, 1);
        assert_eq!(info.min, Some(1.0));
        assert_eq!(info.max, Some(4.0));
        assert_eq!(info.file_size, None);
    }

    #[test]
    fn test_csv_row() {
        let row = csv_row(&sample());
        assert_eq!(
            row,
            "\"/nonexistent/dem_2001.tif\",2,2,float32,EPSG:32633,30,30,-9999,1,4,2001"
        );
        assert_eq!(CSV_HEADER.split(',').count(), row.split(',').count());
    }

    #[test]
    fn test_info_serializes_to_json() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["dtype"], "float32");
        assert_eq!(value["year"], "2001");
        assert_eq!(value["nodata"], -9999.0);
    }
}
