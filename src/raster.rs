//! # Raster Data Model
//!
//! In-memory representation of a single-band raster:
//!
//! - [`PixelArray`]: band 1 as a typed 2D array (rows = height, cols = width)
//! - [`Profile`]: the metadata bundle (dimensions, data type, CRS, transform, no-data)
//! - [`RasterRecord`]: one loaded file, keyed by its source path
//!
//! The array and the profile always come out of the same decoded image, so a
//! record produced by this crate satisfies [`Profile::check`].

use crate::error::{RasterError, Result};
use ndarray::Array2;
use num_traits::{NumCast, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Sample data type of a raster band.
///
/// Names follow the usual GDAL/rasterio spelling (`uint8`, `int16`, `float32`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric types that can be stored in a [`PixelArray`].
pub trait Pixel: Copy + fmt::Debug + PartialOrd + NumCast + Zero + 'static {
    const DTYPE: DataType;

    /// Wraps a typed array into the matching [`PixelArray`] variant
    fn into_pixel_array(array: Array2<Self>) -> PixelArray;

    /// Borrows the typed array if `pixels` holds this type
    fn typed(pixels: &PixelArray) -> Option<&Array2<Self>>;

    fn widen(self) -> f64 {
        <f64 as NumCast>::from(self).unwrap_or(f64::NAN)
    }
}

/// Band 1 of a raster, held in its native sample type.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelArray {
    U8(Array2<u8>),
    U16(Array2<u16>),
    U32(Array2<u32>),
    U64(Array2<u64>),
    I8(Array2<i8>),
    I16(Array2<i16>),
    I32(Array2<i32>),
    I64(Array2<i64>),
    F32(Array2<f32>),
    F64(Array2<f64>),
}

macro_rules! impl_pixel {
    ($t:ty, $variant:ident, $dtype:ident) => {
        impl Pixel for $t {
            const DTYPE: DataType = DataType::$dtype;

            fn into_pixel_array(array: Array2<Self>) -> PixelArray {
                PixelArray::$variant(array)
            }

            fn typed(pixels: &PixelArray) -> Option<&Array2<Self>> {
                match pixels {
                    PixelArray::$variant(a) => Some(a),
                    _ => None,
                }
            }
        }

        impl From<Array2<$t>> for PixelArray {
            fn from(array: Array2<$t>) -> Self {
                PixelArray::$variant(array)
            }
        }
    };
}

impl_pixel!(u8, U8, Uint8);
impl_pixel!(u16, U16, Uint16);
impl_pixel!(u32, U32, Uint32);
impl_pixel!(u64, U64, Uint64);
impl_pixel!(i8, I8, Int8);
impl_pixel!(i16, I16, Int16);
impl_pixel!(i32, I32, Int32);
impl_pixel!(i64, I64, Int64);
impl_pixel!(f32, F32, Float32);
impl_pixel!(f64, F64, Float64);

/// Runs `$body` with `$a` bound to the typed array inside `$pixels`.
macro_rules! with_array {
    ($pixels:expr, $a:ident => $body:expr) => {
        match $pixels {
            PixelArray::U8($a) => $body,
            PixelArray::U16($a) => $body,
            PixelArray::U32($a) => $body,
            PixelArray::U64($a) => $body,
            PixelArray::I8($a) => $body,
            PixelArray::I16($a) => $body,
            PixelArray::I32($a) => $body,
            PixelArray::I64($a) => $body,
            PixelArray::F32($a) => $body,
            PixelArray::F64($a) => $body,
        }
    };
}
pub(crate) use with_array;

impl PixelArray {
    /// Builds an array from row-major samples
    pub fn from_vec<T: Pixel>(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        let len = data.len();
        let array = Array2::from_shape_vec((rows, cols), data).map_err(|_| {
            RasterError::ShapeMismatch {
                expected: (rows, cols),
                actual: (len, 1),
            }
        })?;
        Ok(T::into_pixel_array(array))
    }

    pub fn dtype(&self) -> DataType {
        match self {
            PixelArray::U8(_) => DataType::Uint8,
            PixelArray::U16(_) => DataType::Uint16,
            PixelArray::U32(_) => DataType::Uint32,
            PixelArray::U64(_) => DataType::Uint64,
            PixelArray::I8(_) => DataType::Int8,
            PixelArray::I16(_) => DataType::Int16,
            PixelArray::I32(_) => DataType::Int32,
            PixelArray::I64(_) => DataType::Int64,
            PixelArray::F32(_) => DataType::Float32,
            PixelArray::F64(_) => DataType::Float64,
        }
    }

    /// `(rows, cols)`, i.e. `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        with_array!(self, a => a.dim())
    }

    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `(row, col)` widened to f64
    pub fn get_f64(&self, row: usize, col: usize) -> Option<f64> {
        with_array!(self, a => a.get((row, col)).map(|v| v.widen()))
    }

    pub fn as_typed<T: Pixel>(&self) -> Option<&Array2<T>> {
        T::typed(self)
    }

    /// Minimum and maximum over valid cells (not no-data, not NaN)
    pub fn valid_range(&self, nodata: Option<f64>) -> Option<(f64, f64)> {
        with_array!(self, a => {
            let nodata = native_nodata(a, nodata);
            a.iter()
                .map(|v| v.widen())
                .filter(|v| !v.is_nan() && !is_nodata(*v, nodata))
                .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                })
        })
    }

    /// Number of cells equal to the no-data value
    pub fn count_nodata(&self, nodata: Option<f64>) -> usize {
        if nodata.is_none() {
            return 0;
        }
        with_array!(self, a => {
            let nodata = native_nodata(a, nodata);
            a.iter().filter(|v| is_nodata(v.widen(), nodata)).count()
        })
    }
}

/// The no-data value as the array's sample type widened back to f64, so it
/// compares equal to the cells that hold it (e.g. `-3.4e38` in a float32 band).
///
/// Float bands round the sentinel to their precision. Integer bands only have a
/// sentinel when it is exactly representable: `-1.5` or `1e10` in an `i16` band
/// match no cell.
pub fn native_nodata<T: Pixel>(_array: &Array2<T>, nodata: Option<f64>) -> Option<f64> {
    let nd = nodata?;
    let native = <T as NumCast>::from(nd).map(|v: T| v.widen());
    if T::DTYPE.is_float() {
        Some(native.unwrap_or(nd))
    } else {
        native.filter(|v| *v == nd)
    }
}

/// Whether `value` equals the no-data sentinel. A NaN sentinel matches NaN cells.
pub fn is_nodata(value: f64, nodata: Option<f64>) -> bool {
    match nodata {
        Some(nd) if nd.is_nan() => value.is_nan(),
        Some(nd) => value == nd,
        None => false,
    }
}

/// Affine georeferencing of a north-up raster.
///
/// `x = origin_x + col * pixel_width`, `y = origin_y + row * pixel_height`;
/// `pixel_height` is negative for north-up images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// `(min_x, min_y, max_x, max_y)` of a `cols` x `rows` grid
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let x0 = self.origin_x;
        let x1 = self.origin_x + cols as f64 * self.pixel_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + rows as f64 * self.pixel_height;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// Whether an EPSG code names a geographic or a projected system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrsKind {
    Geographic,
    Projected,
}

/// Coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: u16,
    pub kind: CrsKind,
}

impl Crs {
    pub fn geographic(epsg: u16) -> Self {
        Self {
            epsg,
            kind: CrsKind::Geographic,
        }
    }

    pub fn projected(epsg: u16) -> Self {
        Self {
            epsg,
            kind: CrsKind::Projected,
        }
    }

    /// WGS84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::geographic(4326)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl FromStr for Crs {
    type Err = RasterError;

    /// Parses `EPSG:<code>`. Codes in 4000..5000 are taken as geographic.
    fn from_str(s: &str) -> Result<Self> {
        let code = s
            .trim()
            .strip_prefix("EPSG:")
            .or_else(|| s.trim().strip_prefix("epsg:"))
            .ok_or_else(|| RasterError::Config(format!("CRS must be 'EPSG:<code>', got '{}'", s)))?;
        let epsg: u16 = code
            .parse()
            .map_err(|_| RasterError::Config(format!("Invalid EPSG code '{}'", code)))?;
        if (4000..5000).contains(&epsg) {
            Ok(Crs::geographic(epsg))
        } else {
            Ok(Crs::projected(epsg))
        }
    }
}

/// Metadata profile of a raster file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Always `"GTiff"` for rasters read by this crate
    pub driver: String,
    pub width: usize,
    pub height: usize,
    /// Samples per pixel in the source file; only band 1 is loaded
    pub count: usize,
    pub dtype: DataType,
    pub crs: Option<Crs>,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
}

impl Profile {
    /// Single-band profile with the default transform, no CRS and no no-data value
    pub fn new(width: usize, height: usize, dtype: DataType) -> Self {
        Self {
            driver: "GTiff".to_string(),
            width,
            height,
            count: 1,
            dtype,
            crs: None,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Profile describing `array` exactly
    pub fn for_array(array: &PixelArray) -> Self {
        let (rows, cols) = array.shape();
        Self::new(cols, rows, array.dtype())
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Pixel size as `(x, y)`, both positive
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.transform.pixel_width.abs(),
            self.transform.pixel_height.abs(),
        )
    }

    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.width, self.height)
    }

    /// Verifies that `array` has the declared dimensions and data type
    pub fn check(&self, array: &PixelArray) -> Result<()> {
        let actual = array.shape();
        let expected = (self.height, self.width);
        if actual != expected {
            return Err(RasterError::ShapeMismatch { expected, actual });
        }
        if array.dtype() != self.dtype {
            return Err(RasterError::DtypeMismatch {
                expected: self.dtype.to_string(),
                actual: array.dtype().to_string(),
            });
        }
        Ok(())
    }

    pub fn matches(&self, array: &PixelArray) -> bool {
        self.check(array).is_ok()
    }
}

/// One raster loaded into memory.
#[derive(Debug, Clone)]
pub struct RasterRecord {
    pub path: PathBuf,
    pub array: PixelArray,
    pub profile: Profile,
    /// Year token taken from the file name, when the extraction strategy found one
    pub year: Option<String>,
}
