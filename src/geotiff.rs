//! # GeoTIFF Codec
//!
//! Reads band 1 of a GeoTIFF into a [`PixelArray`] together with its
//! [`Profile`], and writes an array back out with the same metadata.
//!
//! Georeferencing is carried in the standard GeoTIFF tags:
//!
//! | Tag   | Name                | Use                                        |
//! |-------|---------------------|--------------------------------------------|
//! | 33550 | ModelPixelScale     | pixel size                                 |
//! | 33922 | ModelTiepoint       | upper-left corner                          |
//! | 34264 | ModelTransformation | alternative to scale + tiepoint (read only)|
//! | 34735 | GeoKeyDirectory     | EPSG code of the CRS                       |
//! | 42113 | GDAL_NODATA         | no-data value, ASCII                       |
//!
//! Writing is deterministic: writing the array and profile obtained from a
//! file this module wrote reproduces that file byte for byte.

use crate::error::{RasterError, Result};
use crate::raster::{Crs, CrsKind, GeoTransform, PixelArray, Profile};
use log::debug;
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;
use tiff::{ColorType, TiffResult};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Reads band 1 and the metadata profile of a GeoTIFF file.
///
/// # Errors
///
/// - [`RasterError::NotFound`] if `path` does not exist
/// - [`RasterError::Read`] if the file cannot be opened or is not a valid raster
pub fn read_raster<P: AsRef<Path>>(path: P) -> Result<(PixelArray, Profile)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RasterError::NotFound(path.to_path_buf()),
        _ => RasterError::read(path, e),
    })?;
    debug!("Decoding raster: {}", path.display());
    let raster = decode(BufReader::new(file), path)?;
    Ok(raster)
}

/// Same as [`read_raster`] but decodes an in-memory buffer.
pub fn read_raster_from_buffer(data: &[u8]) -> Result<(PixelArray, Profile)> {
    decode(Cursor::new(data), Path::new("<buffer>"))
}

/// Writes `array` to `path` as a GeoTIFF described by `profile`.
///
/// The image is encoded into a temporary file next to `path` and then moved
/// into place, so a failed write never leaves a truncated raster behind.
///
/// # Errors
///
/// - [`RasterError::ShapeMismatch`] / [`RasterError::DtypeMismatch`] if the
///   array does not match the profile
/// - [`RasterError::Write`] if encoding or persisting fails
pub fn write_raster<P: AsRef<Path>>(array: &PixelArray, path: P, profile: &Profile) -> Result<()> {
    let path = path.as_ref();
    profile.check(array)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| RasterError::write(path, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        encode(array, profile, &mut writer).map_err(|e| RasterError::write(path, e))?;
        writer.flush().map_err(|e| RasterError::write(path, e))?;
    }
    temp.persist(path)
        .map_err(|e| RasterError::write(path, e.error))?;

    debug!("Raster written to: {}", path.display());
    Ok(())
}

/// Same as [`write_raster`] but returns the encoded GeoTIFF bytes.
pub fn write_raster_to_buffer(array: &PixelArray, profile: &Profile) -> Result<Vec<u8>> {
    profile.check(array)?;
    let mut buf = Vec::new();
    encode(array, profile, Cursor::new(&mut buf))
        .map_err(|e| RasterError::write("<buffer>", e))?;
    Ok(buf)
}

/// Largest band or tag buffer the decoder will allocate
const MAX_BUFFER_BYTES: usize = 1024 * 1024 * 1024;

fn decode<R: Read + Seek>(reader: R, source: &Path) -> Result<(PixelArray, Profile)> {
    let mut limits = Limits::default();
    limits.decoding_buffer_size = MAX_BUFFER_BYTES;
    limits.intermediate_buffer_size = MAX_BUFFER_BYTES;
    limits.ifd_value_size = MAX_BUFFER_BYTES;
    let mut decoder = Decoder::new(reader)
        .map_err(|e| RasterError::read(source, e))?
        .with_limits(limits);

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| RasterError::read(source, format!("cannot read dimensions: {}", e)))?;
    let color = decoder
        .colortype()
        .map_err(|e| RasterError::read(source, e))?;
    let samples = samples_per_pixel(color);

    let image = decoder
        .read_image()
        .map_err(|e| RasterError::read(source, format!("cannot read image data: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;
    let array = band_one(image, rows, cols, samples).map_err(|reason| RasterError::read(source, reason))?;

    let transform = read_transform(&mut decoder).unwrap_or_default();
    let crs = read_crs(&mut decoder);
    let nodata = read_nodata(&mut decoder);

    let profile = Profile {
        driver: "GTiff".to_string(),
        width: cols,
        height: rows,
        count: samples,
        dtype: array.dtype(),
        crs,
        transform,
        nodata,
    };
    Ok((array, profile))
}

fn samples_per_pixel(color: ColorType) -> usize {
    match color {
        ColorType::Gray(_) | ColorType::Palette(_) => 1,
        ColorType::GrayA(_) => 2,
        ColorType::RGB(_) => 3,
        ColorType::RGBA(_) | ColorType::CMYK(_) => 4,
        #[allow(unreachable_patterns)]
        _ => 1,
    }
}

/// Keeps the first sample of every pixel of a chunky image.
fn first_band<T: Copy>(
    mut buf: Vec<T>,
    rows: usize,
    cols: usize,
    samples: usize,
) -> std::result::Result<Array2<T>, String> {
    let expected = rows * cols * samples;
    if buf.len() < expected {
        return Err(format!(
            "image holds {} samples, expected {} ({}x{}x{})",
            buf.len(),
            expected,
            cols,
            rows,
            samples
        ));
    }
    let data = if samples == 1 {
        buf.truncate(rows * cols);
        buf
    } else {
        buf.into_iter().step_by(samples).take(rows * cols).collect()
    };
    Array2::from_shape_vec((rows, cols), data).map_err(|e| e.to_string())
}

fn band_one(
    image: DecodingResult,
    rows: usize,
    cols: usize,
    samples: usize,
) -> std::result::Result<PixelArray, String> {
    let array = match image {
        DecodingResult::U8(buf) => PixelArray::U8(first_band(buf, rows, cols, samples)?),
        DecodingResult::U16(buf) => PixelArray::U16(first_band(buf, rows, cols, samples)?),
        DecodingResult::U32(buf) => PixelArray::U32(first_band(buf, rows, cols, samples)?),
        DecodingResult::U64(buf) => PixelArray::U64(first_band(buf, rows, cols, samples)?),
        DecodingResult::I8(buf) => PixelArray::I8(first_band(buf, rows, cols, samples)?),
        DecodingResult::I16(buf) => PixelArray::I16(first_band(buf, rows, cols, samples)?),
        DecodingResult::I32(buf) => PixelArray::I32(first_band(buf, rows, cols, samples)?),
        DecodingResult::I64(buf) => PixelArray::I64(first_band(buf, rows, cols, samples)?),
        DecodingResult::F32(buf) => PixelArray::F32(first_band(buf, rows, cols, samples)?),
        DecodingResult::F64(buf) => PixelArray::F64(first_band(buf, rows, cols, samples)?),
    };
    Ok(array)
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok();

    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
        }
    }

    // Row-major 4x4 matrix; only the 2D affine part is used
    let matrix = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TRANSFORMATION))
        .ok()?;
    if matrix.len() >= 8 {
        return Some(GeoTransform::new(matrix[3], matrix[7], matrix[0], matrix[5]));
    }
    None
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<Crs> {
    let keys = decoder
        .get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))
        .ok()?;
    parse_geokeys(&keys)
}

/// Extracts the CRS from a GeoKeyDirectory: a 4-value header
/// `[version, revision, minor, count]` followed by `count` entries of
/// `[key_id, tag_location, value_count, value]`.
fn parse_geokeys(keys: &[u16]) -> Option<Crs> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let mut geographic = None;
    let mut projected = None;

    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        // location != 0 means the value lives in another tag
        if location != 0 || value == 0 || value == u16::MAX {
            continue;
        }
        match key_id {
            PROJECTED_CS_TYPE_KEY => projected = Some(Crs::projected(value)),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(Crs::geographic(value)),
            _ => {}
        }
    }
    projected.or(geographic)
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).ok()?;
    text.trim_end_matches('\0').trim().parse().ok()
}

fn geokey_directory(crs: Option<&Crs>) -> Vec<u16> {
    let model_type = match crs.map(|c| c.kind) {
        Some(CrsKind::Geographic) => MODEL_TYPE_GEOGRAPHIC,
        _ => MODEL_TYPE_PROJECTED,
    };
    let mut keys: Vec<u16> = vec![
        1, 1, 0, 0, // version 1.1.0, key count patched below
        GT_MODEL_TYPE_KEY, 0, 1, model_type,
        GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA,
    ];
    if let Some(crs) = crs {
        let key_id = match crs.kind {
            CrsKind::Geographic => GEOGRAPHIC_TYPE_KEY,
            CrsKind::Projected => PROJECTED_CS_TYPE_KEY,
        };
        keys.extend_from_slice(&[key_id, 0, 1, crs.epsg]);
    }
    keys[3] = ((keys.len() - 4) / 4) as u16;
    keys
}

fn encode<W: Write + Seek>(array: &PixelArray, profile: &Profile, writer: W) -> TiffResult<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    match array {
        PixelArray::U8(a) => write_image::<colortype::Gray8, _>(&mut encoder, a, profile),
        PixelArray::U16(a) => write_image::<colortype::Gray16, _>(&mut encoder, a, profile),
        PixelArray::U32(a) => write_image::<colortype::Gray32, _>(&mut encoder, a, profile),
        PixelArray::U64(a) => write_image::<colortype::Gray64, _>(&mut encoder, a, profile),
        PixelArray::I8(a) => write_image::<colortype::GrayI8, _>(&mut encoder, a, profile),
        PixelArray::I16(a) => write_image::<colortype::GrayI16, _>(&mut encoder, a, profile),
        PixelArray::I32(a) => write_image::<colortype::GrayI32, _>(&mut encoder, a, profile),
        PixelArray::I64(a) => write_image::<colortype::GrayI64, _>(&mut encoder, a, profile),
        PixelArray::F32(a) => write_image::<colortype::Gray32Float, _>(&mut encoder, a, profile),
        PixelArray::F64(a) => write_image::<colortype::Gray64Float, _>(&mut encoder, a, profile),
    }
}

fn write_image<C, W>(
    encoder: &mut TiffEncoder<W>,
    data: &Array2<C::Inner>,
    profile: &Profile,
) -> TiffResult<()>
where
    C: colortype::ColorType,
    C::Inner: Copy,
    [C::Inner]: tiff::encoder::TiffValue,
    W: Write + Seek,
{
    let (rows, cols) = data.dim();
    let mut image = encoder.new_image::<C>(cols as u32, rows as u32)?;

    let gt = &profile.transform;
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])?;

    let geokeys = geokey_directory(profile.crs.as_ref());
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geokeys[..])?;

    if let Some(nodata) = profile.nodata {
        let text = format_nodata(nodata);
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA), text.as_str())?;
    }

    let samples: Vec<C::Inner> = data.iter().copied().collect();
    image.write_data(&samples)
}

/// GDAL writes integral no-data values without a fractional part
fn format_nodata(nodata: f64) -> String {
    if nodata.is_nan() {
        "nan".to_string()
    } else {
        format!("{}", nodata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geokey_directory_roundtrip() {
        let keys = geokey_directory(Some(&Crs::projected(32633)));
        assert_eq!(keys[3], 3);
        assert_eq!(parse_geokeys(&keys), Some(Crs::projected(32633)));

        let keys = geokey_directory(Some(&Crs::wgs84()));
        assert_eq!(parse_geokeys(&keys), Some(Crs::wgs84()));

        let keys = geokey_directory(None);
        assert_eq!(keys[3], 2);
        assert_eq!(parse_geokeys(&keys), None);
    }

    #[test]
    fn test_parse_geokeys_prefers_projected() {
        let keys = vec![
            1, 1, 0, 2, //
            GEOGRAPHIC_TYPE_KEY, 0, 1, 4269, //
            PROJECTED_CS_TYPE_KEY, 0, 1, 26915,
        ];
        assert_eq!(parse_geokeys(&keys), Some(Crs::projected(26915)));
    }

    #[test]
    fn test_parse_geokeys_skips_external_values() {
        let keys = vec![
            1, 1, 0, 1, //
            GEOGRAPHIC_TYPE_KEY, 34736, 1, 0,
        ];
        assert_eq!(parse_geokeys(&keys), None);
        assert_eq!(parse_geokeys(&[1, 1, 0]), None);
    }

    #[test]
    fn test_first_band_of_chunky_image() {
        // 2x2 RGB image: band 1 is every third sample
        let buf: Vec<u8> = vec![1, 10, 100, 2, 20, 200, 3, 30, 255, 4, 40, 0];
        let band = first_band(buf, 2, 2, 3).unwrap();
        assert_eq!(band, ndarray::array![[1, 2], [3, 4]]);
    }

    #[test]
    fn test_first_band_rejects_short_buffer() {
        assert!(first_band(vec![0u16; 3], 2, 2, 1).is_err());
    }

    /// Little-endian baseline TIFF header for a `width` x `height` 8-bit grey
    /// strip image, followed by only a handful of data bytes
    fn gray8_header(width: u32, height: u32) -> Vec<u8> {
        let entries: [(u16, u16, u32); 9] = [
            (256, 4, width),
            (257, 4, height),
            (258, 3, 8),
            (259, 3, 1),
            (262, 3, 1),
            (273, 4, 8 + 2 + 9 * 12 + 4),
            (277, 3, 1),
            (278, 4, height),
            (279, 4, width * height),
        ];
        let mut buf = b"II*\0".to_vec();
        buf.extend_from_slice(&8u32.to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, kind, value) in entries {
            buf.extend_from_slice(&tag.to_le_bytes());
            buf.extend_from_slice(&kind.to_le_bytes());
            buf.extend_from_slice(&1u32.to_le_bytes());
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]);
        buf
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        // 60000 x 60000 bytes is well past the decoder buffer cap
        let result = read_raster_from_buffer(&gray8_header(60000, 60000));
        assert!(matches!(result, Err(RasterError::Read { .. })));
    }

    #[test]
    fn test_truncated_buffer_is_read_error() {
        let pixels = PixelArray::from(Array2::<f32>::zeros((64, 64)));
        let bytes = write_raster_to_buffer(&pixels, &Profile::for_array(&pixels)).unwrap();
        let result = read_raster_from_buffer(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(RasterError::Read { .. })));
    }

    #[test]
    fn test_format_nodata() {
        assert_eq!(format_nodata(-9999.0), "-9999");
        assert_eq!(format_nodata(0.5), "0.5");
        assert!(format_nodata(f64::NAN).parse::<f64>().unwrap().is_nan());
    }
}
