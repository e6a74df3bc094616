//! Typed cube geometry extracted from a parsed header.

use log::warn;

use crate::dtype::{ByteOrder, DataType};
use crate::error::{Error, Result};
use crate::header::Header;
use crate::interleave::Interleave;
use crate::value::Value;

/// Geometry and per-band metadata of a flat binary cube.
///
/// Produced once by [`Geometry::from_header`] and immutable afterwards
/// except for the lazily resolved no-data sentinel and the bad-band mask.
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Number of lines (rows).
    pub lines: usize,
    /// Number of columns (samples per line).
    pub columns: usize,
    /// Number of spectral bands.
    pub bands: usize,
    /// Physical axis ordering on disk.
    pub interleave: Interleave,
    /// Element type of the binary data.
    pub dtype: DataType,
    /// Byte order of the binary data.
    pub byte_order: ByteOrder,
    /// Byte prefix before the first element (`header offset`).
    pub offset: usize,
    /// Band-center wavelengths, one per band.
    pub wavelengths: Option<Vec<f64>>,
    /// Full width at half maximum, one per band.
    pub fwhm: Option<Vec<f64>>,
    /// Unit of the wavelength values; absence is a warning, not an error.
    pub wavelength_units: Option<String>,
    /// Bad-band mask, `true` = usable (`bbl` value 1).
    pub bad_bands: Option<Vec<bool>>,
    /// No-data sentinel (`data ignore value`); inferred later if absent.
    pub no_data: Option<f64>,
    /// Opaque georeferencing string, passed through uninterpreted.
    pub map_info: Option<String>,
}

fn invalid(key: &str, value: &Value) -> Error {
    Error::InvalidValue {
        key: String::from(key),
        value: value.to_string(),
    }
}

fn required_dim(header: &Header, key: &'static str) -> Result<usize> {
    let value = header.required(key)?;
    match value.as_usize() {
        Some(n) if n > 0 => Ok(n),
        _ => Err(invalid(key, value)),
    }
}

fn band_list(header: &Header, key: &'static str, bands: usize) -> Result<Option<Vec<f64>>> {
    let Some(value) = header.get(key) else {
        return Ok(None);
    };
    let list = value.as_f64_list().ok_or_else(|| invalid(key, value))?;
    if list.len() != bands {
        return Err(Error::LengthMismatch {
            field: key,
            expected: bands,
            actual: list.len(),
        });
    }
    Ok(Some(list))
}

impl Geometry {
    /// Build a geometry record from a parsed header.
    ///
    /// Fails when a required keyword (`lines`, `samples`, `bands`,
    /// `interleave`, `data type`) is missing or malformed, when the
    /// interleave or type code is unrecognized, or when a per-band list
    /// does not have one entry per band. A missing `wavelength units`
    /// keyword only logs a warning.
    pub fn from_header(header: &Header) -> Result<Geometry> {
        let lines = required_dim(header, "lines")?;
        let columns = required_dim(header, "samples")?;
        let bands = required_dim(header, "bands")?;

        let interleave_value = header.required("interleave")?;
        let interleave = match interleave_value.as_str() {
            Some(s) => Interleave::parse(s)?,
            None => return Err(Error::UnknownInterleave(interleave_value.to_string())),
        };

        let dtype_value = header.required("data type")?;
        let dtype = match dtype_value.as_i64() {
            Some(code) => DataType::from_code(code)?,
            None => return Err(invalid("data type", dtype_value)),
        };

        let byte_order = match header.get("byte order") {
            Some(value) => match value.as_i64() {
                Some(code) => ByteOrder::from_code(code)?,
                None => return Err(invalid("byte order", value)),
            },
            None => ByteOrder::Little,
        };

        let offset = match header.get("header offset") {
            Some(value) => value.as_usize().ok_or_else(|| invalid("header offset", value))?,
            None => 0,
        };

        let wavelengths = band_list(header, "wavelength", bands)?;
        let fwhm = band_list(header, "fwhm", bands)?;
        let bad_bands =
            band_list(header, "bbl", bands)?.map(|list| list.iter().map(|&v| v == 1.0).collect());

        let wavelength_units = header
            .get("wavelength units")
            .and_then(Value::as_str)
            .map(String::from);
        if wavelength_units.is_none() {
            warn!("wavelength units not specified");
        }

        let no_data = match header.get("data ignore value") {
            Some(value) => Some(
                value
                    .as_f64()
                    .ok_or_else(|| invalid("data ignore value", value))?,
            ),
            None => None,
        };

        let map_info = header.get("map info").map(Value::to_string);

        Ok(Geometry {
            lines,
            columns,
            bands,
            interleave,
            dtype,
            byte_order,
            offset,
            wavelengths,
            fwhm,
            wavelength_units,
            bad_bands,
            no_data,
            map_info,
        })
    }

    /// Physical on-disk shape for this interleave.
    pub fn physical_shape(&self) -> [usize; 3] {
        self.interleave
            .physical_shape(self.lines, self.columns, self.bands)
    }

    /// Total number of elements in the cube.
    pub fn element_count(&self) -> usize {
        self.lines * self.columns * self.bands
    }

    /// Total data size in bytes, excluding the byte prefix.
    pub fn byte_len(&self) -> usize {
        self.element_count() * self.dtype.size()
    }
}
