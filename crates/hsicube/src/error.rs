use std::path::PathBuf;

use crate::dtype::DataType;

/// All errors that can occur while opening or reading a cube.
#[derive(Debug)]
pub enum Error {
    /// No sibling header file was found next to a flat binary cube.
    MissingHeader(PathBuf),
    /// The cube file itself does not exist.
    NotFound(PathBuf),
    /// A required header keyword was not present.
    MissingKeyword(&'static str),
    /// A header value could not be parsed as the expected type.
    InvalidValue { key: String, value: String },
    /// The file is structurally malformed (unterminated list, wrong dataset
    /// rank, empty container, ...).
    InvalidStructure(&'static str),
    /// The `interleave` keyword named something other than bip/bil/bsq.
    UnknownInterleave(String),
    /// Unrecognized numeric type code in the header.
    UnknownDataType(i64),
    /// Unrecognized byte-order code in the header.
    UnknownByteOrder(i64),
    /// The container dataset uses an element type this crate cannot map.
    UnsupportedElementType(String),
    /// A per-band metadata list does not have one entry per band.
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The data file size disagrees with the geometry declared in the header.
    FileSize { expected: u64, actual: u64 },
    /// A read was attempted before `load()` or after `close()`.
    NotLoaded,
    /// A zero-copy view was requested on a cube with non-native byte order.
    ForeignByteOrder,
    /// The mapped data is not aligned for the requested element type.
    Unaligned,
    /// The requested element type does not match the declared data type.
    TypeMismatch {
        declared: DataType,
        requested: DataType,
    },
    /// A band/line/column index lies outside the cube extent.
    IndexOutOfBounds {
        axis: &'static str,
        index: usize,
        extent: usize,
    },
    /// A half-open chunk range lies outside the cube extent or is inverted.
    InvalidRange {
        axis: &'static str,
        start: usize,
        end: usize,
        extent: usize,
    },
    /// A queried wavelength lies outside the cube's spectral coverage.
    WavelengthOutOfRange(f64),
    /// The cube carries no wavelength metadata.
    NoWavelengths,
    /// The operation is not supported by this backend.
    WrongBackend(&'static str),
    /// `read_next` was called on an iterator that already completed.
    IterationFinished,
    /// An I/O error from the standard library.
    Io(std::io::Error),
    /// An error from the HDF5 library.
    Hdf5(hdf5::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingHeader(path) => {
                write!(f, "header file not found: {}", path.display())
            }
            Error::NotFound(path) => write!(f, "file not found: {}", path.display()),
            Error::MissingKeyword(key) => write!(f, "missing required header keyword: {key}"),
            Error::InvalidValue { key, value } => {
                write!(f, "invalid value for header keyword {key}: {value}")
            }
            Error::InvalidStructure(what) => write!(f, "malformed file: {what}"),
            Error::UnknownInterleave(s) => write!(f, "unrecognized interleave: {s}"),
            Error::UnknownDataType(code) => write!(f, "unrecognized data type code: {code}"),
            Error::UnknownByteOrder(code) => write!(f, "unrecognized byte order code: {code}"),
            Error::UnsupportedElementType(desc) => {
                write!(f, "unsupported dataset element type: {desc}")
            }
            Error::LengthMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "{field} list has {actual} entries, expected {expected}"
            ),
            Error::FileSize { expected, actual } => write!(
                f,
                "data file size mismatch: expected {expected} bytes, found {actual}"
            ),
            Error::NotLoaded => write!(f, "cube data is not loaded"),
            Error::ForeignByteOrder => {
                write!(f, "zero-copy view requires native byte order")
            }
            Error::Unaligned => write!(f, "mapped data is not aligned for the element type"),
            Error::TypeMismatch {
                declared,
                requested,
            } => write!(
                f,
                "element type mismatch: cube stores {declared}, requested {requested}"
            ),
            Error::IndexOutOfBounds {
                axis,
                index,
                extent,
            } => write!(f, "{axis} index {index} out of bounds (extent {extent})"),
            Error::InvalidRange {
                axis,
                start,
                end,
                extent,
            } => write!(
                f,
                "{axis} range {start}..{end} out of bounds (extent {extent})"
            ),
            Error::WavelengthOutOfRange(wave) => {
                write!(f, "wavelength {wave} outside spectral range")
            }
            Error::NoWavelengths => write!(f, "cube has no wavelength metadata"),
            Error::WrongBackend(op) => {
                write!(f, "operation not supported by this backend: {op}")
            }
            Error::IterationFinished => write!(f, "iterator already completed; reset to reuse"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Hdf5(e) => write!(f, "HDF5 error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Hdf5(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<hdf5::Error> for Error {
    fn from(e: hdf5::Error) -> Self {
        Error::Hdf5(e)
    }
}
