//! Numeric element types for cube data.
//!
//! Flat binary cubes declare their element type as an integer code in the
//! header (`data type`) together with a byte-order flag. This module maps
//! those codes to concrete Rust types and provides the [`Element`] trait
//! used by the typed read accessors.

use std::fmt;

use hdf5::types::{FloatSize, IntSize, TypeDescriptor};

use crate::error::{Error, Result};

/// Byte order of a flat binary cube (`byte order` header keyword: 0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least-significant byte first (header code 0).
    Little,
    /// Most-significant byte first (header code 1).
    Big,
}

impl ByteOrder {
    /// Resolve a header byte-order code.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(ByteOrder::Little),
            1 => Ok(ByteOrder::Big),
            other => Err(Error::UnknownByteOrder(other)),
        }
    }

    /// The header code for this byte order.
    pub fn code(self) -> i64 {
        match self {
            ByteOrder::Little => 0,
            ByteOrder::Big => 1,
        }
    }

    /// The byte order of the host.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Returns `true` if this order matches the host byte order.
    pub fn is_native(self) -> bool {
        self == Self::native()
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little-endian"),
            ByteOrder::Big => write!(f, "big-endian"),
        }
    }
}

/// Fixed-width numeric element type of a cube.
///
/// The variants cover the standard header type codes: 1 (u8), 2 (i16),
/// 3 (i32), 4 (f32), 5 (f64), 12 (u16), 13 (u32), 14 (i64), 15 (u64).
/// Complex-valued codes (6, 9) are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U8,
    I16,
    I32,
    F32,
    F64,
    U16,
    U32,
    I64,
    U64,
}

impl DataType {
    /// Resolve a header `data type` code.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(DataType::U8),
            2 => Ok(DataType::I16),
            3 => Ok(DataType::I32),
            4 => Ok(DataType::F32),
            5 => Ok(DataType::F64),
            12 => Ok(DataType::U16),
            13 => Ok(DataType::U32),
            14 => Ok(DataType::I64),
            15 => Ok(DataType::U64),
            other => Err(Error::UnknownDataType(other)),
        }
    }

    /// The header code for this element type.
    pub fn code(self) -> i64 {
        match self {
            DataType::U8 => 1,
            DataType::I16 => 2,
            DataType::I32 => 3,
            DataType::F32 => 4,
            DataType::F64 => 5,
            DataType::U16 => 12,
            DataType::U32 => 13,
            DataType::I64 => 14,
            DataType::U64 => 15,
        }
    }

    /// Element width in bytes.
    pub fn size(self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::I64 | DataType::U64 | DataType::F64 => 8,
        }
    }

    /// Map an HDF5 type descriptor onto a cube element type.
    pub fn from_descriptor(desc: &TypeDescriptor) -> Result<Self> {
        match desc {
            TypeDescriptor::Integer(IntSize::U2) => Ok(DataType::I16),
            TypeDescriptor::Integer(IntSize::U4) => Ok(DataType::I32),
            TypeDescriptor::Integer(IntSize::U8) => Ok(DataType::I64),
            TypeDescriptor::Unsigned(IntSize::U1) => Ok(DataType::U8),
            TypeDescriptor::Unsigned(IntSize::U2) => Ok(DataType::U16),
            TypeDescriptor::Unsigned(IntSize::U4) => Ok(DataType::U32),
            TypeDescriptor::Unsigned(IntSize::U8) => Ok(DataType::U64),
            TypeDescriptor::Float(FloatSize::U4) => Ok(DataType::F32),
            TypeDescriptor::Float(FloatSize::U8) => Ok(DataType::F64),
            other => Err(Error::UnsupportedElementType(format!("{other:?}"))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::U8 => "u8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::I64 => "i64",
            DataType::U64 => "u64",
        };
        write!(f, "{name}")
    }
}

/// A Rust numeric type admissible as a cube element.
///
/// `Pod` allows reinterpreting mapped bytes as typed slices without copying;
/// `H5Type` allows the same type to drive hierarchical-container reads.
pub trait Element:
    bytemuck::Pod + hdf5::types::H5Type + Copy + PartialEq + Send + Sync + 'static
{
    /// The declared on-disk type this Rust type corresponds to.
    const DTYPE: DataType;

    /// Reverse the byte order of the value.
    fn swap_bytes(self) -> Self;
}

macro_rules! impl_int_element {
    ($t:ty, $dtype:expr) => {
        impl Element for $t {
            const DTYPE: DataType = $dtype;

            fn swap_bytes(self) -> Self {
                <$t>::swap_bytes(self)
            }
        }
    };
}

impl_int_element!(u8, DataType::U8);
impl_int_element!(i16, DataType::I16);
impl_int_element!(i32, DataType::I32);
impl_int_element!(u16, DataType::U16);
impl_int_element!(u32, DataType::U32);
impl_int_element!(i64, DataType::I64);
impl_int_element!(u64, DataType::U64);

impl Element for f32 {
    const DTYPE: DataType = DataType::F32;

    fn swap_bytes(self) -> Self {
        f32::from_bits(self.to_bits().swap_bytes())
    }
}

impl Element for f64 {
    const DTYPE: DataType = DataType::F64;

    fn swap_bytes(self) -> Self {
        f64::from_bits(self.to_bits().swap_bytes())
    }
}

/// Decode a single element from raw bytes as `f64`.
///
/// The slice must hold at least `dtype.size()` bytes.
pub fn decode_scalar(bytes: &[u8], dtype: DataType, order: ByteOrder) -> f64 {
    match (dtype, order) {
        (DataType::U8, _) => bytes[0] as f64,
        (DataType::I16, ByteOrder::Little) => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
        (DataType::I16, ByteOrder::Big) => i16::from_be_bytes([bytes[0], bytes[1]]) as f64,
        (DataType::U16, ByteOrder::Little) => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
        (DataType::U16, ByteOrder::Big) => u16::from_be_bytes([bytes[0], bytes[1]]) as f64,
        (DataType::I32, ByteOrder::Little) => {
            i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        (DataType::I32, ByteOrder::Big) => {
            i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        (DataType::U32, ByteOrder::Little) => {
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        (DataType::U32, ByteOrder::Big) => {
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        (DataType::F32, ByteOrder::Little) => {
            f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        (DataType::F32, ByteOrder::Big) => {
            f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        (DataType::I64, ByteOrder::Little) => i64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f64,
        (DataType::I64, ByteOrder::Big) => i64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f64,
        (DataType::U64, ByteOrder::Little) => u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f64,
        (DataType::U64, ByteOrder::Big) => u64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f64,
        (DataType::F64, ByteOrder::Little) => f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
        (DataType::F64, ByteOrder::Big) => f64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
    }
}
