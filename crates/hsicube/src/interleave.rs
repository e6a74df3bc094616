//! Layout-aware slicing of flat binary cubes.
//!
//! A flat cube stores its three axes in one of three physical orders:
//!
//! | Interleave | Physical axis order     | Shape     |
//! |------------|-------------------------|-----------|
//! | BIP        | (line, column, band)    | (L, C, B) |
//! | BIL        | (line, band, column)    | (L, B, C) |
//! | BSQ        | (band, line, column)    | (B, L, C) |
//!
//! The accessors here translate logical coordinates into slices of the
//! physical array and return them in *canonical logical order*, so callers
//! never see the on-disk layout: a band is (lines, columns), a line is
//! (columns, bands), a column is (lines, bands), a chunk is
//! (lines, columns, bands). All of them are pure view reindexing — no
//! element is copied.

use std::fmt;

use ndarray::{s, ArrayView2, ArrayView3, Axis};

use crate::error::{Error, Result};

/// Physical axis ordering of a flat binary cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interleave {
    /// Band-interleaved-by-pixel: (line, column, band).
    Bip,
    /// Band-interleaved-by-line: (line, band, column).
    Bil,
    /// Band-sequential: (band, line, column).
    Bsq,
}

impl Interleave {
    /// Parse an `interleave` header value, case-insensitively.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bip" => Ok(Interleave::Bip),
            "bil" => Ok(Interleave::Bil),
            "bsq" => Ok(Interleave::Bsq),
            other => Err(Error::UnknownInterleave(String::from(other))),
        }
    }

    /// Lowercase header spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Interleave::Bip => "bip",
            Interleave::Bil => "bil",
            Interleave::Bsq => "bsq",
        }
    }

    /// Physical shape of a cube with the given logical extents.
    pub fn physical_shape(self, lines: usize, columns: usize, bands: usize) -> [usize; 3] {
        match self {
            Interleave::Bip => [lines, columns, bands],
            Interleave::Bil => [lines, bands, columns],
            Interleave::Bsq => [bands, lines, columns],
        }
    }

    /// Logical extents `(lines, columns, bands)` of a physical view.
    fn logical_extents<T>(self, data: &ArrayView3<'_, T>) -> (usize, usize, usize) {
        let shape = data.shape();
        match self {
            Interleave::Bip => (shape[0], shape[1], shape[2]),
            Interleave::Bil => (shape[0], shape[2], shape[1]),
            Interleave::Bsq => (shape[1], shape[2], shape[0]),
        }
    }
}

impl fmt::Display for Interleave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn check_index(axis: &'static str, index: usize, extent: usize) -> Result<()> {
    if index >= extent {
        return Err(Error::IndexOutOfBounds {
            axis,
            index,
            extent,
        });
    }
    Ok(())
}

fn check_range(axis: &'static str, start: usize, end: usize, extent: usize) -> Result<()> {
    if start > end || end > extent {
        return Err(Error::InvalidRange {
            axis,
            start,
            end,
            extent,
        });
    }
    Ok(())
}

/// View of one band as a (lines, columns) array.
pub fn band_view<'a, T>(
    data: ArrayView3<'a, T>,
    interleave: Interleave,
    index: usize,
) -> Result<ArrayView2<'a, T>> {
    let (_, _, bands) = interleave.logical_extents(&data);
    check_index("band", index, bands)?;
    let view = match interleave {
        Interleave::Bip => data.index_axis_move(Axis(2), index),
        Interleave::Bil => data.index_axis_move(Axis(1), index),
        Interleave::Bsq => data.index_axis_move(Axis(0), index),
    };
    Ok(view)
}

/// View of one line as a (columns, bands) array.
pub fn line_view<'a, T>(
    data: ArrayView3<'a, T>,
    interleave: Interleave,
    index: usize,
) -> Result<ArrayView2<'a, T>> {
    let (lines, _, _) = interleave.logical_extents(&data);
    check_index("line", index, lines)?;
    let view = match interleave {
        Interleave::Bip => data.index_axis_move(Axis(0), index),
        Interleave::Bil => data.index_axis_move(Axis(0), index).reversed_axes(),
        Interleave::Bsq => data.index_axis_move(Axis(1), index).reversed_axes(),
    };
    Ok(view)
}

/// View of one column as a (lines, bands) array.
pub fn column_view<'a, T>(
    data: ArrayView3<'a, T>,
    interleave: Interleave,
    index: usize,
) -> Result<ArrayView2<'a, T>> {
    let (_, columns, _) = interleave.logical_extents(&data);
    check_index("column", index, columns)?;
    let view = match interleave {
        Interleave::Bip => data.index_axis_move(Axis(1), index),
        Interleave::Bil => data.index_axis_move(Axis(2), index),
        Interleave::Bsq => data.index_axis_move(Axis(2), index).reversed_axes(),
    };
    Ok(view)
}

/// View of a rectangular chunk as a (lines, columns, bands) array.
///
/// Ranges are half-open and are not clamped here; callers clamp to the
/// cube extents (the iterator does).
pub fn chunk_view<'a, T>(
    data: ArrayView3<'a, T>,
    interleave: Interleave,
    col_start: usize,
    col_end: usize,
    line_start: usize,
    line_end: usize,
) -> Result<ArrayView3<'a, T>> {
    let (lines, columns, _) = interleave.logical_extents(&data);
    check_range("line", line_start, line_end, lines)?;
    check_range("column", col_start, col_end, columns)?;
    let view = match interleave {
        Interleave::Bip => data.slice_move(s![line_start..line_end, col_start..col_end, ..]),
        Interleave::Bil => data
            .slice_move(s![line_start..line_end, .., col_start..col_end])
            .permuted_axes([0, 2, 1]),
        Interleave::Bsq => data
            .slice_move(s![.., line_start..line_end, col_start..col_end])
            .permuted_axes([1, 2, 0]),
    };
    Ok(view)
}
