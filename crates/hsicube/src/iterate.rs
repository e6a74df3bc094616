//! Sequential traversal of a cube by line, column, band, or chunk.

use std::marker::PhantomData;

use ndarray::{Array2, Array3};

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::handle::ImageHandle;

/// Traversal mode for a [`CubeIterator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterMode {
    /// One line per call, in order.
    Line,
    /// One column per call, in order.
    Column,
    /// One band per call, in order.
    Band,
    /// Rectangular tiles of (lines, columns) pixels, traversed across each
    /// row of tiles before advancing to the next. Edge tiles are clamped
    /// to the cube extents.
    Chunk { lines: usize, columns: usize },
}

/// One slice yielded by [`CubeIterator::read_next`], shaped by the mode:
/// lines and columns are (columns x bands) / (lines x bands) planes, bands
/// are (lines x columns), chunks are (lines x columns x bands).
#[derive(Debug, Clone, PartialEq)]
pub enum CubeSlice<T> {
    Line(Array2<T>),
    Column(Array2<T>),
    Band(Array2<T>),
    Chunk(Array3<T>),
}

impl<T> CubeSlice<T> {
    /// Unwrap a 2-D slice (line, column, or band mode).
    pub fn into_plane(self) -> Option<Array2<T>> {
        match self {
            CubeSlice::Line(a) | CubeSlice::Column(a) | CubeSlice::Band(a) => Some(a),
            CubeSlice::Chunk(_) => None,
        }
    }

    /// Unwrap a chunk.
    pub fn into_chunk(self) -> Option<Array3<T>> {
        match self {
            CubeSlice::Chunk(a) => Some(a),
            _ => None,
        }
    }
}

/// Cursor-based iterator bound to one [`ImageHandle`].
///
/// Cursors start "before first" (−1). Each `read_next` advances the
/// cursor, reads the slice fresh from the backing resource (no caching),
/// and flags `complete` on the call that yields the final slice; the call
/// after that fails with [`Error::IterationFinished`] until `reset()`.
pub struct CubeIterator<'a, T: Element> {
    handle: &'a ImageHandle,
    mode: IterMode,
    current_line: isize,
    current_column: isize,
    current_band: isize,
    complete: bool,
    _element: PhantomData<T>,
}

impl<'a, T: Element> CubeIterator<'a, T> {
    pub(crate) fn new(handle: &'a ImageHandle, mode: IterMode) -> Self {
        CubeIterator {
            handle,
            mode,
            current_line: -1,
            current_column: -1,
            current_band: -1,
            complete: false,
            _element: PhantomData,
        }
    }

    /// The traversal mode.
    pub fn mode(&self) -> IterMode {
        self.mode
    }

    /// `true` once the final slice has been yielded.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Current line cursor, `None` before the first read.
    pub fn current_line(&self) -> Option<usize> {
        (self.current_line >= 0).then_some(self.current_line as usize)
    }

    /// Current column cursor, `None` before the first read.
    pub fn current_column(&self) -> Option<usize> {
        (self.current_column >= 0).then_some(self.current_column as usize)
    }

    /// Current band cursor, `None` before the first read.
    pub fn current_band(&self) -> Option<usize> {
        (self.current_band >= 0).then_some(self.current_band as usize)
    }

    /// Advance the cursor and read the next slice.
    pub fn read_next(&mut self) -> Result<CubeSlice<T>> {
        if self.complete {
            return Err(Error::IterationFinished);
        }
        match self.mode {
            IterMode::Line => {
                self.current_line += 1;
                let index = self.current_line as usize;
                if index == self.handle.lines() - 1 {
                    self.complete = true;
                }
                Ok(CubeSlice::Line(self.handle.read_line(index)?))
            }
            IterMode::Column => {
                self.current_column += 1;
                let index = self.current_column as usize;
                if index == self.handle.columns() - 1 {
                    self.complete = true;
                }
                Ok(CubeSlice::Column(self.handle.read_column(index)?))
            }
            IterMode::Band => {
                self.current_band += 1;
                let index = self.current_band as usize;
                if index == self.handle.bands() - 1 {
                    self.complete = true;
                }
                Ok(CubeSlice::Band(self.handle.read_band(index)?))
            }
            IterMode::Chunk { lines, columns } => {
                if lines == 0 || columns == 0 {
                    return Err(Error::InvalidValue {
                        key: String::from("chunk size"),
                        value: format!("({lines}, {columns})"),
                    });
                }
                if self.current_column < 0 {
                    self.current_column = 0;
                    self.current_line = 0;
                } else {
                    self.current_column += columns as isize;
                    if self.current_column >= self.handle.columns() as isize {
                        self.current_column = 0;
                        self.current_line += lines as isize;
                    }
                }

                let line_start = self.current_line as usize;
                let col_start = self.current_column as usize;
                let line_end = (line_start + lines).min(self.handle.lines());
                let col_end = (col_start + columns).min(self.handle.columns());
                if line_end == self.handle.lines() && col_end == self.handle.columns() {
                    self.complete = true;
                }
                Ok(CubeSlice::Chunk(self.handle.read_chunk(
                    col_start, col_end, line_start, line_end,
                )?))
            }
        }
    }

    /// Return all cursors to "before first" and clear the completion flag.
    /// The handle's load state is untouched.
    pub fn reset(&mut self) {
        self.current_line = -1;
        self.current_column = -1;
        self.current_band = -1;
        self.complete = false;
    }
}
