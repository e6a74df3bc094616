//! Flat binary cube backend.
//!
//! A flat cube is a raw array of fixed-width elements in one of the three
//! interleave orders, described by a sibling `.hdr` text file. The data
//! file is memory-mapped on `load()` and unmapped on `close()`; reads
//! build zero-copy views over the mapping and copy out only the requested
//! slice.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use memmap2::{Mmap, MmapMut, MmapOptions};
use ndarray::{Array, Array2, Array3, ArrayView3, Dimension};

use crate::dtype::{self, DataType, Element};
use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::handle::Ancillary;
use crate::header::Header;
use crate::interleave;

/// Mapping mode for [`FlatCube::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Read-only mapping.
    Read,
    /// Read-write mapping of the underlying file.
    ReadWrite,
}

enum Mapping {
    Ro(Mmap),
    Rw(MmapMut),
}

impl Mapping {
    fn bytes(&self) -> &[u8] {
        match self {
            Mapping::Ro(map) => map,
            Mapping::Rw(map) => map,
        }
    }
}

/// A flat binary cube: parsed geometry plus an optional memory mapping.
///
/// The mapping exists only between [`load`](FlatCube::load) and
/// [`close`](FlatCube::close); every read checks for it and fails with
/// [`Error::NotLoaded`] otherwise.
pub struct FlatCube {
    path: PathBuf,
    header: Header,
    geometry: Geometry,
    ancillary: Option<Ancillary>,
    mapping: Option<Mapping>,
}

impl FlatCube {
    /// Open a flat cube: locate the sibling header, parse it, and resolve
    /// the cube geometry. The data itself is not mapped until `load()`.
    ///
    /// If the header carries no `data ignore value`, the cube is briefly
    /// mapped to infer the sentinel from the four corner pixels of band 0
    /// (plurality vote; ties go to the first corner in ul, ur, ll, lr
    /// order), then unmapped again.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let header_path = path.with_extension("hdr");
        if !header_path.is_file() {
            return Err(Error::MissingHeader(header_path));
        }

        let header = Header::parse_file(&header_path)?;
        let geometry = Geometry::from_header(&header)?;
        let mut cube = FlatCube {
            path: path.to_path_buf(),
            header,
            geometry,
            ancillary: None,
            mapping: None,
        };

        if cube.geometry.no_data.is_none() {
            warn!(
                "no data ignore value in {}; guessing from image corners",
                cube.path.display()
            );
            cube.load(MapMode::Read)?;
            let guess = cube.infer_no_data()?;
            cube.geometry.no_data = Some(guess);
            cube.close();
        }

        Ok(cube)
    }

    /// The cube data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parsed header, including unrecognized keys.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The resolved cube geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Mutable access to the geometry, for overriding the no-data sentinel
    /// or installing a bad-band mask.
    pub fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    /// Observation geometry layers installed by `load_observables`.
    pub fn ancillary(&self) -> Option<&Ancillary> {
        self.ancillary.as_ref()
    }

    pub(crate) fn set_ancillary(&mut self, ancillary: Ancillary) {
        self.ancillary = Some(ancillary);
    }

    /// Map the data file into memory. Idempotent: loading an already
    /// loaded cube is a no-op and does not duplicate the mapping.
    pub fn load(&mut self, mode: MapMode) -> Result<()> {
        if self.mapping.is_some() {
            return Ok(());
        }

        let expected = (self.geometry.offset + self.geometry.byte_len()) as u64;
        let actual = std::fs::metadata(&self.path)?.len();
        if actual != expected {
            return Err(Error::FileSize { expected, actual });
        }

        let mapping = match mode {
            MapMode::Read => {
                let file = File::open(&self.path)?;
                Mapping::Ro(unsafe { MmapOptions::new().map(&file)? })
            }
            MapMode::ReadWrite => {
                let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
                Mapping::Rw(unsafe { MmapOptions::new().map_mut(&file)? })
            }
        };
        debug!("mapped {} ({} bytes)", self.path.display(), actual);
        self.mapping = Some(mapping);
        Ok(())
    }

    /// Release the mapping. Safe to call when not loaded.
    pub fn close(&mut self) {
        if self.mapping.take().is_some() {
            debug!("unmapped {}", self.path.display());
        }
    }

    /// Returns `true` while the data file is mapped.
    pub fn is_loaded(&self) -> bool {
        self.mapping.is_some()
    }

    /// Raw cube bytes past the header-offset prefix.
    fn data_bytes(&self) -> Result<&[u8]> {
        let mapping = self.mapping.as_ref().ok_or(Error::NotLoaded)?;
        Ok(&mapping.bytes()[self.geometry.offset..])
    }

    /// Typed physical view without byte-order normalization.
    fn raw_view<T: Element>(&self) -> Result<ArrayView3<'_, T>> {
        if T::DTYPE != self.geometry.dtype {
            return Err(Error::TypeMismatch {
                declared: self.geometry.dtype,
                requested: T::DTYPE,
            });
        }
        let slice: &[T] =
            bytemuck::try_cast_slice(self.data_bytes()?).map_err(|_| Error::Unaligned)?;
        let [d0, d1, d2] = self.geometry.physical_shape();
        ArrayView3::from_shape((d0, d1, d2), slice)
            .map_err(|_| Error::InvalidStructure("mapped size disagrees with geometry"))
    }

    /// Zero-copy typed view of the whole cube in physical order.
    ///
    /// Only available when the declared byte order matches the host; use
    /// the owned read accessors otherwise.
    pub fn view<T: Element>(&self) -> Result<ArrayView3<'_, T>> {
        if !self.geometry.byte_order.is_native() {
            return Err(Error::ForeignByteOrder);
        }
        self.raw_view()
    }

    /// Swap the owned slice to native byte order if the cube is foreign.
    fn to_native<T: Element, D: Dimension>(&self, mut array: Array<T, D>) -> Array<T, D> {
        if !self.geometry.byte_order.is_native() {
            array.mapv_inplace(Element::swap_bytes);
        }
        array
    }

    /// Read one band as a (lines, columns) array.
    pub fn read_band<T: Element>(&self, index: usize) -> Result<Array2<T>> {
        let view = interleave::band_view(self.raw_view()?, self.geometry.interleave, index)?;
        Ok(self.to_native(view.to_owned()))
    }

    /// Read one line as a (columns, bands) array.
    pub fn read_line<T: Element>(&self, index: usize) -> Result<Array2<T>> {
        let view = interleave::line_view(self.raw_view()?, self.geometry.interleave, index)?;
        Ok(self.to_native(view.to_owned()))
    }

    /// Read one column as a (lines, bands) array.
    pub fn read_column<T: Element>(&self, index: usize) -> Result<Array2<T>> {
        let view = interleave::column_view(self.raw_view()?, self.geometry.interleave, index)?;
        Ok(self.to_native(view.to_owned()))
    }

    /// Read a rectangular chunk as a (lines, columns, bands) array over the
    /// half-open ranges `[col_start, col_end)` and `[line_start, line_end)`.
    pub fn read_chunk<T: Element>(
        &self,
        col_start: usize,
        col_end: usize,
        line_start: usize,
        line_end: usize,
    ) -> Result<Array3<T>> {
        let view = interleave::chunk_view(
            self.raw_view()?,
            self.geometry.interleave,
            col_start,
            col_end,
            line_start,
            line_end,
        )?;
        Ok(self.to_native(view.to_owned()))
    }

    /// Read one band as `f64` regardless of the declared element type.
    pub fn read_band_f64(&self, index: usize) -> Result<Array2<f64>> {
        match self.geometry.dtype {
            DataType::U8 => Ok(self.read_band::<u8>(index)?.mapv(f64::from)),
            DataType::I16 => Ok(self.read_band::<i16>(index)?.mapv(f64::from)),
            DataType::I32 => Ok(self.read_band::<i32>(index)?.mapv(f64::from)),
            DataType::F32 => Ok(self.read_band::<f32>(index)?.mapv(f64::from)),
            DataType::F64 => self.read_band::<f64>(index),
            DataType::U16 => Ok(self.read_band::<u16>(index)?.mapv(f64::from)),
            DataType::U32 => Ok(self.read_band::<u32>(index)?.mapv(f64::from)),
            DataType::I64 => Ok(self.read_band::<i64>(index)?.mapv(|v| v as f64)),
            DataType::U64 => Ok(self.read_band::<u64>(index)?.mapv(|v| v as f64)),
        }
    }

    /// Decode the band-0 element at logical (line, column) as `f64`.
    fn corner_value(&self, line: usize, column: usize) -> Result<f64> {
        let g = &self.geometry;
        let index = match g.interleave {
            interleave::Interleave::Bip => (line * g.columns + column) * g.bands,
            interleave::Interleave::Bil => line * g.bands * g.columns + column,
            interleave::Interleave::Bsq => line * g.columns + column,
        };
        let start = index * g.dtype.size();
        let bytes = self.data_bytes()?;
        Ok(dtype::decode_scalar(
            &bytes[start..start + g.dtype.size()],
            g.dtype,
            g.byte_order,
        ))
    }

    /// Guess the no-data sentinel from the four corners of band 0.
    ///
    /// Assumes no-data regions are large enough to touch at least two
    /// corners; callers may override the result.
    fn infer_no_data(&self) -> Result<f64> {
        let last_line = self.geometry.lines - 1;
        let last_column = self.geometry.columns - 1;
        let samples = [
            self.corner_value(0, 0)?,
            self.corner_value(0, last_column)?,
            self.corner_value(last_line, 0)?,
            self.corner_value(last_line, last_column)?,
        ];

        let mut best = samples[0];
        let mut best_count = 0;
        for &sample in &samples {
            let count = samples.iter().filter(|&&other| other == sample).count();
            if count > best_count {
                best = sample;
                best_count = count;
            }
        }
        Ok(best)
    }
}

impl Drop for FlatCube {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interleave::Interleave;
    use std::io::Write;

    const LINES: usize = 4;
    const COLUMNS: usize = 5;
    const BANDS: usize = 3;

    fn element(line: usize, column: usize, band: usize) -> f32 {
        (line * 10_000 + column * 100 + band) as f32
    }

    fn write_cube(
        dir: &Path,
        name: &str,
        interleave: Interleave,
        header_extra: &str,
        value: impl Fn(usize, usize, usize) -> f32,
    ) -> PathBuf {
        let data_path = dir.join(format!("{name}.img"));
        let mut data = Vec::new();
        match interleave {
            Interleave::Bip => {
                for l in 0..LINES {
                    for c in 0..COLUMNS {
                        for b in 0..BANDS {
                            data.extend_from_slice(&value(l, c, b).to_le_bytes());
                        }
                    }
                }
            }
            Interleave::Bil => {
                for l in 0..LINES {
                    for b in 0..BANDS {
                        for c in 0..COLUMNS {
                            data.extend_from_slice(&value(l, c, b).to_le_bytes());
                        }
                    }
                }
            }
            Interleave::Bsq => {
                for b in 0..BANDS {
                    for l in 0..LINES {
                        for c in 0..COLUMNS {
                            data.extend_from_slice(&value(l, c, b).to_le_bytes());
                        }
                    }
                }
            }
        }
        std::fs::write(&data_path, &data).unwrap();

        let mut header = std::fs::File::create(dir.join(format!("{name}.hdr"))).unwrap();
        write!(
            header,
            "ENVI\nsamples = {COLUMNS}\nlines = {LINES}\nbands = {BANDS}\n\
             data type = 4\ninterleave = {interleave}\nbyte order = 0\n{header_extra}"
        )
        .unwrap();
        data_path
    }

    #[test]
    fn open_without_header_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orphan.img");
        std::fs::write(&path, [0u8; 4]).unwrap();
        let err = FlatCube::open(&path).unwrap_err();
        assert!(matches!(err, Error::MissingHeader(_)));
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = FlatCube::open(dir.path().join("absent.img")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn reads_require_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cube(
            dir.path(),
            "cube",
            Interleave::Bip,
            "data ignore value = -9999\n",
            element,
        );
        let cube = FlatCube::open(&path).unwrap();
        assert!(!cube.is_loaded());
        assert!(matches!(
            cube.read_band::<f32>(0),
            Err(Error::NotLoaded)
        ));
    }

    #[test]
    fn load_is_idempotent_and_close_is_safe() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cube(
            dir.path(),
            "cube",
            Interleave::Bil,
            "data ignore value = -9999\n",
            element,
        );
        let mut cube = FlatCube::open(&path).unwrap();
        cube.close(); // no-op before load
        cube.load(MapMode::Read).unwrap();
        cube.load(MapMode::Read).unwrap();
        assert!(cube.is_loaded());
        let band = cube.read_band::<f32>(1).unwrap();
        assert_eq!(band[[2, 3]], element(2, 3, 1));
        cube.close();
        assert!(!cube.is_loaded());
        assert!(matches!(
            cube.read_line::<f32>(0),
            Err(Error::NotLoaded)
        ));
        // A fresh load serves reads again.
        cube.load(MapMode::Read).unwrap();
        assert_eq!(cube.read_band::<f32>(0).unwrap()[[0, 0]], element(0, 0, 0));
    }

    #[test]
    fn size_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cube(
            dir.path(),
            "cube",
            Interleave::Bip,
            "data ignore value = 0\n",
            element,
        );
        // Truncate the data file.
        let data = std::fs::read(&path).unwrap();
        std::fs::write(&path, &data[..data.len() - 4]).unwrap();
        let mut cube = FlatCube::open(&path).unwrap();
        assert!(matches!(
            cube.load(MapMode::Read),
            Err(Error::FileSize { .. })
        ));
    }

    #[test]
    fn type_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cube(
            dir.path(),
            "cube",
            Interleave::Bip,
            "data ignore value = 0\n",
            element,
        );
        let mut cube = FlatCube::open(&path).unwrap();
        cube.load(MapMode::Read).unwrap();
        assert!(matches!(
            cube.read_band::<i16>(0),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn no_data_inferred_from_corners() {
        let dir = tempfile::tempdir().unwrap();
        // Three corners share -9999, one is 0.
        let path = write_cube(dir.path(), "cube", Interleave::Bsq, "", |l, c, b| {
            if b != 0 {
                return 1.0;
            }
            match (l, c) {
                (0, 0) => -9999.0,
                (0, 4) => -9999.0,
                (3, 0) => 0.0,
                (3, 4) => -9999.0,
                _ => 7.0,
            }
        });
        let cube = FlatCube::open(&path).unwrap();
        assert_eq!(cube.geometry().no_data, Some(-9999.0));
        // Inference unmaps again.
        assert!(!cube.is_loaded());
    }

    #[test]
    fn no_data_tie_takes_first_corner() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cube(dir.path(), "cube", Interleave::Bip, "", |l, c, b| {
            if b != 0 {
                return 1.0;
            }
            match (l, c) {
                (0, 0) | (0, 4) => -5.0,
                _ => 0.0,
            }
        });
        let cube = FlatCube::open(&path).unwrap();
        assert_eq!(cube.geometry().no_data, Some(-5.0));
    }

    #[test]
    fn big_endian_cube_reads_native_values() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("be.img");
        let mut data = Vec::new();
        for l in 0..LINES {
            for c in 0..COLUMNS {
                for b in 0..BANDS {
                    data.extend_from_slice(&element(l, c, b).to_be_bytes());
                }
            }
        }
        std::fs::write(&data_path, &data).unwrap();
        std::fs::write(
            dir.path().join("be.hdr"),
            format!(
                "ENVI\nsamples = {COLUMNS}\nlines = {LINES}\nbands = {BANDS}\n\
                 data type = 4\ninterleave = bip\nbyte order = 1\n\
                 data ignore value = -9999\n"
            ),
        )
        .unwrap();

        let mut cube = FlatCube::open(&data_path).unwrap();
        cube.load(MapMode::Read).unwrap();
        assert!(matches!(cube.view::<f32>(), Err(Error::ForeignByteOrder)));
        let band = cube.read_band::<f32>(2).unwrap();
        assert_eq!(band[[1, 4]], element(1, 4, 2));
        let chunk = cube.read_chunk::<f32>(0, 2, 1, 3).unwrap();
        assert_eq!(chunk[[0, 1, 2]], element(1, 1, 2));
    }

    #[test]
    fn read_write_mapping_serves_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cube(
            dir.path(),
            "cube",
            Interleave::Bil,
            "data ignore value = -9999\n",
            element,
        );
        let mut cube = FlatCube::open(&path).unwrap();
        cube.load(MapMode::ReadWrite).unwrap();
        assert_eq!(cube.read_column::<f32>(2).unwrap()[[1, 1]], element(1, 2, 1));
    }

    #[test]
    fn header_offset_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("off.img");
        let mut data = vec![0xAB; 16]; // byte prefix
        for l in 0..LINES {
            for c in 0..COLUMNS {
                for b in 0..BANDS {
                    data.extend_from_slice(&element(l, c, b).to_le_bytes());
                }
            }
        }
        std::fs::write(&data_path, &data).unwrap();
        std::fs::write(
            dir.path().join("off.hdr"),
            format!(
                "ENVI\nsamples = {COLUMNS}\nlines = {LINES}\nbands = {BANDS}\n\
                 data type = 4\ninterleave = bip\nbyte order = 0\nheader offset = 16\n\
                 data ignore value = -9999\n"
            ),
        )
        .unwrap();

        let mut cube = FlatCube::open(&data_path).unwrap();
        cube.load(MapMode::Read).unwrap();
        assert_eq!(cube.read_band::<f32>(0).unwrap()[[3, 4]], element(3, 4, 0));
    }
}
