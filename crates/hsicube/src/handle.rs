//! The unifying per-file cube handle.
//!
//! An [`ImageHandle`] hides which physical format backs a file: every
//! read request is dispatched either through the interleave-aware flat
//! backend or the hierarchical container's native indexing, and comes back
//! in canonical logical order. This is the only surface downstream
//! consumers (correction algorithms, samplers, exporters) depend on.

use std::path::Path;

use log::warn;
use ndarray::{Array2, Array3};

use crate::dtype::{DataType, Element};
use crate::error::{Error, Result};
use crate::flat::{FlatCube, MapMode};
use crate::geometry::Geometry;
use crate::header::Header;
use crate::hierarchical::{HierarchicalCube, HierarchicalOptions};
use crate::iterate::{CubeIterator, IterMode};

/// Which physical format backs a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Flat binary cube with a sibling textual header.
    Flat,
    /// Hierarchical scientific container.
    Hierarchical,
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Flat => write!(f, "flat"),
            FileType::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

/// Per-scene observation geometry and terrain layers, in radians
/// (path length in the data's own distance unit).
#[derive(Debug, Clone)]
pub struct Ancillary {
    pub solar_zn: Array2<f64>,
    pub solar_az: Array2<f64>,
    pub sensor_zn: Array2<f64>,
    pub sensor_az: Array2<f64>,
    pub slope: Array2<f64>,
    pub aspect: Array2<f64>,
    pub path_length: Option<Array2<f64>>,
}

enum Backend {
    Flat(FlatCube),
    Hierarchical(HierarchicalCube),
}

/// One open cube, flat or hierarchical, behind a single read API.
///
/// The handle owns its backing resource exclusively; distinct handles over
/// distinct files are independent. A handle is not safe for concurrent
/// mutation from multiple threads: its load state is unsynchronized.
pub struct ImageHandle {
    backend: Backend,
}

/// Derive a bad-band mask from wavelength regions: band `i` is bad iff its
/// wavelength falls inside *any* `[start, end]` interval.
fn mask_from_regions(wavelengths: &[f64], regions: &[(f64, f64)]) -> Vec<bool> {
    wavelengths
        .iter()
        .map(|&wave| {
            !regions
                .iter()
                .any(|&(start, end)| wave >= start && wave <= end)
        })
        .collect()
}

impl ImageHandle {
    /// Open a flat binary cube (sibling `.hdr` header required).
    pub fn open_flat(path: impl AsRef<Path>) -> Result<Self> {
        Ok(ImageHandle {
            backend: Backend::Flat(FlatCube::open(path)?),
        })
    }

    /// Open a hierarchical container cube.
    pub fn open_hierarchical(
        path: impl AsRef<Path>,
        options: HierarchicalOptions,
    ) -> Result<Self> {
        Ok(ImageHandle {
            backend: Backend::Hierarchical(HierarchicalCube::open(path, options)?),
        })
    }

    /// Which backend serves this handle.
    pub fn file_type(&self) -> FileType {
        match &self.backend {
            Backend::Flat(_) => FileType::Flat,
            Backend::Hierarchical(_) => FileType::Hierarchical,
        }
    }

    /// The cube file path.
    pub fn path(&self) -> &Path {
        match &self.backend {
            Backend::Flat(cube) => cube.path(),
            Backend::Hierarchical(cube) => cube.path(),
        }
    }

    /// Number of lines.
    pub fn lines(&self) -> usize {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().lines,
            Backend::Hierarchical(cube) => cube.lines(),
        }
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().columns,
            Backend::Hierarchical(cube) => cube.columns(),
        }
    }

    /// Number of spectral bands.
    pub fn bands(&self) -> usize {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().bands,
            Backend::Hierarchical(cube) => cube.bands(),
        }
    }

    /// Logical shape `(lines, columns, bands)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.lines(), self.columns(), self.bands())
    }

    /// Element type of the stored data.
    pub fn dtype(&self) -> DataType {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().dtype,
            Backend::Hierarchical(cube) => cube.dtype(),
        }
    }

    /// Band-center wavelengths, if the cube carries them.
    pub fn wavelengths(&self) -> Option<&[f64]> {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().wavelengths.as_deref(),
            Backend::Hierarchical(cube) => Some(cube.wavelengths()),
        }
    }

    /// Full width at half maximum per band.
    pub fn fwhm(&self) -> Option<&[f64]> {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().fwhm.as_deref(),
            Backend::Hierarchical(cube) => Some(cube.fwhm()),
        }
    }

    /// Wavelength unit string.
    pub fn wavelength_units(&self) -> Option<&str> {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().wavelength_units.as_deref(),
            Backend::Hierarchical(cube) => cube.wavelength_units(),
        }
    }

    /// Opaque georeferencing string.
    pub fn map_info(&self) -> Option<&str> {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().map_info.as_deref(),
            Backend::Hierarchical(cube) => cube.map_info(),
        }
    }

    /// No-data sentinel. For flat cubes this is the header value or the
    /// corner-vote guess; for hierarchical cubes the open-time option.
    pub fn no_data(&self) -> Option<f64> {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().no_data,
            Backend::Hierarchical(cube) => Some(cube.no_data()),
        }
    }

    /// Override the no-data sentinel (the inference heuristic is not
    /// guaranteed correct).
    pub fn set_no_data(&mut self, value: f64) {
        match &mut self.backend {
            Backend::Flat(cube) => cube.geometry_mut().no_data = Some(value),
            Backend::Hierarchical(cube) => cube.set_no_data(value),
        }
    }

    /// Bad-band mask, `true` = usable.
    pub fn bad_bands(&self) -> Option<&[bool]> {
        match &self.backend {
            Backend::Flat(cube) => cube.geometry().bad_bands.as_deref(),
            Backend::Hierarchical(cube) => cube.bad_bands(),
        }
    }

    /// The parsed flat header, including unrecognized keys. `None` for
    /// hierarchical cubes.
    pub fn header(&self) -> Option<&Header> {
        match &self.backend {
            Backend::Flat(cube) => Some(cube.header()),
            Backend::Hierarchical(_) => None,
        }
    }

    /// The flat-cube geometry record. `None` for hierarchical cubes.
    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.backend {
            Backend::Flat(cube) => Some(cube.geometry()),
            Backend::Hierarchical(_) => None,
        }
    }

    /// Observation geometry and terrain layers, if loaded.
    pub fn ancillary(&self) -> Option<&Ancillary> {
        match &self.backend {
            Backend::Flat(cube) => cube.ancillary(),
            Backend::Hierarchical(cube) => cube.ancillary(),
        }
    }

    /// Acquire the backing resource (memory mapping or dataset handle).
    /// Idempotent. Hierarchical containers are always opened read-only;
    /// the mode applies to flat mappings.
    pub fn load(&mut self, mode: MapMode) -> Result<()> {
        match &mut self.backend {
            Backend::Flat(cube) => cube.load(mode),
            Backend::Hierarchical(cube) => cube.load(),
        }
    }

    /// Release the backing resource. Safe to call when not loaded.
    pub fn close(&mut self) {
        match &mut self.backend {
            Backend::Flat(cube) => cube.close(),
            Backend::Hierarchical(cube) => cube.close(),
        }
    }

    /// Returns `true` while the backing resource is held.
    pub fn is_loaded(&self) -> bool {
        match &self.backend {
            Backend::Flat(cube) => cube.is_loaded(),
            Backend::Hierarchical(cube) => cube.is_loaded(),
        }
    }

    /// Read one band as a (lines, columns) array.
    pub fn read_band<T: Element>(&self, index: usize) -> Result<Array2<T>> {
        match &self.backend {
            Backend::Flat(cube) => cube.read_band(index),
            Backend::Hierarchical(cube) => cube.read_band(index),
        }
    }

    /// Read one line as a (columns, bands) array.
    pub fn read_line<T: Element>(&self, index: usize) -> Result<Array2<T>> {
        match &self.backend {
            Backend::Flat(cube) => cube.read_line(index),
            Backend::Hierarchical(cube) => cube.read_line(index),
        }
    }

    /// Read one column as a (lines, bands) array.
    pub fn read_column<T: Element>(&self, index: usize) -> Result<Array2<T>> {
        match &self.backend {
            Backend::Flat(cube) => cube.read_column(index),
            Backend::Hierarchical(cube) => cube.read_column(index),
        }
    }

    /// Read a rectangular chunk as a (lines, columns, bands) array over
    /// half-open ranges `[col_start, col_end)`, `[line_start, line_end)`.
    pub fn read_chunk<T: Element>(
        &self,
        col_start: usize,
        col_end: usize,
        line_start: usize,
        line_end: usize,
    ) -> Result<Array3<T>> {
        match &self.backend {
            Backend::Flat(cube) => cube.read_chunk(col_start, col_end, line_start, line_end),
            Backend::Hierarchical(cube) => {
                cube.read_chunk(col_start, col_end, line_start, line_end)
            }
        }
    }

    /// Index of the band whose center wavelength is closest to `wave`.
    ///
    /// Returns `None` (with a warning) when the query lies outside the
    /// cube's spectral range or the cube carries no wavelengths — a
    /// recoverable probe result, not an error.
    pub fn wave_to_band(&self, wave: f64) -> Option<usize> {
        let wavelengths = self.wavelengths()?;
        if wavelengths.is_empty() {
            return None;
        }
        let min = wavelengths.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = wavelengths
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        if wave < min || wave > max {
            warn!("wavelength {wave} outside image range [{min}, {max}]");
            return None;
        }
        wavelengths
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - wave)
                    .abs()
                    .partial_cmp(&(*b - wave).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(index, _)| index)
    }

    /// Read the band closest to the given wavelength.
    ///
    /// Fails with [`Error::WavelengthOutOfRange`] when the query lies
    /// outside the spectral range, and [`Error::NoWavelengths`] when the
    /// cube has no wavelength metadata.
    pub fn read_wave<T: Element>(&self, wave: f64) -> Result<Array2<T>> {
        if self.wavelengths().map_or(true, <[f64]>::is_empty) {
            return Err(Error::NoWavelengths);
        }
        match self.wave_to_band(wave) {
            Some(index) => self.read_band(index),
            None => Err(Error::WavelengthOutOfRange(wave)),
        }
    }

    /// Build and install a bad-band mask from wavelength regions.
    ///
    /// Band `i` is marked bad iff its wavelength falls inside *any*
    /// `[start, end]` interval. Returns the mask (`true` = usable).
    pub fn build_bad_band_mask(&mut self, regions: &[(f64, f64)]) -> Result<Vec<bool>> {
        let wavelengths = self.wavelengths().ok_or(Error::NoWavelengths)?;
        let mask = mask_from_regions(wavelengths, regions);
        match &mut self.backend {
            Backend::Flat(cube) => cube.geometry_mut().bad_bands = Some(mask.clone()),
            Backend::Hierarchical(cube) => cube.set_bad_bands(mask.clone()),
        }
        Ok(mask)
    }

    /// Read a sibling observables cube (flat backend only) and install its
    /// geometry bands as ancillary layers, converted to radians.
    ///
    /// The observables cube uses the standard band layout: 1 sensor
    /// azimuth, 2 sensor zenith, 3 solar azimuth, 4 solar zenith, 6 slope,
    /// 7 aspect (all in degrees).
    pub fn load_observables(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let Backend::Flat(cube) = &mut self.backend else {
            return Err(Error::WrongBackend("load_observables"));
        };

        let mut observables = FlatCube::open(path)?;
        observables.load(MapMode::Read)?;
        let band_radians = |index: usize| -> Result<Array2<f64>> {
            Ok(observables.read_band_f64(index)?.mapv_into(f64::to_radians))
        };
        let ancillary = Ancillary {
            sensor_az: band_radians(1)?,
            sensor_zn: band_radians(2)?,
            solar_az: band_radians(3)?,
            solar_zn: band_radians(4)?,
            slope: band_radians(6)?,
            aspect: band_radians(7)?,
            path_length: None,
        };
        observables.close();
        cube.set_ancillary(ancillary);
        Ok(())
    }

    /// Create an iterator over this cube.
    ///
    /// The iterator borrows the handle and performs no caching: each
    /// `read_next` is a fresh read from the backing resource.
    pub fn iterate<T: Element>(&self, mode: IterMode) -> CubeIterator<'_, T> {
        CubeIterator::new(self, mode)
    }
}
