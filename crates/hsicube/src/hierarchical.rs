//! Hierarchical container backend.
//!
//! The container holds one top-level group with a `Reflectance` subtree:
//! the spectral dataset (`Reflectance_Data`, shaped lines x columns x
//! bands) and a `Metadata` subtree with wavelengths, coordinate system
//! and optional per-scene geometry and terrain layers. Unlike the flat
//! backend there is no interleave ambiguity; the on-disk order is always
//! canonical, so reads are plain hyperslab selections.

use std::path::{Path, PathBuf};

use hdf5::types::VarLenUnicode;
use hdf5::{Dataset, File, Group};
use log::{debug, warn};
use ndarray::{s, Array2, Array3, Ix2, Ix3};

use crate::dtype::{DataType, Element};
use crate::error::{Error, Result};
use crate::handle::Ancillary;

/// Options for opening a hierarchical cube.
#[derive(Debug, Clone, Copy)]
pub struct HierarchicalOptions {
    /// No-data sentinel; the container format carries none of its own.
    pub no_data: f64,
    /// Also read per-scene geometry and terrain ancillary layers.
    pub load_ancillary: bool,
}

impl Default for HierarchicalOptions {
    fn default() -> Self {
        HierarchicalOptions {
            no_data: -9999.0,
            load_ancillary: false,
        }
    }
}

/// A hierarchical cube: metadata read at open time plus an optional open
/// dataset handle, present only between `load()` and `close()`.
pub struct HierarchicalCube {
    path: PathBuf,
    group: String,
    lines: usize,
    columns: usize,
    bands: usize,
    dtype: DataType,
    wavelengths: Vec<f64>,
    fwhm: Vec<f64>,
    wavelength_units: Option<String>,
    projection: Option<String>,
    map_info: Option<String>,
    transform: Option<[f64; 6]>,
    no_data: f64,
    bad_bands: Option<Vec<bool>>,
    ancillary: Option<Ancillary>,
    resource: Option<(File, Dataset)>,
}

fn reflectance_dataset(file: &File, group: &str) -> Result<Dataset> {
    Ok(file.group(group)?.group("Reflectance")?.dataset("Reflectance_Data")?)
}

fn read_string(group: &Group, name: &str) -> Option<String> {
    group
        .dataset(name)
        .ok()
        .and_then(|ds| ds.read_scalar::<VarLenUnicode>().ok())
        .map(|s| s.as_str().to_string())
}

/// Derive the affine transform from a comma-separated map-info string.
fn transform_from_map_info(map_info: &str) -> Option<[f64; 6]> {
    let fields: Vec<&str> = map_info.split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return None;
    }
    let pixel_w: f64 = fields[1].parse().ok()?;
    let pixel_h: f64 = fields[2].parse().ok()?;
    let ulx: f64 = fields[3].parse().ok()?;
    let uly: f64 = fields[4].parse().ok()?;
    Some([ulx, pixel_w, 0.0, uly, 0.0, -pixel_h])
}

impl HierarchicalCube {
    /// Open a hierarchical cube and read its metadata.
    ///
    /// The container is closed again before returning; `load()` reopens it
    /// and binds the spectral dataset.
    pub fn open(path: impl AsRef<Path>, options: HierarchicalOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let group = file
            .member_names()?
            .into_iter()
            .next()
            .ok_or(Error::InvalidStructure("container has no top-level group"))?;

        let data = reflectance_dataset(&file, &group)?;
        let shape = data.shape();
        if shape.len() != 3 {
            return Err(Error::InvalidStructure("spectral dataset is not 3-dimensional"));
        }
        let (lines, columns, bands) = (shape[0], shape[1], shape[2]);
        if lines == 0 || columns == 0 || bands == 0 {
            return Err(Error::InvalidStructure("spectral dataset has a zero extent"));
        }
        let dtype = DataType::from_descriptor(&data.dtype()?.to_descriptor()?)?;

        let metadata = file.group(&group)?.group("Reflectance")?.group("Metadata")?;

        let spectral = metadata.group("Spectral_Data")?;
        let wavelength_ds = spectral.dataset("Wavelength")?;
        let wavelengths = wavelength_ds.read_1d::<f64>()?.to_vec();
        if wavelengths.len() != bands {
            return Err(Error::LengthMismatch {
                field: "wavelength",
                expected: bands,
                actual: wavelengths.len(),
            });
        }
        let fwhm = spectral.dataset("FWHM")?.read_1d::<f64>()?.to_vec();
        let wavelength_units = wavelength_ds
            .attr("Units")
            .ok()
            .and_then(|attr| attr.read_scalar::<VarLenUnicode>().ok())
            .map(|units| units.as_str().to_string());
        if wavelength_units.is_none() {
            warn!("wavelength units not specified in {}", path.display());
        }

        let coord = metadata.group("Coordinate_System")?;
        let projection = read_string(&coord, "Coordinate_System_String");
        let map_info = read_string(&coord, "Map_Info");
        let transform = map_info.as_deref().and_then(transform_from_map_info);

        let ancillary = if options.load_ancillary {
            Some(Self::read_ancillary(&metadata, lines, columns)?)
        } else {
            None
        };

        Ok(HierarchicalCube {
            path: path.to_path_buf(),
            group,
            lines,
            columns,
            bands,
            dtype,
            wavelengths,
            fwhm,
            wavelength_units,
            projection,
            map_info,
            transform,
            no_data: options.no_data,
            bad_bands: None,
            ancillary,
            resource: None,
        })
    }

    /// Read solar/sensor geometry and terrain layers, converting
    /// degree-valued fields to radians.
    fn read_ancillary(metadata: &Group, lines: usize, columns: usize) -> Result<Ancillary> {
        let logs = metadata.group("Logs")?;
        let solar_zn_deg = logs.dataset("Solar_Zenith_Angle")?.read_scalar::<f64>()?;
        let solar_az_deg = logs.dataset("Solar_Azimuth_Angle")?.read_scalar::<f64>()?;

        let sensor_zn = metadata
            .dataset("to-sensor_Zenith_Angle")?
            .read_2d::<f64>()?
            .mapv_into(f64::to_radians);
        let sensor_az = metadata
            .dataset("to-sensor_Azimuth_Angle")?
            .read_2d::<f64>()?
            .mapv_into(f64::to_radians);

        let terrain = metadata.group("Ancillary_Imagery")?;
        let slope = terrain
            .dataset("Slope")?
            .read_2d::<f64>()?
            .mapv_into(f64::to_radians);
        let aspect = terrain
            .dataset("Aspect")?
            .read_2d::<f64>()?
            .mapv_into(f64::to_radians);
        let path_length = terrain.dataset("Path_Length")?.read_2d::<f64>()?;

        Ok(Ancillary {
            solar_zn: Array2::from_elem((lines, columns), solar_zn_deg.to_radians()),
            solar_az: Array2::from_elem((lines, columns), solar_az_deg.to_radians()),
            sensor_zn,
            sensor_az,
            slope,
            aspect,
            path_length: Some(path_length),
        })
    }

    /// The container file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The top-level group name the cube was found under.
    pub fn group_name(&self) -> &str {
        &self.group
    }

    /// Logical extents.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Element type of the spectral dataset.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn fwhm(&self) -> &[f64] {
        &self.fwhm
    }

    pub fn wavelength_units(&self) -> Option<&str> {
        self.wavelength_units.as_deref()
    }

    /// Coordinate system string, verbatim from the container.
    pub fn projection(&self) -> Option<&str> {
        self.projection.as_deref()
    }

    pub fn map_info(&self) -> Option<&str> {
        self.map_info.as_deref()
    }

    /// Affine transform `(ulx, pixel_w, 0, uly, 0, -pixel_h)` derived from
    /// the map-info string.
    pub fn transform(&self) -> Option<[f64; 6]> {
        self.transform
    }

    pub fn no_data(&self) -> f64 {
        self.no_data
    }

    pub fn set_no_data(&mut self, value: f64) {
        self.no_data = value;
    }

    pub fn bad_bands(&self) -> Option<&[bool]> {
        self.bad_bands.as_deref()
    }

    pub(crate) fn set_bad_bands(&mut self, mask: Vec<bool>) {
        self.bad_bands = Some(mask);
    }

    pub fn ancillary(&self) -> Option<&Ancillary> {
        self.ancillary.as_ref()
    }

    /// Reopen the container and bind the spectral dataset. Idempotent.
    pub fn load(&mut self) -> Result<()> {
        if self.resource.is_some() {
            return Ok(());
        }
        let file = File::open(&self.path)?;
        let dataset = reflectance_dataset(&file, &self.group)?;
        debug!("opened dataset in {}", self.path.display());
        self.resource = Some((file, dataset));
        Ok(())
    }

    /// Drop the dataset handle and close the container. Safe when not
    /// loaded.
    pub fn close(&mut self) {
        if self.resource.take().is_some() {
            debug!("closed {}", self.path.display());
        }
    }

    /// Returns `true` while the dataset handle is bound.
    pub fn is_loaded(&self) -> bool {
        self.resource.is_some()
    }

    fn dataset(&self) -> Result<&Dataset> {
        self.resource
            .as_ref()
            .map(|(_, dataset)| dataset)
            .ok_or(Error::NotLoaded)
    }

    /// Read one band as a (lines, columns) array.
    pub fn read_band<T: Element>(&self, index: usize) -> Result<Array2<T>> {
        let dataset = self.dataset()?;
        if index >= self.bands {
            return Err(Error::IndexOutOfBounds {
                axis: "band",
                index,
                extent: self.bands,
            });
        }
        Ok(dataset.read_slice::<T, _, Ix2>(s![.., .., index])?)
    }

    /// Read one line as a (columns, bands) array.
    pub fn read_line<T: Element>(&self, index: usize) -> Result<Array2<T>> {
        let dataset = self.dataset()?;
        if index >= self.lines {
            return Err(Error::IndexOutOfBounds {
                axis: "line",
                index,
                extent: self.lines,
            });
        }
        Ok(dataset.read_slice::<T, _, Ix2>(s![index, .., ..])?)
    }

    /// Read one column as a (lines, bands) array.
    pub fn read_column<T: Element>(&self, index: usize) -> Result<Array2<T>> {
        let dataset = self.dataset()?;
        if index >= self.columns {
            return Err(Error::IndexOutOfBounds {
                axis: "column",
                index,
                extent: self.columns,
            });
        }
        Ok(dataset.read_slice::<T, _, Ix2>(s![.., index, ..])?)
    }

    /// Read a rectangular chunk as a (lines, columns, bands) array.
    pub fn read_chunk<T: Element>(
        &self,
        col_start: usize,
        col_end: usize,
        line_start: usize,
        line_end: usize,
    ) -> Result<Array3<T>> {
        let dataset = self.dataset()?;
        if line_start > line_end || line_end > self.lines {
            return Err(Error::InvalidRange {
                axis: "line",
                start: line_start,
                end: line_end,
                extent: self.lines,
            });
        }
        if col_start > col_end || col_end > self.columns {
            return Err(Error::InvalidRange {
                axis: "column",
                start: col_start,
                end: col_end,
                extent: self.columns,
            });
        }
        Ok(dataset.read_slice::<T, _, Ix3>(s![line_start..line_end, col_start..col_end, ..])?)
    }
}

impl Drop for HierarchicalCube {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_from_map_info_fields() {
        let info = "UTM, 1.0, 1.0, 553245.0, 4186735.0, 1, 1, 11, North, WGS-84";
        let t = transform_from_map_info(info).unwrap();
        assert_eq!(t, [553245.0, 1.0, 0.0, 4186735.0, 0.0, -1.0]);
    }

    #[test]
    fn transform_rejects_short_or_non_numeric() {
        assert!(transform_from_map_info("UTM, 1.0").is_none());
        assert!(transform_from_map_info("UTM, a, b, c, d").is_none());
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = HierarchicalCube::open(
            dir.path().join("absent.h5"),
            HierarchicalOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn default_options() {
        let options = HierarchicalOptions::default();
        assert_eq!(options.no_data, -9999.0);
        assert!(!options.load_ancillary);
    }
}
