//! Uniform access to large hyperspectral imaging cubes.
//!
//! Cubes come in two incompatible on-disk forms: flat binary arrays in one
//! of three interleave orders described by a textual header, and
//! hierarchical scientific containers with a pre-ordered dataset. The
//! [`handle::ImageHandle`] exposes one read API over both, backed by a
//! lazy memory mapping or dataset handle, and [`iterate::CubeIterator`]
//! walks a cube sequentially by line, column, band, or chunk.

pub mod dtype;
pub mod error;
pub mod flat;
pub mod geometry;
pub mod handle;
pub mod header;
pub mod hierarchical;
pub mod interleave;
pub mod iterate;
pub mod value;

pub use dtype::{ByteOrder, DataType, Element};
pub use error::{Error, Result};
pub use flat::{FlatCube, MapMode};
pub use geometry::Geometry;
pub use handle::{Ancillary, FileType, ImageHandle};
pub use header::Header;
pub use hierarchical::{HierarchicalCube, HierarchicalOptions};
pub use interleave::Interleave;
pub use iterate::{CubeIterator, CubeSlice, IterMode};
pub use value::Value;
