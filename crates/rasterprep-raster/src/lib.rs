//! Rasterprep Raster - GDAL-backed raster normalization operations
//!
//! CRS resolution, in-place reprojection, and pixel-type coercion for the
//! staged rasters of one evaluation run.

mod util;

pub mod crs;
pub mod dtype;
pub mod reproject;

pub use crs::{resolve, validate_raster, CrsDescriptor};
pub use dtype::normalize_dtype;
pub use reproject::{reproject, Resampling};
