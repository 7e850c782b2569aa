//! Domain models for the raster products handled by one evaluation run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Logical role of a raster product within one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RasterRole {
    /// Reference Digital Surface Model (the fixed product set).
    ReferenceDsm,
    /// Candidate Digital Surface Model.
    TestDsm,
    /// Candidate Class Label raster.
    TestCls,
    /// Candidate Material raster.
    TestMtl,
    /// Candidate Digital Terrain Model.
    TestDtm,
}

impl RasterRole {
    /// Categorical rasters carry discrete labels; resampling them must not
    /// invent values absent from the source.
    pub fn is_categorical(&self) -> bool {
        matches!(self, RasterRole::TestCls | RasterRole::TestMtl)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RasterRole::ReferenceDsm => "reference-dsm",
            RasterRole::TestDsm => "test-dsm",
            RasterRole::TestCls => "test-cls",
            RasterRole::TestMtl => "test-mtl",
            RasterRole::TestDtm => "test-dtm",
        }
    }
}

impl fmt::Display for RasterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conventional file name of the reference DSM for a given prefix.
pub fn reference_dsm_name(prefix: &str) -> String {
    format!("{prefix}-DSM.tif")
}

/// A candidate raster after it has been copied into the working directory.
#[derive(Debug, Clone, Serialize)]
pub struct StagedRaster {
    pub role: RasterRole,
    pub path: PathBuf,
}

impl StagedRaster {
    pub fn new(role: RasterRole, path: PathBuf) -> Self {
        Self { role, path }
    }
}
