//! Coordinate reference system resolution and comparison.

use crate::util::open_readonly;
use gdal::Dataset;
use rasterprep_core::error::{PrepError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// A CRS captured as PROJ parameters.
///
/// The descriptor carries full projection parameters rather than an
/// authority code, so locally-defined reference projections survive the
/// trip through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsDescriptor {
    proj4: String,
}

impl CrsDescriptor {
    pub fn from_proj4(proj4: impl Into<String>) -> Self {
        Self {
            proj4: proj4.into(),
        }
    }

    pub fn proj4(&self) -> &str {
        &self.proj4
    }

    /// Equivalence under normalized parameters, never raw string equality.
    /// Equivalent definitions routinely differ in token order and numeric
    /// formatting.
    pub fn is_equivalent(&self, other: &CrsDescriptor) -> bool {
        normalized_parameters(&self.proj4) == normalized_parameters(&other.proj4)
    }
}

/// Verify that a raster opens under GDAL without reading its bands.
pub fn validate_raster(path: &Path) -> Result<()> {
    open_readonly(path).map(|_| ())
}

/// Extract the CRS descriptor from a georeferenced raster.
pub fn resolve(path: &Path) -> Result<CrsDescriptor> {
    let dataset = open_readonly(path)?;
    descriptor_of(&dataset, path)
}

pub(crate) fn descriptor_of(dataset: &Dataset, path: &Path) -> Result<CrsDescriptor> {
    if dataset.projection().is_empty() {
        return Err(PrepError::UnreadableRaster {
            path: path.to_path_buf(),
            reason: "raster carries no CRS metadata".to_string(),
        });
    }

    let spatial_ref = dataset.spatial_ref().map_err(|e| PrepError::UnreadableRaster {
        path: path.to_path_buf(),
        reason: format!("cannot read spatial reference: {}", e),
    })?;

    let proj4 = spatial_ref.to_proj4().map_err(|e| PrepError::UnreadableRaster {
        path: path.to_path_buf(),
        reason: format!("cannot export CRS as PROJ parameters: {}", e),
    })?;

    Ok(CrsDescriptor::from_proj4(proj4))
}

/// Break a PROJ parameter string into a canonical key/value set.
///
/// Tokens that do not affect the transform (`+no_defs`, `+wktext`,
/// `+type=crs`) are dropped, and numeric values are canonicalized, so
/// "+lat_0=0" and "+lat_0=0.0" normalize identically.
fn normalized_parameters(proj4: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();

    for token in proj4.split_whitespace() {
        let token = token.trim_start_matches('+');
        if token.is_empty() {
            continue;
        }

        let (key, value) = match token.split_once('=') {
            Some((key, value)) => (key.to_ascii_lowercase(), value),
            None => (token.to_ascii_lowercase(), ""),
        };

        if matches!(key.as_str(), "no_defs" | "wktext" | "type") {
            continue;
        }

        let value = match value.parse::<f64>() {
            Ok(number) => number.to_string(),
            Err(_) => value.to_ascii_lowercase(),
        };

        params.insert(key, value);
    }

    params
}
