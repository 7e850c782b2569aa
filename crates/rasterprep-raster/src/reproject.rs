//! In-place raster reprojection.
//!
//! The warp is an inverse-mapping resample: the destination grid is laid
//! out over the forward-projected source extent, then every destination
//! pixel center is projected back into the source CRS and sampled there.
//! Coordinates go through PROJ one row at a time.

use crate::crs::{descriptor_of, CrsDescriptor};
use crate::util::{open_readonly, sibling_tmp_path};
use gdal::raster::{Buffer, GdalDataType};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, Driver, DriverManager};
use proj::Proj;
use rasterprep_core::error::{PrepError, Result};
use std::fs;
use std::path::Path;

/// Resampling method applied when a raster actually changes CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    /// Sample the closest source pixel. The only safe choice for
    /// categorical rasters, which must not grow labels absent from the
    /// source.
    Nearest,
    /// Distance-weighted blend of the four closest source pixels, for
    /// continuous surfaces.
    Bilinear,
}

/// Rewrite the raster at `path` so its CRS equals `target`.
///
/// No-op when the current CRS is already equivalent to the target under
/// normalized-parameter comparison; the file is not touched at all in that
/// case. Otherwise the raster is resampled into a sibling temp file which
/// then replaces the original. Callers must be holding a disposable copy;
/// no backup is kept.
pub fn reproject(path: &Path, target: &CrsDescriptor, resampling: Resampling) -> Result<()> {
    let source = open_readonly(path)?;

    if source.projection().is_empty() {
        return Err(reprojection_error(path, "source raster has no CRS"));
    }
    let source_crs = descriptor_of(&source, path)?;

    if source_crs.is_equivalent(target) {
        tracing::debug!(
            path = %path.display(),
            "CRS already matches the target, skipping reprojection"
        );
        return Ok(());
    }

    // Reject a malformed target before any destination file exists.
    SpatialRef::from_proj4(target.proj4())
        .map_err(|e| reprojection_error(path, format!("malformed target CRS: {}", e)))?;

    let tmp_path = sibling_tmp_path(path);
    warp(&source, path, &source_crs, target, resampling, &tmp_path)?;
    drop(source);

    fs::rename(&tmp_path, path)?;
    tracing::info!(
        path = %path.display(),
        target = target.proj4(),
        "reprojected raster"
    );
    Ok(())
}

fn warp(
    source: &Dataset,
    source_path: &Path,
    source_crs: &CrsDescriptor,
    target: &CrsDescriptor,
    resampling: Resampling,
    out_path: &Path,
) -> Result<()> {
    let (width, height) = source.raster_size();
    let source_gt = source
        .geo_transform()
        .map_err(|e| reprojection_error(source_path, format!("no geotransform: {}", e)))?;
    if source_gt[2] != 0.0 || source_gt[4] != 0.0 {
        return Err(reprojection_error(
            source_path,
            "rotated geotransforms are not supported",
        ));
    }

    let forward = Proj::new_known_crs(source_crs.proj4(), target.proj4(), None)
        .map_err(|e| reprojection_error(source_path, format!("cannot build transform: {}", e)))?;
    let inverse = Proj::new_known_crs(target.proj4(), source_crs.proj4(), None)
        .map_err(|e| reprojection_error(source_path, format!("cannot build transform: {}", e)))?;

    let (min_x, min_y, max_x, max_y) =
        projected_extent(&forward, &source_gt, width, height, source_path)?;

    // Same pixel counts as the source; the resolution follows the new
    // extent.
    let target_gt = [
        min_x,
        (max_x - min_x) / width as f64,
        0.0,
        max_y,
        0.0,
        -(max_y - min_y) / height as f64,
    ];

    let band_count = source.raster_count();
    let band_type = source
        .rasterband(1)
        .map_err(|e| reprojection_error(source_path, format!("cannot access band 1: {}", e)))?
        .band_type();

    let driver = DriverManager::get_driver_by_name("GTiff")
        .map_err(|e| reprojection_error(source_path, format!("GTiff driver unavailable: {}", e)))?;
    let mut destination = create_dataset(&driver, out_path, width, height, band_count, band_type)
        .map_err(|e| reprojection_error(source_path, format!("cannot create output: {}", e)))?;

    destination
        .set_geo_transform(&target_gt)
        .map_err(|e| reprojection_error(source_path, e.to_string()))?;
    let target_sr = SpatialRef::from_proj4(target.proj4())
        .map_err(|e| reprojection_error(source_path, format!("malformed target CRS: {}", e)))?;
    destination
        .set_spatial_ref(&target_sr)
        .map_err(|e| reprojection_error(source_path, e.to_string()))?;

    for band_index in 1..=band_count {
        let source_band = source
            .rasterband(band_index)
            .map_err(|e| reprojection_error(source_path, e.to_string()))?;
        let no_data = source_band.no_data_value();
        let pixels = source_band
            .read_as::<f64>((0, 0), (width, height), (width, height), None)
            .map_err(|e| reprojection_error(source_path, e.to_string()))?;

        let resampled = resample_band(
            pixels.data(),
            &source_gt,
            width,
            height,
            &target_gt,
            &inverse,
            resampling,
            no_data,
            source_path,
        )?;

        let mut destination_band = destination
            .rasterband(band_index)
            .map_err(|e| reprojection_error(source_path, e.to_string()))?;
        if no_data.is_some() {
            destination_band
                .set_no_data_value(no_data)
                .map_err(|e| reprojection_error(source_path, e.to_string()))?;
        }
        let mut buffer = Buffer::new((width, height), resampled);
        destination_band
            .write((0, 0), (width, height), &mut buffer)
            .map_err(|e| reprojection_error(source_path, e.to_string()))?;
    }

    Ok(())
}

/// Bounding box of the source extent in the target CRS, from a densified
/// boundary so curved projected edges cannot clip the output.
fn projected_extent(
    forward: &Proj,
    geo_transform: &[f64; 6],
    width: usize,
    height: usize,
    source_path: &Path,
) -> Result<(f64, f64, f64, f64)> {
    const EDGE_SAMPLES: usize = 21;

    let far_col = width as f64;
    let far_row = height as f64;
    let mut boundary = Vec::with_capacity(EDGE_SAMPLES * 4);
    for step in 0..EDGE_SAMPLES {
        let t = step as f64 / (EDGE_SAMPLES - 1) as f64;
        boundary.push(pixel_to_geo(geo_transform, t * far_col, 0.0));
        boundary.push(pixel_to_geo(geo_transform, t * far_col, far_row));
        boundary.push(pixel_to_geo(geo_transform, 0.0, t * far_row));
        boundary.push(pixel_to_geo(geo_transform, far_col, t * far_row));
    }

    forward
        .convert_array(&mut boundary)
        .map_err(|e| reprojection_error(source_path, format!("cannot project extent: {}", e)))?;

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(x, y) in &boundary {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return Err(reprojection_error(
            source_path,
            "source extent does not project into the target CRS",
        ));
    }

    Ok((min_x, min_y, max_x, max_y))
}

#[allow(clippy::too_many_arguments)]
fn resample_band(
    source: &[f64],
    source_gt: &[f64; 6],
    width: usize,
    height: usize,
    target_gt: &[f64; 6],
    inverse: &Proj,
    resampling: Resampling,
    no_data: Option<f64>,
    source_path: &Path,
) -> Result<Vec<f64>> {
    // Destination pixels that land outside the source footprint get the
    // declared no-data value, or zero when none is declared.
    let fill = no_data.unwrap_or(0.0);

    let mut output = Vec::with_capacity(width * height);
    let mut row_points = vec![(0.0_f64, 0.0_f64); width];

    for row in 0..height {
        for (col, point) in row_points.iter_mut().enumerate() {
            *point = pixel_to_geo(target_gt, col as f64 + 0.5, row as f64 + 0.5);
        }
        inverse
            .convert_array(&mut row_points)
            .map_err(|e| reprojection_error(source_path, format!("inverse transform: {}", e)))?;

        for &(x, y) in &row_points {
            // Fractional source pixel coordinates of this destination
            // pixel center.
            let source_col = (x - source_gt[0]) / source_gt[1] - 0.5;
            let source_row = (y - source_gt[3]) / source_gt[5] - 0.5;

            let value = match resampling {
                Resampling::Nearest => {
                    nearest(source, width, height, source_col, source_row, fill)
                }
                Resampling::Bilinear => {
                    bilinear(source, width, height, source_col, source_row, no_data, fill)
                }
            };
            output.push(value);
        }
    }

    Ok(output)
}

fn nearest(source: &[f64], width: usize, height: usize, col: f64, row: f64, fill: f64) -> f64 {
    let col = col.round();
    let row = row.round();
    if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
        return fill;
    }
    source[row as usize * width + col as usize]
}

fn bilinear(
    source: &[f64],
    width: usize,
    height: usize,
    col: f64,
    row: f64,
    no_data: Option<f64>,
    fill: f64,
) -> f64 {
    let col0 = col.floor();
    let row0 = row.floor();

    // Pixels without a full 2x2 neighborhood fall back to nearest.
    if col0 < 0.0 || row0 < 0.0 || col0 + 1.0 >= width as f64 || row0 + 1.0 >= height as f64 {
        return nearest(source, width, height, col, row, fill);
    }

    let c = col0 as usize;
    let r = row0 as usize;
    let corners = [
        source[r * width + c],
        source[r * width + c + 1],
        source[(r + 1) * width + c],
        source[(r + 1) * width + c + 1],
    ];

    // Never blend the no-data sentinel into valid elevations.
    if let Some(sentinel) = no_data {
        if corners.iter().any(|&v| v == sentinel) {
            return nearest(source, width, height, col, row, fill);
        }
    }

    let dx = col - col0;
    let dy = row - row0;
    let top = corners[0] * (1.0 - dx) + corners[1] * dx;
    let bottom = corners[2] * (1.0 - dx) + corners[3] * dx;
    top * (1.0 - dy) + bottom * dy
}

fn pixel_to_geo(geo_transform: &[f64; 6], col: f64, row: f64) -> (f64, f64) {
    (
        geo_transform[0] + col * geo_transform[1] + row * geo_transform[2],
        geo_transform[3] + col * geo_transform[4] + row * geo_transform[5],
    )
}

// GTiff creation is generic over the pixel type, so runtime band types are
// dispatched here. Exotic integer widths widen to Float64.
fn create_dataset(
    driver: &Driver,
    path: &Path,
    width: usize,
    height: usize,
    bands: usize,
    band_type: GdalDataType,
) -> gdal::errors::Result<Dataset> {
    match band_type {
        GdalDataType::UInt8 => driver.create_with_band_type::<u8, _>(path, width, height, bands),
        GdalDataType::UInt16 => driver.create_with_band_type::<u16, _>(path, width, height, bands),
        GdalDataType::Int16 => driver.create_with_band_type::<i16, _>(path, width, height, bands),
        GdalDataType::UInt32 => driver.create_with_band_type::<u32, _>(path, width, height, bands),
        GdalDataType::Int32 => driver.create_with_band_type::<i32, _>(path, width, height, bands),
        GdalDataType::Float32 => driver.create_with_band_type::<f32, _>(path, width, height, bands),
        _ => driver.create_with_band_type::<f64, _>(path, width, height, bands),
    }
}

fn reprojection_error(path: &Path, reason: impl Into<String>) -> PrepError {
    PrepError::Reprojection {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
