//! Pixel storage type normalization.
//!
//! The external engine reads Float32 only and silently misbehaves on
//! Float64 input, so the staged DSM is coerced before dispatch. The
//! conversion must carry the no-data sentinel across; losing it would turn
//! voids into elevations.

use crate::util::{open_readonly, sibling_tmp_path};
use gdal::raster::{Buffer, GdalDataType};
use gdal::DriverManager;
use rasterprep_core::error::{PrepError, Result};
use std::fs;
use std::path::Path;

/// Rewrite every band of the raster at `path` as single-precision float.
///
/// No-op when all bands already are Float32, which also makes the
/// operation idempotent. A declared no-data value is clamped into the
/// Float32 range and every sentinel pixel re-reads as the clamped value.
pub fn normalize_dtype(path: &Path) -> Result<()> {
    let source = open_readonly(path)?;
    let band_count = source.raster_count();

    let mut needs_conversion = false;
    for band_index in 1..=band_count {
        let band = source
            .rasterband(band_index)
            .map_err(|e| conversion_error(path, e.to_string()))?;
        if band.band_type() != GdalDataType::Float32 {
            needs_conversion = true;
        }
    }
    if !needs_conversion {
        tracing::debug!(path = %path.display(), "already Float32, skipping conversion");
        return Ok(());
    }

    let (width, height) = source.raster_size();
    let driver = DriverManager::get_driver_by_name("GTiff")
        .map_err(|e| conversion_error(path, format!("GTiff driver unavailable: {}", e)))?;

    let tmp_path = sibling_tmp_path(path);
    let mut destination = driver
        .create_with_band_type::<f32, _>(&tmp_path, width, height, band_count)
        .map_err(|e| conversion_error(path, format!("cannot create output: {}", e)))?;

    if let Ok(geo_transform) = source.geo_transform() {
        destination
            .set_geo_transform(&geo_transform)
            .map_err(|e| conversion_error(path, e.to_string()))?;
    }
    if !source.projection().is_empty() {
        let spatial_ref = source
            .spatial_ref()
            .map_err(|e| conversion_error(path, e.to_string()))?;
        destination
            .set_spatial_ref(&spatial_ref)
            .map_err(|e| conversion_error(path, e.to_string()))?;
    }

    for band_index in 1..=band_count {
        let band = source
            .rasterband(band_index)
            .map_err(|e| conversion_error(path, e.to_string()))?;
        let no_data = band.no_data_value();
        let pixels = band
            .read_as::<f64>((0, 0), (width, height), (width, height), None)
            .map_err(|e| conversion_error(path, e.to_string()))?;

        let new_no_data = no_data.map(clamp_to_f32);
        let converted = convert_values(pixels.data(), no_data, new_no_data, path)?;

        let mut destination_band = destination
            .rasterband(band_index)
            .map_err(|e| conversion_error(path, e.to_string()))?;
        if new_no_data.is_some() {
            destination_band
                .set_no_data_value(new_no_data)
                .map_err(|e| conversion_error(path, e.to_string()))?;
        }
        let mut buffer = Buffer::new((width, height), converted);
        destination_band
            .write((0, 0), (width, height), &mut buffer)
            .map_err(|e| conversion_error(path, e.to_string()))?;
    }

    drop(destination);
    drop(source);
    fs::rename(&tmp_path, path)?;
    tracing::info!(path = %path.display(), "converted raster to Float32");
    Ok(())
}

fn convert_values(
    pixels: &[f64],
    no_data: Option<f64>,
    new_no_data: Option<f64>,
    path: &Path,
) -> Result<Vec<f64>> {
    // NaN sentinels need their own comparison; NaN never equals itself.
    let is_sentinel = |value: f64| match no_data {
        Some(sentinel) if sentinel.is_nan() => value.is_nan(),
        Some(sentinel) => value == sentinel,
        None => false,
    };

    let mut converted = Vec::with_capacity(pixels.len());
    for &value in pixels {
        if is_sentinel(value) {
            converted.push(new_no_data.unwrap_or(value));
        } else {
            if value.is_finite() && value.abs() > f64::from(f32::MAX) {
                return Err(conversion_error(
                    path,
                    format!("value {} exceeds the Float32 range", value),
                ));
            }
            converted.push(value);
        }
    }
    Ok(converted)
}

/// Re-encode the sentinel in Float32: finite values clamp into the
/// representable range and round to the closest Float32, so the declared
/// no-data value and the stored pixels stay bit-identical.
fn clamp_to_f32(value: f64) -> f64 {
    if value.is_nan() || value.is_infinite() {
        return value;
    }
    f64::from(value.clamp(f64::from(f32::MIN), f64::from(f32::MAX)) as f32)
}

fn conversion_error(path: &Path, reason: impl Into<String>) -> PrepError {
    PrepError::DtypeConversion {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
