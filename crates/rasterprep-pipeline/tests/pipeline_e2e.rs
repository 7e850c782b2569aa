//! End-to-end orchestrator tests with a recording engine.
//!
//! The reference products and candidates are small synthetic GeoTIFFs; the
//! external engine is replaced by in-process test doubles.

use gdal::raster::{Buffer, GdalDataType};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use rasterprep_core::error::PrepError;
use rasterprep_core::models::RasterRole;
use rasterprep_pipeline::{
    EngineInvocation, MetricsEngine, MetricsPipeline, RunRequest, Stage,
};
use rasterprep_raster::resolve;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WGS84_GT: [f64; 6] = [-81.0, 0.001, 0.0, 35.0, 0.0, -0.001];
const UTM17_GT: [f64; 6] = [500000.0, 10.0, 0.0, 3900000.0, 0.0, -10.0];

#[derive(Default)]
struct RecordingEngine {
    invocations: RefCell<Vec<EngineInvocation>>,
}

impl MetricsEngine for RecordingEngine {
    fn invoke(&self, invocation: &EngineInvocation) -> rasterprep_core::Result<()> {
        self.invocations.borrow_mut().push(invocation.clone());
        Ok(())
    }
}

struct FailingEngine;

impl MetricsEngine for FailingEngine {
    fn invoke(&self, _invocation: &EngineInvocation) -> rasterprep_core::Result<()> {
        Err(PrepError::EngineInvocation {
            reason: "engine exited with exit status: 1".to_string(),
        })
    }
}

fn write_raster(
    path: &Path,
    epsg: u32,
    geo_transform: [f64; 6],
    width: usize,
    height: usize,
    values: Vec<f64>,
) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f64, _>(path, width, height, 1)
        .unwrap();
    dataset.set_geo_transform(&geo_transform).unwrap();
    dataset
        .set_spatial_ref(&SpatialRef::from_epsg(epsg).unwrap())
        .unwrap();
    let mut band = dataset.rasterband(1).unwrap();
    let mut buffer = Buffer::new((width, height), values);
    band.write((0, 0), (width, height), &mut buffer).unwrap();
}

/// Reference directory with `AOI_1-DSM.tif` in UTM 17N plus one candidate
/// DSM/CLS pair in geographic coordinates.
struct Fixture {
    _dirs: Vec<TempDir>,
    reference_dir: PathBuf,
    dsm: PathBuf,
    cls: PathBuf,
    output_dir: PathBuf,
}

fn fixture() -> Fixture {
    let reference = TempDir::new().unwrap();
    let inputs = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let reference_dsm = reference.path().join("AOI_1-DSM.tif");
    write_raster(&reference_dsm, 32617, UTM17_GT, 8, 8, vec![10.0; 64]);

    let dsm = inputs.path().join("candidate-dsm.tif");
    write_raster(&dsm, 4326, WGS84_GT, 16, 16, vec![7.0; 256]);

    let cls = inputs.path().join("candidate-cls.tif");
    let labels = (0..256)
        .map(|i| if (i / 16 + i % 16) % 2 == 0 { 1.0 } else { 2.0 })
        .collect();
    write_raster(&cls, 4326, WGS84_GT, 16, 16, labels);

    Fixture {
        reference_dir: reference.path().to_path_buf(),
        dsm,
        cls,
        output_dir: output.path().join("run"),
        _dirs: vec![reference, inputs, output],
    }
}

fn request(fixture: &Fixture) -> RunRequest {
    RunRequest {
        reference_dir: fixture.reference_dir.clone(),
        reference_prefix: "AOI_1".to_string(),
        test_dsm: fixture.dsm.clone(),
        test_cls: fixture.cls.clone(),
        test_mtl: None,
        test_dtm: None,
        output_dir: Some(fixture.output_dir.clone()),
        template: None,
    }
}

fn band_type(path: &Path) -> GdalDataType {
    let dataset = Dataset::open(path).unwrap();
    let band = dataset.rasterband(1).unwrap();
    band.band_type()
}

#[test]
fn test_full_run_normalizes_and_dispatches() {
    let fixture = fixture();
    let engine = RecordingEngine::default();
    let pipeline = MetricsPipeline::new(request(&fixture), &engine);

    let report = pipeline.run().unwrap();

    // Both staged candidates report the reference CRS.
    let reference_crs = resolve(&fixture.reference_dir.join("AOI_1-DSM.tif")).unwrap();
    let staged_dsm = report
        .staged
        .iter()
        .find(|raster| raster.role == RasterRole::TestDsm)
        .unwrap();
    let staged_cls = report
        .staged
        .iter()
        .find(|raster| raster.role == RasterRole::TestCls)
        .unwrap();
    assert!(resolve(&staged_dsm.path).unwrap().is_equivalent(&reference_crs));
    assert!(resolve(&staged_cls.path).unwrap().is_equivalent(&reference_crs));
    assert!(report.target_crs.contains("+proj=utm"));

    // The staged DSM is Float32; the CLS is not subject to the coercion.
    assert_eq!(band_type(&staged_dsm.path), GdalDataType::Float32);

    // Originals are untouched; the pipeline reprojects copies only.
    assert!(resolve(&fixture.dsm)
        .unwrap()
        .is_equivalent(&resolve(&fixture.cls).unwrap()));

    // The config document binds the staged paths and empty optionals.
    let config = fs::read_to_string(&report.config_path).unwrap();
    assert!(config.contains(staged_dsm.path.to_str().unwrap()));
    assert!(config.contains(staged_cls.path.to_str().unwrap()));
    assert!(config.contains(r#""MTLFilename": """#));
    assert!(config.contains(r#""DTMFilename": """#));
    assert!(config.contains("AOI_1-DSM.tif"));

    // The engine saw exactly one dispatch with the prepared directories.
    let invocations = engine.invocations.borrow();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].config_path, report.config_path);
    assert_eq!(invocations[0].reference_dir, fixture.reference_dir);
    assert_eq!(invocations[0].test_dir, report.working_dir);
    assert_eq!(invocations[0].output_dir, report.working_dir);
}

#[test]
fn test_absent_optionals_are_not_staged() {
    let fixture = fixture();
    let engine = RecordingEngine::default();
    let pipeline = MetricsPipeline::new(request(&fixture), &engine);

    let report = pipeline.run().unwrap();

    let roles: Vec<_> = report.staged.iter().map(|raster| raster.role).collect();
    assert_eq!(roles, vec![RasterRole::TestDsm, RasterRole::TestCls]);
    assert_eq!(engine.invocations.borrow().len(), 1);
}

#[test]
fn test_supplied_optionals_are_staged_and_reprojected() {
    let fixture = fixture();

    let extras = TempDir::new().unwrap();
    let mtl = extras.path().join("candidate-mtl.tif");
    write_raster(&mtl, 4326, WGS84_GT, 16, 16, vec![3.0; 256]);
    let dtm = extras.path().join("candidate-dtm.tif");
    write_raster(&dtm, 4326, WGS84_GT, 16, 16, vec![5.0; 256]);

    let mut request = request(&fixture);
    request.test_mtl = Some(mtl);
    request.test_dtm = Some(dtm);

    let engine = RecordingEngine::default();
    let report = MetricsPipeline::new(request, &engine).run().unwrap();

    assert_eq!(report.staged.len(), 4);
    let reference_crs = resolve(&fixture.reference_dir.join("AOI_1-DSM.tif")).unwrap();
    for staged in &report.staged {
        assert!(staged.path.exists());
        assert!(resolve(&staged.path).unwrap().is_equivalent(&reference_crs));
    }

    let config = fs::read_to_string(&report.config_path).unwrap();
    let staged_mtl = report
        .staged
        .iter()
        .find(|raster| raster.role == RasterRole::TestMtl)
        .unwrap();
    assert!(config.contains(staged_mtl.path.to_str().unwrap()));
}

#[test]
fn test_unreadable_dsm_fails_before_config_is_written() {
    let fixture = fixture();
    fs::write(&fixture.dsm, b"definitely not a GeoTIFF").unwrap();

    let engine = RecordingEngine::default();
    let failure = MetricsPipeline::new(request(&fixture), &engine)
        .run()
        .unwrap_err();

    assert_eq!(failure.stage, Stage::StageInputs);
    assert!(matches!(failure.source, PrepError::UnreadableRaster { .. }));

    // No config document may exist in the working directory.
    let configs: Vec<_> = fs::read_dir(&fixture.output_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext == "config")
                .unwrap_or(false)
        })
        .collect();
    assert!(configs.is_empty());
    assert!(engine.invocations.borrow().is_empty());
}

#[test]
fn test_missing_required_input_is_a_staging_error() {
    let fixture = fixture();
    let mut request = request(&fixture);
    request.test_cls = PathBuf::from("/nonexistent/cls.tif");

    let engine = RecordingEngine::default();
    let failure = MetricsPipeline::new(request, &engine).run().unwrap_err();

    assert_eq!(failure.stage, Stage::StageInputs);
    assert!(matches!(failure.source, PrepError::Staging { .. }));
}

#[test]
fn test_existing_output_dir_is_reused_not_cleared() {
    let fixture = fixture();
    fs::create_dir_all(&fixture.output_dir).unwrap();
    let unrelated = fixture.output_dir.join("previous-results.txt");
    fs::write(&unrelated, "keep me").unwrap();

    let engine = RecordingEngine::default();
    let report = MetricsPipeline::new(request(&fixture), &engine)
        .run()
        .unwrap();

    assert_eq!(fs::read_to_string(&unrelated).unwrap(), "keep me");
    assert_eq!(report.working_dir, fs::canonicalize(&fixture.output_dir).unwrap());

    // A second run against the same directory is idempotent.
    let fixture2 = fixture_like(&fixture);
    let report2 = MetricsPipeline::new(request(&fixture2), &engine)
        .run()
        .unwrap();
    assert_eq!(report2.working_dir, report.working_dir);
    assert_eq!(engine.invocations.borrow().len(), 2);
}

/// Fresh candidate files targeting the same reference and output
/// directory.
fn fixture_like(original: &Fixture) -> Fixture {
    let inputs = TempDir::new().unwrap();
    let dsm = inputs.path().join("candidate-dsm.tif");
    write_raster(&dsm, 4326, WGS84_GT, 16, 16, vec![7.0; 256]);
    let cls = inputs.path().join("candidate-cls.tif");
    write_raster(&cls, 4326, WGS84_GT, 16, 16, vec![1.0; 256]);

    Fixture {
        reference_dir: original.reference_dir.clone(),
        dsm,
        cls,
        output_dir: original.output_dir.clone(),
        _dirs: vec![inputs],
    }
}

#[test]
fn test_engine_failure_keeps_working_directory() {
    let fixture = fixture();
    let failure = MetricsPipeline::new(request(&fixture), FailingEngine)
        .run()
        .unwrap_err();

    assert_eq!(failure.stage, Stage::InvokeEngine);
    assert!(matches!(failure.source, PrepError::EngineInvocation { .. }));

    // Everything the run prepared survives for inspection.
    assert!(fixture.output_dir.join("candidate-dsm.tif").exists());
    assert!(fixture.output_dir.join("candidate-cls.tif").exists());
    let entries: Vec<_> = fs::read_dir(&fixture.output_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext == "config")
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_missing_reference_dsm_fails_at_crs_stage() {
    let fixture = fixture();
    let mut request = request(&fixture);
    request.reference_prefix = "AOI_2".to_string();

    let failure = MetricsPipeline::new(request, RecordingEngine::default())
        .run()
        .unwrap_err();

    assert_eq!(failure.stage, Stage::NormalizeCrs);
    assert!(matches!(failure.source, PrepError::UnreadableRaster { .. }));
}
