//! The orchestrator: working-directory lifecycle and step sequencing.
//!
//! One run is strictly sequential: prepare the working directory, stage
//! the candidate files into it, render the config document, normalize
//! coordinates and pixel types, then dispatch to the engine. The first
//! failure aborts the run and the working directory is left as-is for
//! post-mortem inspection.

use crate::engine::{EngineInvocation, MetricsEngine};
use crate::error::{RunResult, StageFailure};
use crate::stage::Stage;
use rasterprep_core::error::{PrepError, Result};
use rasterprep_core::models::{reference_dsm_name, RasterRole, StagedRaster};
use rasterprep_core::template;
use rasterprep_raster::{CrsDescriptor, Resampling};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Directory holding the reference products.
    pub reference_dir: PathBuf,
    /// File prefix of the reference products (`<prefix>-DSM.tif`).
    pub reference_prefix: String,
    /// Candidate DSM file (required).
    pub test_dsm: PathBuf,
    /// Candidate CLS file (required).
    pub test_cls: PathBuf,
    /// Candidate MTL file.
    pub test_mtl: Option<PathBuf>,
    /// Candidate DTM file.
    pub test_dtm: Option<PathBuf>,
    /// Explicit working directory; a timestamped one is created in the
    /// current directory when absent.
    pub output_dir: Option<PathBuf>,
    /// Config document template; the built-in one when absent.
    pub template: Option<String>,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub working_dir: PathBuf,
    pub config_path: PathBuf,
    pub staged: Vec<StagedRaster>,
    /// PROJ parameters of the reference CRS everything was normalized to.
    pub target_crs: String,
}

/// Sequential, blocking pipeline around one working directory.
///
/// The directory is exclusively owned by this run; running two pipelines
/// against the same directory is undefined by contract.
pub struct MetricsPipeline<E: MetricsEngine> {
    request: RunRequest,
    engine: E,
}

impl<E: MetricsEngine> MetricsPipeline<E> {
    pub fn new(request: RunRequest, engine: E) -> Self {
        Self { request, engine }
    }

    /// Run every stage in order.
    pub fn run(&self) -> RunResult<RunReport> {
        let fail = StageFailure::new;

        let working_dir = self
            .prepare_directory()
            .map_err(|e| fail(Stage::PrepareDirectory, e))?;
        tracing::info!(dir = %working_dir.display(), "working directory ready");

        let staged = self
            .stage_inputs(&working_dir)
            .map_err(|e| fail(Stage::StageInputs, e))?;
        tracing::info!(count = staged.len(), "inputs staged");

        let config_path = self
            .render_config(&working_dir, &staged)
            .map_err(|e| fail(Stage::RenderConfig, e))?;
        tracing::info!(config = %config_path.display(), "config document written");

        let target_crs = self
            .normalize_crs(&staged)
            .map_err(|e| fail(Stage::NormalizeCrs, e))?;

        self.normalize_dtype(&staged)
            .map_err(|e| fail(Stage::NormalizeDtype, e))?;

        self.invoke_engine(&working_dir, &config_path)
            .map_err(|e| fail(Stage::InvokeEngine, e))?;

        Ok(RunReport {
            working_dir,
            config_path,
            staged,
            target_crs: target_crs.proj4().to_string(),
        })
    }

    /// An explicit output directory is created if missing and reused if
    /// present, never cleared. Without one, each run gets a fresh
    /// timestamp-named directory.
    fn prepare_directory(&self) -> Result<PathBuf> {
        let dir = match &self.request.output_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir.clone()
            }
            None => {
                let dir = PathBuf::from(format!("metrics-{}", chrono::Utc::now().timestamp()));
                fs::create_dir(&dir)?;
                dir
            }
        };
        // Absolute from here on; the config document binds absolute paths.
        Ok(fs::canonicalize(dir)?)
    }

    fn stage_inputs(&self, working_dir: &Path) -> Result<Vec<StagedRaster>> {
        let mut staged = vec![
            stage_file(&self.request.test_dsm, RasterRole::TestDsm, working_dir)?,
            stage_file(&self.request.test_cls, RasterRole::TestCls, working_dir)?,
        ];
        if let Some(mtl) = &self.request.test_mtl {
            staged.push(stage_file(mtl, RasterRole::TestMtl, working_dir)?);
        }
        if let Some(dtm) = &self.request.test_dtm {
            staged.push(stage_file(dtm, RasterRole::TestDtm, working_dir)?);
        }
        Ok(staged)
    }

    fn render_config(&self, working_dir: &Path, staged: &[StagedRaster]) -> Result<PathBuf> {
        let path_of = |role: RasterRole| {
            staged
                .iter()
                .find(|raster| raster.role == role)
                .map(|raster| raster.path.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let dsm = path_of(RasterRole::TestDsm);
        let cls = path_of(RasterRole::TestCls);
        let mtl = path_of(RasterRole::TestMtl);
        let dtm = path_of(RasterRole::TestDtm);

        let template = self
            .request
            .template
            .as_deref()
            .unwrap_or(template::DEFAULT_TEMPLATE);
        let contents = template::render(
            template,
            &self.request.reference_prefix,
            &dsm,
            &cls,
            &mtl,
            &dtm,
        )?;

        let config_path =
            working_dir.join(template::config_filename(Path::new(&dsm), Path::new(&cls)));
        fs::write(&config_path, contents)?;
        Ok(config_path)
    }

    /// The reference DSM defines the CRS every candidate is normalized
    /// into; the downstream alignment fails ungracefully on mismatched
    /// coordinate systems.
    fn normalize_crs(&self, staged: &[StagedRaster]) -> Result<CrsDescriptor> {
        let reference_dsm = self
            .request
            .reference_dir
            .join(reference_dsm_name(&self.request.reference_prefix));
        let target = rasterprep_raster::resolve(&reference_dsm)?;
        tracing::info!(target = target.proj4(), "resolved reference CRS");

        for raster in staged {
            let resampling = if raster.role.is_categorical() {
                Resampling::Nearest
            } else {
                Resampling::Bilinear
            };
            rasterprep_raster::reproject(&raster.path, &target, resampling)?;
        }
        Ok(target)
    }

    /// Only the DSM is subject to the engine's Float32 constraint.
    fn normalize_dtype(&self, staged: &[StagedRaster]) -> Result<()> {
        if let Some(dsm) = staged.iter().find(|raster| raster.role == RasterRole::TestDsm) {
            rasterprep_raster::normalize_dtype(&dsm.path)?;
        }
        Ok(())
    }

    fn invoke_engine(&self, working_dir: &Path, config_path: &Path) -> Result<()> {
        let invocation = EngineInvocation {
            config_path: config_path.to_path_buf(),
            reference_dir: self.request.reference_dir.clone(),
            test_dir: working_dir.to_path_buf(),
            output_dir: working_dir.to_path_buf(),
        };
        self.engine.invoke(&invocation)
    }
}

fn stage_file(source: &Path, role: RasterRole, working_dir: &Path) -> Result<StagedRaster> {
    if !source.exists() {
        return Err(PrepError::Staging {
            path: source.to_path_buf(),
            reason: "input file does not exist".to_string(),
        });
    }

    // An unreadable input must surface here, before the config document
    // exists.
    rasterprep_raster::validate_raster(source)?;

    let file_name = source.file_name().ok_or_else(|| PrepError::Staging {
        path: source.to_path_buf(),
        reason: "input path has no file name".to_string(),
    })?;
    let destination = working_dir.join(file_name);
    fs::copy(source, &destination).map_err(|e| PrepError::Staging {
        path: source.to_path_buf(),
        reason: format!("cannot copy into working directory: {}", e),
    })?;

    tracing::debug!(
        role = %role,
        from = %source.display(),
        to = %destination.display(),
        "staged input"
    );
    Ok(StagedRaster::new(role, destination))
}
