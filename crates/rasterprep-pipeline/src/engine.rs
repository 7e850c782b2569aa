//! The boundary to the external metrics engine.
//!
//! The engine computes the actual accuracy metrics; this system only
//! prepares its inputs. The engine is a capability the orchestrator is
//! handed, so tests substitute a recording implementation.

use rasterprep_core::error::{PrepError, Result};
use std::path::PathBuf;
use std::process::Command;

/// One engine invocation: which config document to read and where the
/// reference, test, and output files live.
#[derive(Debug, Clone)]
pub struct EngineInvocation {
    pub config_path: PathBuf,
    pub reference_dir: PathBuf,
    pub test_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Port for the external evaluation engine.
pub trait MetricsEngine {
    fn invoke(&self, invocation: &EngineInvocation) -> Result<()>;
}

impl<E: MetricsEngine + ?Sized> MetricsEngine for &E {
    fn invoke(&self, invocation: &EngineInvocation) -> Result<()> {
        (**self).invoke(invocation)
    }
}

/// Production implementation: spawn the engine command as a child process
/// and block until it exits. The engine's exit status decides the run's
/// outcome.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    command: String,
}

impl ProcessEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl MetricsEngine for ProcessEngine {
    fn invoke(&self, invocation: &EngineInvocation) -> Result<()> {
        tracing::info!(
            command = %self.command,
            config = %invocation.config_path.display(),
            "invoking metrics engine"
        );

        let status = Command::new(&self.command)
            .arg("--config")
            .arg(&invocation.config_path)
            .arg("--reference")
            .arg(&invocation.reference_dir)
            .arg("--test")
            .arg(&invocation.test_dir)
            .arg("--output")
            .arg(&invocation.output_dir)
            .status()
            .map_err(|e| PrepError::EngineInvocation {
                reason: format!("cannot spawn {}: {}", self.command, e),
            })?;

        if !status.success() {
            return Err(PrepError::EngineInvocation {
                reason: format!("{} exited with {}", self.command, status),
            });
        }
        Ok(())
    }
}
