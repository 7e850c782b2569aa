//! Pipeline-level error wrapping.

use crate::stage::Stage;
use rasterprep_core::PrepError;
use thiserror::Error;

/// A failed run, annotated with the stage that aborted it.
///
/// Whatever the stage left in the working directory stays there; failed
/// runs are inspected, not cleaned up.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: PrepError,
}

impl StageFailure {
    pub fn new(stage: Stage, source: PrepError) -> Self {
        Self { stage, source }
    }
}

pub type RunResult<T> = std::result::Result<T, StageFailure>;
