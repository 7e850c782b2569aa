//! Rasterprep Pipeline - orchestration of one evaluation run
//!
//! Owns the working-directory lifecycle, sequences the normalization steps,
//! and dispatches the prepared files to the external metrics engine.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod stage;

pub use engine::{EngineInvocation, MetricsEngine, ProcessEngine};
pub use error::{RunResult, StageFailure};
pub use pipeline::{MetricsPipeline, RunReport, RunRequest};
pub use stage::Stage;
