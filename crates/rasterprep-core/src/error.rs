//! Error types for rasterprep

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepError {
    // Raster errors
    #[error("Cannot read raster {path}: {reason}")]
    UnreadableRaster { path: PathBuf, reason: String },

    #[error("Reprojection of {path} failed: {reason}")]
    Reprojection { path: PathBuf, reason: String },

    #[error("Pixel type conversion of {path} failed: {reason}")]
    DtypeConversion { path: PathBuf, reason: String },

    // Config document errors
    #[error("Config template is missing the {placeholder} placeholder")]
    Template { placeholder: String },

    // Staging errors
    #[error("Cannot stage input {path}: {reason}")]
    Staging { path: PathBuf, reason: String },

    // Engine errors
    #[error("Metrics engine invocation failed: {reason}")]
    EngineInvocation { reason: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PrepError>;
