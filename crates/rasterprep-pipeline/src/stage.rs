//! Pipeline stages, in execution order.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Create or reuse the working directory.
    PrepareDirectory,
    /// Copy the supplied candidate files into the working directory.
    StageInputs,
    /// Render and write the config document.
    RenderConfig,
    /// Reproject every staged raster into the reference CRS.
    NormalizeCrs,
    /// Coerce the staged DSM to Float32.
    NormalizeDtype,
    /// Dispatch to the external metrics engine.
    InvokeEngine,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PrepareDirectory => "prepare-directory",
            Stage::StageInputs => "stage-inputs",
            Stage::RenderConfig => "render-config",
            Stage::NormalizeCrs => "normalize-crs",
            Stage::NormalizeDtype => "normalize-dtype",
            Stage::InvokeEngine => "invoke-engine",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
