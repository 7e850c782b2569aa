//! Shared GDAL plumbing for the raster operations.

use gdal::Dataset;
use rasterprep_core::error::{PrepError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Open a raster read-only, mapping failures to `UnreadableRaster`.
pub(crate) fn open_readonly(path: &Path) -> Result<Dataset> {
    Dataset::open(path).map_err(|e| PrepError::UnreadableRaster {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Temp file next to `path`. Rewrites land here first and rename over the
/// original, so a failed rewrite never truncates the input.
pub(crate) fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("raster"));
    name.push(".tmp.tif");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_tmp_path_stays_in_directory() {
        let tmp = sibling_tmp_path(Path::new("/work/run/dsm.tif"));
        assert_eq!(tmp, PathBuf::from("/work/run/dsm.tif.tmp.tif"));
    }
}
