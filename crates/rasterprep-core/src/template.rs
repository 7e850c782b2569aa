//! Config document rendering.
//!
//! The external metrics engine learns which files to compare from a config
//! document generated once per run. The document is produced from a fixed
//! template by substituting one placeholder per logical role. Optional
//! inputs that were not supplied render as empty strings, which the engine
//! reads as "not provided" rather than a broken path.

use crate::error::{PrepError, Result};
use std::path::Path;

/// Template shipped with the crate; callers may substitute their own.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/metrics.config.in");

const PLACEHOLDERS: [&str; 5] = [
    "{REF_PREFIX}",
    "{TEST_DSM}",
    "{TEST_CLS}",
    "{TEST_MTL}",
    "{TEST_DTM}",
];

/// Render a config document from a template.
///
/// Every placeholder must occur in the template; a template without one of
/// them would silently drop an input binding, so that is an error rather
/// than a skip.
pub fn render(
    template: &str,
    ref_prefix: &str,
    test_dsm: &str,
    test_cls: &str,
    test_mtl: &str,
    test_dtm: &str,
) -> Result<String> {
    let bindings = [ref_prefix, test_dsm, test_cls, test_mtl, test_dtm];

    let mut rendered = template.to_string();
    for (placeholder, value) in PLACEHOLDERS.iter().zip(bindings) {
        if !rendered.contains(placeholder) {
            return Err(PrepError::Template {
                placeholder: (*placeholder).to_string(),
            });
        }
        rendered = rendered.replace(placeholder, value);
    }

    Ok(rendered)
}

/// Derive the config file name from the two mandatory inputs.
///
/// The stems keep the name recognizable; the digest covers the full path
/// pair, so input pairs that differ only by directory still get distinct
/// names.
pub fn config_filename(test_dsm: &Path, test_cls: &Path) -> String {
    let dsm_stem = file_stem(test_dsm);
    let cls_stem = file_stem(test_cls);
    let digest = fnv1a(&[
        test_dsm.to_string_lossy().as_bytes(),
        test_cls.to_string_lossy().as_bytes(),
    ]);
    format!("{dsm_stem}-{cls_stem}-{digest:016x}.config")
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string())
}

// 64-bit FNV-1a over the concatenated parts, with a NUL fed between parts
// so ("ab", "c") and ("a", "bc") hash differently.
fn fnv1a(parts: &[&[u8]]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for part in parts {
        for &byte in *part {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(PRIME);
        }
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
