//! Output path derivation shared by both entry points.

use std::path::{Path, PathBuf};

const FALLBACK_STEM: &str = "output";

/// Derives a sibling path from `path` by replacing its last extension with
/// `suffix`.
///
/// `out.xlsx` + `_compact.xlsx` → `out_compact.xlsx`;
/// `archive/` + `_info.json` → `archive_info.json`.
/// Only the final extension is removed, so `v1.2/out.xlsx` keeps its
/// directory intact. Paths without a file name (`.`, `..`) get a file named
/// `output<suffix>` inside them.
#[must_use]
pub fn with_base_suffix(path: &Path, suffix: &str) -> PathBuf {
    match path.file_stem() {
        Some(stem) => {
            let mut name = stem.to_os_string();
            name.push(suffix);
            path.with_file_name(name)
        }
        None => path.join(format!("{FALLBACK_STEM}{suffix}")),
    }
}
