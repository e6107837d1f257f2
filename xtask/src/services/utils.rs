use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub(crate) const CRATE_PREFIX: &str = "qpay-";

/// Returns the workspace root (the parent of the xtask manifest).
///
/// # Errors
/// Returns an error if the manifest directory does not have a parent.
pub(crate) fn get_project_root() -> Result<PathBuf> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map(Path::to_path_buf)
        .context("Could not find project root from xtask manifest")
}

/// Normalizes a project crate name to the workspace naming convention.
#[must_use]
pub(crate) fn normalize_project_name(project: &str) -> String {
    if project.starts_with(CRATE_PREFIX) {
        project.to_owned()
    } else {
        format!("{CRATE_PREFIX}{project}")
    }
}
