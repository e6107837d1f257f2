use crate::services::descriptors::check_all;
use crate::services::utils::get_project_root;
use anyhow::{Result, bail};

/// Validates the hosting descriptors.
///
/// # Errors
/// Returns an error listing every problem found.
pub(crate) fn check_descriptors() -> Result<()> {
    let root = get_project_root()?;
    let problems = check_all(&root)?;

    if problems.is_empty() {
        println!("✅ render.yaml and vercel.json are consistent with the workspace");
        return Ok(());
    }

    for problem in &problems {
        eprintln!("  ✗ {problem}");
    }
    bail!("{} problem(s) found in deployment descriptors", problems.len());
}
