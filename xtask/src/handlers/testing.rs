use crate::services::utils::normalize_project_name;

/// Runs tests in the workspace or a specific crate, through nextest when installed.
///
/// # Errors
/// Returns an error if the test run fails.
pub(crate) fn run_tests(project: Option<&str>) -> anyhow::Result<()> {
    let target_is_workspace = project.is_none_or(|value| value == "all");
    let has_nextest = std::process::Command::new("cargo-nextest").arg("--version").output().is_ok();

    let mut args: Vec<String> =
        if has_nextest { vec!["nextest".into(), "run".into()] } else { vec!["test".into()] };

    match project {
        Some(project) if !target_is_workspace => {
            args.push("-p".into());
            args.push(normalize_project_name(project));
        },
        _ => args.push("--workspace".into()),
    }

    args.push("--all-features".into());
    if has_nextest {
        args.extend(["--failure-output", "immediate-final", "--success-output", "never"].map(String::from));
    }

    println!("🧪 Running tests via '{}'...", if has_nextest { "nextest" } else { "cargo test" });
    let status = std::process::Command::new("cargo").args(args).status()?;

    if !status.success() {
        anyhow::bail!("Tests failed!");
    }
    Ok(())
}
