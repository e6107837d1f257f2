use crate::models::args::DeployTarget;
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Stdio};

/// The platform CLI invocation for a target. Each is a single command without flags.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlatformCli {
    program: &'static str,
    args: &'static [&'static str],
    install_hint: &'static str,
}

impl PlatformCli {
    pub(crate) const fn for_target(target: DeployTarget) -> Self {
        match target {
            DeployTarget::Render => Self {
                program: "render",
                args: &["blueprint", "launch"],
                install_hint: "https://render.com/docs/cli",
            },
            DeployTarget::Vercel => Self {
                program: "vercel",
                args: &[],
                install_hint: "npm i -g vercel",
            },
        }
    }

    pub(crate) fn command_line(&self) -> String {
        std::iter::once(self.program).chain(self.args.iter().copied()).collect::<Vec<_>>().join(" ")
    }

    /// Runs the CLI in `root`, attached to the terminal.
    ///
    /// # Errors
    /// Returns an error if the CLI is not installed or exits unsuccessfully.
    pub(crate) fn run(&self, root: &Path) -> Result<()> {
        let status = Command::new(self.program)
            .args(self.args)
            .current_dir(root)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| {
                format!("Failed to execute `{}`. Install it first: {}", self.program, self.install_hint)
            })?;

        if !status.success() {
            bail!("`{}` exited with status {}", self.command_line(), status.code().unwrap_or(-1));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_command_per_platform() {
        assert_eq!(PlatformCli::for_target(DeployTarget::Render).command_line(), "render blueprint launch");
        assert_eq!(PlatformCli::for_target(DeployTarget::Vercel).command_line(), "vercel");
    }
}
