use crate::handlers::check::check_descriptors;
use crate::models::args::DeployTarget;
use crate::services::platform::PlatformCli;
use crate::services::utils::get_project_root;
use anyhow::Result;

/// Deploys through the platform's own CLI.
///
/// Render keeps the server and its Redis running. Vercel cold-boots the binary
/// per invocation, so `REDIS_URL` must point at an external Redis there for
/// duplicate webhooks to be detected.
///
/// # Errors
/// Returns an error if the descriptors are inconsistent or the platform CLI fails.
pub(crate) fn deploy(target: DeployTarget, skip_check: bool) -> Result<()> {
    if !skip_check {
        check_descriptors()?;
    }

    if target == DeployTarget::Vercel {
        println!("⚠️  Vercel cold-boots each instance: set REDIS_URL or duplicate deliveries are reprocessed.");
    }

    let cli = PlatformCli::for_target(target);
    println!("🚀 Deploying to {target} via `{}`...", cli.command_line());
    cli.run(&get_project_root()?)
}
