//! # CLI Argument Definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt;

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "cargo xtask")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Developer and deployment toolkit for the QPay workspace")]
pub(crate) struct Cli {
    /// The main subcommand to execute.
    #[command(subcommand)]
    pub(crate) command: AppCommands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum AppCommands {
    /// Validate `render.yaml` and `vercel.json` against the workspace
    Check {},
    /// Hand the workspace to a hosting platform's CLI
    Deploy {
        /// Target platform
        #[arg(value_enum)]
        target: DeployTarget,
        /// Do not validate the descriptors first
        #[arg(long)]
        skip_check: bool,
    },
    /// Run tests (workspace by default)
    Test {
        /// Run tests for a specific crate (auto-prefixes with 'qpay-' if missing)
        project: Option<String>,
    },
    /// Run a project
    Run {
        /// Run a specific crate (auto-prefixes with 'qpay-' if missing)
        project: String,
    },
}

/// Hosting platforms with a descriptor in the repository root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DeployTarget {
    /// Long-running web service plus Redis, from `render.yaml`
    Render,
    /// Serverless functions, from `vercel.json`
    Vercel,
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Render => "render",
            Self::Vercel => "vercel",
        })
    }
}
