#![allow(clippy::print_stderr, clippy::print_stdout)]

mod handlers;
mod models;
mod services;

use crate::handlers::{check, deploy, run, testing};
use crate::models::args::{AppCommands, Cli};

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        AppCommands::Check {} => check::check_descriptors()?,
        AppCommands::Deploy { target, skip_check } => deploy::deploy(target, skip_check)?,
        AppCommands::Test { project } => testing::run_tests(project.as_deref())?,
        AppCommands::Run { project } => run::run_project(&project)?,
    }

    Ok(())
}
