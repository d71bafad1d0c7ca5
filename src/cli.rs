use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: plan today's windows and keep driving the device,
    /// forever.
    Run(RunArgs),

    /// Fetch today's prices and print the plan without touching any device.
    Plan(PlanArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the TOML config file.
    #[clap(long, env = "CALDERA_CONFIG", default_value = "caldera.toml")]
    pub config: PathBuf,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Path to the TOML config file.
    #[clap(long, env = "CALDERA_CONFIG", default_value = "caldera.toml")]
    pub config: PathBuf,
}
