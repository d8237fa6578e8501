//! Root CLI structure for animtree-rs

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "animtree-rs")]
#[command(about = "Inspect and simulate animation blend trees described in scene files", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display the node hierarchy of a scene
    Inspect(crate::commands::inspect::InspectArgs),

    /// Run a scene for a number of frames and report root motion and states
    Simulate(crate::commands::simulate::SimulateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
