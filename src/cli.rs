// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Build, publish, and redeploy a container image over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter hoist.yml in the current directory
    Init {
        /// Image name, e.g. myuser/flask-app
        #[arg(long)]
        image: Option<String>,

        /// Overwrite an existing hoist.yml
        #[arg(long)]
        force: bool,
    },

    /// Build the image, push it, and replace the container on the target
    Deploy {
        /// Image tag to build and deploy (default: tag from hoist.yml)
        #[arg(short, long)]
        tag: Option<String>,

        /// Build context directory (default: build.context from hoist.yml)
        #[arg(short, long)]
        context: Option<PathBuf>,

        /// Supersede a deployment that is still marked in progress
        #[arg(long)]
        force: bool,
    },

    /// Show deployment records
    Status {
        /// Record id or unique id prefix (default: latest per target)
        id: Option<String>,
    },
}
