use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parental screen-time controller
///
/// Runs a persistent screen-time countdown that locks the device when it
/// reaches zero. Timer controls require an authenticated parent session.
#[derive(Parser, Debug)]
#[command(name = "screen-guard")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for persisted session, timer and PIN records
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interactive controller (timer loop and lock screen)
    Run,
    /// Show session, timer and lock status
    Status,
    /// End the parent session
    Logout,
    /// Write a configuration file with default settings
    InitConfig {
        /// Output path (defaults to the platform config location)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
