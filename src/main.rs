use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Args, Commands};
use commands::Environment;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match &args.command {
        Commands::InitConfig { output, force } => {
            commands::utils::init_logging(args.verbose, "info");
            commands::setup::init_config(output.clone(), *force)
        }
        Commands::Run => commands::run::run(&load_environment(&args)?),
        Commands::Status => commands::status::status(&load_environment(&args)?),
        Commands::Logout => commands::setup::logout(&load_environment(&args)?),
    }
}

/// Load configuration and start logging at the configured level
fn load_environment(args: &Args) -> Result<Environment> {
    let env = Environment::load(args.config.as_deref(), args.data_dir.clone())?;
    commands::utils::init_logging(args.verbose, &env.config.logging.level);
    Ok(env)
}
