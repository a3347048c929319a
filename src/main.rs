//! Cascade EQ CLI
//!
//! Command-line interface for the cascade-eq equalizer engine.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::debug;

use cascade_eq::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("Cascade EQ v{}", env!("CARGO_PKG_VERSION"));
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("Cascade EQ v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &cascade_eq::EngineConfig) -> Result<()> {
    match cmd {
        Commands::Render {
            input,
            output,
            block_size,
            save_state,
            params,
        } => commands::render(&input, &output, block_size, save_state.as_deref(), &params, config),
        Commands::Response {
            points,
            sample_rate,
            params,
        } => commands::response(points, sample_rate, &params, config),
        Commands::Params { params } => commands::list_params(&params),
    }
}
