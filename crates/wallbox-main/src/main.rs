// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Wallbox Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

mod commands;
mod config;
mod control;
mod setup;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::FmtSubscriber;

use control::Action;
use config::AppConfig;

#[derive(Parser)]
#[command(name = "wallbox")]
#[command(version, about = "Bridge a Wallbox charger into Home Assistant", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Poll the charger and publish its entities until interrupted (default)
    Run,
    /// Print the current entity states, from the running bridge when there is one
    Status,
    /// Check the credentials and exit
    Validate,
    /// Lock the charger
    Lock,
    /// Unlock the charger
    Unlock,
    /// Pause the charging session
    Pause,
    /// Resume the charging session
    Resume,
    /// Set the maximum charging current in amperes
    SetCurrent { amps: f64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Respects RUST_LOG
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => commands::run(&cli.config, &config).await,
        Command::Status => commands::status(&config).await,
        Command::Validate => commands::validate(&config).await,
        Command::Lock => commands::execute(&config, Action::Lock).await,
        Command::Unlock => commands::execute(&config, Action::Unlock).await,
        Command::Pause => commands::execute(&config, Action::Pause).await,
        Command::Resume => commands::execute(&config, Action::Resume).await,
        Command::SetCurrent { amps } => {
            commands::execute(&config, Action::SetCurrent { amps }).await
        }
    }
}
