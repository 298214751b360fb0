//! bale - JavaScript bundling and static asset serving with HTTP caching.

#![allow(dead_code)]

mod bundle;
mod cache;
mod cli;
mod config;
mod core;
mod deps;
mod freshness;
mod logger;
mod plugin;
mod statics;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{BaleConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(BaleConfig::load(&cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(),
        Commands::Bundle { entry, output, .. } => {
            cli::bundle::write_bundle(&config, entry, output.as_deref())
        }
    }
}
