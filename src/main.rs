//! Pixbeam - a live-preview development server for pixel-graphics apps.

#![allow(dead_code)]

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod protocol;
mod render;
mod runtime;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PreviewConfig;
use std::sync::Arc;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(PreviewConfig::load(cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(config),
        Commands::Render {
            output,
            config: pairs,
            ..
        } => cli::render::render_once(&config, output, pairs),
    }
}
