//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Pixbeam live-preview server CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: pixbeam.toml)
    #[arg(short = 'C', long, default_value = "pixbeam.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the live-preview server
    #[command(visible_alias = "s")]
    Serve {
        /// App source to preview
        #[arg(value_hint = clap::ValueHint::FilePath)]
        app: PathBuf,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable file watching for live updates
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,

        /// Serve GIF instead of WebP
        #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        gif: Option<bool>,

        /// Render deadline in milliseconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Animation duration cap in milliseconds (0 = unbounded)
        #[arg(long)]
        max_duration: Option<u32>,

        /// Write each request's config as JSON to this path
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        config_out: Option<PathBuf>,
    },

    /// Render the app once and write the image to a file
    #[command(visible_alias = "r")]
    Render {
        /// App source to render
        #[arg(value_hint = clap::ValueHint::FilePath)]
        app: PathBuf,

        /// Config values as key=value pairs
        #[arg(value_name = "KEY=VALUE")]
        config: Vec<String>,

        /// Output image path (.webp or .gif)
        #[arg(short, long, default_value = "preview.webp", value_hint = clap::ValueHint::FilePath)]
        output: PathBuf,

        /// Animation duration cap in milliseconds (0 = unbounded)
        #[arg(long)]
        max_duration: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_flags() {
        let cli = Cli::parse_from([
            "pixbeam", "serve", "app.pixel.json", "--port", "9000", "--watch", "false",
        ]);
        let Commands::Serve {
            app, port, watch, ..
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(app, PathBuf::from("app.pixel.json"));
        assert_eq!(port, Some(9000));
        assert_eq!(watch, Some(false));
    }

    #[test]
    fn test_watch_flag_without_value() {
        let cli = Cli::parse_from(["pixbeam", "serve", "app.pixel.json", "--watch"]);
        let Commands::Serve { watch, .. } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(watch, Some(true));
    }

    #[test]
    fn test_render_config_pairs() {
        let cli = Cli::parse_from([
            "pixbeam", "render", "app.pixel.json", "speed=2", "x=1", "-o", "out.gif",
        ]);
        let Commands::Render { config, output, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(config, vec!["speed=2".to_string(), "x=1".to_string()]);
        assert_eq!(output, PathBuf::from("out.gif"));
    }
}
