//! Preview server configuration for `pixbeam.toml`.
//!
//! # Sections
//!
//! | Section    | Purpose                                           |
//! |------------|---------------------------------------------------|
//! | `[serve]`  | Development server (interface, port, ws, watch)   |
//! | `[render]` | Render deadline, animation cap, output format     |
//!
//! CLI flags override file values; the file is optional.

mod error;

pub use error::ConfigError;

use crate::cli::{Cli, Commands};
use crate::render::ImageFormat;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing pixbeam.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// App source path (from CLI, not the config file)
    #[serde(skip)]
    pub app: PathBuf,

    /// Development server settings
    pub serve: ServeConfig,

    /// Render settings
    pub render: RenderConfig,
}

/// `[serve]` section: development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// WebSocket port for the live preview stream.
    pub ws_port: u16,

    /// Enable file watcher for live updates.
    pub watch: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8080,
            ws_port: 35729,
            watch: true,
        }
    }
}

/// `[render]` section: render cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Deadline for one app execution, in milliseconds.
    pub timeout_ms: u64,

    /// Animation duration cap in milliseconds. 0 means unbounded.
    pub max_duration_ms: u32,

    /// Serve GIF instead of WebP.
    pub gif: bool,

    /// When set, each on-demand request's config is written to this path
    /// as JSON before the render executes.
    pub config_out: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_duration_ms: 15_000,
            gif: false,
            config_out: None,
        }
    }
}

impl RenderConfig {
    /// The image container format this server emits.
    pub fn format(&self) -> ImageFormat {
        if self.gif {
            ImageFormat::Gif
        } else {
            ImageFormat::Webp
        }
    }
}

impl PreviewConfig {
    /// Load configuration from the optional config file, then apply CLI
    /// overrides and validate.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = if cli.config.exists() {
            Self::from_path(&cli.config)?
        } else {
            Self::default()
        };

        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file from disk.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML, warning about unknown keys instead of rejecting them.
    fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let de = toml::Deserializer::new(text);
        let config: Self = serde_ignored::deserialize(de, |path| {
            crate::log!("warning"; "unknown config key `{}`", path);
        })?;
        Ok(config)
    }

    /// Apply command-line overrides on top of file values.
    fn apply_cli(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Serve {
                app,
                interface,
                port,
                watch,
                gif,
                timeout,
                max_duration,
                config_out,
            } => {
                self.app = app.clone();
                if let Some(interface) = interface {
                    self.serve.interface = *interface;
                }
                if let Some(port) = port {
                    self.serve.port = *port;
                }
                if let Some(watch) = watch {
                    self.serve.watch = *watch;
                }
                if let Some(gif) = gif {
                    self.render.gif = *gif;
                }
                if let Some(timeout) = timeout {
                    self.render.timeout_ms = *timeout;
                }
                if let Some(max_duration) = max_duration {
                    self.render.max_duration_ms = *max_duration;
                }
                if let Some(config_out) = config_out {
                    self.render.config_out = Some(config_out.clone());
                }
            }
            Commands::Render {
                app, max_duration, ..
            } => {
                self.app = app.clone();
                self.serve.watch = false;
                if let Some(max_duration) = max_duration {
                    self.render.max_duration_ms = *max_duration;
                }
            }
        }
    }

    /// Reject configurations the server cannot run with.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.render.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "render.timeout_ms must be greater than zero".into(),
            ));
        }
        if self.serve.port == self.serve.ws_port {
            return Err(ConfigError::Validation(format!(
                "serve.port and serve.ws_port are both {}",
                self.serve.port
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PreviewConfig::default();
        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.ws_port, 35729);
        assert!(config.serve.watch);
        assert_eq!(config.render.timeout_ms, 30_000);
        assert_eq!(config.render.max_duration_ms, 15_000);
        assert!(!config.render.gif);
        assert!(config.render.config_out.is_none());
        assert_eq!(config.render.format(), ImageFormat::Webp);
    }

    #[test]
    fn test_parse_toml_sections() {
        let config = PreviewConfig::from_toml_str(
            "[serve]\ninterface = \"0.0.0.0\"\nport = 9000\nwatch = false\n\n[render]\ngif = true\ntimeout_ms = 500",
        )
        .unwrap();

        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        assert_eq!(config.serve.port, 9000);
        assert!(!config.serve.watch);
        assert!(config.render.gif);
        assert_eq!(config.render.timeout_ms, 500);
        assert_eq!(config.render.format(), ImageFormat::Gif);
        // Untouched fields keep their defaults
        assert_eq!(config.serve.ws_port, 35729);
        assert_eq!(config.render.max_duration_ms, 15_000);
    }

    #[test]
    fn test_parse_toml_unknown_keys_tolerated() {
        let config =
            PreviewConfig::from_toml_str("[serve]\nport = 7000\n\n[site]\ntitle = \"x\"").unwrap();
        assert_eq!(config.serve.port, 7000);
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = PreviewConfig::default();
        config.render.timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_port_collision() {
        let mut config = PreviewConfig::default();
        config.serve.ws_port = config.serve.port;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }
}
