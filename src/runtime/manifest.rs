//! Built-in manifest runtime.
//!
//! A manifest app is a JSON document describing an animation as text art:
//!
//! ```json
//! {
//!     "name": "blinker",
//!     "width": 4,
//!     "height": 2,
//!     "palette": { ".": "#000000", "#": "#ffcc00" },
//!     "frames": [
//!         { "rows": ["####", "...."], "delay_ms": 120 },
//!         { "rows": ["....", "####"], "delay_ms": 120 }
//!     ],
//!     "show_full_animation": false,
//!     "schema": { "version": "1", "fields": [] }
//! }
//! ```
//!
//! Each palette key is a single character mapping to a `#rgb`, `#rrggbb` or
//! `#rrggbbaa` color. A `speed` config key scales frame delays at render
//! time.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use super::{AppConfig, AppLoader, AppProgram, ExecError, LoadError, LoadedApp, RuntimeContext, Schema};
use crate::render::{Frame, RenderTree};

const DEFAULT_DELAY_MS: u32 = 100;

/// Loads a manifest document from disk on every call, so watch mode picks
/// up edits.
pub struct ManifestLoader {
    path: PathBuf,
}

impl ManifestLoader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl AppLoader for ManifestLoader {
    fn load(&self, _ctx: &RuntimeContext) -> Result<LoadedApp, LoadError> {
        let text = fs::read_to_string(&self.path)?;
        let doc: ManifestDoc =
            serde_json::from_str(&text).map_err(|e| LoadError::Parse(e.to_string()))?;
        let palette = doc.compile_palette()?;
        doc.validate(&palette)?;

        Ok(LoadedApp {
            schema: doc.schema.clone(),
            program: Box::new(ManifestApp { doc, palette }),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestDoc {
    #[serde(default)]
    #[allow(dead_code)] // Display name, reserved for the viewer title
    name: String,
    width: u32,
    height: u32,
    palette: HashMap<String, String>,
    frames: Vec<ManifestFrame>,
    #[serde(default)]
    show_full_animation: bool,
    #[serde(default)]
    schema: Option<Schema>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestFrame {
    rows: Vec<String>,
    #[serde(default = "default_delay")]
    delay_ms: u32,
}

fn default_delay() -> u32 {
    DEFAULT_DELAY_MS
}

impl ManifestDoc {
    fn compile_palette(&self) -> Result<HashMap<char, [u8; 4]>, LoadError> {
        let mut palette = HashMap::with_capacity(self.palette.len());
        for (key, color) in &self.palette {
            let mut chars = key.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                return Err(LoadError::Parse(format!(
                    "palette key `{key}` must be a single character"
                )));
            };
            let rgba = parse_color(color)
                .map_err(|e| LoadError::Parse(format!("palette entry `{key}`: {e}")))?;
            palette.insert(ch, rgba);
        }
        Ok(palette)
    }

    /// Every frame must match the declared dimensions and only use palette
    /// characters; catching this at load time means `run` cannot fail on
    /// malformed art.
    fn validate(&self, palette: &HashMap<char, [u8; 4]>) -> Result<(), LoadError> {
        if self.width == 0 || self.height == 0 {
            return Err(LoadError::Parse("width and height must be positive".into()));
        }
        if self.frames.is_empty() {
            return Err(LoadError::Parse("at least one frame is required".into()));
        }

        for (i, frame) in self.frames.iter().enumerate() {
            if frame.rows.len() != self.height as usize {
                return Err(LoadError::Parse(format!(
                    "frame {i} has {} rows, expected {}",
                    frame.rows.len(),
                    self.height
                )));
            }
            for (j, row) in frame.rows.iter().enumerate() {
                if row.chars().count() != self.width as usize {
                    return Err(LoadError::Parse(format!(
                        "frame {i} row {j} has {} columns, expected {}",
                        row.chars().count(),
                        self.width
                    )));
                }
                if let Some(ch) = row.chars().find(|ch| !palette.contains_key(ch)) {
                    return Err(LoadError::Parse(format!(
                        "frame {i} row {j} uses `{ch}` which is not in the palette"
                    )));
                }
            }
        }
        Ok(())
    }
}

struct ManifestApp {
    doc: ManifestDoc,
    palette: HashMap<char, [u8; 4]>,
}

#[async_trait]
impl AppProgram for ManifestApp {
    async fn run(&self, _ctx: &RuntimeContext, config: &AppConfig) -> Result<RenderTree, ExecError> {
        let speed = match config.get("speed") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|s| *s > 0.0)
                .ok_or_else(|| ExecError(format!("invalid speed `{raw}`")))?,
            None => 1.0,
        };

        let frames = self
            .doc
            .frames
            .iter()
            .map(|frame| {
                let mut pixels = Vec::with_capacity(
                    (self.doc.width * self.doc.height * 4) as usize,
                );
                for row in &frame.rows {
                    for ch in row.chars() {
                        // Unknown chars were rejected at load time
                        pixels.extend_from_slice(&self.palette[&ch]);
                    }
                }
                let delay_ms = ((f64::from(frame.delay_ms) / speed).round() as u32).max(1);
                Frame::new(self.doc.width, self.doc.height, pixels, delay_ms)
            })
            .collect();

        Ok(RenderTree {
            frames,
            show_full_animation: self.doc.show_full_animation,
        })
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` into RGBA8.
fn parse_color(color: &str) -> Result<[u8; 4], String> {
    let hex = color
        .strip_prefix('#')
        .ok_or_else(|| format!("color `{color}` must start with `#`"))?;

    let invalid = || format!("color `{color}` is not valid hex");
    let byte = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    let nibble = |s: &str| {
        u8::from_str_radix(s, 16)
            .map(|v| v * 17)
            .map_err(|_| invalid())
    };

    match hex.len() {
        3 => Ok([
            nibble(&hex[0..1])?,
            nibble(&hex[1..2])?,
            nibble(&hex[2..3])?,
            255,
        ]),
        6 => Ok([
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            255,
        ]),
        8 => Ok([
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        ]),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BLINKER: &str = r#####"{
        "name": "blinker",
        "width": 4,
        "height": 2,
        "palette": { ".": "#000000", "#": "#ffcc00" },
        "frames": [
            { "rows": ["####", "...."], "delay_ms": 120 },
            { "rows": ["....", "####"], "delay_ms": 120 }
        ],
        "schema": { "version": "1", "fields": [] }
    }"#####;

    fn write_manifest(text: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.pixel.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_blinker() {
        let (_dir, path) = write_manifest(BLINKER);
        let ctx = RuntimeContext::new();
        let app = ManifestLoader::new(path).load(&ctx).unwrap();
        assert!(app.schema.is_some());
    }

    #[tokio::test]
    async fn test_run_produces_frames() {
        let (_dir, path) = write_manifest(BLINKER);
        let ctx = RuntimeContext::new();
        let app = ManifestLoader::new(path).load(&ctx).unwrap();

        let tree = app.program.run(&ctx, &AppConfig::new()).await.unwrap();
        assert_eq!(tree.frames.len(), 2);
        assert_eq!(tree.frames[0].width, 4);
        assert_eq!(tree.frames[0].height, 2);
        assert_eq!(tree.frames[0].pixels.len(), 4 * 2 * 4);
        assert_eq!(tree.frames[0].delay_ms, 120);
        // Top-left pixel of frame 0 is `#` = #ffcc00
        assert_eq!(&tree.frames[0].pixels[0..4], &[0xff, 0xcc, 0x00, 0xff]);
    }

    #[tokio::test]
    async fn test_speed_config_scales_delays() {
        let (_dir, path) = write_manifest(BLINKER);
        let ctx = RuntimeContext::new();
        let app = ManifestLoader::new(path).load(&ctx).unwrap();

        let mut config = AppConfig::new();
        config.insert("speed".into(), "2".into());
        let tree = app.program.run(&ctx, &config).await.unwrap();
        assert_eq!(tree.frames[0].delay_ms, 60);

        config.insert("speed".into(), "zero".into());
        let err = app.program.run(&ctx, &config).await.unwrap_err();
        assert!(err.to_string().contains("invalid speed"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let ctx = RuntimeContext::new();
        let err = ManifestLoader::new(PathBuf::from("/nonexistent/app.json"))
            .load(&ctx)
            .unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_row_width_mismatch_rejected() {
        let (_dir, path) = write_manifest(
            r###"{"width": 4, "height": 1, "palette": {"#": "#fff"},
                 "frames": [{"rows": ["##"]}]}"###,
        );
        let ctx = RuntimeContext::new();
        let err = ManifestLoader::new(path).load(&ctx).unwrap_err();
        assert!(err.to_string().contains("columns"));
    }

    #[test]
    fn test_unknown_palette_char_rejected() {
        let (_dir, path) = write_manifest(
            r##"{"width": 2, "height": 1, "palette": {"#": "#fff"},
                 "frames": [{"rows": ["#x"]}]}"##,
        );
        let ctx = RuntimeContext::new();
        let err = ManifestLoader::new(path).load(&ctx).unwrap_err();
        assert!(err.to_string().contains("not in the palette"));
    }

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("#fff").unwrap(), [255, 255, 255, 255]);
        assert_eq!(parse_color("#ffcc00").unwrap(), [0xff, 0xcc, 0x00, 255]);
        assert_eq!(parse_color("#ffcc0080").unwrap(), [0xff, 0xcc, 0x00, 0x80]);
        assert!(parse_color("ffcc00").is_err());
        assert!(parse_color("#ggg").is_err());
        assert!(parse_color("#ffcc0").is_err());
    }
}
