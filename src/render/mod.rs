//! Render data model: frames, trees, encoded images, cycle outcomes.

pub mod encode;
mod error;

pub use error::{EncodeError, RenderError};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Closed set of image container formats the preview stream can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Webp,
    Gif,
}

impl ImageFormat {
    /// Wire tag, e.g. `"webp"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }

    /// MIME type for HTTP responses.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Guess a format from an output file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One RGBA frame of a render tree.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
    /// How long this frame is shown, in milliseconds.
    pub delay_ms: u32,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, delay_ms: u32) -> Self {
        Self {
            width,
            height,
            pixels,
            delay_ms,
        }
    }
}

/// What an app execution produces: an ordered frame sequence.
#[derive(Debug, Clone, Default)]
pub struct RenderTree {
    pub frames: Vec<Frame>,
    /// When set, the animation plays in full regardless of the configured
    /// duration cap.
    pub show_full_animation: bool,
}

/// Encoded image bytes together with their container format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

impl EncodedImage {
    /// Base64 form used by the wire protocol and the JSON envelope.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }
}

/// Immutable record of one completed render cycle.
///
/// Exactly one of `image` / `error` is present after a completed cycle;
/// `schema` independently accompanies reload-triggered cycles.
#[derive(Debug, Clone, Default)]
pub struct RenderOutcome {
    pub image: Option<EncodedImage>,
    pub error: Option<String>,
    pub schema: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tags() {
        assert_eq!(ImageFormat::Webp.as_str(), "webp");
        assert_eq!(ImageFormat::Gif.mime(), "image/gif");
        assert_eq!(
            serde_json::to_string(&ImageFormat::Webp).unwrap(),
            "\"webp\""
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ImageFormat::from_path(Path::new("out.gif")),
            Some(ImageFormat::Gif)
        );
        assert_eq!(
            ImageFormat::from_path(Path::new("out.webp")),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImageFormat::from_path(Path::new("out.png")), None);
        assert_eq!(ImageFormat::from_path(Path::new("out")), None);
    }

    #[test]
    fn test_base64_payload() {
        let image = EncodedImage {
            data: vec![1, 2, 3],
            format: ImageFormat::Webp,
        };
        assert_eq!(image.to_base64(), "AQID");
    }
}
