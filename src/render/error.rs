//! Render cycle error types.

use crate::runtime::{ExecError, LoadError};
use thiserror::Error;

/// Failure of a single render cycle.
///
/// Every variant is carried as data on the cycle's outcome; a failing cycle
/// never takes the render loop down with it.
#[derive(Debug, Error)]
pub enum RenderError {
    /// App source failed to load or compile.
    #[error("error loading app: {0}")]
    Reload(#[from] LoadError),

    /// The app ran and failed.
    #[error("error running app: {0}")]
    Execution(#[from] ExecError),

    /// The execution deadline expired.
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// The render tree could not be encoded.
    #[error("error encoding image: {0}")]
    Encode(#[from] EncodeError),

    /// The configuration snapshot could not be serialized or written.
    #[error("config snapshot failed: {0}")]
    ConfigEncoding(String),

    /// The render loop is no longer running.
    #[error("render loop closed")]
    Closed,
}

/// Failure to turn a render tree into image bytes.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("render produced no frames")]
    EmptyTree,

    #[error("frame buffer does not match its dimensions")]
    BadFrame,

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_carries_configured_duration() {
        let err = RenderError::Timeout(50);
        assert_eq!(err.to_string(), "timeout after 50ms");
    }

    #[test]
    fn test_reload_wraps_load_error() {
        let err = RenderError::from(LoadError::Parse("bad manifest".into()));
        assert!(err.to_string().contains("error loading app"));
        assert!(err.to_string().contains("bad manifest"));
    }
}
