//! Preview stream message protocol.
//!
//! Defines the JSON message format for WebSocket communication between the
//! preview server and connected viewers.
//!
//! # Message Types
//!
//! - `image`: encoded image for the latest render cycle (base64)
//! - `error`: the cycle failed; human-readable message
//! - `schema`: a reload produced a new configuration schema
//!
//! One render outcome expands to events in the fixed order
//! Image → [Error] → [Schema]. An Image event is emitted even for failed
//! cycles (with an empty payload) so viewers observe every cycle boundary.

use serde::{Deserialize, Serialize};

use crate::render::{ImageFormat, RenderOutcome};

/// Preview event sent over WebSocket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PreviewEvent {
    /// Encoded image for the latest cycle
    Image {
        /// Base64 image bytes; empty when the cycle failed
        message: String,
        img_type: ImageFormat,
    },

    /// The cycle failed
    Error { message: String },

    /// Reload produced a new configuration schema
    Schema {
        /// Schema JSON document as a string
        message: String,
    },
}

impl PreviewEvent {
    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","message":"event serialization failed"}"#.into())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }

    /// Expand one cycle outcome into its ordered event sequence.
    pub fn from_outcome(outcome: &RenderOutcome, format: ImageFormat) -> Vec<Self> {
        let mut events = vec![Self::Image {
            message: outcome
                .image
                .as_ref()
                .map(|image| image.to_base64())
                .unwrap_or_default(),
            img_type: format,
        }];

        if let Some(error) = &outcome.error {
            events.push(Self::Error {
                message: error.clone(),
            });
        }

        if let Some(schema) = &outcome.schema {
            events.push(Self::Schema {
                message: schema.clone(),
            });
        }

        events
    }
}
