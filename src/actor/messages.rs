//! Actor Message Definitions
//!
//! Message types for inter-actor communication.
//!
//! ```text
//! FsActor --FileChange--> RenderActor --Outcome--> WsActor
//! ```

use std::net::TcpStream;

use tokio::sync::oneshot;

use crate::render::{EncodedImage, RenderError, RenderOutcome};
use crate::runtime::AppConfig;

/// Result of one on-demand cycle, delivered on the caller's reply channel.
pub type RenderReply = Result<EncodedImage, RenderError>;

// =============================================================================
// RenderActor Messages
// =============================================================================

/// Messages to the render loop. One buffered channel carries all three
/// trigger sources, so triggers are processed strictly in arrival order.
#[derive(Debug)]
pub enum RenderMsg {
    /// Replace the retained config used by future file-triggered cycles.
    /// Does not itself trigger a cycle.
    PushConfig(AppConfig),

    /// Render now with this config. The cycle's result goes to `reply`,
    /// which belongs to exactly one caller.
    Render {
        config: AppConfig,
        reply: oneshot::Sender<RenderReply>,
    },

    /// Source changed on disk; render with the retained config.
    FileChange,

    /// Shutdown
    Shutdown,
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to the broadcast hub
pub enum HubMsg {
    /// Fan one cycle outcome out to every live connection
    Outcome(RenderOutcome),

    /// Add client
    AddClient(TcpStream),

    /// Shutdown
    Shutdown,
}
