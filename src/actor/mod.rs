//! Actor System for the Live Preview Pipeline
//!
//! Message-passing concurrency for serve mode:
//!
//! ```text
//! FsActor --> RenderActor --> WsActor
//! (watch)      (render)     (broadcast)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher with debouncing
//! - `render` - The render loop owning the executable unit
//! - `handle` - Client interface for on-demand renders and schema reads
//! - `ws` - WebSocket broadcast hub
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod fs;
pub mod handle;
pub mod messages;
pub mod render;
pub mod ws;


pub use coordinator::Coordinator;
pub use handle::RenderHandle;
