//! Actor Coordinator - Wires up the Live Preview Actor System
//!
//! # Responsibility
//!
//! The Coordinator is a **thin orchestrator** that:
//! - Creates communication channels
//! - Wires up actors and hands out the render handle
//! - Runs them concurrently until shutdown
//!
//! It does NOT contain render logic - that lives in `render`.
//!
//! # Architecture
//!
//! ```text
//! FsActor --> RenderActor --> WsActor
//!                  ^
//!             RenderHandle (HTTP callers)
//! ```

use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwapOption;
use crossbeam::channel::Receiver;
use tokio::sync::{mpsc, watch};

use super::fs::FsActor;
use super::handle::RenderHandle;
use super::messages::{HubMsg, RenderMsg};
use super::render::RenderActor;
use super::ws::{self, WsActor};
use crate::config::PreviewConfig;
use crate::runtime::{AppLoader, RuntimeContext};

/// Trigger buffer size - large enough that producers never block under
/// normal load.
const RENDER_BUFFER: usize = 100;

/// Outcome buffer size
const HUB_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system
pub struct Coordinator {
    config: Arc<PreviewConfig>,
    render_actor: RenderActor,
    ws_actor: WsActor,
    render_tx: mpsc::Sender<RenderMsg>,
    hub_tx: mpsc::Sender<HubMsg>,
    /// Optional shutdown signal receiver
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    /// Build the actor set and its client handle.
    ///
    /// In non-watch mode the app loads here, up front, so a broken app
    /// fails the command instead of the first request.
    pub fn new(
        config: Arc<PreviewConfig>,
        loader: Arc<dyn AppLoader>,
        ctx: Arc<RuntimeContext>,
    ) -> Result<(Self, RenderHandle)> {
        let (render_tx, render_rx) = mpsc::channel::<RenderMsg>(RENDER_BUFFER);
        let (hub_tx, hub_rx) = mpsc::channel::<HubMsg>(HUB_BUFFER);
        let (ready_tx, ready_rx) = watch::channel(false);
        let app = Arc::new(ArcSwapOption::empty());

        let render_actor = RenderActor::new(
            render_rx,
            hub_tx.clone(),
            loader,
            Arc::clone(&ctx),
            config.serve.watch,
            config.render.clone(),
            Arc::clone(&app),
            ready_tx,
        )
        .map_err(|e| anyhow::anyhow!("failed to load app: {}", e))?;

        let ws_actor = WsActor::new(hub_rx, config.render.format());
        let handle = RenderHandle::new(render_tx.clone(), ready_rx, app, ctx);

        let coordinator = Self {
            config,
            render_actor,
            ws_actor,
            render_tx,
            hub_tx,
            shutdown_rx: None,
        };
        Ok((coordinator, handle))
    }

    /// Set shutdown signal receiver
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system until shutdown
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            render_actor,
            ws_actor,
            render_tx,
            hub_tx,
            shutdown_rx,
        } = self;

        // Viewers need the stream only in watch mode; curl does not
        if config.serve.watch {
            match ws::server::start_ws_server(config.serve.ws_port, hub_tx.clone()) {
                Ok(actual_port) => {
                    crate::cli::serve::set_actual_ws_port(actual_port);
                }
                Err(e) => {
                    crate::log!("actor"; "websocket server failed: {}", e);
                }
            }
        }

        let fs_actor = if config.serve.watch {
            Some(
                FsActor::new(&config.app, render_tx.clone())
                    .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?,
            )
        } else {
            None
        };

        crate::debug!("actor"; "start");
        let render_handle = tokio::spawn(render_actor.run());
        let ws_handle = tokio::spawn(ws_actor.run());
        let fs_handle = fs_actor.map(|actor| tokio::spawn(actor.run()));

        // Wait for shutdown (poll-based since crossbeam channel)
        match shutdown_rx {
            Some(rx) => loop {
                if rx.try_recv().is_ok() {
                    crate::debug!("actor"; "shutdown signal received");
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            },
            None => loop {
                if crate::core::is_shutdown() {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            },
        }

        // Drain-and-stop: the render loop finishes its in-flight cycle, the
        // hub closes every connection.
        let _ = render_tx.send(RenderMsg::Shutdown).await;
        let _ = hub_tx.send(HubMsg::Shutdown).await;
        if let Some(handle) = fs_handle {
            handle.abort();
        }
        let _ = tokio::time::timeout(std::time::Duration::from_millis(500), render_handle).await;
        let _ = tokio::time::timeout(std::time::Duration::from_millis(500), ws_handle).await;

        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
