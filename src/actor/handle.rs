//! RenderHandle - client interface to the render loop.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::{mpsc, oneshot, watch};

use super::messages::RenderMsg;
use crate::render::{EncodedImage, RenderError};
use crate::runtime::{AppConfig, HandlerError, LoadedApp, RuntimeContext, Schema};

/// Cloneable handle for submitting work to the render loop.
///
/// Every on-demand render carries its own one-shot reply slot, so
/// concurrent callers can never observe each other's outcome - the reply
/// channel is the correlation ticket.
#[derive(Clone)]
pub struct RenderHandle {
    /// Sender to the render loop
    tx: mpsc::Sender<RenderMsg>,
    /// Ready gate receiver (released after the first load attempt)
    ready: watch::Receiver<bool>,
    /// Snapshot of the published executable unit
    app: Arc<ArcSwapOption<LoadedApp>>,
    ctx: Arc<RuntimeContext>,
}

impl RenderHandle {
    pub(super) fn new(
        tx: mpsc::Sender<RenderMsg>,
        ready: watch::Receiver<bool>,
        app: Arc<ArcSwapOption<LoadedApp>>,
        ctx: Arc<RuntimeContext>,
    ) -> Self {
        Self { tx, ready, app, ctx }
    }

    /// Render now with `config`, blocking until this call's own cycle
    /// completes. Safe to call concurrently.
    pub async fn render(&self, config: AppConfig) -> Result<EncodedImage, RenderError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(RenderMsg::Render {
                config,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RenderError::Closed)?;

        reply_rx.await.map_err(|_| RenderError::Closed)?
    }

    /// Replace the retained config used by future file-triggered cycles.
    /// Does not trigger a cycle.
    pub async fn push_config(&self, config: AppConfig) -> Result<(), RenderError> {
        self.tx
            .send(RenderMsg::PushConfig(config))
            .await
            .map_err(|_| RenderError::Closed)
    }

    /// Signal that the app source changed. Returns without waiting for the
    /// cycle; its outcome is only observable through the broadcast hub.
    pub async fn notify_file_change(&self) -> Result<(), RenderError> {
        self.tx
            .send(RenderMsg::FileChange)
            .await
            .map_err(|_| RenderError::Closed)
    }

    /// Current schema document, blocking until the first load attempt
    /// completes. Falls back to the empty schema when the app has none.
    pub async fn schema_json(&self) -> String {
        self.wait_ready().await;

        self.app
            .load_full()
            .and_then(|app| app.schema_json())
            .unwrap_or_else(Schema::empty_json)
    }

    /// Invoke a named schema handler on the loaded app, blocking until the
    /// first load attempt completes.
    pub async fn call_handler(&self, name: &str, param: &str) -> Result<String, HandlerError> {
        self.wait_ready().await;

        let Some(app) = self.app.load_full() else {
            return Err(HandlerError::NotReady);
        };
        app.program.call_handler(&self.ctx, name, param).await
    }

    /// Block until the ready gate releases.
    async fn wait_ready(&self) {
        let mut ready = self.ready.clone();
        // A dropped sender means the loop exited; stop waiting either way
        let _ = ready.wait_for(|released| *released).await;
    }
}
