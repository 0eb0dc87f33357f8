//! Render Actor - the single-flight render loop.
//!
//! Owns the executable unit and the retained configuration, and serializes
//! every render trigger (file change, on-demand request, config push)
//! through one execution path. At most one cycle runs at any instant.
//!
//! Each cycle: config snapshot (on-demand only) → reload-if-watching →
//! release the ready gate on the first reload attempt → execute under the
//! configured deadline → encode → emit the outcome.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::{mpsc, watch};

use super::messages::{HubMsg, RenderMsg};
use crate::config::RenderConfig;
use crate::render::{
    EncodedImage, ImageFormat, RenderError, RenderOutcome, encode,
};
use crate::runtime::{AppConfig, AppLoader, ExecError, LoadedApp, RuntimeContext};

/// How a cycle was triggered. On-demand cycles write the config snapshot;
/// file-change cycles attach the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Request,
    FileChange,
}

/// Successful half of a cycle.
struct CycleOk {
    image: EncodedImage,
    schema: Option<String>,
}

/// Render Actor - owns all coordinator state
pub struct RenderActor {
    /// Channel to receive triggers
    rx: mpsc::Receiver<RenderMsg>,
    /// Channel to publish outcomes to the broadcast hub
    hub_tx: mpsc::Sender<HubMsg>,
    loader: Arc<dyn AppLoader>,
    ctx: Arc<RuntimeContext>,
    /// Published executable unit; this loop is the only writer. Readers
    /// (schema, handler calls) take lock-free snapshots via the handle.
    app: Arc<ArcSwapOption<LoadedApp>>,
    /// Retained config, replaced wholesale by pushes and requests
    config: AppConfig,
    /// Ready gate: released after the first reload attempt
    ready_tx: watch::Sender<bool>,
    /// Reload from source on every cycle
    watch: bool,
    opts: RenderConfig,
}

impl RenderActor {
    /// Create the actor. In non-watch mode the app is loaded once, up
    /// front, and never replaced; a load failure here is fatal to startup.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rx: mpsc::Receiver<RenderMsg>,
        hub_tx: mpsc::Sender<HubMsg>,
        loader: Arc<dyn AppLoader>,
        ctx: Arc<RuntimeContext>,
        watch: bool,
        opts: RenderConfig,
        app: Arc<ArcSwapOption<LoadedApp>>,
        ready_tx: watch::Sender<bool>,
    ) -> Result<Self, RenderError> {
        let actor = Self {
            rx,
            hub_tx,
            loader,
            ctx,
            app,
            config: AppConfig::new(),
            ready_tx,
            watch,
            opts,
        };

        if !actor.watch {
            let loaded = actor.loader.load(&actor.ctx)?;
            actor.app.store(Some(Arc::new(loaded)));
            actor.release_ready();
        }

        Ok(actor)
    }

    /// Run the actor event loop. Per-cycle failures are data on the
    /// outcome; only a Shutdown message or channel closure ends the loop.
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                RenderMsg::PushConfig(config) => {
                    self.config = config;
                }

                RenderMsg::Render { config, reply } => {
                    self.config = config;
                    let result = self.cycle(Trigger::Request).await;
                    if let Err(e) = &result {
                        crate::log!("render"; "error rendering app: {}", e);
                    }
                    let outcome = Self::outcome(&result);
                    let _ = self.hub_tx.send(HubMsg::Outcome(outcome)).await;
                    // The caller may have given up (timeout, disconnect)
                    let _ = reply.send(result.map(|ok| ok.image));
                }

                RenderMsg::FileChange => {
                    crate::log!("watch"; "detected updates, reloading");
                    let result = self.cycle(Trigger::FileChange).await;
                    match &result {
                        Ok(_) => crate::logger::status_success("rendered"),
                        Err(e) => crate::logger::status_error("render failed", &e.to_string()),
                    }
                    let outcome = Self::outcome(&result);
                    let _ = self.hub_tx.send(HubMsg::Outcome(outcome)).await;
                }

                RenderMsg::Shutdown => {
                    crate::debug!("render"; "shutting down");
                    break;
                }
            }
        }
    }

    /// One full pass: snapshot → reload → execute → encode.
    async fn cycle(&mut self, trigger: Trigger) -> Result<CycleOk, RenderError> {
        if trigger == Trigger::Request {
            self.write_config_snapshot()?;
        }

        if self.watch {
            let loaded = self.loader.load(&self.ctx);
            // The first reload attempt opens the gate, success or not
            self.release_ready();
            match loaded {
                Ok(app) => self.app.store(Some(Arc::new(app))),
                // The previously published unit stays in place
                Err(e) => return Err(RenderError::Reload(e)),
            }
        }

        let Some(app) = self.app.load_full() else {
            // Non-watch loads at startup and watch reloads above, so this
            // only trips if a future caller wires the actor up wrong.
            return Err(RenderError::Execution(ExecError("app is not loaded".into())));
        };

        let deadline = Duration::from_millis(self.opts.timeout_ms);
        let tree = match tokio::time::timeout(deadline, app.program.run(&self.ctx, &self.config))
            .await
        {
            Ok(result) => result.map_err(RenderError::Execution)?,
            Err(_) => return Err(RenderError::Timeout(self.opts.timeout_ms)),
        };

        let max_duration = if tree.show_full_animation {
            0
        } else {
            self.opts.max_duration_ms
        };
        let image = encode::encode(&tree, self.format(), max_duration)?;

        let schema = match trigger {
            Trigger::FileChange => app.schema_json(),
            Trigger::Request => None,
        };

        Ok(CycleOk { image, schema })
    }

    fn format(&self) -> ImageFormat {
        self.opts.format()
    }

    /// Config snapshot for external tooling, written before the render
    /// runs. Failures are returned to the requesting caller, not fatal.
    fn write_config_snapshot(&self) -> Result<(), RenderError> {
        let Some(path) = &self.opts.config_out else {
            return Ok(());
        };

        let bytes = serde_json::to_vec(&self.config)
            .map_err(|e| RenderError::ConfigEncoding(e.to_string()))?;
        std::fs::write(path, bytes).map_err(|e| RenderError::ConfigEncoding(e.to_string()))
    }

    /// Release the ready gate. Transitions at most once; repeat calls are
    /// no-ops.
    fn release_ready(&self) {
        self.ready_tx.send_replace(true);
    }

    /// Exactly one of image / error is set on every completed cycle.
    fn outcome(result: &Result<CycleOk, RenderError>) -> RenderOutcome {
        match result {
            Ok(ok) => RenderOutcome {
                image: Some(ok.image.clone()),
                error: None,
                schema: ok.schema.clone(),
            },
            Err(e) => RenderOutcome {
                image: None,
                error: Some(e.to_string()),
                schema: None,
            },
        }
    }
}
