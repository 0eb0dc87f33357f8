//! Live-preview server command.

mod api;
mod lifecycle;
mod response;

use crate::{
    actor::{Coordinator, RenderHandle},
    config::PreviewConfig,
    debug, log,
    runtime::{RuntimeContext, manifest::ManifestLoader},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use tiny_http::Server;

/// Actual WebSocket port (may differ from the configured port if it was in
/// use). Updated by the coordinator after the listener binds.
static ACTUAL_WS_PORT: AtomicU16 = AtomicU16::new(0);

/// Update the actual WebSocket port (called by coordinator after binding)
pub fn set_actual_ws_port(port: u16) {
    ACTUAL_WS_PORT.store(port, Ordering::Relaxed);
}

/// Get the actual WebSocket port, falling back to the configured one until
/// the listener has bound
fn get_actual_ws_port(configured: u16) -> u16 {
    match ACTUAL_WS_PORT.load(Ordering::Relaxed) {
        0 => configured,
        port => port,
    }
}

/// Everything a request handler needs, cloned per request.
#[derive(Clone)]
pub(super) struct ServerState {
    pub handle: RenderHandle,
    pub rt: tokio::runtime::Handle,
    pub config: Arc<PreviewConfig>,
}

/// Start the live-preview server and block until shutdown.
pub fn serve(config: Arc<PreviewConfig>) -> Result<()> {
    let ctx = Arc::new(RuntimeContext::new());
    let loader = Arc::new(ManifestLoader::new(config.app.clone()));

    // Builds the actor set; in non-watch mode this also loads the app, so
    // a broken app fails here rather than on the first request
    let (coordinator, handle) = Coordinator::new(Arc::clone(&config), loader, ctx)?;

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::unbounded::<()>();
    crate::core::register_server(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}", addr);
    if config.serve.watch {
        debug!("ws"; "ws://localhost:{}", config.serve.ws_port);
    }

    // Actor system runs on its own runtime thread; request handlers hop
    // into it through the runtime handle
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    let rt_handle = rt.handle().clone();

    let coordinator = coordinator.with_shutdown_signal(shutdown_rx);
    let actor_thread = std::thread::spawn(move || {
        rt.block_on(async {
            if let Err(e) = coordinator.run().await {
                log!("actor"; "error: {}", e);
            }
        });
    });

    run_request_loop(
        &server,
        ServerState {
            handle,
            rt: rt_handle,
            config: Arc::clone(&config),
        },
    );

    lifecycle::wait_for_shutdown(actor_thread);
    Ok(())
}

fn run_request_loop(server: &Server, state: ServerState) {
    // Use thread pool to handle requests concurrently
    // This prevents a long render from blocking schema or health requests
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("failed to create thread pool");

    for request in server.incoming_requests() {
        let state = state.clone();
        pool.spawn(move || {
            if let Err(e) = api::handle_request(request, &state) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}
