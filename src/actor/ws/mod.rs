//! WebSocket Actor - Broadcast Hub
//!
//! This actor is responsible for:
//! - Managing WebSocket viewer connections
//! - Fanning each render outcome out to all connected viewers
//! - Replaying the latest outcome to newly connected viewers
//!
//! # Architecture
//!
//! ```text
//! RenderActor --[Outcome]--> WsActor --[image/error/schema]--> Viewers
//! ```
//!
//! A slow or dead viewer never stalls the hub: every connection drains its
//! own bounded queue on a dedicated writer thread (see `registry`).

mod registry;
pub mod server;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::protocol::Message;

use super::messages::HubMsg;
use crate::protocol::PreviewEvent;
use crate::render::{ImageFormat, RenderOutcome};
use registry::Registry;

/// WebSocket Actor - manages viewer connections and broadcasts
pub struct WsActor {
    /// Channel to receive messages
    rx: mpsc::Receiver<HubMsg>,
    /// Connected viewers
    registry: Arc<Registry>,
    /// Latest outcome, replayed to new viewers (snapshot recovery)
    last: Arc<Mutex<Option<RenderOutcome>>>,
    /// Format tag attached to image events
    format: ImageFormat,
}

impl WsActor {
    /// Create a new WsActor
    pub fn new(rx: mpsc::Receiver<HubMsg>, format: ImageFormat) -> Self {
        Self {
            rx,
            registry: Arc::new(Registry::new()),
            last: Arc::new(Mutex::new(None)),
            format,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                HubMsg::Outcome(outcome) => {
                    let events = PreviewEvent::from_outcome(&outcome, self.format);
                    *self.last.lock() = Some(outcome);
                    for event in events {
                        self.registry
                            .broadcast(Message::Text(event.to_json().into()));
                    }
                }

                HubMsg::AddClient(stream) => {
                    self.add_client(stream);
                }

                HubMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    self.registry.close();
                    break;
                }
            }
        }
        // Producer gone counts as shutdown too; close is idempotent
        self.registry.close();
    }

    /// Hand the raw stream to its own writer thread: handshake, snapshot
    /// replay, then queue drain. The hub never blocks on a viewer.
    fn add_client(&self, stream: TcpStream) {
        let registry = Arc::clone(&self.registry);
        let last = Arc::clone(&self.last);
        let format = self.format;
        std::thread::spawn(move || client_writer(stream, registry, last, format));
    }
}

/// Per-connection writer: owns the socket for its whole lifetime.
fn client_writer(
    stream: TcpStream,
    registry: Arc<Registry>,
    last: Arc<Mutex<Option<RenderOutcome>>>,
    format: ImageFormat,
) {
    let mut ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            crate::log!("ws"; "handshake failed: {}", e);
            return;
        }
    };

    // Catch the viewer up on the current state before joining the fan-out
    let replay: Vec<Message> = {
        let last = last.lock();
        last.as_ref()
            .map(|outcome| {
                PreviewEvent::from_outcome(outcome, format)
                    .into_iter()
                    .map(|event| Message::Text(event.to_json().into()))
                    .collect()
            })
            .unwrap_or_default()
    };
    for msg in replay {
        if ws.send(msg).is_err() {
            return;
        }
    }

    let Some((id, queue)) = registry.admit() else {
        let _ = ws.close(None);
        return;
    };
    crate::debug!("ws"; "client {} connected (total: {})", id, registry.len());

    while let Ok(msg) = queue.recv() {
        if let Err(e) = ws.send(msg) {
            crate::debug!("ws"; "client {} disconnected: {}", id, e);
            registry.remove(id);
            break;
        }
    }

    let _ = ws.close(None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::EncodedImage;
    use std::time::Duration;

    fn outcome(data: Vec<u8>) -> RenderOutcome {
        RenderOutcome {
            image: Some(EncodedImage {
                data,
                format: ImageFormat::Webp,
            }),
            error: None,
            schema: None,
        }
    }

    fn read_event(
        ws: &mut tungstenite::WebSocket<
            tungstenite::stream::MaybeTlsStream<std::net::TcpStream>,
        >,
    ) -> PreviewEvent {
        loop {
            if let Message::Text(text) = ws.read().unwrap() {
                return PreviewEvent::from_json(&text).unwrap();
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hub_delivers_over_real_sockets() {
        let (hub_tx, hub_rx) = mpsc::channel(8);
        let actor = WsActor::new(hub_rx, ImageFormat::Webp);
        let hub = tokio::spawn(actor.run());

        let port = server::start_ws_server(0, hub_tx.clone()).unwrap();

        // First outcome lands before anyone is connected
        hub_tx
            .send(HubMsg::Outcome(outcome(vec![1, 2, 3])))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A late viewer gets the snapshot replay on connect
        let (mut ws, _) = tokio::task::spawn_blocking(move || {
            tungstenite::connect(format!("ws://127.0.0.1:{port}"))
        })
        .await
        .unwrap()
        .unwrap();

        let replayed = tokio::task::block_in_place(|| read_event(&mut ws));
        assert_eq!(
            replayed,
            PreviewEvent::Image {
                message: "AQID".into(),
                img_type: ImageFormat::Webp,
            }
        );

        // Live broadcast reaches the connected viewer. Give the writer
        // thread a moment to register before broadcasting.
        tokio::time::sleep(Duration::from_millis(100)).await;
        hub_tx
            .send(HubMsg::Outcome(RenderOutcome {
                image: None,
                error: Some("boom".into()),
                schema: None,
            }))
            .await
            .unwrap();

        let first = tokio::task::block_in_place(|| read_event(&mut ws));
        assert_eq!(
            first,
            PreviewEvent::Image {
                message: String::new(),
                img_type: ImageFormat::Webp,
            }
        );
        let second = tokio::task::block_in_place(|| read_event(&mut ws));
        assert_eq!(
            second,
            PreviewEvent::Error {
                message: "boom".into(),
            }
        );

        hub_tx.send(HubMsg::Shutdown).await.unwrap();
        hub.await.unwrap();
    }
}
