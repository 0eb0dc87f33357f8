//! Connection registry with per-connection bounded send queues.
//!
//! Broadcast never blocks: each connection drains its own queue on its own
//! writer thread, and a connection that falls too far behind is dropped
//! from the registry instead of stalling the hub.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tungstenite::protocol::Message;

/// Outbound queue depth per connection.
pub(super) const SEND_QUEUE_CAP: usize = 64;

struct ClientHandle {
    id: u64,
    tx: Sender<Message>,
}

/// Registry of live connections
pub(super) struct Registry {
    clients: Mutex<Vec<ClientHandle>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Registry {
    pub(super) fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Admit a connection; returns its id and the queue its writer thread
    /// drains. Returns None after shutdown.
    pub(super) fn admit(&self) -> Option<(u64, Receiver<Message>)> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }

        let (tx, rx) = channel::bounded(SEND_QUEUE_CAP);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients.lock().push(ClientHandle { id, tx });
        Some((id, rx))
    }

    /// Remove a connection. Safe to call concurrently with broadcasts and
    /// for an id that is already gone.
    pub(super) fn remove(&self, id: u64) {
        self.clients.lock().retain(|client| client.id != id);
    }

    /// Queue a message for every live connection. A connection whose queue
    /// is full or gone is dropped here; its writer thread sees the closed
    /// queue and shuts the socket.
    pub(super) fn broadcast(&self, msg: Message) {
        let mut clients = self.clients.lock();
        let count = clients.len();

        if count == 0 {
            crate::debug!("ws"; "no clients connected");
            return;
        }

        clients.retain(|client| match client.tx.try_send(msg.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                crate::debug!("ws"; "client {} too slow, disconnecting", client.id);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        });

        crate::debug!("ws"; "broadcast to {} clients", count);
    }

    /// Drop every connection and refuse new ones. Idempotent.
    pub(super) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.clients.lock().clear();
    }

    pub(super) fn len(&self) -> usize {
        self.clients.lock().len()
    }
}
