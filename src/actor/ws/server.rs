//! WebSocket listener for the live preview stream.
//!
//! Accepted connections are handed to the WsActor via channel for the
//! handshake and everything after; this module only owns the listener.

use std::net::TcpListener;

use anyhow::Result;

use crate::actor::messages::HubMsg;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Start the WebSocket listener and the acceptor thread.
///
/// Returns the actually bound port, which may differ from `base_port` when
/// that port was in use (or when `base_port` is 0).
pub fn start_ws_server(base_port: u16, hub_tx: tokio::sync::mpsc::Sender<HubMsg>) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    // Spawn acceptor thread
    std::thread::spawn(move || {
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("ws"; "client connected: {}", addr);

                    // Blocking mode for the handshake in the writer thread
                    let _ = stream.set_nonblocking(false);

                    if hub_tx.blocking_send(HubMsg::AddClient(stream)).is_err() {
                        // Hub is gone, stop accepting
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                    continue;
                }
                Err(e) => {
                    crate::log!("ws"; "accept error: {}", e);
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
            }
        }
    });

    Ok(actual_port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("127.0.0.1:{}", port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_ephemeral_port() {
        let (listener, port) = try_bind_port(0, 1).unwrap();
        assert!(port > 0);
        drop(listener);
    }

    #[test]
    fn test_bind_retries_past_taken_port() {
        let (taken, port) = try_bind_port(0, 1).unwrap();
        let (second, second_port) = try_bind_port(port, MAX_PORT_RETRIES).unwrap();
        assert_ne!(second_port, port);
        drop(taken);
        drop(second);
    }
}
