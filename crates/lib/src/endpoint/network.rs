//! UDP endpoint with last-peer tracking.
//!
//! UDP has no connections, so replies go to whoever sent the most recent
//! datagram. The receive loop is the only writer of that address and the send
//! loop the only reader.

use super::{EndpointError, HANDOFF_CAPACITY};
use crate::config::NetworkConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Largest datagram forwarded to the device by default.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1024;

/// UDP socket plus its receive and send loops.
pub struct NetworkEndpoint {
    /// Datagrams received from any peer.
    pub rx: mpsc::Receiver<Vec<u8>>,
    /// Payloads to send to the last peer.
    pub tx: mpsc::Sender<Vec<u8>>,
    local_addr: SocketAddr,
    recv_task: JoinHandle<()>,
    send_task: JoinHandle<()>,
}

impl NetworkEndpoint {
    /// Bind to `addr` and start both loops.
    pub async fn bind(addr: &str, config: &NetworkConfig) -> Result<Self, EndpointError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| EndpointError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = socket.local_addr().map_err(|source| EndpointError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let socket = Arc::new(socket);

        let (in_tx, in_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (peer_tx, peer_rx) = watch::channel(None);

        let recv_task = tokio::spawn(recv_loop(
            socket.clone(),
            config.max_datagram_size,
            peer_tx,
            in_tx,
        ));
        let send_task = tokio::spawn(send_loop(socket, peer_rx, out_rx));
        log::info!("network: listening on udp {}", local_addr);

        Ok(Self {
            rx: in_rx,
            tx: out_tx,
            local_addr,
            recv_task,
            send_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop both loops; the socket is released once the last loop is gone.
    pub fn close(self) {
        self.recv_task.abort();
        self.send_task.abort();
        log::debug!("network: closed {}", self.local_addr);
    }
}

async fn recv_loop(
    socket: Arc<UdpSocket>,
    max_datagram_size: usize,
    last_peer: watch::Sender<Option<SocketAddr>>,
    inbound: mpsc::Sender<Vec<u8>>,
) {
    // One spare byte tells a datagram that fits exactly from one the OS cut short.
    let mut buf = vec![0u8; max_datagram_size + 1];
    loop {
        let (n, peer) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("network: recv_from failed: {}", e);
                continue;
            }
        };
        if n > max_datagram_size {
            log::warn!(
                "network: datagram from {} exceeds {} bytes, dropping",
                peer,
                max_datagram_size
            );
            continue;
        }
        let previous = last_peer.send_replace(Some(peer));
        if previous != Some(peer) {
            log::info!("network: peer is now {}", peer);
        }
        log::debug!("network: {} byte(s) from {}", n, peer);
        if inbound.send(buf[..n].to_vec()).await.is_err() {
            log::debug!("network: inbound queue closed, stopping receive loop");
            return;
        }
    }
}

async fn send_loop(
    socket: Arc<UdpSocket>,
    last_peer: watch::Receiver<Option<SocketAddr>>,
    mut outbound: mpsc::Receiver<Vec<u8>>,
) {
    while let Some(data) = outbound.recv().await {
        let Some(peer) = *last_peer.borrow() else {
            log::warn!(
                "network: no peer seen yet, dropping {} byte(s)",
                data.len()
            );
            continue;
        };
        match socket.send_to(&data, peer).await {
            Ok(n) => log::debug!("network: {} byte(s) to {}", n, peer),
            Err(e) => log::warn!("network: send_to {} failed: {}", peer, e),
        }
    }
    log::debug!("network: outbound queue closed, stopping send loop");
}
