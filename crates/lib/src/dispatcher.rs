//! Dispatcher: moves units between the two endpoints.
//!
//! Network datagrams always go to the device as application frames. Frames
//! from the device are routed by type: application payloads go back to the last
//! network peer, diagnostic text goes to the local sink (stdout), anything else
//! is logged and dropped.

use crate::endpoint::{EndpointError, NetworkEndpoint, SerialEndpoint};
use crate::packet::{FrameType, Packet};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Routes traffic between a network and a serial endpoint. Diagnostics are
/// written to `diag`.
pub struct Dispatcher<D> {
    network: NetworkEndpoint,
    serial: SerialEndpoint,
    diag: D,
}

impl<D: AsyncWrite + Unpin> Dispatcher<D> {
    pub fn new(network: NetworkEndpoint, serial: SerialEndpoint, diag: D) -> Self {
        Self {
            network,
            serial,
            diag,
        }
    }

    /// Run until one endpoint stops. Only returns with an error: losing the
    /// serial port yields [`EndpointError::SerialClosed`].
    pub async fn run(&mut self) -> Result<(), EndpointError> {
        loop {
            tokio::select! {
                datagram = self.network.rx.recv() => match datagram {
                    Some(data) => self.handle_network(data).await?,
                    None => return Err(EndpointError::NetworkClosed),
                },
                packet = self.serial.rx.recv() => match packet {
                    Some(packet) => self.handle_serial(packet).await,
                    None => return Err(self.serial.closed().await),
                },
            }
        }
    }

    async fn handle_network(&mut self, data: Vec<u8>) -> Result<(), EndpointError> {
        log::debug!("dispatch: {} byte(s) network -> serial", data.len());
        self.serial
            .tx
            .send(data)
            .await
            .map_err(|_| EndpointError::SerialClosed)
    }

    async fn handle_serial(&mut self, packet: Packet) {
        match packet.frame_type {
            FrameType::Application => {
                log::debug!(
                    "dispatch: {} byte(s) serial -> network",
                    packet.payload.len()
                );
                if self.network.tx.send(packet.payload).await.is_err() {
                    log::warn!("dispatch: network send loop gone, dropping application frame");
                }
            }
            FrameType::Diagnostic => {
                let text = String::from_utf8_lossy(&packet.payload);
                if let Err(e) = self.write_diagnostic(text.as_bytes()).await {
                    log::warn!("dispatch: writing diagnostic output failed: {}", e);
                }
            }
            FrameType::Ipv4(_) | FrameType::Ipv6(_) => {
                log::warn!(
                    "dispatch: {} frames are not supported, dropping {} byte(s)",
                    packet.frame_type,
                    packet.payload.len()
                );
            }
            FrameType::Unknown(b) => {
                log::warn!("dispatch: unsupported frame type: 0x{:02x}", b);
            }
        }
    }

    async fn write_diagnostic(&mut self, text: &[u8]) -> std::io::Result<()> {
        self.diag.write_all(text).await?;
        self.diag.flush().await
    }

    /// Stop both endpoints.
    pub fn close(self) {
        self.network.close();
        self.serial.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::endpoint::SerialOptions;
    use crate::framemux::{self, DEFAULT_MAX_FRAME_SIZE};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, DuplexStream};
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    struct Rig {
        dispatcher: Dispatcher<DuplexStream>,
        device: DuplexStream,
        stdout: DuplexStream,
        addr: std::net::SocketAddr,
    }

    async fn rig() -> Rig {
        let network = NetworkEndpoint::bind("127.0.0.1:0", &NetworkConfig::default())
            .await
            .unwrap();
        let addr = network.local_addr();
        let (host, device) = tokio::io::duplex(4096);
        let serial = SerialEndpoint::spawn(
            host,
            SerialOptions {
                max_frame_size: DEFAULT_MAX_FRAME_SIZE,
                pacing: None,
            },
        );
        let (diag, stdout) = tokio::io::duplex(4096);
        Rig {
            dispatcher: Dispatcher::new(network, serial, diag),
            device,
            stdout,
            addr,
        }
    }

    #[tokio::test]
    async fn diagnostics_reach_sink_in_order() {
        let Rig {
            mut dispatcher,
            mut device,
            mut stdout,
            ..
        } = rig().await;
        let run = tokio::spawn(async move {
            let _ = dispatcher.run().await;
        });
        for line in ["first\n", "second\n", "third\n"] {
            device
                .write_all(&framemux::encode(FrameType::Diagnostic, line.as_bytes()))
                .await
                .unwrap();
        }
        let expected = b"first\nsecond\nthird\n";
        let mut got = vec![0u8; expected.len()];
        timeout(Duration::from_secs(2), stdout.read_exact(&mut got))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&got, expected);
        run.abort();
    }

    #[tokio::test]
    async fn unsupported_frames_go_nowhere() {
        let Rig {
            mut dispatcher,
            mut device,
            mut stdout,
            addr,
        } = rig().await;
        let run = tokio::spawn(async move {
            let _ = dispatcher.run().await;
        });
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"hello", addr).await.unwrap();
        // drain the forwarded datagram so the device side is quiet again
        let mut buf = [0u8; 64];
        let n = timeout(Duration::from_secs(2), device.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert!(n > 0);

        device
            .write_all(&framemux::encode(FrameType::Unknown(0x7E), b"\x00junk"))
            .await
            .unwrap();
        device
            .write_all(&framemux::encode(FrameType::Ipv6(0x60), &[0u8; 8]))
            .await
            .unwrap();

        let mut reply = [0u8; 64];
        assert!(timeout(Duration::from_millis(200), client.recv_from(&mut reply))
            .await
            .is_err());
        assert!(timeout(Duration::from_millis(50), stdout.read(&mut reply))
            .await
            .is_err());
        run.abort();
    }

    #[tokio::test]
    async fn serial_loss_ends_run() {
        let Rig {
            mut dispatcher,
            device,
            ..
        } = rig().await;
        drop(device);
        let res = timeout(Duration::from_secs(2), dispatcher.run())
            .await
            .unwrap();
        assert!(matches!(res, Err(EndpointError::SerialClosed)));
        dispatcher.close();
    }
}
