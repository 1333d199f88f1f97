//! Serial endpoint: slipmux frames in, application frames out.
//!
//! The receive loop turns the byte stream into [`Packet`]s. The send loop
//! wraps every outbound payload in an application frame and writes it through
//! a [`PacedWriter`]. Losing the port ends the receive loop with
//! [`EndpointError::SerialClosed`], which the owner picks up via
//! [`SerialEndpoint::closed`].

use super::{EndpointError, HANDOFF_CAPACITY};
use crate::config::{PacingConfig, SerialConfig};
use crate::framemux::{self, FrameReader};
use crate::pacing::PacedWriter;
use crate::packet::{FrameType, Packet};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};

/// Per-port settings that are independent of how the port was opened.
#[derive(Debug, Clone)]
pub struct SerialOptions {
    pub max_frame_size: usize,
    /// `None` writes at full speed.
    pub pacing: Option<(usize, Duration)>,
}

impl SerialOptions {
    pub fn from_config(serial: &SerialConfig, pacing: &PacingConfig) -> Self {
        Self {
            max_frame_size: serial.max_frame_size,
            pacing: pacing
                .enabled
                .then(|| (pacing.burst_size, pacing.pause())),
        }
    }
}

/// Serial port plus its receive and send loops.
pub struct SerialEndpoint {
    /// Frames received from the device.
    pub rx: mpsc::Receiver<Packet>,
    /// Application payloads to send to the device.
    pub tx: mpsc::Sender<Vec<u8>>,
    recv_task: Option<JoinHandle<EndpointError>>,
    send_task: JoinHandle<()>,
}

impl SerialEndpoint {
    /// Open `path` at the configured baud rate, 8N1, no flow control, and start both loops.
    pub fn open(
        path: &str,
        serial: &SerialConfig,
        pacing: &PacingConfig,
    ) -> Result<Self, EndpointError> {
        let port = tokio_serial::new(path, serial.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|source| EndpointError::Open {
                path: path.to_string(),
                source,
            })?;
        log::info!("serial: opened {} at {} baud", path, serial.baud_rate);
        Ok(Self::spawn(port, SerialOptions::from_config(serial, pacing)))
    }

    /// Start both loops over an already open port.
    pub fn spawn<P>(port: P, options: SerialOptions) -> Self
    where
        P: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(port);
        let reader = FrameReader::new(read_half, options.max_frame_size);
        let writer = match options.pacing {
            Some((burst, pause)) => PacedWriter::new(write_half, burst, pause),
            None => PacedWriter::unpaced(write_half),
        };

        let (in_tx, in_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel(HANDOFF_CAPACITY);

        let recv_task = tokio::spawn(recv_loop(reader, in_tx));
        let send_task = tokio::spawn(send_loop(writer, out_rx));

        Self {
            rx: in_rx,
            tx: out_tx,
            recv_task: Some(recv_task),
            send_task,
        }
    }

    /// Wait for the receive loop to end and return why. Call after `rx` has
    /// yielded `None`.
    pub async fn closed(&mut self) -> EndpointError {
        let Some(task) = self.recv_task.take() else {
            return EndpointError::SerialClosed;
        };
        match task.await {
            Ok(err) => err,
            Err(e) => {
                log::error!("serial: receive loop panicked or was cancelled: {}", e);
                EndpointError::SerialClosed
            }
        }
    }

    /// Stop both loops and release the port.
    pub fn close(self) {
        if let Some(task) = self.recv_task {
            task.abort();
        }
        self.send_task.abort();
        log::debug!("serial: closed");
    }
}

async fn recv_loop<R>(mut reader: FrameReader<R>, inbound: mpsc::Sender<Packet>) -> EndpointError
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = match reader.read_frame().await {
            Ok(f) => f,
            Err(e) if e.is_fatal() => {
                log::error!("serial: {}", e);
                return EndpointError::SerialClosed;
            }
            Err(e) => {
                log::warn!("serial: dropping frame: {}", e);
                continue;
            }
        };
        let packet = Packet::from_frame(frame.frame_type, frame.payload);
        log::debug!(
            "serial: {} frame, {} byte(s)",
            packet.frame_type,
            packet.payload.len()
        );
        if inbound.send(packet).await.is_err() {
            log::debug!("serial: inbound queue closed, stopping receive loop");
            return EndpointError::SerialClosed;
        }
    }
}

async fn send_loop<W>(mut writer: PacedWriter<W>, mut outbound: mpsc::Receiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(data) = outbound.recv().await {
        let frame = framemux::encode(FrameType::Application, &data);
        if let Err(e) = writer.write(&frame).await {
            log::warn!("serial: write failed: {}", e);
        }
    }
    log::debug!("serial: outbound queue closed, stopping send loop");
}
