//! Transport endpoints: the UDP socket facing network clients and the serial
//! port facing the device.
//!
//! Each endpoint owns its transport and runs one receive loop and one send
//! loop for its whole lifetime. Loops talk to the dispatcher through capacity-one
//! queues, so a slow consumer holds back its producer instead of buffering.

mod network;
mod serial;

pub use network::{NetworkEndpoint, DEFAULT_MAX_DATAGRAM_SIZE};
pub use serial::{SerialEndpoint, SerialOptions};

/// Capacity of every handoff queue between loops.
pub(crate) const HANDOFF_CAPACITY: usize = 1;

/// Errors surfaced by endpoints to their owner.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("binding udp socket to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("opening serial device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: tokio_serial::Error,
    },
    /// The serial device is gone; the gateway cannot continue.
    #[error("serial port closed")]
    SerialClosed,
    #[error("network endpoint stopped")]
    NetworkClosed,
}
