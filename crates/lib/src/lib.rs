//! Muxgate core library: bridges a slipmux serial device to a UDP socket.
//!
//! Two endpoints (UDP and serial) each run a receive and a send loop; the
//! dispatcher routes frames between them and prints device diagnostics.

pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod framemux;
pub mod gateway;
pub mod pacing;
pub mod packet;
