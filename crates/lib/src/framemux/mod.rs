//! Slipmux framing: SLIP (RFC 1055) byte stuffing with a leading frame type byte.
//!
//! A frame on the wire is `END, type, escaped payload..., END`. Decoding is
//! incremental so frames may be split across arbitrary reads.

mod decoder;
mod reader;

pub use decoder::{Frame, FrameDecoder};
pub use reader::FrameReader;

use crate::packet::FrameType;

/// Ends a frame.
pub const END: u8 = 0xC0;
/// Escape marker.
pub const ESC: u8 = 0xDB;
/// Escaped `END`.
pub const ESC_END: u8 = 0xDC;
/// Escaped `ESC`.
pub const ESC_ESC: u8 = 0xDD;

/// Bytes a device frame carries on top of its payload: type byte and pad byte.
pub const FRAME_OVERHEAD: usize = 2;

/// Largest frame accepted by default: a full 1024-byte payload plus overhead.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 + FRAME_OVERHEAD;

/// Errors from reading frames off a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The underlying stream ended or the device went away.
    #[error("serial port closed")]
    Closed,
    #[error("serial read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt frame: invalid escape sequence 0x{0:02x}")]
    BadEscape(u8),
    #[error("corrupt frame: exceeds {0} bytes")]
    Oversized(usize),
}

impl FrameError {
    /// True when the stream cannot produce any further frames.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Closed)
    }
}

/// Encode one frame: leading END (flushes line noise), type byte, escaped payload, END.
pub fn encode(frame_type: FrameType, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + payload.len() / 8 + 4);
    out.push(END);
    push_escaped(&mut out, frame_type.as_byte());
    for &b in payload {
        push_escaped(&mut out, b);
    }
    out.push(END);
    out
}

fn push_escaped(out: &mut Vec<u8>, b: u8) {
    match b {
        END => out.extend_from_slice(&[ESC, ESC_END]),
        ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
        _ => out.push(b),
    }
}
