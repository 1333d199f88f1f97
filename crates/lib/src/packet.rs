//! Typed frames read off the serial link.
//!
//! The device tags every frame with a single type byte. Only application
//! (CoAP) and diagnostic frames are routed; IP frames are recognized so they
//! can be reported accurately, everything else is unknown.

use std::fmt;

/// Frame type byte carried at the start of every slipmux frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Application protocol message (CoAP in practice), forwarded verbatim.
    Application,
    /// Human-readable text from the device.
    Diagnostic,
    /// IPv4 packet; the byte is the IP version/IHL octet.
    Ipv4(u8),
    /// IPv6 packet; the byte is the first octet of the header.
    Ipv6(u8),
    Unknown(u8),
}

impl FrameType {
    pub const APPLICATION: u8 = 0xA9;
    pub const DIAGNOSTIC: u8 = 0x0A;
    pub const IPV4_FIRST: u8 = 0x45;
    pub const IPV4_LAST: u8 = 0x4F;
    pub const IPV6_FIRST: u8 = 0x60;
    pub const IPV6_LAST: u8 = 0x6F;

    /// The type byte as it appears on the wire.
    pub fn as_byte(self) -> u8 {
        match self {
            FrameType::Application => Self::APPLICATION,
            FrameType::Diagnostic => Self::DIAGNOSTIC,
            FrameType::Ipv4(b) | FrameType::Ipv6(b) | FrameType::Unknown(b) => b,
        }
    }
}

impl From<u8> for FrameType {
    fn from(b: u8) -> Self {
        match b {
            Self::APPLICATION => FrameType::Application,
            Self::DIAGNOSTIC => FrameType::Diagnostic,
            Self::IPV4_FIRST..=Self::IPV4_LAST => FrameType::Ipv4(b),
            Self::IPV6_FIRST..=Self::IPV6_LAST => FrameType::Ipv6(b),
            _ => FrameType::Unknown(b),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::Application => write!(f, "application"),
            FrameType::Diagnostic => write!(f, "diagnostic"),
            FrameType::Ipv4(b) => write!(f, "ipv4 (0x{:02x})", b),
            FrameType::Ipv6(b) => write!(f, "ipv6 (0x{:02x})", b),
            FrameType::Unknown(b) => write!(f, "0x{:02x}", b),
        }
    }
}

/// Leading byte the device prepends to frame payloads; never part of the message.
pub const PAD_BYTE: u8 = 0x00;

/// One frame received from the device, pad byte already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub frame_type: FrameType,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a packet from a decoded frame, dropping a single leading pad byte if present.
    pub fn from_frame(frame_type: u8, mut payload: Vec<u8>) -> Self {
        if payload.first() == Some(&PAD_BYTE) {
            payload.remove(0);
        }
        Self {
            frame_type: FrameType::from(frame_type),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_type_from_byte() {
        assert_eq!(FrameType::from(0xA9), FrameType::Application);
        assert_eq!(FrameType::from(0x0A), FrameType::Diagnostic);
        assert_eq!(FrameType::from(0x45), FrameType::Ipv4(0x45));
        assert_eq!(FrameType::from(0x4F), FrameType::Ipv4(0x4F));
        assert_eq!(FrameType::from(0x6A), FrameType::Ipv6(0x6A));
        assert_eq!(FrameType::from(0x7F), FrameType::Unknown(0x7F));
    }

    #[test]
    fn frame_type_byte_is_preserved() {
        for b in [0x00u8, 0x0A, 0x45, 0x60, 0xA9, 0xFF] {
            assert_eq!(FrameType::from(b).as_byte(), b);
        }
    }

    #[test]
    fn from_frame_strips_one_pad_byte() {
        let p = Packet::from_frame(0xA9, vec![0x00, 0x00, 0x41]);
        assert_eq!(p.frame_type, FrameType::Application);
        assert_eq!(p.payload, vec![0x00, 0x41]);
    }

    #[test]
    fn from_frame_without_pad_is_unchanged() {
        let p = Packet::from_frame(0x0A, b"boot ok\n".to_vec());
        assert_eq!(p.frame_type, FrameType::Diagnostic);
        assert_eq!(p.payload, b"boot ok\n");
    }

    #[test]
    fn from_frame_empty_payload() {
        let p = Packet::from_frame(0xA9, Vec::new());
        assert!(p.payload.is_empty());
    }
}
