//! Incremental slipmux frame decoder (byte in, frame out).

use super::{FrameError, END, ESC, ESC_END, ESC_ESC};

/// A decoded frame: raw type byte and unescaped payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
enum Corruption {
    BadEscape(u8),
    Oversized,
}

/// Decoder state for one byte stream. Corrupt frames are swallowed whole and
/// reported once, when their terminating END arrives.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    in_escape: bool,
    corrupt: Option<Corruption>,
    max_frame_size: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_frame_size.min(4096)),
            in_escape: false,
            corrupt: None,
            max_frame_size,
        }
    }

    /// Feed one byte. Returns a frame (or the error for a dropped frame) when an END completes it.
    pub fn push(&mut self, byte: u8) -> Option<Result<Frame, FrameError>> {
        if byte == END {
            return self.finish();
        }
        if self.corrupt.is_some() {
            return None;
        }
        if self.in_escape {
            self.in_escape = false;
            match byte {
                ESC_END => self.append(END),
                ESC_ESC => self.append(ESC),
                other => self.corrupt = Some(Corruption::BadEscape(other)),
            }
        } else if byte == ESC {
            self.in_escape = true;
        } else {
            self.append(byte);
        }
        None
    }

    /// Discard any partially received frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_escape = false;
        self.corrupt = None;
    }

    fn append(&mut self, byte: u8) {
        if self.buffer.len() >= self.max_frame_size {
            self.buffer.clear();
            self.corrupt = Some(Corruption::Oversized);
            return;
        }
        self.buffer.push(byte);
    }

    fn finish(&mut self) -> Option<Result<Frame, FrameError>> {
        // A dangling ESC before END is a bad escape of END itself.
        if self.in_escape && self.corrupt.is_none() {
            self.corrupt = Some(Corruption::BadEscape(END));
        }
        let corrupt = self.corrupt.take();
        let buffer = std::mem::take(&mut self.buffer);
        self.in_escape = false;
        match corrupt {
            Some(Corruption::BadEscape(b)) => Some(Err(FrameError::BadEscape(b))),
            Some(Corruption::Oversized) => Some(Err(FrameError::Oversized(self.max_frame_size))),
            None => {
                let (&frame_type, payload) = buffer.split_first()?;
                Some(Ok(Frame {
                    frame_type,
                    payload: payload.to_vec(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<Result<Frame, FrameError>> {
        bytes.iter().filter_map(|&b| decoder.push(b)).collect()
    }

    #[test]
    fn decodes_single_frame() {
        let mut d = FrameDecoder::new(64);
        let out = feed(&mut d, &[END, 0x0A, b'o', b'k', END]);
        assert_eq!(out.len(), 1);
        let frame = out.into_iter().next().unwrap().unwrap();
        assert_eq!(frame.frame_type, 0x0A);
        assert_eq!(frame.payload, b"ok");
    }

    #[test]
    fn back_to_back_ends_yield_nothing() {
        let mut d = FrameDecoder::new(64);
        assert!(feed(&mut d, &[END, END, END]).is_empty());
    }

    #[test]
    fn frame_split_across_feeds() {
        let mut d = FrameDecoder::new(64);
        assert!(feed(&mut d, &[END, 0xA9, 0x01, ESC]).is_empty());
        let out = feed(&mut d, &[ESC_END, 0x02, END]);
        let frame = out.into_iter().next().unwrap().unwrap();
        assert_eq!(frame.payload, vec![0x01, END, 0x02]);
    }

    #[test]
    fn bad_escape_drops_frame_and_recovers() {
        let mut d = FrameDecoder::new(64);
        let out = feed(
            &mut d,
            &[END, 0xA9, 0x01, ESC, 0x42, 0x03, END, 0x0A, b'x', END],
        );
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Err(FrameError::BadEscape(0x42))));
        let frame = out[1].as_ref().unwrap();
        assert_eq!(frame.frame_type, 0x0A);
        assert_eq!(frame.payload, b"x");
    }

    #[test]
    fn oversized_frame_is_dropped() {
        let mut d = FrameDecoder::new(4);
        let out = feed(&mut d, &[END, 0xA9, 1, 2, 3, 4, 5, END, 0xA9, 7, END]);
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Err(FrameError::Oversized(4))));
        assert_eq!(out[1].as_ref().unwrap().payload, vec![7]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut d = FrameDecoder::new(64);
        assert!(feed(&mut d, &[0xA9, 1, 2]).is_empty());
        d.reset();
        let out = feed(&mut d, &[0x0A, b'z', END]);
        assert_eq!(out[0].as_ref().unwrap().payload, b"z");
    }
}
