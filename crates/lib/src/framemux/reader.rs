//! Async frame reader over any byte stream (serial port, duplex pipe in tests).

use super::{Frame, FrameDecoder, FrameError};
use std::collections::VecDeque;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK: usize = 256;

/// EIO, what a tty read returns once a USB serial adapter has been unplugged.
/// std has no stable `ErrorKind` for it, so only the raw errno identifies it.
/// Same value on Linux, macOS and the BSDs.
#[cfg(unix)]
const EIO: i32 = 5;

/// Reads whole frames from `inner`, one at a time.
pub struct FrameReader<R> {
    inner: R,
    decoder: FrameDecoder,
    ready: VecDeque<Result<Frame, FrameError>>,
    buf: Box<[u8]>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, max_frame_size: usize) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(max_frame_size),
            ready: VecDeque::new(),
            buf: vec![0u8; READ_CHUNK].into_boxed_slice(),
        }
    }

    /// Wait for the next frame. A corrupt frame is returned as an error and the
    /// reader stays usable; [`FrameError::Closed`] means no more frames will come.
    pub async fn read_frame(&mut self) -> Result<Frame, FrameError> {
        loop {
            if let Some(next) = self.ready.pop_front() {
                return next;
            }
            let n = match self.inner.read(&mut self.buf).await {
                Ok(0) => return Err(FrameError::Closed),
                Ok(n) => n,
                Err(e) if port_gone(&e) => {
                    log::debug!("serial read error treated as closed: {}", e);
                    return Err(FrameError::Closed);
                }
                Err(e) => {
                    self.decoder.reset();
                    return Err(FrameError::Io(e));
                }
            };
            for &b in &self.buf[..n] {
                if let Some(res) = self.decoder.push(b) {
                    self.ready.push_back(res);
                }
            }
        }
    }
}

fn port_gone(e: &io::Error) -> bool {
    if matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof
    ) {
        return true;
    }
    #[cfg(unix)]
    if e.raw_os_error() == Some(EIO) {
        return true;
    }
    false
}
