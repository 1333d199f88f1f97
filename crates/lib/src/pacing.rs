//! Paced output for devices that cannot keep up with a full-speed serial line.
//!
//! The target board has no hardware flow control and its UART interrupt handler
//! also handles the application protocol, so its receive FIFO overflows if bytes
//! arrive back to back. Writes are cut into bursts no larger than the FIFO with
//! a pause between bursts.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Receive FIFO depth of the device.
pub const DEFAULT_BURST_SIZE: usize = 8;

pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// Failed paced write; `written` bytes reached the sink before the error.
#[derive(Debug, thiserror::Error)]
#[error("paced write failed after {written} byte(s): {source}")]
pub struct PacedWriteError {
    pub written: usize,
    #[source]
    pub source: io::Error,
}

/// Wraps a byte sink and writes at most `burst_size` bytes per interval.
#[derive(Debug)]
pub struct PacedWriter<W> {
    inner: W,
    burst_size: usize,
    pause: Duration,
}

impl<W: AsyncWrite + Unpin> PacedWriter<W> {
    /// `burst_size` of zero is treated as one.
    pub fn new(inner: W, burst_size: usize, pause: Duration) -> Self {
        Self {
            inner,
            burst_size: burst_size.max(1),
            pause,
        }
    }

    /// Writer that never pauses (used when pacing is disabled).
    pub fn unpaced(inner: W) -> Self {
        Self {
            inner,
            burst_size: usize::MAX,
            pause: Duration::ZERO,
        }
    }

    /// Write all of `buf`, sleeping `pause` before every burst after the first.
    /// Stops at the first sink error.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, PacedWriteError> {
        let mut written = 0;
        for (i, burst) in buf.chunks(self.burst_size).enumerate() {
            if i != 0 {
                tokio::time::sleep(self.pause).await;
            }
            let mut rest = burst;
            while !rest.is_empty() {
                match self.inner.write(rest).await {
                    Ok(0) => {
                        return Err(PacedWriteError {
                            written,
                            source: io::ErrorKind::WriteZero.into(),
                        })
                    }
                    Ok(n) => {
                        written += n;
                        rest = &rest[n..];
                    }
                    Err(source) => return Err(PacedWriteError { written, source }),
                }
            }
            if let Err(source) = self.inner.flush().await {
                return Err(PacedWriteError { written, source });
            }
        }
        Ok(written)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
