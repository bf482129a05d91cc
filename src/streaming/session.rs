//! Per-client streaming loop

use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::Transport;
use crate::Result;
use crate::frame::{FrameGuard, FrameSource};
use crate::multipart;
use crate::types::FrameBuffer;

/// Delays that pace a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTiming {
    /// Pause after each delivered frame
    pub frame_interval: Duration,
    /// Pause before retrying an empty or busy source
    pub empty_retry: Duration,
}

impl StreamTiming {
    pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(30);
    pub const DEFAULT_EMPTY_RETRY: Duration = Duration::from_millis(10);
}

impl Default for StreamTiming {
    fn default() -> Self {
        Self { frame_interval: Self::DEFAULT_FRAME_INTERVAL, empty_retry: Self::DEFAULT_EMPTY_RETRY }
    }
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// A write to the client failed or the client went away
    TransportClosed,
    /// The source reported a non-retryable acquisition failure
    SourceUnavailable,
}

/// What a finished session delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    /// Acquisitions that found the source empty or busy
    pub empty_polls: u64,
    pub end: SessionEnd,
}

/// Streams frames from one source to one client
pub struct StreamSession<S: ?Sized, T> {
    source: Arc<S>,
    transport: T,
    timing: StreamTiming,
}

impl<S, T> StreamSession<S, T>
where
    S: FrameSource + ?Sized,
    T: Transport,
{
    pub fn new(source: Arc<S>, transport: T, timing: StreamTiming) -> Self {
        Self { source, transport, timing }
    }

    /// Relay frames until the client goes away or the source dies
    ///
    /// At most one frame is checked out at a time and it is released on the
    /// iteration that acquired it, whichever write fails.
    pub async fn run(self) -> SessionSummary {
        let Self { source, mut transport, timing } = self;
        let mut frames_sent = 0u64;
        let mut bytes_sent = 0u64;
        let mut empty_polls = 0u64;

        info!("Stream session started");

        let end = loop {
            let acquired = match FrameGuard::acquire(&*source) {
                Ok(frame) => frame,
                Err(e) if e.is_retryable() => {
                    debug!("Frame acquisition failed, retrying: {}", e);
                    None
                }
                Err(e) => {
                    warn!("Frame source unavailable, ending session: {}", e);
                    break SessionEnd::SourceUnavailable;
                }
            };

            // An idle session never writes, so it has to ask whether the client left.
            let Some(frame) = acquired else {
                empty_polls += 1;
                if transport.is_closed() {
                    debug!("Stream client gone while waiting for a frame");
                    break SessionEnd::TransportClosed;
                }
                trace!("No frame available, retrying");
                tokio::time::sleep(timing.empty_retry).await;
                continue;
            };

            if let Err(e) = write_part(&mut transport, &frame).await {
                debug!("Stream client gone: {}", e);
                break SessionEnd::TransportClosed;
            }

            frames_sent += 1;
            bytes_sent += frame.len() as u64;
            trace!(frame = frames_sent, len = frame.len(), "Frame sent");
            drop(frame);

            tokio::time::sleep(timing.frame_interval).await;
        };

        info!(frames_sent, bytes_sent, empty_polls, ?end, "Stream session ended");
        SessionSummary { frames_sent, bytes_sent, empty_polls, end }
    }
}

/// Boundary, header, payload: three writes, stopping at the first failure
async fn write_part<T: Transport>(transport: &mut T, frame: &FrameBuffer) -> Result<()> {
    transport.write(multipart::boundary()).await?;
    transport.write(multipart::part_header(frame.len())).await?;
    transport.write(Bytes::clone(&frame.data)).await
}
