//! Captured frame buffers

use bytes::Bytes;
use std::time::Instant;

/// One encoded image handed out by a [`FrameSource`](crate::frame::FrameSource)
///
/// The buffer belongs to the source's pool. Holders get it through a
/// [`FrameGuard`](crate::frame::FrameGuard), which gives it back on drop.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Encoded JPEG bytes
    pub data: Bytes,

    /// Sensor width in pixels
    pub width: u16,

    /// Sensor height in pixels
    pub height: u16,

    /// Capture time
    pub captured_at: Instant,

    /// Pool slot the buffer came from
    pub slot: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer
    pub fn new(data: impl Into<Bytes>, width: u16, height: u16, slot: usize) -> Self {
        Self { data: data.into(), width, height, captured_at: Instant::now(), slot }
    }

    /// Exact payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
