//! Frame source boundary
//!
//! Frame buffers come from a small pool owned by the source (often a single
//! slot). Every successful [`FrameSource::acquire`] must be paired with exactly
//! one [`FrameSource::release`]. Inside this crate buffers are only ever held
//! through a [`FrameGuard`], whose drop performs that release, so no exit path
//! can skip it or run it twice.

use std::ops::Deref;
use std::sync::Arc;
use tracing::{error, info, trace};

use crate::Result;
use crate::types::FrameBuffer;

/// Supplier of encoded frames from a constrained buffer pool
pub trait FrameSource: Send + Sync + 'static {
    /// Take the next frame out of the pool
    ///
    /// Returns:
    /// - `Ok(Some(buffer))` - A frame is available and now checked out
    /// - `Ok(None)` - The pool is momentarily empty, try again shortly
    /// - `Err(e)` - Acquisition failed; `e.is_retryable()` tells whether to try again
    fn acquire(&self) -> Result<Option<FrameBuffer>>;

    /// Return a checked-out buffer to the pool
    fn release(&self, buffer: FrameBuffer);
}

/// Outcome of bringing up the frame source
///
/// A source that failed to initialise disables streaming only; the link and
/// status services keep running.
#[derive(Clone)]
pub enum Camera {
    Ready(Arc<dyn FrameSource>),
    Failed(Arc<str>),
}

impl Camera {
    /// Wrap a source initialisation result, reporting failures
    pub fn from_init<S: FrameSource>(result: Result<S>) -> Self {
        match result {
            Ok(source) => {
                info!("Camera ready");
                Camera::Ready(Arc::new(source))
            }
            Err(e) => {
                error!("Camera init failed, streaming disabled: {}", e);
                for suggestion in e.recovery_suggestions() {
                    error!("  - {}", suggestion);
                }
                Camera::Failed(e.to_string().into())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Camera::Ready(_))
    }

    /// Init failure message, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            Camera::Ready(_) => None,
            Camera::Failed(reason) => Some(reason),
        }
    }
}

/// A checked-out frame, released when the guard goes out of scope
#[derive(Debug)]
pub struct FrameGuard<'a, S: FrameSource + ?Sized> {
    source: &'a S,
    buffer: Option<FrameBuffer>,
}

impl<'a, S: FrameSource + ?Sized> FrameGuard<'a, S> {
    /// Acquire a frame from `source`; `Ok(None)` when the pool is empty
    pub fn acquire(source: &'a S) -> Result<Option<Self>> {
        Ok(source.acquire()?.map(|buffer| {
            trace!(slot = buffer.slot, len = buffer.len(), "Frame acquired");
            Self { source, buffer: Some(buffer) }
        }))
    }
}

impl<S: FrameSource + ?Sized> Deref for FrameGuard<'_, S> {
    type Target = FrameBuffer;

    fn deref(&self) -> &FrameBuffer {
        // Only `drop` takes the buffer out.
        self.buffer.as_ref().unwrap_or_else(|| unreachable!("frame guard used after release"))
    }
}

impl<S: FrameSource + ?Sized> Drop for FrameGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            trace!(slot = buffer.slot, "Frame released");
            self.source.release(buffer);
        }
    }
}
