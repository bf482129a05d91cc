//! File-backed frame source
//!
//! Serves the JPEG files of a directory in name order, looping forever, out of
//! a fixed number of buffer slots. With the default single slot it behaves
//! like a sensor that can only have one frame checked out at a time.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, trace, warn};

use crate::frame::FrameSource;
use crate::types::FrameBuffer;
use crate::{EdgeCamError, Result};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Frame source replaying JPEG files from disk
pub struct DirectorySource {
    frames: Vec<Bytes>,
    slots: usize,
    width: u16,
    height: u16,
    next: AtomicUsize,
    outstanding: AtomicUsize,
}

impl DirectorySource {
    pub const DEFAULT_SLOTS: usize = 1;

    /// Load every `.jpg`/`.jpeg` file in `dir`
    ///
    /// Fails when the directory cannot be read or holds no usable frame.
    pub fn open<P: AsRef<Path>>(dir: P, slots: usize) -> Result<Self> {
        let dir = dir.as_ref();
        if slots == 0 {
            return Err(EdgeCamError::source_init("at least one buffer slot is required"));
        }

        let entries = std::fs::read_dir(dir).map_err(|e| {
            EdgeCamError::source_init_with_source(
                format!("cannot read frame directory {}", dir.display()),
                Box::new(e),
            )
        })?;

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            })
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            match std::fs::read(path) {
                Ok(data) if data.starts_with(&JPEG_SOI) => frames.push(Bytes::from(data)),
                Ok(_) => warn!(path = %path.display(), "Skipping file without JPEG header"),
                Err(e) => warn!(path = %path.display(), "Skipping unreadable frame: {}", e),
            }
        }

        if frames.is_empty() {
            return Err(EdgeCamError::source_init(format!(
                "no JPEG frames found in {}",
                dir.display()
            )));
        }

        info!(dir = %dir.display(), frames = frames.len(), slots, "Frame directory loaded");
        Ok(Self {
            frames,
            slots,
            width: 320,
            height: 240,
            next: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
        })
    }

    /// Resolution reported in frame metadata
    pub fn with_resolution(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Buffers currently checked out
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

impl FrameSource for DirectorySource {
    fn acquire(&self) -> Result<Option<FrameBuffer>> {
        let claimed = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < self.slots).then_some(n + 1))
            .is_ok();
        if !claimed {
            trace!("All frame slots busy");
            return Ok(None);
        }

        let sequence = self.next.fetch_add(1, Ordering::Relaxed);
        let data = self.frames[sequence % self.frames.len()].clone();
        Ok(Some(FrameBuffer::new(data, self.width, self.height, sequence % self.slots)))
    }

    fn release(&self, buffer: FrameBuffer) {
        let released = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if !released {
            warn!(slot = buffer.slot, "Release without outstanding buffer");
        }
    }
}
