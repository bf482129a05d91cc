//! Test doubles for the link driver, frame source and client transport
//!
//! Each double records what the code under test did to it so assertions can
//! check call counts and ordering after the fact.

#![cfg(test)]

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::frame::FrameSource;
use crate::link::{LinkDriver, LinkEvents};
use crate::streaming::Transport;
use crate::types::FrameBuffer;
use crate::{EdgeCamError, Result};

/// Link driver that counts connect requests
#[derive(Clone, Default)]
pub struct RecordingDriver {
    inner: Arc<DriverInner>,
}

#[derive(Default)]
struct DriverInner {
    connects: AtomicUsize,
    rejects_left: AtomicUsize,
    events: Mutex<Option<LinkEvents>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_calls(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Make the next `n` connect requests fail synchronously
    pub fn reject_next_connects(&self, n: usize) {
        self.inner.rejects_left.store(n, Ordering::SeqCst);
    }

    pub fn events(&self) -> Option<LinkEvents> {
        self.inner.events.lock().unwrap().clone()
    }
}

impl LinkDriver for RecordingDriver {
    fn attach(&self, events: LinkEvents) {
        *self.inner.events.lock().unwrap() = Some(events);
    }

    fn connect(&self) -> Result<()> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        let rejected = self
            .inner
            .rejects_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected { Err(EdgeCamError::driver_failed("radio busy")) } else { Ok(()) }
    }
}

/// One scripted answer to `acquire`
#[derive(Debug, Clone)]
pub enum SourceStep {
    Frame(Vec<u8>),
    Empty,
    Fail { transient: bool },
}

/// Frame source replaying a script, then optionally one step forever
///
/// Without a repeating step, an exhausted script makes `acquire` fail with a
/// non-retryable error.
#[derive(Debug)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<SourceStep>>,
    tail: Option<SourceStep>,
    acquires: AtomicUsize,
    releases: AtomicUsize,
    attempts: AtomicUsize,
    max_outstanding: AtomicUsize,
    closed: AtomicBool,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = SourceStep>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            tail: None,
            acquires: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            max_outstanding: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn repeating(frame: Vec<u8>) -> Self {
        Self::new(Vec::new()).then_forever(SourceStep::Frame(frame))
    }

    /// Answer with `step` once the script runs out
    pub fn then_forever(mut self, step: SourceStep) -> Self {
        self.tail = Some(step);
        self
    }

    /// Successful acquisitions
    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Every call to `acquire`, including empty and failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Simulate the client leaving: reported closed, every write fails
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn outstanding(&self) -> usize {
        self.acquires() - self.releases()
    }

    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding.load(Ordering::SeqCst)
    }
}

impl FrameSource for ScriptedSource {
    fn acquire(&self) -> Result<Option<FrameBuffer>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        let step = step
            .or_else(|| self.tail.clone())
            .unwrap_or(SourceStep::Fail { transient: false });

        match step {
            SourceStep::Frame(data) => {
                let slot = self.acquires.fetch_add(1, Ordering::SeqCst);
                self.max_outstanding.fetch_max(self.outstanding(), Ordering::SeqCst);
                Ok(Some(FrameBuffer::new(data, 320, 240, slot)))
            }
            SourceStep::Empty => Ok(None),
            SourceStep::Fail { transient } => {
                Err(EdgeCamError::source_unavailable("scripted failure", transient))
            }
        }
    }

    fn release(&self, _buffer: FrameBuffer) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transport recording chunks and failing on a chosen write
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    written: Arc<Mutex<Vec<Bytes>>>,
    attempts: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    fail_on: Option<usize>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th write (1-based) and every write after it
    pub fn failing_on(n: usize) -> Self {
        Self { fail_on: Some(n), ..Self::default() }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Simulate the client leaving: reported closed, every write fails
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn chunks(&self) -> Vec<Bytes> {
        self.written.lock().unwrap().clone()
    }

    /// Successfully written chunks grouped as (boundary, header, payload)
    pub fn parts(&self) -> Vec<(Bytes, Bytes, Bytes)> {
        self.chunks()
            .chunks_exact(3)
            .map(|part| (part[0].clone(), part[1].clone(), part[2].clone()))
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.is_closed() || self.fail_on.is_some_and(|fail_on| n >= fail_on) {
            return Err(EdgeCamError::transport_closed("scripted write failure"));
        }
        self.written.lock().unwrap().push(chunk);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
