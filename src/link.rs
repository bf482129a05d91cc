//! Link driver boundary
//!
//! The radio stack is an external collaborator. It accepts connect requests
//! through [`LinkDriver`] and reports what happened through a [`LinkEvents`]
//! handle, which only enqueues; the supervisor applies events in order on its
//! own task.

use std::net::Ipv4Addr;
use tokio::sync::mpsc;
use tracing::trace;

use crate::Result;
use crate::types::{DisconnectReason, LinkEvent};

/// Station-mode radio driver
pub trait LinkDriver: Send + Sync + 'static {
    /// Receive the handle driver callbacks must report through
    ///
    /// Called once, before the supervisor task starts.
    fn attach(&self, events: LinkEvents);

    /// Ask the radio to (re)associate with the configured access point
    ///
    /// Must not block. The outcome arrives later as a
    /// [`LinkEvent::GotAddress`] or [`LinkEvent::Disconnected`].
    fn connect(&self) -> Result<()>;
}

/// Non-blocking event sink handed to driver callbacks
#[derive(Debug, Clone)]
pub struct LinkEvents {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl LinkEvents {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue an event; returns false once the supervisor has stopped
    pub fn send(&self, event: LinkEvent) -> bool {
        trace!(?event, "Link event queued");
        self.tx.send(event).is_ok()
    }

    pub fn started(&self) -> bool {
        self.send(LinkEvent::Started)
    }

    pub fn disconnected(&self, reason: DisconnectReason) -> bool {
        self.send(LinkEvent::Disconnected(reason))
    }

    pub fn got_address(&self, address: Ipv4Addr) -> bool {
        self.send(LinkEvent::GotAddress(address))
    }
}
