//! Simulated link driver for running without radio hardware

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use tracing::{debug, info};

use crate::link::{LinkDriver, LinkEvents};
use crate::types::DisconnectReason;
use crate::{EdgeCamError, Result};

/// Driver that "associates" after a fixed delay
///
/// Queued failures are consumed one per connect request before the link
/// starts succeeding, which makes reconnect behaviour observable on a desk.
pub struct LoopbackLink {
    address: Ipv4Addr,
    association_delay: Duration,
    failures: Mutex<VecDeque<DisconnectReason>>,
    events: OnceLock<LinkEvents>,
}

impl LoopbackLink {
    pub const DEFAULT_ASSOCIATION_DELAY: Duration = Duration::from_millis(200);

    pub fn new(address: Ipv4Addr) -> Self {
        Self {
            address,
            association_delay: Self::DEFAULT_ASSOCIATION_DELAY,
            failures: Mutex::new(VecDeque::new()),
            events: OnceLock::new(),
        }
    }

    pub fn with_association_delay(mut self, delay: Duration) -> Self {
        self.association_delay = delay;
        self
    }

    /// Fail the next connect requests with these reasons, in order
    pub fn with_failures(self, reasons: impl IntoIterator<Item = DisconnectReason>) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.extend(reasons);
        }
        self
    }
}

impl LinkDriver for LoopbackLink {
    fn attach(&self, events: LinkEvents) {
        if self.events.set(events).is_err() {
            debug!("Loopback link already attached");
        }
    }

    fn connect(&self) -> Result<()> {
        let events = self
            .events
            .get()
            .cloned()
            .ok_or_else(|| EdgeCamError::driver_failed("loopback link not attached"))?;

        let failure = self
            .failures
            .lock()
            .map_err(|_| EdgeCamError::driver_failed("loopback failure queue poisoned"))?
            .pop_front();
        let address = self.address;
        let delay = self.association_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match failure {
                Some(reason) => {
                    info!(%reason, "Loopback link simulating failed association");
                    events.disconnected(reason);
                }
                None => {
                    events.got_address(address);
                }
            }
        });

        Ok(())
    }
}
