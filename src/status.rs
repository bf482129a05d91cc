//! Status events for the message broker
//!
//! The broker client is an external collaborator behind [`StatusPublisher`].
//! Publishing is fire-and-forget: failures are logged and never reach the
//! caller.

use serde::Serialize;
use std::net::Ipv4Addr;
use tracing::{info, warn};

use crate::{EdgeCamError, Result};

/// Broker client used for device status events
#[async_trait::async_trait]
pub trait StatusPublisher: Send + Sync + 'static {
    /// Hand `payload` to the broker client for `topic`
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Event payloads published by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    /// Link became ready for the first time
    Online { device: String, address: Option<Ipv4Addr>, stream_port: u16 },
}

impl StatusEvent {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| EdgeCamError::publish_failed("<encode>", e.to_string()))
    }
}

/// Publish `event` and log the outcome instead of returning it
pub async fn publish_event<P>(publisher: &P, topic: &str, event: &StatusEvent)
where
    P: StatusPublisher + ?Sized,
{
    let payload = match event.to_json() {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to encode status event: {}", e);
            return;
        }
    };

    match publisher.publish(topic, &payload).await {
        Ok(()) => info!(topic, "Status event published"),
        Err(e) => warn!(topic, "Status publish failed: {}", e),
    }
}

/// Publisher that writes events to the log
///
/// Used when no broker client is wired in.
#[derive(Debug, Clone)]
pub struct LogPublisher {
    broker_uri: String,
}

impl LogPublisher {
    pub fn new(broker_uri: impl Into<String>) -> Self {
        Self { broker_uri: broker_uri.into() }
    }
}

#[async_trait::async_trait]
impl StatusPublisher for LogPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let payload = std::str::from_utf8(payload)
            .map_err(|e| EdgeCamError::publish_failed(topic, e.to_string()))?;
        info!(broker = %self.broker_uri, topic, payload, "Status event");
        Ok(())
    }
}
