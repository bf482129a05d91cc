//! Reconnect pacing

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::DisconnectReason;
use crate::{EdgeCamError, Result};

/// Maps a disconnect reason to the wait before the next connect attempt
///
/// Credential and handshake failures wait `long`, everything else waits
/// `short`. The delay is flat: the attempt count never stretches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffPolicy {
    #[serde(rename = "short_ms", with = "crate::config::millis")]
    short: Duration,
    #[serde(rename = "long_ms", with = "crate::config::millis")]
    long: Duration,
}

impl BackoffPolicy {
    pub const DEFAULT_SHORT: Duration = Duration::from_millis(1000);
    pub const DEFAULT_LONG: Duration = Duration::from_millis(3000);

    /// Create a policy; `long` must not be shorter than `short`
    pub fn new(short: Duration, long: Duration) -> Result<Self> {
        if long < short {
            return Err(EdgeCamError::config(format!(
                "credential backoff ({long:?}) must not be shorter than generic backoff ({short:?})"
            )));
        }
        Ok(Self { short, long })
    }

    /// Wait before reconnecting after `reason`
    pub fn delay_for(&self, reason: &DisconnectReason) -> Duration {
        if reason.is_credential_class() { self.long } else { self.short }
    }

    pub fn short(&self) -> Duration {
        self.short
    }

    pub fn long(&self) -> Duration {
        self.long
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { short: Self::DEFAULT_SHORT, long: Self::DEFAULT_LONG }
    }
}
