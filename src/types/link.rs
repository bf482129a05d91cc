//! Link state machine types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use super::DisconnectReason;
use crate::{EdgeCamError, Result};

/// Wireless attachment status
///
/// Exactly one instance exists per supervisor. Transitions are restricted to
/// the edges accepted by [`LinkState::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkState {
    /// Radio not started yet
    #[default]
    Idle,

    /// Connect request issued, waiting for association and an address
    Connecting,

    /// Associated and addressed
    Connected,

    /// Lost or failed; a reconnect is scheduled
    Disconnected {
        reason: DisconnectReason,
        /// Failed attempts since the last successful connection
        attempt: u32,
    },
}

impl LinkState {
    /// Whether the link is usable by dependent services
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: &LinkState) -> bool {
        matches!(
            (self, next),
            (LinkState::Idle, LinkState::Connecting)
                | (LinkState::Connecting, LinkState::Connected)
                | (LinkState::Connecting, LinkState::Disconnected { .. })
                | (LinkState::Connected, LinkState::Disconnected { .. })
                | (LinkState::Disconnected { .. }, LinkState::Connecting)
        )
    }

    /// Move to `next`, rejecting edges outside the state machine
    pub fn transition(&mut self, next: LinkState) -> Result<()> {
        if !self.can_transition_to(&next) {
            return Err(EdgeCamError::invalid_transition(*self, next));
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Idle => f.write_str("idle"),
            LinkState::Connecting => f.write_str("connecting"),
            LinkState::Connected => f.write_str("connected"),
            LinkState::Disconnected { reason, attempt } => {
                write!(f, "disconnected({reason}, attempt {attempt})")
            }
        }
    }
}

/// Events emitted by the link driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Station interface started
    Started,
    /// Association lost or attempt failed
    Disconnected(DisconnectReason),
    /// DHCP lease obtained
    GotAddress(Ipv4Addr),
}
