//! Disconnect reason classification for the radio driver

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw reason codes reported by the station driver on disconnect.
pub mod codes {
    pub const AUTH_EXPIRE: u16 = 2;
    pub const BEACON_TIMEOUT: u16 = 200;
    pub const NO_AP_FOUND: u16 = 201;
    pub const AUTH_FAIL: u16 = 202;
    pub const HANDSHAKE_TIMEOUT: u16 = 204;
}

/// Why the link went down
///
/// Only the reasons the device reacts to differently get their own variant;
/// everything else is carried through as [`DisconnectReason::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    AuthExpire,
    AuthFail,
    BeaconTimeout,
    NoApFound,
    HandshakeTimeout,
    Other(u16),
}

impl DisconnectReason {
    /// Decode a driver reason code
    pub fn from_code(code: u16) -> Self {
        match code {
            codes::AUTH_EXPIRE => DisconnectReason::AuthExpire,
            codes::AUTH_FAIL => DisconnectReason::AuthFail,
            codes::BEACON_TIMEOUT => DisconnectReason::BeaconTimeout,
            codes::NO_AP_FOUND => DisconnectReason::NoApFound,
            codes::HANDSHAKE_TIMEOUT => DisconnectReason::HandshakeTimeout,
            other => DisconnectReason::Other(other),
        }
    }

    /// The driver reason code for this reason
    pub fn code(self) -> u16 {
        match self {
            DisconnectReason::AuthExpire => codes::AUTH_EXPIRE,
            DisconnectReason::AuthFail => codes::AUTH_FAIL,
            DisconnectReason::BeaconTimeout => codes::BEACON_TIMEOUT,
            DisconnectReason::NoApFound => codes::NO_AP_FOUND,
            DisconnectReason::HandshakeTimeout => codes::HANDSHAKE_TIMEOUT,
            DisconnectReason::Other(code) => code,
        }
    }

    /// Credential and handshake failures, which get the long reconnect delay
    pub fn is_credential_class(self) -> bool {
        matches!(
            self,
            DisconnectReason::AuthExpire
                | DisconnectReason::AuthFail
                | DisconnectReason::HandshakeTimeout
        )
    }

    /// Operator hint for the log line
    pub fn describe(self) -> &'static str {
        match self {
            DisconnectReason::AuthExpire => "Auth expired (timeout)",
            DisconnectReason::AuthFail => "Auth failed - check password/security",
            DisconnectReason::BeaconTimeout => "Beacon timeout - signal issue",
            DisconnectReason::NoApFound => "AP not found - check SSID",
            DisconnectReason::HandshakeTimeout => "Handshake timeout",
            DisconnectReason::Other(_) => "Other reason",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::AuthExpire => f.write_str("auth_expire"),
            DisconnectReason::AuthFail => f.write_str("auth_fail"),
            DisconnectReason::BeaconTimeout => f.write_str("beacon_timeout"),
            DisconnectReason::NoApFound => f.write_str("no_ap_found"),
            DisconnectReason::HandshakeTimeout => f.write_str("handshake_timeout"),
            DisconnectReason::Other(code) => write!(f, "other({code})"),
        }
    }
}
