//! Error types for the edge camera runtime.
//!
//! All fallible operations in this crate return [`EdgeCamError`]. Errors carry
//! structured context and can classify themselves as retryable, which is how the
//! streaming session tells a momentary source hiccup apart from a dead source.
//!
//! ## Error Categories
//!
//! - **Configuration Errors**: Invalid or unreadable device configuration
//! - **Link Errors**: Rejected link-state transitions and driver failures
//! - **Source Errors**: Frame source initialization or acquisition failures
//! - **Transport Errors**: Client connections that stopped accepting writes
//! - **Publish Errors**: Status events the broker client could not accept
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use edgecam::EdgeCamError;
//!
//! let error = EdgeCamError::source_unavailable("sensor busy", true);
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::LinkState;

/// Result type alias for edge camera operations.
pub type Result<T, E = EdgeCamError> = std::result::Result<T, E>;

/// Main error type for edge camera operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EdgeCamError {
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid link transition from {from} to {to}")]
    InvalidTransition { from: LinkState, to: LinkState },

    #[error("Link driver failed: {reason}")]
    Driver {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Frame source failed to initialize: {reason}")]
    SourceInit {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Frame source unavailable: {reason}")]
    SourceUnavailable { reason: String, transient: bool },

    #[error("Transport closed: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Failed to bind HTTP listener on port {port}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server stopped unexpectedly")]
    Server {
        #[source]
        source: std::io::Error,
    },
}

impl EdgeCamError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            EdgeCamError::Config { .. } => false,
            EdgeCamError::File { .. } => false,
            EdgeCamError::InvalidTransition { .. } => false,
            EdgeCamError::Driver { .. } => true,
            EdgeCamError::SourceInit { .. } => false,
            EdgeCamError::SourceUnavailable { transient, .. } => *transient,
            EdgeCamError::Transport { .. } => false,
            EdgeCamError::Timeout { .. } => true,
            EdgeCamError::Publish { .. } => true,
            EdgeCamError::Bind { .. } => false,
            EdgeCamError::Server { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            EdgeCamError::Config { .. } => vec![
                "Check the SSID and password in the configuration file",
                "Use auth mode 'open' only for networks without a password",
                "Ensure the long backoff is not shorter than the short backoff",
            ],
            EdgeCamError::File { .. } => vec![
                "Check the configuration file exists and is readable",
                "Verify the file is valid YAML",
            ],
            EdgeCamError::InvalidTransition { .. } => vec![
                "Check the link driver emits events in a valid order",
                "Inspect driver logs for duplicated or late events",
            ],
            EdgeCamError::Driver { .. } => vec![
                "Verify the radio is started",
                "Check the access point is in range and on 2.4GHz",
            ],
            EdgeCamError::SourceInit { .. } => vec![
                "Check the camera module is connected",
                "Verify the frame directory exists and contains JPEG files",
                "Restart the device after fixing the sensor",
            ],
            EdgeCamError::SourceUnavailable { .. } => vec![
                "Reduce the stream frame rate",
                "Increase the number of frame buffer slots",
            ],
            EdgeCamError::Transport { .. } => vec![
                "Reconnect the client",
                "Check network stability between client and device",
            ],
            EdgeCamError::Timeout { .. } => vec![
                "Increase the timeout duration",
                "Check signal strength and access point load",
            ],
            EdgeCamError::Publish { .. } => vec![
                "Check the broker address",
                "Verify the broker is reachable from the device network",
            ],
            EdgeCamError::Bind { .. } => vec![
                "Choose a different HTTP port",
                "Stop the process already listening on this port",
            ],
            EdgeCamError::Server { .. } => vec![
                "Restart the device",
                "Check the network interface is still up",
            ],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        EdgeCamError::Config { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        EdgeCamError::File { path, source }
    }

    /// Helper constructor for rejected link transitions.
    pub fn invalid_transition(from: LinkState, to: LinkState) -> Self {
        EdgeCamError::InvalidTransition { from, to }
    }

    /// Helper constructor for link driver failures.
    pub fn driver_failed(reason: impl Into<String>) -> Self {
        EdgeCamError::Driver { reason: reason.into(), source: None }
    }

    /// Helper constructor for frame source initialization failures.
    pub fn source_init(reason: impl Into<String>) -> Self {
        EdgeCamError::SourceInit { reason: reason.into(), source: None }
    }

    /// Helper constructor for frame source initialization failures with source.
    pub fn source_init_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        EdgeCamError::SourceInit { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for acquisition failures.
    pub fn source_unavailable(reason: impl Into<String>, transient: bool) -> Self {
        EdgeCamError::SourceUnavailable { reason: reason.into(), transient }
    }

    /// Helper constructor for transport write failures.
    pub fn transport_closed(reason: impl Into<String>) -> Self {
        EdgeCamError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport write failures with source.
    pub fn transport_closed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        EdgeCamError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for publish failures.
    pub fn publish_failed(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        EdgeCamError::Publish { topic: topic.into(), reason: reason.into() }
    }
}

impl From<std::io::Error> for EdgeCamError {
    fn from(err: std::io::Error) -> Self {
        EdgeCamError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for EdgeCamError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        EdgeCamError::Config { reason: err.to_string() }
    }
}
