//! Link supervision and live MJPEG streaming for small edge cameras.
//!
//! edgecam keeps a wireless link attached and serves the camera as a
//! `multipart/x-mixed-replace` stream once the link is up.
//!
//! # Features
//!
//! - **Link supervision**: an event-driven state machine with reason-aware
//!   reconnect backoff and a readiness signal
//! - **Scarce frame buffers**: every acquired frame is released exactly once,
//!   whichever way a stream ends
//! - **Hardware at the edges**: radio, sensor and broker client sit behind
//!   traits, with simulated implementations for running on a workstation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use edgecam::config::Config;
//! use edgecam::device::Device;
//! use edgecam::frame::Camera;
//! use edgecam::links::LoopbackLink;
//! use edgecam::sources::DirectorySource;
//! use edgecam::status::LogPublisher;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("edgecam.yaml")?;
//!     let camera = Camera::from_init(DirectorySource::open("frames", 1));
//!     let link = LoopbackLink::new([192, 168, 4, 2].into());
//!     let publisher = LogPublisher::new(config.broker_uri());
//!
//!     let device = Device::new(config, link, camera, publisher);
//!     device.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(test)]
mod test_utils;
pub mod types;

// Link supervision
pub mod backoff;
pub mod link;
pub mod links;
pub mod supervisor;

// Frames and streaming
pub mod frame;
pub mod multipart;
pub mod sources;
pub mod streaming;

// Device services
pub mod config;
pub mod device;
pub mod http;
pub mod logging;
pub mod status;

// Core exports
pub use error::*;
pub use types::*;

pub use backoff::BackoffPolicy;
pub use config::Config;
pub use device::{Device, RunSummary};
pub use frame::{Camera, FrameGuard, FrameSource};
pub use link::{LinkDriver, LinkEvents};
pub use status::{StatusEvent, StatusPublisher};
pub use streaming::{StreamSession, StreamTiming, Transport};
pub use supervisor::{LinkMonitor, LinkStatus, Supervisor};
