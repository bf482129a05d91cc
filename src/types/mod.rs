//! Core types shared by the supervisor and the streaming pipeline.
//!
//! - [`LinkState`] is the wireless attachment state machine
//! - [`LinkEvent`] is what the radio driver reports
//! - [`DisconnectReason`] classifies driver reason codes
//! - [`FrameBuffer`] is one encoded image borrowed from a frame source

mod frame;
mod link;
mod reason;

pub use frame::FrameBuffer;
pub use link::{LinkEvent, LinkState};
pub use reason::{DisconnectReason, codes as reason_codes};
