//! Live frame streaming
//!
//! A [`StreamSession`] relays frames from a [`FrameSource`](crate::frame::FrameSource)
//! to one client [`Transport`] until the client stops accepting writes.

mod session;
mod transport;


pub use session::{SessionEnd, SessionSummary, StreamSession, StreamTiming};
pub use transport::{ChannelTransport, IoTransport, Transport};
