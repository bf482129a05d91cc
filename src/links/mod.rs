//! Link driver implementations

pub mod loopback;

pub use loopback::LoopbackLink;
