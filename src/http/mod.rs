//! HTTP surface: viewer page, live stream and status
//!
//! - `GET /` - minimal page embedding the stream
//! - `GET /stream` - `multipart/x-mixed-replace` feed, one client at a time
//! - `GET /status` - link and camera state as JSON

mod routes;
mod server;

pub use routes::{HttpState, router};
pub use server::{bind, serve};
