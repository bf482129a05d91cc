//! `multipart/x-mixed-replace` framing for the live stream
//!
//! Each part goes on the wire as three chunks:
//!
//! ```text
//! \r\n--frame\r\n
//! Content-Type: image/jpeg\r\nContent-Length: <N>\r\n\r\n
//! <N payload bytes>
//! ```

use bytes::Bytes;

/// Boundary token announced in the response content type.
pub const BOUNDARY_TOKEN: &str = "frame";

/// Response content type for `/stream`.
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace;boundary=frame";

/// Content type of every part.
pub const PART_CONTENT_TYPE: &str = "image/jpeg";

/// Delimiter written before every part.
pub const BOUNDARY: &[u8] = b"\r\n--frame\r\n";

/// Boundary chunk
pub fn boundary() -> Bytes {
    Bytes::from_static(BOUNDARY)
}

/// Header block for a part carrying `len` payload bytes
pub fn part_header(len: usize) -> Bytes {
    Bytes::from(format!("Content-Type: {PART_CONTENT_TYPE}\r\nContent-Length: {len}\r\n\r\n"))
}
