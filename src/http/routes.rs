//! Route handlers

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::frame::Camera;
use crate::multipart::STREAM_CONTENT_TYPE;
use crate::streaming::{ChannelTransport, StreamSession, StreamTiming};
use crate::supervisor::{LinkMonitor, LinkStatus};

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><title>edgecam</title></head>
<body style="margin:0;background:#000">
<img src="/stream" style="width:100%;height:auto" alt="live stream">
</body>
</html>
"#;

/// Shared handler state
#[derive(Clone)]
pub struct HttpState {
    device_id: Arc<str>,
    camera: Camera,
    link: LinkMonitor,
    timing: StreamTiming,
    send_timeout: Duration,
    max_streams: usize,
    streams: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl HttpState {
    pub fn new(
        device_id: impl Into<Arc<str>>,
        camera: Camera,
        link: LinkMonitor,
        http: &HttpConfig,
        timing: StreamTiming,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            camera,
            link,
            timing,
            send_timeout: http.send_timeout,
            max_streams: http.max_streams,
            streams: Arc::new(Semaphore::new(http.max_streams)),
            shutdown,
        }
    }

    /// Streams currently being served
    pub fn active_streams(&self) -> usize {
        self.max_streams - self.streams.available_permits()
    }
}

/// Build the device router
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/stream", get(stream))
        .route("/status", get(status))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn stream(State(state): State<HttpState>) -> Response {
    let source = match &state.camera {
        Camera::Ready(source) => Arc::clone(source),
        Camera::Failed(reason) => {
            return (StatusCode::SERVICE_UNAVAILABLE, format!("camera unavailable: {reason}"))
                .into_response();
        }
    };

    let Ok(permit) = Arc::clone(&state.streams).try_acquire_owned() else {
        debug!("Rejecting stream request, all stream slots busy");
        return (StatusCode::SERVICE_UNAVAILABLE, "stream busy").into_response();
    };

    let (transport, rx) = ChannelTransport::new(state.send_timeout);
    let session = StreamSession::new(source, transport, state.timing);
    tokio::spawn(async move {
        let summary = session.run().await;
        info!(frames = summary.frames_sent, end = ?summary.end, "Stream client finished");
        drop(permit);
    });

    // Shutdown ends the body; the session then sees its next write fail.
    let body = ReceiverStream::new(rx).take_until(state.shutdown.clone().cancelled_owned());

    (
        [(header::CONTENT_TYPE, STREAM_CONTENT_TYPE), (header::CACHE_CONTROL, "no-cache")],
        Body::from_stream(body),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct StatusReport {
    device: String,
    link: LinkStatus,
    camera: CameraReport,
    active_streams: usize,
}

#[derive(Debug, Serialize)]
struct CameraReport {
    ready: bool,
    error: Option<String>,
}

async fn status(State(state): State<HttpState>) -> Json<StatusReport> {
    let camera = CameraReport {
        ready: state.camera.is_ready(),
        error: state.camera.error().map(str::to_string),
    };
    Json(StatusReport {
        device: state.device_id.to_string(),
        link: state.link.status(),
        camera,
        active_streams: state.active_streams(),
    })
}
