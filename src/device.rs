//! Device runtime
//!
//! Brings the link up, waits a bounded time for readiness and only then starts
//! the services that need the network: the online status event and the HTTP
//! listener. A link that never comes up is reported and the device keeps
//! supervising it; a camera that failed to initialise only disables `/stream`.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::Result;
use crate::config::Config;
use crate::frame::Camera;
use crate::http::{self, HttpState};
use crate::link::LinkDriver;
use crate::status::{StatusEvent, StatusPublisher, publish_event};
use crate::supervisor::{LinkMonitor, Supervisor};

/// What a finished run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Whether the link was ready in time and dependent services started
    pub services_started: bool,
}

/// One edge camera: link, status publisher, camera and HTTP surface
pub struct Device<D, P> {
    config: Config,
    driver: D,
    camera: Camera,
    publisher: Arc<P>,
}

impl<D, P> Device<D, P>
where
    D: LinkDriver,
    P: StatusPublisher,
{
    pub fn new(config: Config, driver: D, camera: Camera, publisher: P) -> Self {
        Self { config, driver, camera, publisher: Arc::new(publisher) }
    }

    /// Run until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<RunSummary> {
        let Self { config, driver, camera, publisher } = self;

        info!(
            ssid = %config.wifi.ssid,
            auth = ?config.wifi.auth,
            broker = %config.broker_uri(),
            "Starting device {}",
            config.device_id
        );

        let supervisor = Supervisor::spawn(driver, config.backoff);
        let monitor = supervisor.monitor();
        supervisor.start();

        info!(timeout = ?config.timing.startup_timeout, "Waiting for link");
        let ready = tokio::select! {
            ready = supervisor.wait_ready(config.timing.startup_timeout) => ready,
            _ = cancel.cancelled() => false,
        };

        let mut http_task = None;
        if ready {
            info!(address = ?monitor.address(), "Link ready");
            http_task = start_services(&config, camera, monitor.clone(), &publisher, &cancel).await;
        } else if !cancel.is_cancelled() {
            error!(
                timeout = ?config.timing.startup_timeout,
                "Link not ready in time, dependent services not started"
            );
            error!("Check: SSID correct? Access point on 2.4GHz? In range?");
        }

        let http_running = http_task.is_some();
        let mut ticker = tokio::time::interval(config.timing.status_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => report_status(&monitor, http_running),
            }
        }

        info!("Device shutting down");
        if let Some(task) = http_task {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("HTTP server failed: {}", e),
                Err(e) => error!("HTTP server task failed: {}", e),
            }
        }
        supervisor.shutdown().await;

        Ok(RunSummary { services_started: ready })
    }
}

async fn start_services<P: StatusPublisher>(
    config: &Config,
    camera: Camera,
    monitor: LinkMonitor,
    publisher: &Arc<P>,
    cancel: &CancellationToken,
) -> Option<JoinHandle<Result<()>>> {
    let event = StatusEvent::Online {
        device: config.device_id.clone(),
        address: monitor.address(),
        stream_port: config.http.port,
    };
    let topic = config.event_topic();
    let publisher = Arc::clone(publisher);
    tokio::spawn(async move { publish_event(&*publisher, &topic, &event).await });

    let listener = match http::bind(config.http.port).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("HTTP listener unavailable: {}", e);
            return None;
        }
    };

    let state = HttpState::new(
        config.device_id.as_str(),
        camera,
        monitor,
        &config.http,
        config.timing.stream_timing(),
        cancel.child_token(),
    );
    Some(tokio::spawn(http::serve(
        listener,
        http::router(state),
        config.http.recv_timeout,
        cancel.child_token(),
    )))
}

fn report_status(monitor: &LinkMonitor, http_running: bool) {
    let status = monitor.status();
    if status.state.is_connected() {
        info!(
            address = ?status.address,
            http = if http_running { "running" } else { "stopped" },
            "Status: link OK"
        );
    } else {
        warn!(state = %status.state, "Status: link down");
    }
}
