//! Connectivity supervisor
//!
//! One task owns the [`LinkState`]. Driver callbacks enqueue [`LinkEvent`]s,
//! the task applies them in delivery order and schedules reconnects with a
//! timer instead of sleeping inline, so a pending backoff never blocks the
//! next event. Everyone else observes the state through a watch channel.

use serde::Serialize;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::backoff::BackoffPolicy;
use crate::link::{LinkDriver, LinkEvents};
use crate::types::{DisconnectReason, LinkEvent, LinkState};

/// Reason recorded when the driver refuses a connect request outright.
pub const CONNECT_REJECTED: DisconnectReason = DisconnectReason::Other(0);

/// Snapshot published after every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LinkStatus {
    #[serde(flatten)]
    pub state: LinkState,
    /// Address of the current lease, cleared on disconnect
    pub address: Option<Ipv4Addr>,
}

/// Owner of the supervisor task
///
/// Dropping the supervisor stops the task.
pub struct Supervisor {
    events: LinkEvents,
    monitor: LinkMonitor,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Attach `driver` and spawn the state-owning task in `Idle`
    pub fn spawn<D>(driver: D, policy: BackoffPolicy) -> Self
    where
        D: LinkDriver,
    {
        let (events, events_rx) = LinkEvents::channel();
        let (status_tx, status_rx) = watch::channel(LinkStatus::default());
        let cancel = CancellationToken::new();

        driver.attach(events.clone());

        let actor = SupervisorTask {
            driver,
            policy,
            status: LinkStatus::default(),
            attempt: 0,
            reconnect_at: None,
            status_tx,
        };
        let task = tokio::spawn(actor.run(events_rx, cancel.clone()));

        Self { events, monitor: LinkMonitor { status: status_rx }, cancel, task: Some(task) }
    }

    /// Start the link: `Idle → Connecting` and issue the first connect
    pub fn start(&self) {
        self.events.started();
    }

    /// Handle for driver callbacks
    pub fn events(&self) -> LinkEvents {
        self.events.clone()
    }

    /// Read-only view for dependent services
    pub fn monitor(&self) -> LinkMonitor {
        self.monitor.clone()
    }

    pub fn state(&self) -> LinkState {
        self.monitor.state()
    }

    pub fn address(&self) -> Option<Ipv4Addr> {
        self.monitor.address()
    }

    pub fn is_ready(&self) -> bool {
        self.monitor.is_ready()
    }

    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        self.monitor.wait_ready(timeout).await
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Supervisor task failed: {}", e);
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        debug!("Dropping supervisor");
        self.cancel.cancel();
    }
}

/// Cloneable read side of the link state
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    status: watch::Receiver<LinkStatus>,
}

impl LinkMonitor {
    /// Current snapshot
    pub fn status(&self) -> LinkStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> LinkState {
        self.status.borrow().state
    }

    pub fn address(&self) -> Option<Ipv4Addr> {
        self.status.borrow().address
    }

    /// Non-blocking readiness poll
    pub fn is_ready(&self) -> bool {
        self.status.borrow().state.is_connected()
    }

    /// Wait until the link is connected, giving up after `timeout`
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut status = self.status.clone();
        let ready = status.wait_for(|s| s.state.is_connected());
        matches!(tokio::time::timeout(timeout, ready).await, Ok(Ok(_)))
    }

    /// Wait for the next published snapshot; `None` once the supervisor is gone
    pub async fn changed(&mut self) -> Option<LinkStatus> {
        self.status.changed().await.ok()?;
        Some(*self.status.borrow_and_update())
    }
}

struct SupervisorTask<D> {
    driver: D,
    policy: BackoffPolicy,
    status: LinkStatus,
    attempt: u32,
    reconnect_at: Option<Instant>,
    status_tx: watch::Sender<LinkStatus>,
}

impl<D: LinkDriver> SupervisorTask<D> {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<LinkEvent>, cancel: CancellationToken) {
        info!("Link supervisor started");

        loop {
            let reconnect_at = self.reconnect_at;
            let reconnect = async move {
                match reconnect_at {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Link supervisor cancelled");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        debug!("All event senders dropped");
                        break;
                    }
                },
                _ = reconnect => {
                    self.reconnect_at = None;
                    self.reconnect();
                }
            }
        }

        info!(state = %self.status.state, "Link supervisor stopped");
    }

    fn handle(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Started => self.on_started(),
            LinkEvent::GotAddress(address) => self.on_link_up(address),
            LinkEvent::Disconnected(reason) => self.on_link_down(reason),
        }
    }

    fn on_started(&mut self) {
        if self.status.state != LinkState::Idle {
            debug!(state = %self.status.state, "Ignoring start outside idle");
            return;
        }
        info!("Link started, connecting");
        if self.transition(LinkState::Connecting).is_ok() {
            self.issue_connect();
        }
    }

    fn on_link_up(&mut self, address: Ipv4Addr) {
        if self.status.state != LinkState::Connecting {
            warn!(state = %self.status.state, %address, "Ignoring address outside connecting");
            return;
        }
        self.attempt = 0;
        self.status.address = Some(address);
        if self.transition(LinkState::Connected).is_ok() {
            info!(%address, "Link connected");
        }
    }

    fn on_link_down(&mut self, reason: DisconnectReason) {
        if !matches!(self.status.state, LinkState::Connected | LinkState::Connecting) {
            debug!(state = %self.status.state, %reason, "Ignoring stale disconnect");
            return;
        }

        self.attempt = self.attempt.saturating_add(1);
        self.status.address = None;
        let next = LinkState::Disconnected { reason, attempt: self.attempt };
        if self.transition(next).is_err() {
            return;
        }

        let delay = self.policy.delay_for(&reason);
        warn!(
            %reason,
            code = reason.code(),
            attempt = self.attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Link disconnected: {}",
            reason.describe()
        );
        self.reconnect_at = Some(Instant::now() + delay);
    }

    fn reconnect(&mut self) {
        if self.transition(LinkState::Connecting).is_ok() {
            debug!(attempt = self.attempt, "Reconnecting");
            self.issue_connect();
        }
    }

    fn issue_connect(&mut self) {
        if let Err(e) = self.driver.connect() {
            error!("Connect request rejected: {}", e);
            self.on_link_down(CONNECT_REJECTED);
        }
    }

    fn transition(&mut self, next: LinkState) -> Result<()> {
        let previous = self.status.state;
        if let Err(e) = self.status.state.transition(next) {
            error!("{}", e);
            return Err(e);
        }
        debug!(from = %previous, to = %next, "Link transition");
        self.status_tx.send_replace(self.status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingDriver;

    async fn next_state(monitor: &mut LinkMonitor) -> LinkState {
        monitor.changed().await.expect("supervisor alive").state
    }

    /// Skip snapshots until one matches; the watch channel coalesces bursts.
    async fn until(monitor: &mut LinkMonitor, pred: impl Fn(&LinkState) -> bool) -> LinkState {
        loop {
            let state = next_state(monitor).await;
            if pred(&state) {
                return state;
            }
        }
    }

    fn assert_waited(since: Instant, delay: Duration) {
        let waited = since.elapsed();
        assert!(waited >= delay, "waited {waited:?}, expected {delay:?}");
        assert!(waited < delay + Duration::from_millis(50), "waited {waited:?}, expected {delay:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn starts_idle_and_connects_on_start() {
        let driver = RecordingDriver::new();
        let supervisor = Supervisor::spawn(driver.clone(), BackoffPolicy::default());
        let mut monitor = supervisor.monitor();
        assert_eq!(supervisor.state(), LinkState::Idle);

        supervisor.start();
        assert_eq!(next_state(&mut monitor).await, LinkState::Connecting);
        assert_eq!(driver.connect_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_reported_start_connects_once() {
        let driver = RecordingDriver::new();
        let supervisor = Supervisor::spawn(driver.clone(), BackoffPolicy::default());
        let mut monitor = supervisor.monitor();
        let events = driver.events().expect("driver attached");

        assert!(events.started());
        assert_eq!(next_state(&mut monitor).await, LinkState::Connecting);
        assert_eq!(driver.connect_calls(), 1);

        // A repeated start from the radio is ignored outside idle.
        assert!(events.started());
        events.got_address(Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(next_state(&mut monitor).await, LinkState::Connected);
        assert_eq!(driver.connect_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_waits_long_delay_then_reconnects() {
        let driver = RecordingDriver::new();
        let supervisor = Supervisor::spawn(driver.clone(), BackoffPolicy::default());
        let events = supervisor.events();
        let mut monitor = supervisor.monitor();

        supervisor.start();
        assert_eq!(next_state(&mut monitor).await, LinkState::Connecting);

        events.disconnected(DisconnectReason::AuthFail);
        assert_eq!(
            next_state(&mut monitor).await,
            LinkState::Disconnected { reason: DisconnectReason::AuthFail, attempt: 1 }
        );
        let down_at = Instant::now();
        assert_eq!(driver.connect_calls(), 1);

        assert_eq!(next_state(&mut monitor).await, LinkState::Connecting);
        assert_waited(down_at, BackoffPolicy::DEFAULT_LONG);
        assert_eq!(driver.connect_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn generic_loss_waits_short_delay() {
        let driver = RecordingDriver::new();
        let supervisor = Supervisor::spawn(driver.clone(), BackoffPolicy::default());
        let events = supervisor.events();
        let mut monitor = supervisor.monitor();

        supervisor.start();
        next_state(&mut monitor).await;
        events.got_address(Ipv4Addr::new(192, 168, 4, 2));
        assert_eq!(next_state(&mut monitor).await, LinkState::Connected);
        assert_eq!(monitor.address(), Some(Ipv4Addr::new(192, 168, 4, 2)));

        events.disconnected(DisconnectReason::BeaconTimeout);
        assert!(matches!(next_state(&mut monitor).await, LinkState::Disconnected { attempt: 1, .. }));
        assert_eq!(monitor.address(), None);
        let down_at = Instant::now();

        assert_eq!(next_state(&mut monitor).await, LinkState::Connecting);
        assert_waited(down_at, BackoffPolicy::DEFAULT_SHORT);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_counter_accumulates_and_resets_on_connect() {
        let driver = RecordingDriver::new();
        let supervisor = Supervisor::spawn(driver.clone(), BackoffPolicy::default());
        let events = supervisor.events();
        let mut monitor = supervisor.monitor();

        supervisor.start();
        next_state(&mut monitor).await;

        for expected in 1..=3 {
            events.disconnected(DisconnectReason::NoApFound);
            assert_eq!(
                next_state(&mut monitor).await,
                LinkState::Disconnected { reason: DisconnectReason::NoApFound, attempt: expected }
            );
            assert_eq!(next_state(&mut monitor).await, LinkState::Connecting);
        }
        assert_eq!(driver.connect_calls(), 4);

        events.got_address(Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(next_state(&mut monitor).await, LinkState::Connected);

        events.disconnected(DisconnectReason::BeaconTimeout);
        assert_eq!(
            next_state(&mut monitor).await,
            LinkState::Disconnected { reason: DisconnectReason::BeaconTimeout, attempt: 1 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn flapping_uses_delay_of_latest_reason() {
        let driver = RecordingDriver::new();
        let supervisor = Supervisor::spawn(driver.clone(), BackoffPolicy::default());
        let events = supervisor.events();
        let mut monitor = supervisor.monitor();

        supervisor.start();
        next_state(&mut monitor).await;
        events.disconnected(DisconnectReason::AuthFail);
        next_state(&mut monitor).await;
        assert_eq!(next_state(&mut monitor).await, LinkState::Connecting);

        // Up and immediately down again, delivered in one burst.
        events.got_address(Ipv4Addr::new(10, 0, 0, 2));
        events.disconnected(DisconnectReason::BeaconTimeout);
        let state = until(&mut monitor, |s| matches!(s, LinkState::Disconnected { .. })).await;
        assert_eq!(
            state,
            LinkState::Disconnected { reason: DisconnectReason::BeaconTimeout, attempt: 1 }
        );
        let down_at = Instant::now();

        assert_eq!(next_state(&mut monitor).await, LinkState::Connecting);
        assert_waited(down_at, BackoffPolicy::DEFAULT_SHORT);
        assert_eq!(driver.connect_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_order_events_are_ignored() {
        let driver = RecordingDriver::new();
        let supervisor = Supervisor::spawn(driver.clone(), BackoffPolicy::default());
        let events = supervisor.events();

        // Idle: neither an address nor a disconnect may move the state.
        events.got_address(Ipv4Addr::new(10, 0, 0, 2));
        events.disconnected(DisconnectReason::AuthFail);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(supervisor.state(), LinkState::Idle);
        assert_eq!(driver.connect_calls(), 0);

        let mut monitor = supervisor.monitor();
        supervisor.start();
        next_state(&mut monitor).await;
        events.disconnected(DisconnectReason::AuthFail);
        next_state(&mut monitor).await;

        // Disconnected with a reconnect pending: a second disconnect is stale.
        events.disconnected(DisconnectReason::BeaconTimeout);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            supervisor.state(),
            LinkState::Disconnected { reason: DisconnectReason::AuthFail, attempt: 1 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wait_ready_times_out_while_connecting() {
        let driver = RecordingDriver::new();
        let supervisor = Supervisor::spawn(driver, BackoffPolicy::default());
        supervisor.start();

        let started = Instant::now();
        assert!(!supervisor.wait_ready(Duration::from_secs(30)).await);
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(supervisor.state(), LinkState::Connecting);
        assert!(!supervisor.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_ready_wakes_on_connect() {
        let driver = RecordingDriver::new();
        let supervisor = Supervisor::spawn(driver.clone(), BackoffPolicy::default());
        let events = driver.events().expect("driver attached");
        supervisor.start();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            events.got_address(Ipv4Addr::new(10, 0, 0, 2));
        });

        let started = Instant::now();
        assert!(supervisor.wait_ready(Duration::from_secs(30)).await);
        assert!(started.elapsed() < Duration::from_secs(30));
        assert!(supervisor.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_connect_is_retried() {
        let driver = RecordingDriver::new();
        driver.reject_next_connects(1);
        let supervisor = Supervisor::spawn(driver.clone(), BackoffPolicy::default());
        let mut monitor = supervisor.monitor();

        supervisor.start();
        assert_eq!(
            until(&mut monitor, |s| !matches!(s, LinkState::Connecting)).await,
            LinkState::Disconnected { reason: CONNECT_REJECTED, attempt: 1 }
        );
        assert_eq!(next_state(&mut monitor).await, LinkState::Connecting);
        assert_eq!(driver.connect_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_task() {
        let supervisor = Supervisor::spawn(RecordingDriver::new(), BackoffPolicy::default());
        let mut monitor = supervisor.monitor();
        supervisor.shutdown().await;
        assert!(monitor.changed().await.is_none());
    }
}
