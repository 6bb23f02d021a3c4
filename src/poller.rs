//! Background polling agent
//!
//! The agent runs on its own thread and keeps the registry fresh by asking
//! a [`DataSource`] for value snapshots and process topology.
//!
//! # Cadence
//!
//! Every tick (default 250 ms) issues a value request. Every
//! `topology_every`-th tick (default 5, starting with the first) also issues
//! a topology request, so topology refreshes five times less often than
//! values.
//!
//! # Failure Independence
//!
//! The two requests are handled separately: a failed or rejected topology
//! request never prevents a value snapshot from being applied in the same
//! tick, and vice versa. A disconnected source is skipped silently and
//! retried next tick.
//!
//! # Stopping
//!
//! The loop checks its [`CancelToken`] every tick and sleeps on the token's
//! wake channel, so [`PollerHandle::stop`] returns within one request rather
//! than one full interval.

use crate::config::PollingConfig;
use crate::error::{Result, ScopeError};
use crate::registry::SharedRegistry;
use crate::source::DataSource;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Capacity of the event channel; events are dropped when it is full
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
struct CancelInner {
    cancelled: AtomicBool,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

/// Cooperative cancellation signal shared between a handle and its loop
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                wake_tx,
                wake_rx,
            }),
        }
    }

    /// Request cancellation and wake a sleeping loop
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let _ = self.inner.wake_tx.try_send(());
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`; returns whether cancellation was requested
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        // Woken early only by `cancel`; a timeout is the normal case
        let _ = self.inner.wake_rx.recv_timeout(timeout);
        self.is_cancelled()
    }
}

/// The two request kinds issued against a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Values,
    Topology,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Values => write!(f, "value snapshot"),
            RequestKind::Topology => write!(f, "process topology"),
        }
    }
}

/// Polling statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Ticks executed
    pub ticks: u64,
    /// Ticks skipped because the source was disconnected
    pub skipped_disconnected: u64,
    /// Value requests issued
    pub value_polls: u64,
    /// Value requests that failed or were rejected by the registry
    pub value_failures: u64,
    /// Topology requests issued
    pub topology_polls: u64,
    /// Topology requests that failed
    pub topology_failures: u64,
    /// Events dropped because the event channel was full
    pub dropped_events: u64,
}

/// Events published by the agent for the foreground
#[derive(Debug, Clone, PartialEq)]
pub enum PollerEvent {
    /// Source connectivity changed
    ConnectionChanged(bool),
    /// A request failed; the other request kind is unaffected
    RequestFailed { request: RequestKind, error: String },
    /// Periodic statistics (sent with every topology tick)
    Stats(PollStats),
    /// The agent has stopped
    Stopped(PollStats),
}

/// Feeds a registry from a data source on a fixed cadence
pub struct PollingAgent {
    source: Box<dyn DataSource>,
    registry: SharedRegistry,
    config: PollingConfig,
    /// Ticks on which the source was connected; drives the topology sub-cadence
    connected_ticks: u64,
    connected: bool,
    stats: PollStats,
    event_tx: Sender<PollerEvent>,
    event_rx: Receiver<PollerEvent>,
}

impl PollingAgent {
    /// Create an agent; nothing runs until [`PollingAgent::tick`] or [`PollingAgent::spawn`]
    pub fn new(
        source: Box<dyn DataSource>,
        registry: SharedRegistry,
        config: PollingConfig,
    ) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
        Self {
            source,
            registry,
            config,
            connected_ticks: 0,
            connected: false,
            stats: PollStats::default(),
            event_tx,
            event_rx,
        }
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    /// Receiver for agent events
    pub fn events(&self) -> Receiver<PollerEvent> {
        self.event_rx.clone()
    }

    /// Run one polling cycle
    pub fn tick(&mut self) {
        self.stats.ticks += 1;

        let connected = self.source.is_connected();
        if connected != self.connected {
            self.connected = connected;
            if connected {
                tracing::info!("Data source connected");
            } else {
                tracing::info!("Data source disconnected, polling paused");
            }
            self.emit(PollerEvent::ConnectionChanged(connected));
        }

        if !connected {
            self.stats.skipped_disconnected += 1;
            return;
        }

        let every = u64::from(self.config.topology_every.max(1));
        let topology_due = self.connected_ticks % every == 0;
        self.connected_ticks += 1;

        self.poll_values();
        if topology_due {
            self.poll_topology();
            self.emit(PollerEvent::Stats(self.stats));
        }
    }

    fn poll_values(&mut self) {
        self.stats.value_polls += 1;
        let result = self
            .source
            .fetch_values()
            .and_then(|entries| self.registry.apply_snapshot(entries));
        if let Err(e) = result {
            self.stats.value_failures += 1;
            self.report_failure(RequestKind::Values, e);
        }
    }

    fn poll_topology(&mut self) {
        self.stats.topology_polls += 1;
        match self.source.fetch_topology() {
            Ok(entries) => self.registry.apply_process_info(entries),
            Err(e) => {
                self.stats.topology_failures += 1;
                self.report_failure(RequestKind::Topology, e);
            }
        }
    }

    fn report_failure(&mut self, request: RequestKind, error: ScopeError) {
        tracing::warn!("{} request failed: {}", request, error);
        self.emit(PollerEvent::RequestFailed {
            request,
            error: error.to_string(),
        });
    }

    /// Try to send an event, counting it as dropped if the queue is full
    fn emit(&mut self, event: PollerEvent) {
        if self.event_tx.try_send(event).is_err() {
            self.stats.dropped_events += 1;
        }
    }

    /// Run the polling loop until the token is cancelled
    pub fn run(mut self, token: CancelToken) -> PollStats {
        let interval = self.config.interval();
        tracing::info!(
            "Polling agent started on {} every {:?} (topology every {} ticks)",
            self.source.describe(),
            interval,
            self.config.topology_every
        );

        while !token.is_cancelled() {
            let started = Instant::now();
            self.tick();

            let remaining = interval.saturating_sub(started.elapsed());
            if token.wait_timeout(remaining) {
                break;
            }
        }

        self.emit(PollerEvent::Stopped(self.stats));
        tracing::info!("Polling agent stopped after {} ticks", self.stats.ticks);
        self.stats
    }

    /// Run the polling loop on a dedicated thread
    pub fn spawn(self) -> Result<PollerHandle> {
        let token = CancelToken::new();
        let events = self.events();
        let loop_token = token.clone();
        let join = std::thread::Builder::new()
            .name("scope-poller".to_string())
            .spawn(move || self.run(loop_token))?;

        Ok(PollerHandle {
            token,
            join: Some(join),
            events,
        })
    }
}

/// Handle to a running polling agent
pub struct PollerHandle {
    token: CancelToken,
    join: Option<JoinHandle<PollStats>>,
    events: Receiver<PollerEvent>,
}

impl PollerHandle {
    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<PollerEvent> {
        self.events.try_recv().ok()
    }

    /// Receive all pending events
    pub fn drain(&self) -> Vec<PollerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Stop the agent and wait for its thread
    pub fn stop(mut self) -> Result<PollStats> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<PollStats> {
        self.token.cancel();
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| ScopeError::Channel("polling thread panicked".to_string())),
            None => Ok(PollStats::default()),
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.shutdown();
        }
    }
}
