//! Network reachability monitor.
//!
//! Merges two independent signals — push-style reachability notifications
//! from the platform and an on-demand active probe — into a single
//! observable [`ConnectionState`]. The state is held in a `watch` channel:
//! every subscriber immediately sees the current value, then each change.
//!
//! Reconciliation policy:
//! - `Available` → `Connected` immediately (the platform already confirmed)
//! - `Lost` → `Disconnected` immediately
//! - `Losing` / `Unknown` → ambiguous; run the active probe and adopt its
//!   result rather than trusting the signal alone
//!
//! The monitor starts in `Pending` and fires a probe right away so a real
//! answer is available quickly; `Pending` is never re-entered afterwards.

mod probe;

pub use probe::{ReachabilityProbe, TcpProbe};

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Whether the network is currently reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No signal and no probe result yet.
    Pending,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Push-style reachability notification from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachabilitySignal {
    Available,
    Losing,
    Lost,
    Unknown,
}

/// Single source of truth for "can we reach the network".
///
/// The monitor owns the only writer to the state cell; everything else
/// holds read-only [`watch::Receiver`]s obtained from [`subscribe`].
///
/// [`subscribe`]: ConnectivityMonitor::subscribe
pub struct ConnectivityMonitor {
    state: watch::Sender<ConnectionState>,
    probe: Arc<dyn ReachabilityProbe>,
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn ReachabilityProbe>) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::Pending);
        Arc::new(Self { state, probe })
    }

    /// Subscribe to connection state changes. The receiver immediately
    /// holds the current value.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// The most recently published state.
    pub fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn publish(&self, next: ConnectionState) {
        let prev = *self.state.borrow();
        if prev != next {
            info!(from = %prev, to = %next, "connection state changed");
        }
        self.state.send_replace(next);
    }

    /// Run the active probe once and publish the result.
    ///
    /// Concurrent probes are not deduplicated: each caller's probe races
    /// independently and whichever finishes last determines the published
    /// state, even if it started first. Known limitation — probes are
    /// idempotent and short-lived, and the next signal or probe
    /// self-corrects a stale write.
    pub async fn check_connection(&self) -> ConnectionState {
        let next = if self.probe.reachable().await {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        self.publish(next);
        next
    }

    /// Fire-and-forget variant of [`check_connection`] for callers that
    /// must not wait out the probe timeout.
    ///
    /// [`check_connection`]: ConnectivityMonitor::check_connection
    pub fn check_connection_detached(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.check_connection().await;
        });
    }

    /// Fold one platform signal into the state.
    pub fn on_signal(self: &Arc<Self>, signal: ReachabilitySignal) {
        match signal {
            ReachabilitySignal::Available => self.publish(ConnectionState::Connected),
            ReachabilitySignal::Lost => self.publish(ConnectionState::Disconnected),
            ReachabilitySignal::Losing | ReachabilitySignal::Unknown => {
                debug!(signal = ?signal, "ambiguous reachability signal — probing");
                self.check_connection_detached();
            }
        }
    }

    /// Background task: fire an initial probe, then fold push signals into
    /// the state until the sender side of `signals` closes.
    pub fn spawn(self: &Arc<Self>, mut signals: mpsc::Receiver<ReachabilitySignal>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            info!("connectivity monitor started");
            this.check_connection_detached();
            while let Some(signal) = signals.recv().await {
                this.on_signal(signal);
            }
            debug!("reachability signal stream ended");
        })
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    struct FakeProbe {
        reachable: AtomicBool,
        calls: AtomicU32,
    }

    impl FakeProbe {
        fn new(reachable: bool) -> Arc<Self> {
            Arc::new(Self {
                reachable: AtomicBool::new(reachable),
                calls: AtomicU32::new(0),
            })
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReachabilityProbe for FakeProbe {
        async fn reachable(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable.load(Ordering::SeqCst)
        }
    }

    async fn wait_for(
        rx: &mut watch::Receiver<ConnectionState>,
        expected: ConnectionState,
    ) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if *rx.borrow_and_update() == expected {
                    return;
                }
                rx.changed().await.expect("monitor dropped");
            }
        })
        .await
        .expect("state never reached expected value");
    }

    #[tokio::test]
    async fn starts_pending() {
        let monitor = ConnectivityMonitor::new(FakeProbe::new(true));
        assert_eq!(monitor.current(), ConnectionState::Pending);
    }

    #[tokio::test]
    async fn available_signal_connects_without_probing() {
        let probe = FakeProbe::new(false);
        let monitor = ConnectivityMonitor::new(probe.clone());
        monitor.on_signal(ReachabilitySignal::Available);
        assert_eq!(monitor.current(), ConnectionState::Connected);
        assert_eq!(probe.call_count(), 0);
    }

    #[tokio::test]
    async fn lost_signal_disconnects_without_probing() {
        let probe = FakeProbe::new(true);
        let monitor = ConnectivityMonitor::new(probe.clone());
        monitor.on_signal(ReachabilitySignal::Lost);
        assert_eq!(monitor.current(), ConnectionState::Disconnected);
        assert_eq!(probe.call_count(), 0);
    }

    #[tokio::test]
    async fn ambiguous_signal_defers_to_probe() {
        let probe = FakeProbe::new(true);
        let monitor = ConnectivityMonitor::new(probe.clone());
        let mut rx = monitor.subscribe();

        monitor.on_signal(ReachabilitySignal::Unknown);
        wait_for(&mut rx, ConnectionState::Connected).await;
        assert_eq!(probe.call_count(), 1);

        probe.reachable.store(false, Ordering::SeqCst);
        monitor.on_signal(ReachabilitySignal::Losing);
        wait_for(&mut rx, ConnectionState::Disconnected).await;
        assert_eq!(probe.call_count(), 2);
    }

    #[tokio::test]
    async fn new_subscriber_sees_latest_value_immediately() {
        let monitor = ConnectivityMonitor::new(FakeProbe::new(true));
        monitor.on_signal(ReachabilitySignal::Available);

        // Subscribed after the transition — still sees Connected, not Pending.
        let rx = monitor.subscribe();
        assert_eq!(*rx.borrow(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn spawn_probes_immediately_without_any_signal() {
        let probe = FakeProbe::new(true);
        let monitor = ConnectivityMonitor::new(probe.clone());
        let mut rx = monitor.subscribe();

        let (_tx, signals) = mpsc::channel(8);
        monitor.spawn(signals);

        wait_for(&mut rx, ConnectionState::Connected).await;
        assert_eq!(probe.call_count(), 1);
    }

    #[tokio::test]
    async fn check_connection_returns_and_publishes() {
        let probe = FakeProbe::new(false);
        let monitor = ConnectivityMonitor::new(probe);
        let state = monitor.check_connection().await;
        assert_eq!(state, ConnectionState::Disconnected);
        assert_eq!(monitor.current(), ConnectionState::Disconnected);
    }
}
