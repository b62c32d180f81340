//! Connectivity monitor against real sockets.

mod common;

use common::StaticProbe;
use std::sync::Arc;
use std::time::Duration;
use tether::connectivity::{
    ConnectionState, ConnectivityMonitor, ReachabilitySignal, TcpProbe,
};
use tokio::sync::mpsc;

#[tokio::test]
async fn no_signal_and_no_probe_means_pending() {
    let monitor = ConnectivityMonitor::new(StaticProbe::up());
    assert_eq!(monitor.current(), ConnectionState::Pending);
    assert_eq!(*monitor.subscribe().borrow(), ConnectionState::Pending);
}

#[tokio::test]
async fn probe_against_live_listener_connects() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let probe = Arc::new(TcpProbe::new("127.0.0.1", port, Duration::from_secs(1)));
    let monitor = ConnectivityMonitor::new(probe);

    assert_eq!(monitor.check_connection().await, ConnectionState::Connected);
    assert_eq!(monitor.current(), ConnectionState::Connected);
    drop(listener);
}

#[tokio::test]
async fn probe_against_dead_port_disconnects() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let probe = Arc::new(TcpProbe::new("127.0.0.1", port, Duration::from_secs(1)));
    let monitor = ConnectivityMonitor::new(probe);

    assert_eq!(
        monitor.check_connection().await,
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn late_subscriber_never_sees_pending_after_first_signal() {
    let monitor = ConnectivityMonitor::new(StaticProbe::up());
    monitor.on_signal(ReachabilitySignal::Available);
    monitor.on_signal(ReachabilitySignal::Lost);

    let rx = monitor.subscribe();
    assert_eq!(*rx.borrow(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn signal_stream_drives_state() {
    let probe = StaticProbe::up();
    let monitor = ConnectivityMonitor::new(probe);
    let mut rx = monitor.subscribe();

    let (tx, signals) = mpsc::channel(8);
    monitor.spawn(signals);

    // Initial probe (probe is up) → Connected.
    wait_for(&mut rx, ConnectionState::Connected).await;

    tx.send(ReachabilitySignal::Lost).await.unwrap();
    wait_for(&mut rx, ConnectionState::Disconnected).await;

    tx.send(ReachabilitySignal::Available).await.unwrap();
    wait_for(&mut rx, ConnectionState::Connected).await;
}

async fn wait_for(
    rx: &mut tokio::sync::watch::Receiver<ConnectionState>,
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
    .unwrap_or_else(|_| panic!("state never became {expected}"));
}
