//! Active reachability probe.
//!
//! A probe answers one question: can we open a TCP connection to a known
//! highly-available host right now? Any failure — refused, DNS, timeout —
//! counts as "no"; the distinction is not surfaced upward.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Raw socket-connect capability supplied by the platform.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns `true` if the probe target was reachable within the bound.
    async fn reachable(&self) -> bool;
}

/// Production probe: a short-lived TCP connection with a bounded timeout.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            timeout,
        }
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(target_addr = %self.addr, error = %e, "reachability probe failed");
                false
            }
            Err(_) => {
                debug!(
                    target_addr = %self.addr,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "reachability probe timed out"
                );
                false
            }
        }
    }
}
