//! Shared test doubles for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tether::auth::{ConfigSource, Credential, LogoutApi, RemoteConfig, SessionStore};
use tether::connectivity::ReachabilityProbe;
use tether::transport::TransportError;
use tokio::sync::watch;

/// Route tracing output through the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory session store counting `clear_session` calls.
pub struct MemoryStore {
    tx: watch::Sender<Option<Credential>>,
    clear_calls: AtomicU32,
}

impl MemoryStore {
    pub fn signed_in() -> Arc<Self> {
        let (tx, _) = watch::channel(Some(Credential {
            token: "test-token".to_string(),
            account_id: "acct-1".to_string(),
        }));
        Arc::new(Self {
            tx,
            clear_calls: AtomicU32::new(0),
        })
    }

    pub fn signed_out() -> Arc<Self> {
        let (tx, _) = watch::channel(None);
        Arc::new(Self {
            tx,
            clear_calls: AtomicU32::new(0),
        })
    }

    pub fn clear_count(&self) -> u32 {
        self.clear_calls.load(Ordering::SeqCst)
    }

    pub fn has_credential(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn credential(&self) -> watch::Receiver<Option<Credential>> {
        self.tx.subscribe()
    }

    async fn clear_session(&self) {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(None);
    }
}

/// Config source returning a preset result; the result can be swapped
/// between fetches to model a retry succeeding.
pub struct StaticConfigSource {
    result: Mutex<Result<RemoteConfig, TransportError>>,
    fetches: AtomicU32,
}

impl StaticConfigSource {
    pub fn ok(config: RemoteConfig) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(config)),
            fetches: AtomicU32::new(0),
        })
    }

    pub fn err(err: TransportError) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Err(err)),
            fetches: AtomicU32::new(0),
        })
    }

    pub fn set_result(&self, result: Result<RemoteConfig, TransportError>) {
        *self.result.lock().unwrap() = result;
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch(&self) -> Result<RemoteConfig, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
}

/// Logout endpoint counting invocations, optionally slow so that
/// concurrent 401 bursts overlap a single in-flight logout.
pub struct CountingLogoutApi {
    result: Result<(), TransportError>,
    delay_ms: u64,
    calls: AtomicU32,
}

impl CountingLogoutApi {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            result: Ok(()),
            delay_ms: 0,
            calls: AtomicU32::new(0),
        })
    }

    pub fn succeeding_after_ms(delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(()),
            delay_ms,
            calls: AtomicU32::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(TransportError::status(500)),
            delay_ms: 0,
            calls: AtomicU32::new(0),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogoutApi for CountingLogoutApi {
    async fn logout(&self) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.result.clone()
    }
}

/// Probe with a settable answer and an invocation counter.
pub struct StaticProbe {
    reachable: AtomicBool,
    calls: AtomicU32,
}

impl StaticProbe {
    pub fn up() -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(true),
            calls: AtomicU32::new(0),
        })
    }

    pub fn down() -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(false),
            calls: AtomicU32::new(0),
        })
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for StaticProbe {
    async fn reachable(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reachable.load(Ordering::SeqCst)
    }
}

/// A minimal remote config payload.
pub fn remote_config(min_build: u64, block: bool, force: bool, flexible: bool) -> RemoteConfig {
    RemoteConfig {
        min_build,
        block_app: block,
        force_update: force,
        flexible_update: flexible,
        features: Default::default(),
    }
}
