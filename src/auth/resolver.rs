//! Authorization state resolution.
//!
//! Composes three facts into the current [`AuthState`]: whether a session
//! credential is stored, the outcome of the remote configuration fetch
//! (only attempted when one is), and the comparison between the running
//! build number and the server's minimum.
//!
//! Decision chain, first match wins:
//! 1. no credential → `Unauthorized` (the fetch is not even attempted)
//! 2. fetch in flight → `Init`
//! 3. fetch failed → `ConfigError` (terminal until an explicit retry)
//! 4. `min_build > running_build` and blocked → `Blocked`
//! 5. …and mandatory update → `UpdateRequired`
//! 6. …and optional update → `UpdateAvailable`
//! 7. otherwise → `Authorized`
//!
//! A minimum build equal to or below the running build never triggers the
//! block/update branches, whatever the flags say.

use super::{AuthState, ConfigSnapshot, ConfigSource, RemoteConfig, SessionStore};
use crate::connectivity::ConnectionState;
use crate::remote::{CallResult, RemoteExecutor};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Owns the application's [`AuthState`] as a replay-latest observable.
///
/// Evaluations are serialized: overlapping triggers (connectivity, retry,
/// update-flow completion) run one after another, so a subscriber never
/// observes a partially-applied evaluation.
pub struct SessionResolver {
    state: watch::Sender<AuthState>,
    store: Arc<dyn SessionStore>,
    source: Arc<dyn ConfigSource>,
    executor: RemoteExecutor,
    running_build: u64,
    eval_lock: Mutex<()>,
    last_config: RwLock<Option<ConfigSnapshot>>,
}

impl SessionResolver {
    pub fn new(
        executor: RemoteExecutor,
        store: Arc<dyn SessionStore>,
        source: Arc<dyn ConfigSource>,
        running_build: u64,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(AuthState::Init);
        Arc::new(Self {
            state,
            store,
            source,
            executor,
            running_build,
            eval_lock: Mutex::new(()),
            last_config: RwLock::new(None),
        })
    }

    /// Subscribe to authorization state changes. The receiver immediately
    /// holds the current value.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        *self.state.borrow()
    }

    /// The last successfully fetched configuration, if any.
    pub async fn last_config(&self) -> Option<ConfigSnapshot> {
        self.last_config.read().await.clone()
    }

    /// Whether a server-side feature switch is on, per the last fetched
    /// configuration. Unknown keys and no-config-yet both answer `false`.
    pub async fn feature_enabled(&self, key: &str) -> bool {
        self.last_config
            .read()
            .await
            .as_ref()
            .and_then(|snap| snap.config.features.get(key).copied())
            .unwrap_or(false)
    }

    fn set_state(&self, next: AuthState) {
        let prev = *self.state.borrow();
        if prev != next {
            info!(from = %prev, to = %next, "auth state changed");
        }
        self.state.send_replace(next);
    }

    /// Run the full decision chain. This is also the explicit retry
    /// entrypoint after `ConfigError` or `Blocked`.
    pub async fn refresh(&self) {
        let _guard = self.eval_lock.lock().await;

        let signed_in = self.store.credential().borrow().is_some();
        if !signed_in {
            self.set_state(AuthState::Unauthorized);
            return;
        }

        self.set_state(AuthState::Init);

        let source = Arc::clone(&self.source);
        let handle = self.executor.execute(move || async move { source.fetch().await });
        match handle.terminal().await {
            CallResult::Success(config) => {
                *self.last_config.write().await = Some(ConfigSnapshot {
                    config: config.clone(),
                    fetched_at: Utc::now(),
                });
                let next = self.decide(&config);
                self.set_state(next);
            }
            CallResult::Error(e) => {
                // Terminal until the user retries; no automatic re-fetch.
                warn!(error = %e, "configuration fetch failed");
                self.set_state(AuthState::ConfigError);
            }
            CallResult::InProgress => {
                warn!("configuration fetch ended without a result");
                self.set_state(AuthState::ConfigError);
            }
        }
    }

    fn decide(&self, config: &RemoteConfig) -> AuthState {
        if config.min_build > self.running_build {
            if config.block_app {
                return AuthState::Blocked;
            }
            if config.force_update {
                return AuthState::UpdateRequired;
            }
            if config.flexible_update {
                return AuthState::UpdateAvailable;
            }
        }
        AuthState::Authorized
    }

    /// Resolution of an update flow, trusting the just-made decision
    /// instead of re-fetching configuration: a completed (or dismissed
    /// optional) update moves straight to `Authorized`; an abandoned
    /// mandatory update falls back to `UpdateRequired`.
    pub async fn update_flow_finished(&self, completed: bool) {
        let _guard = self.eval_lock.lock().await;
        let next = if completed {
            AuthState::Authorized
        } else {
            AuthState::UpdateRequired
        };
        self.set_state(next);
    }

    /// Background task: run the first evaluation once connectivity first
    /// reaches `Connected`.
    pub fn watch_connectivity(
        self: &Arc<Self>,
        mut connectivity: watch::Receiver<ConnectionState>,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                if *connectivity.borrow_and_update() == ConnectionState::Connected {
                    break;
                }
                if connectivity.changed().await.is_err() {
                    return;
                }
            }
            debug!("connectivity established — running first session evaluation");
            this.refresh().await;
        })
    }
}

impl std::fmt::Debug for SessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResolver")
            .field("state", &*self.state.borrow())
            .field("running_build", &self.running_build)
            .finish()
    }
}
