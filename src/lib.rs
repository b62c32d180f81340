//! tether — resilient backend session core.
//!
//! Three layers, each depending on the one below it:
//!
//! 1. [`connectivity`] — a single observable source of truth for "can we
//!    reach the network", merging platform push signals with an active
//!    TCP probe.
//! 2. [`remote`] — turns arbitrary async backend operations into uniform
//!    [`remote::CallResult`] streams, with failure classification,
//!    connectivity re-checks on host-unreachable, and coalesced session
//!    invalidation on 401.
//! 3. [`auth`] — derives the application's [`auth::AuthState`] from the
//!    stored credential, the remote configuration, and the build-number
//!    comparison.
//!
//! A host application constructs a [`Core`], supplies its collaborators
//! (session store, config source, logout endpoint), feeds platform
//! reachability signals in, and subscribes to the two state cells.

pub mod auth;
pub mod config;
pub mod connectivity;
pub mod remote;
pub mod single_flight;
pub mod transport;

pub use config::CoreConfig;

use auth::{ConfigSource, LogoutApi, LogoutCoordinator, SessionResolver, SessionStore};
use connectivity::{ConnectivityMonitor, ReachabilityProbe, ReachabilitySignal, TcpProbe};
use remote::RemoteExecutor;
use std::sync::Arc;
use tokio::sync::mpsc;
use transport::HttpConfigSource;

/// Shared handles wiring the three layers together for a host application.
#[derive(Clone)]
pub struct Core {
    pub config: Arc<CoreConfig>,
    pub connectivity: Arc<ConnectivityMonitor>,
    /// Executor for feature calls — classifies failures and invalidates
    /// the session on 401.
    pub executor: RemoteExecutor,
    pub session: Arc<SessionResolver>,
}

impl Core {
    /// Wire the full stack with the production TCP probe.
    pub fn new(
        config: CoreConfig,
        store: Arc<dyn SessionStore>,
        config_source: Arc<dyn ConfigSource>,
        logout_api: Arc<dyn LogoutApi>,
    ) -> Self {
        let probe: Arc<dyn ReachabilityProbe> = Arc::new(TcpProbe::new(
            &config.probe_host,
            config.probe_port,
            config.probe_timeout(),
        ));
        Self::with_probe(config, probe, store, config_source, logout_api)
    }

    /// Wire the full stack fetching configuration over HTTP from
    /// `{api_base_url}/client/config`.
    pub fn over_http(
        config: CoreConfig,
        store: Arc<dyn SessionStore>,
        logout_api: Arc<dyn LogoutApi>,
    ) -> Self {
        let source = Arc::new(HttpConfigSource::new(&config, Arc::clone(&store)));
        Self::new(config, store, source, logout_api)
    }

    /// Wire the full stack with an injected probe (tests, platforms with
    /// their own socket primitive).
    pub fn with_probe(
        config: CoreConfig,
        probe: Arc<dyn ReachabilityProbe>,
        store: Arc<dyn SessionStore>,
        config_source: Arc<dyn ConfigSource>,
        logout_api: Arc<dyn LogoutApi>,
    ) -> Self {
        let connectivity = ConnectivityMonitor::new(probe);

        // The logout path gets its own executor without an unauthorized
        // handler, so a 401 from the logout call cannot recurse.
        let logout = LogoutCoordinator::new(
            RemoteExecutor::new(Arc::clone(&connectivity)),
            logout_api,
            Arc::clone(&store),
        );
        let executor =
            RemoteExecutor::new(Arc::clone(&connectivity)).with_unauthorized_handler(logout);

        let session = SessionResolver::new(
            executor.clone(),
            store,
            config_source,
            config.running_build,
        );

        Self {
            config: Arc::new(config),
            connectivity,
            executor,
            session,
        }
    }

    /// Start the background tasks: fold platform reachability signals into
    /// the connection state and run the first session evaluation once
    /// connectivity is established.
    pub fn start(&self, signals: mpsc::Receiver<ReachabilitySignal>) {
        self.connectivity.spawn(signals);
        self.session
            .watch_connectivity(self.connectivity.subscribe());
    }
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("connectivity", &self.connectivity)
            .field("session", &self.session)
            .finish()
    }
}
