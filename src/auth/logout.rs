//! Coalesced logout on credential rejection.
//!
//! When the server answers 401, every in-flight call reports it — several
//! at once after a token expires. The coordinator funnels all of them
//! through a single-flight guard: one logout call, one session clear,
//! no matter how many 401s land together.

use super::{LogoutApi, SessionStore};
use crate::remote::{CallResult, RemoteExecutor, UnauthorizedHandler};
use crate::single_flight::SingleFlight;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// The provided [`UnauthorizedHandler`]: issues the logout call through
/// the executor and clears the stored session only when it succeeds.
///
/// Built with its own executor that has no unauthorized handler, so a 401
/// from the logout call itself cannot recurse into another logout.
pub struct LogoutCoordinator {
    executor: RemoteExecutor,
    api: Arc<dyn LogoutApi>,
    store: Arc<dyn SessionStore>,
    flight: SingleFlight<bool>,
}

impl LogoutCoordinator {
    pub fn new(
        executor: RemoteExecutor,
        api: Arc<dyn LogoutApi>,
        store: Arc<dyn SessionStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            executor,
            api,
            store,
            flight: SingleFlight::new(),
        })
    }
}

#[async_trait]
impl UnauthorizedHandler for LogoutCoordinator {
    async fn on_unauthorized(&self) {
        let cleared = self
            .flight
            .run(|| {
                let executor = self.executor.clone();
                let api = Arc::clone(&self.api);
                let store = Arc::clone(&self.store);
                async move {
                    warn!("session rejected by server — logging out");
                    let handle = executor.execute(move || async move { api.logout().await });
                    match handle.terminal().await {
                        CallResult::Success(()) => {
                            store.clear_session().await;
                            info!("session cleared after logout");
                            true
                        }
                        CallResult::Error(e) => {
                            warn!(error = %e, "logout call failed — session left intact");
                            false
                        }
                        // The call task died before publishing a terminal
                        // result; treat it like a failed logout.
                        CallResult::InProgress => false,
                    }
                }
            })
            .await;

        if !cleared {
            warn!("unauthorized handling finished without clearing the session");
        }
    }
}

impl std::fmt::Debug for LogoutCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogoutCoordinator")
            .field("flight", &self.flight)
            .finish()
    }
}
