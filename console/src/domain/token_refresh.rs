//! Periodic token refresh as a cancellable background task.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::ports::IdentityProvider;

/// Default delay between refresh attempts.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Default minimum remaining token lifetime before a refresh is requested.
pub const DEFAULT_MIN_VALIDITY: Duration = Duration::from_secs(60);

/// Timing for the refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRefreshPolicy {
    /// Delay between attempts.
    pub interval: Duration,
    /// Minimum remaining validity passed to the provider.
    pub min_validity: Duration,
}

impl Default for TokenRefreshPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            min_validity: DEFAULT_MIN_VALIDITY,
        }
    }
}

/// Spawns the refresh loop.
pub struct TokenRefreshTask;

impl TokenRefreshTask {
    /// Start refreshing on the current tokio runtime.
    ///
    /// The first attempt happens one `interval` after spawning. Ticks with
    /// no session are skipped, so a signed-out user is never pushed into
    /// the sign-in flow. A failed refresh is logged and triggers sign-in
    /// once; the loop keeps running so a later sign-in is picked up.
    pub fn spawn(
        identity: Arc<dyn IdentityProvider>,
        policy: TokenRefreshPolicy,
    ) -> TokenRefreshHandle {
        let handle = tokio::spawn(async move {
            let start = time::Instant::now() + policy.interval;
            let mut ticker = time::interval_at(start, policy.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if identity.session().is_none() {
                    debug!("no session; skipping token refresh");
                    continue;
                }
                refresh_once(identity.as_ref(), policy.min_validity).await;
            }
        });
        info!(
            interval_secs = policy.interval.as_secs(),
            "token refresh task started"
        );
        TokenRefreshHandle { handle }
    }

    /// Start refreshing only when `identity` already holds a session.
    pub fn spawn_if_signed_in(
        identity: Arc<dyn IdentityProvider>,
        policy: TokenRefreshPolicy,
    ) -> Option<TokenRefreshHandle> {
        if identity.session().is_none() {
            info!("not signed in; token refresh not started");
            return None;
        }
        Some(Self::spawn(identity, policy))
    }
}

async fn refresh_once(identity: &dyn IdentityProvider, min_validity: Duration) {
    match identity.refresh(min_validity).await {
        Ok(true) => debug!("access token refreshed"),
        Ok(false) => {}
        Err(err) => {
            warn!(error = %err, "token refresh failed; starting sign-in");
            if let Err(login_err) = identity.login().await {
                warn!(
                    error = %login_err,
                    "failed to start sign-in after refresh failure"
                );
            }
        }
    }
}

/// Owner of a running refresh loop; dropping it stops the loop.
#[derive(Debug)]
pub struct TokenRefreshHandle {
    handle: JoinHandle<()>,
}

impl TokenRefreshHandle {
    /// Stop the loop.
    pub fn cancel(self) {
        drop(self);
    }

    /// Whether the loop has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TokenRefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
