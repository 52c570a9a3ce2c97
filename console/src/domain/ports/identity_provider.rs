//! Port for the external identity provider.
//!
//! The provider owns the [`Session`]: it creates one on sign-in and drops it
//! on sign-out or a failed refresh. Guards and the refresh task only read it
//! or ask the provider to act.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::{Clock, DefaultClock};

use crate::domain::{AccessToken, RoleSet, Session, UserProfile};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityError {
        /// The provider client has not been initialised.
        NotInitialised => "identity provider is not initialised",
        /// No token is available for the current session.
        NoToken => "no access token available",
        /// The provider rejected or failed a token refresh.
        RefreshFailed { message: String } => "token refresh failed: {message}",
        /// Any other provider-side failure.
        Provider { message: String } => "identity provider error: {message}",
    }
}

/// Identity boundary consulted by guards, the transport, and token refresh.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Initialise the provider client; returns whether a user is signed in.
    async fn init(&self) -> Result<bool, IdentityError>;

    /// Start the external sign-in flow.
    async fn login(&self) -> Result<(), IdentityError>;

    /// Sign out and drop the session.
    async fn logout(&self) -> Result<(), IdentityError>;

    /// Current bearer token.
    ///
    /// Fails with [`IdentityError::NoToken`] when no session is held.
    async fn valid_token(&self) -> Result<AccessToken, IdentityError>;

    /// Whether the held token has expired.
    fn token_is_expired(&self) -> bool;

    /// Refresh the token if it expires within `min_validity`.
    ///
    /// Returns whether a new token was issued.
    async fn refresh(&self, min_validity: Duration) -> Result<bool, IdentityError>;

    /// Snapshot of the current session, if any.
    fn session(&self) -> Option<Session>;
}

/// Fixed identity used when the development identity is enabled.
pub const DEVELOPMENT_USER_ID: &str = "dev-user-123";

/// Lifetime in seconds granted to fixture tokens on refresh.
const FIXTURE_TOKEN_LIFETIME_SECS: i64 = 300;

/// In-memory identity provider for development and tests.
///
/// Sign-in triggers are counted rather than redirecting anywhere. A
/// development fixture restores its profile on `login`; other fixtures stay
/// signed out until a session is installed with [`Self::sign_in`].
pub struct FixtureIdentityProvider {
    session: Mutex<Option<Session>>,
    restore_on_login: Option<Session>,
    refresh_failure: Mutex<Option<String>>,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    clock: Arc<dyn Clock>,
}

impl FixtureIdentityProvider {
    fn with_state(session: Option<Session>, restore_on_login: Option<Session>) -> Self {
        Self {
            session: Mutex::new(session),
            restore_on_login,
            refresh_failure: Mutex::new(None),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            clock: Arc::new(DefaultClock),
        }
    }

    /// Provider with no session.
    pub fn signed_out() -> Self {
        Self::with_state(None, None)
    }

    /// Provider holding `session`.
    pub fn signed_in(session: Session) -> Self {
        Self::with_state(Some(session), None)
    }

    /// Provider holding a fixed development profile with admin and manager
    /// roles.
    pub fn development() -> Self {
        let session = development_session();
        Self::with_state(Some(session.clone()), Some(session))
    }

    /// Replace the clock used for token expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Make every later refresh fail with `message`.
    pub fn fail_refresh(&self, message: impl Into<String>) {
        *self
            .refresh_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    /// Install a session as if the user had signed in.
    pub fn sign_in(&self, session: Session) {
        *self.lock_session() = Some(session);
    }

    /// Number of times the sign-in flow was triggered.
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Number of refresh attempts.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn development_session() -> Session {
    Session::authenticated(
        DEVELOPMENT_USER_ID,
        RoleSet::new(["ADMIN", "MANAGER"]),
        AccessToken::new("dev-token"),
        UserProfile {
            username: "dev-user".to_owned(),
            email: Some("dev@example.com".to_owned()),
            first_name: Some("Dev".to_owned()),
            last_name: Some("User".to_owned()),
        },
    )
}

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn init(&self) -> Result<bool, IdentityError> {
        Ok(self
            .lock_session()
            .as_ref()
            .is_some_and(Session::is_authenticated))
    }

    async fn login(&self) -> Result<(), IdentityError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(session) = self.restore_on_login.clone() {
            *self.lock_session() = Some(session);
        }
        Ok(())
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        self.lock_session().take();
        Ok(())
    }

    async fn valid_token(&self) -> Result<AccessToken, IdentityError> {
        self.lock_session()
            .as_ref()
            .filter(|session| session.is_authenticated())
            .map(|session| session.token().clone())
            .ok_or_else(IdentityError::no_token)
    }

    fn token_is_expired(&self) -> bool {
        let now = self.clock.utc();
        self.lock_session()
            .as_ref()
            .is_some_and(|session| session.is_expired_at(now))
    }

    async fn refresh(&self, min_validity: Duration) -> Result<bool, IdentityError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self
            .refresh_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut guard = self.lock_session();
        if let Some(message) = failure {
            guard.take();
            return Err(IdentityError::refresh_failed(message));
        }
        let min_validity = TimeDelta::from_std(min_validity)
            .map_err(|err| IdentityError::provider(err.to_string()))?;
        let Some(session) = guard.take() else {
            return Err(IdentityError::no_token());
        };

        let now = self.clock.utc();
        let needs_refresh = session
            .expires_at()
            .is_some_and(|expiry| expiry - now < min_validity);
        let session = if needs_refresh {
            session.expiring_at(now + TimeDelta::seconds(FIXTURE_TOKEN_LIFETIME_SECS))
        } else {
            session
        };
        *guard = Some(session);
        Ok(needs_refresh)
    }

    fn session(&self) -> Option<Session> {
        self.lock_session().clone()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::test_support::MutableClock;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    #[rstest]
    #[case(FixtureIdentityProvider::signed_out(), false)]
    #[case(FixtureIdentityProvider::development(), true)]
    #[tokio::test]
    async fn init_reports_signed_in_state(
        #[case] provider: FixtureIdentityProvider,
        #[case] expected: bool,
    ) {
        assert_eq!(provider.init().await.expect("init succeeds"), expected);
    }

    #[tokio::test]
    async fn signed_out_provider_has_no_token() {
        let provider = FixtureIdentityProvider::signed_out();
        let err = provider.valid_token().await.expect_err("no token");
        assert!(err.is_no_token());
    }

    #[tokio::test]
    async fn development_login_restores_profile_and_counts_calls() {
        let provider = FixtureIdentityProvider::development();
        provider.logout().await.expect("logout succeeds");
        assert!(provider.session().is_none());

        provider.login().await.expect("login succeeds");
        let session = provider.session().expect("session restored");
        assert_eq!(session.user_id(), DEVELOPMENT_USER_ID);
        assert!(session.roles().is_admin());
        assert_eq!(provider.login_calls(), 1);
    }

    #[tokio::test]
    async fn refresh_extends_tokens_close_to_expiry() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid instant");
        let clock = Arc::new(MutableClock::new(now));
        let session = development_session().expiring_at(now + TimeDelta::seconds(20));
        let provider = FixtureIdentityProvider::signed_in(session).with_clock(clock.clone());

        let refreshed = provider
            .refresh(Duration::from_secs(60))
            .await
            .expect("refresh succeeds");
        assert!(refreshed);
        clock.advance_seconds(120);
        assert!(!provider.token_is_expired());
        clock.advance_seconds(300);
        assert!(provider.token_is_expired());
    }

    #[tokio::test]
    async fn failed_refresh_drops_session() {
        let provider = FixtureIdentityProvider::development();
        provider.fail_refresh("refresh token revoked");
        let err = provider
            .refresh(Duration::from_secs(60))
            .await
            .expect_err("refresh fails");
        assert_eq!(
            err.to_string(),
            "token refresh failed: refresh token revoked"
        );
        assert!(provider.session().is_none());
    }
}
