//! Navigation guard combining authentication and role gates.
//!
//! Every navigation runs two checks in order. Authentication failures start
//! the external sign-in flow exactly once and deny; authorization failures
//! redirect silently. Neither produces a notification.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ports::IdentityProvider;
use super::{CapabilityGate, VisibilityRules};

/// Validation errors returned by [`RoutePath::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePathValidationError {
    /// Path did not start with `/`.
    NotAbsolute,
    /// Path contained whitespace.
    ContainsWhitespace,
}

impl fmt::Display for RoutePathValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAbsolute => write!(f, "route path must start with '/'"),
            Self::ContainsWhitespace => write!(f, "route path must not contain whitespace"),
        }
    }
}

impl std::error::Error for RoutePathValidationError {}

/// Absolute in-app route such as `/vehicles/42/edit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutePath(String);

impl RoutePath {
    /// Validate and construct a route path.
    pub fn new(path: impl Into<String>) -> Result<Self, RoutePathValidationError> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(RoutePathValidationError::NotAbsolute);
        }
        if path.chars().any(char::is_whitespace) {
            return Err(RoutePathValidationError::ContainsWhitespace);
        }
        Ok(Self(path))
    }

    /// Path as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// First non-empty path segment, ignoring query and fragment.
    ///
    /// ```
    /// use fleet_console::domain::RoutePath;
    ///
    /// let path = RoutePath::new("/vehicles/42/edit?tab=docs").expect("valid path");
    /// assert_eq!(path.first_segment(), Some("vehicles"));
    /// ```
    pub fn first_segment(&self) -> Option<&str> {
        self.0
            .split(['?', '#'])
            .next()
            .and_then(|path| path.split('/').find(|segment| !segment.is_empty()))
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RoutePath {
    type Error = RoutePathValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoutePath> for String {
    fn from(value: RoutePath) -> Self {
        value.0
    }
}

/// Gate and redirect attached to a top-level route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Role requirement for the route.
    pub gate: CapabilityGate,
    /// Where to send users the gate rejects; the table fallback when unset.
    pub redirect_to: Option<RoutePath>,
}

impl RouteRule {
    /// Rule with the table's fallback redirect.
    pub const fn gated(gate: CapabilityGate) -> Self {
        Self {
            gate,
            redirect_to: None,
        }
    }

    /// Override the redirect target.
    #[must_use]
    pub fn redirecting_to(mut self, path: RoutePath) -> Self {
        self.redirect_to = Some(path);
        self
    }
}

/// Route rules keyed by first path segment.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: HashMap<String, RouteRule>,
    fallback: RoutePath,
}

impl RouteTable {
    /// Table with no rules; every route needs only authentication.
    pub fn new(fallback: RoutePath) -> Self {
        Self {
            rules: HashMap::new(),
            fallback,
        }
    }

    /// Fleet console routes with their role gates.
    pub fn fleet_defaults(fallback: RoutePath) -> Self {
        [
            ("vehicles", VisibilityRules::staff_only()),
            ("maintenance", VisibilityRules::staff_only()),
            ("billing", VisibilityRules::manager_or_admin()),
            ("geofences", VisibilityRules::manager_or_admin()),
            ("drivers", VisibilityRules::manager_or_admin()),
            ("admin", VisibilityRules::admin_only()),
        ]
        .into_iter()
        .fold(Self::new(fallback), |table, (segment, gate)| {
            table.with_rule(segment, RouteRule::gated(gate))
        })
    }

    /// Add or replace the rule for `segment`.
    #[must_use]
    pub fn with_rule(mut self, segment: impl Into<String>, rule: RouteRule) -> Self {
        self.rules.insert(segment.into(), rule);
        self
    }

    /// Rule governing `path`, if any.
    pub fn rule_for(&self, path: &RoutePath) -> Option<&RouteRule> {
        path.first_segment()
            .and_then(|segment| self.rules.get(segment))
    }

    /// Landing route used when a rule has no redirect of its own.
    pub fn fallback(&self) -> &RoutePath {
        &self.fallback
    }
}

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Navigation may proceed.
    Admitted,
    /// The user lacks the required roles; go here instead.
    Redirect(RoutePath),
    /// The session is missing or expired; sign-in has been triggered.
    SignInRequired,
}

/// Guard run on every navigation.
pub struct RouteGuard<P: ?Sized> {
    identity: Arc<P>,
    table: RouteTable,
}

impl<P> RouteGuard<P>
where
    P: IdentityProvider + ?Sized,
{
    /// Create a guard over `identity` using `table`.
    pub fn new(identity: Arc<P>, table: RouteTable) -> Self {
        Self { identity, table }
    }

    /// Route table in use.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Decide whether navigation to `path` may proceed.
    pub async fn check(&self, path: &RoutePath) -> NavigationDecision {
        let session = self
            .identity
            .session()
            .filter(|session| session.is_authenticated());
        let Some(session) = session.filter(|_| !self.identity.token_is_expired()) else {
            debug!(path = %path, "navigation requires sign-in");
            if let Err(err) = self.identity.login().await {
                warn!(path = %path, error = %err, "failed to start sign-in");
            }
            return NavigationDecision::SignInRequired;
        };

        match self.table.rule_for(path) {
            Some(rule) if !rule.gate.is_visible(session.roles()) => {
                let target = rule
                    .redirect_to
                    .clone()
                    .unwrap_or_else(|| self.table.fallback.clone());
                debug!(
                    path = %path,
                    redirect = %target,
                    "navigation redirected by role gate"
                );
                NavigationDecision::Redirect(target)
            }
            _ => NavigationDecision::Admitted,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{IdentityError, MockIdentityProvider};
    use crate::domain::{AccessToken, RoleSet, Session, UserProfile};
    use rstest::{fixture, rstest};

    fn path(raw: &str) -> RoutePath {
        RoutePath::new(raw).expect("valid path")
    }

    fn session_with(roles: &[&str]) -> Session {
        Session::authenticated(
            "user-1",
            RoleSet::new(roles.iter().copied()),
            AccessToken::new("token"),
            UserProfile::default(),
        )
    }

    fn signed_in(roles: &'static [&'static str]) -> MockIdentityProvider {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_session()
            .returning(move || Some(session_with(roles)));
        identity.expect_token_is_expired().return_const(false);
        identity.expect_login().never();
        identity
    }

    #[fixture]
    fn table() -> RouteTable {
        RouteTable::fleet_defaults(path("/dashboard"))
    }

    #[rstest]
    #[case("/billing")]
    #[case("/drivers/7")]
    #[case("/geofences?zone=north")]
    #[tokio::test]
    async fn driver_is_redirected_from_manager_routes(table: RouteTable, #[case] target: &str) {
        let guard = RouteGuard::new(Arc::new(signed_in(&["DRIVER"])), table);
        assert_eq!(
            guard.check(&path(target)).await,
            NavigationDecision::Redirect(path("/dashboard"))
        );
    }

    #[rstest]
    #[case("/vehicles/42/edit")]
    #[case("/maintenance")]
    #[case("/trips")]
    #[case("/unknown-page")]
    #[tokio::test]
    async fn driver_is_admitted_to_staff_and_open_routes(table: RouteTable, #[case] target: &str) {
        let guard = RouteGuard::new(Arc::new(signed_in(&["DRIVER"])), table);
        let decision = guard.check(&path(target)).await;
        assert_eq!(decision, NavigationDecision::Admitted);
    }

    #[rstest]
    #[tokio::test]
    async fn rule_redirect_overrides_fallback(table: RouteTable) {
        let table = table.with_rule(
            "admin",
            RouteRule::gated(VisibilityRules::admin_only()).redirecting_to(path("/profile")),
        );
        let guard = RouteGuard::new(Arc::new(signed_in(&["MANAGER"])), table);
        assert_eq!(
            guard.check(&path("/admin/users")).await,
            NavigationDecision::Redirect(path("/profile"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn missing_session_triggers_sign_in_once(table: RouteTable) {
        let mut identity = MockIdentityProvider::new();
        identity.expect_session().returning(|| None);
        identity.expect_token_is_expired().return_const(false);
        identity.expect_login().times(1).returning(|| Ok(()));
        let guard = RouteGuard::new(Arc::new(identity), table);

        assert_eq!(
            guard.check(&path("/admin")).await,
            NavigationDecision::SignInRequired
        );
    }

    #[rstest]
    #[tokio::test]
    async fn expired_token_triggers_sign_in_even_if_login_fails(table: RouteTable) {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_session()
            .returning(|| Some(session_with(&["ADMIN"])));
        identity.expect_token_is_expired().return_const(true);
        identity
            .expect_login()
            .times(1)
            .returning(|| Err(IdentityError::provider("redirect blocked")));
        let guard = RouteGuard::new(Arc::new(identity), table);

        assert_eq!(
            guard.check(&path("/dashboard")).await,
            NavigationDecision::SignInRequired
        );
    }

    #[rstest]
    #[case("vehicles", RoutePathValidationError::NotAbsolute)]
    #[case("/vehicles list", RoutePathValidationError::ContainsWhitespace)]
    fn route_paths_are_validated(#[case] raw: &str, #[case] expected: RoutePathValidationError) {
        assert_eq!(RoutePath::new(raw).expect_err("invalid path"), expected);
    }

    #[test]
    fn root_path_has_no_segment() {
        assert_eq!(path("/").first_segment(), None);
    }
}
