//! Authenticated session state owned by the identity boundary.
//!
//! Guards and the role resolver only read sessions; they are created on
//! sign-in and dropped on sign-out or a failed token refresh.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::RoleSet;

/// Bearer token held in memory that is wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wrap a raw bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// Expose the raw token for an `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

/// Profile details reported by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Login name.
    pub username: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserProfile {
    /// "First Last" when both names are known, else the username.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_owned(),
            (None, Some(last)) => last.to_owned(),
            (None, None) => self.username.clone(),
        }
    }
}

/// Snapshot of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
    roles: RoleSet,
    token: AccessToken,
    authenticated: bool,
    expires_at: Option<DateTime<Utc>>,
    profile: UserProfile,
}

impl Session {
    /// Build an authenticated session.
    pub fn authenticated(
        user_id: impl Into<String>,
        roles: RoleSet,
        token: AccessToken,
        profile: UserProfile,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
            token,
            authenticated: true,
            expires_at: None,
            profile,
        }
    }

    /// Attach a token expiry instant.
    #[must_use]
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Mark the session as no longer authenticated.
    #[must_use]
    pub fn revoked(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Provider subject identifier.
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Roles granted by the provider.
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Bearer token.
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// Whether the provider still considers the user signed in.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Token expiry, when the provider reported one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    /// Profile details.
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }
}
