//! Role names, role sets, and primary-role resolution.
//!
//! Role strings come verbatim from the identity provider and are compared
//! case-sensitively. [`RoleSet`] keeps them in provider order with
//! duplicates removed so "first role" fallbacks stay deterministic for a
//! given token.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known application roles, highest privilege first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Fleet and billing management.
    Manager,
    /// Vehicle operator.
    Driver,
    /// Regular customer account.
    User,
}

impl Role {
    /// Precedence used when picking a primary role.
    pub const PRIORITY: [Self; 4] = [Self::Admin, Self::Manager, Self::Driver, Self::User];

    /// Staff roles (everyone except regular users).
    pub const STAFF: [Self; 3] = [Self::Admin, Self::Manager, Self::Driver];

    /// Role string as issued by the identity provider.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Manager => "MANAGER",
            Self::Driver => "DRIVER",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Ordered, de-duplicated set of role strings held by a user.
///
/// ## Invariants
/// - No role appears twice.
/// - Blank role strings are dropped on construction.
///
/// # Examples
/// ```
/// use fleet_console::domain::RoleSet;
///
/// let roles = RoleSet::new(["USER", "DRIVER", "ADMIN", "USER"]);
/// assert_eq!(roles.len(), 3);
/// assert_eq!(roles.primary_role(), Some("ADMIN"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RoleSet(Vec<String>);

impl RoleSet {
    /// Build a role set from provider-issued role strings.
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for role in roles {
            let role = role.into();
            if role.trim().is_empty() || unique.contains(&role) {
                continue;
            }
            unique.push(role);
        }
        Self(unique)
    }

    /// Role set with no roles.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the set holds `role` (exact, case-sensitive match).
    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|held| held == role)
    }

    /// Whether the set holds the well-known `role`.
    pub fn has(&self, role: Role) -> bool {
        self.contains(role.as_str())
    }

    /// Whether the set holds at least one of `roles`.
    pub fn has_any<I, S>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles.into_iter().any(|role| self.contains(role.as_ref()))
    }

    /// Whether the set holds every one of `roles`.
    pub fn has_all<I, S>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles.into_iter().all(|role| self.contains(role.as_ref()))
    }

    /// Iterate over the held roles in provider order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of distinct roles held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no roles are held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest-priority role for display purposes.
    ///
    /// Scans [`Role::PRIORITY`] first. When none of the well-known roles is
    /// held, falls back to the first role in provider order, and to `None`
    /// for an empty set.
    pub fn primary_role(&self) -> Option<&str> {
        Role::PRIORITY
            .iter()
            .find(|role| self.has(**role))
            .map(|role| role.as_str())
            .or_else(|| self.0.first().map(String::as_str))
    }

    /// Holder is an administrator.
    pub fn is_admin(&self) -> bool {
        self.has(Role::Admin)
    }

    /// Holder is a manager or an administrator.
    pub fn is_manager_or_admin(&self) -> bool {
        self.has_any([Role::Manager, Role::Admin])
    }

    /// Holder is a driver.
    pub fn is_driver(&self) -> bool {
        self.has(Role::Driver)
    }

    /// Holder is staff: admin, manager, or driver.
    pub fn is_staff(&self) -> bool {
        self.has_any(Role::STAFF)
    }

    /// Holder is a regular user with no staff role.
    pub fn is_user(&self) -> bool {
        self.has(Role::User) && !self.is_staff()
    }
}

impl From<Vec<String>> for RoleSet {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<RoleSet> for Vec<String> {
    fn from(value: RoleSet) -> Self {
        value.0
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}
