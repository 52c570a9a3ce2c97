//! Capability gates and role-based visibility rules.
//!
//! A [`CapabilityGate`] is immutable configuration attached to a route or a
//! UI element. Evaluation is a pure function of the gate and the user's
//! [`RoleSet`]; there are no error cases.

use serde::{Deserialize, Serialize};

use super::{Role, RoleSet};

/// Role requirements attached to a route or UI element.
///
/// ## Invariants
/// - `denied_roles` take precedence over `allowed_roles`.
/// - A gate with neither list configured evaluates to
///   `fallback_when_unconfigured`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityGate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allowed_roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    denied_roles: Option<Vec<String>>,
    #[serde(default)]
    require_all: bool,
    #[serde(default)]
    fallback_when_unconfigured: bool,
}

impl CapabilityGate {
    /// Gate with no role lists that resolves to `fallback`.
    pub const fn unconfigured(fallback: bool) -> Self {
        Self {
            allowed_roles: None,
            denied_roles: None,
            require_all: false,
            fallback_when_unconfigured: fallback,
        }
    }

    /// Gate admitting holders of any of `roles`.
    pub fn allow<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::unconfigured(false).with_allowed(roles)
    }

    /// Gate rejecting holders of any of `roles` and admitting everyone else.
    pub fn deny<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::unconfigured(true).with_denied(roles)
    }

    /// Replace the allow-list.
    #[must_use]
    pub fn with_allowed<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_roles = Some(roles.into_iter().map(|r| r.as_ref().to_owned()).collect());
        self
    }

    /// Replace the deny-list.
    #[must_use]
    pub fn with_denied<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.denied_roles = Some(roles.into_iter().map(|r| r.as_ref().to_owned()).collect());
        self
    }

    /// Require every allowed role instead of any one of them.
    #[must_use]
    pub const fn requiring_all(mut self) -> Self {
        self.require_all = true;
        self
    }

    /// Set the result used when no role list applies.
    #[must_use]
    pub const fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback_when_unconfigured = fallback;
        self
    }

    /// Allowed roles, if configured.
    pub fn allowed_roles(&self) -> Option<&[String]> {
        self.allowed_roles.as_deref()
    }

    /// Denied roles, if configured.
    pub fn denied_roles(&self) -> Option<&[String]> {
        self.denied_roles.as_deref()
    }

    /// Whether every allowed role is required.
    pub const fn require_all(&self) -> bool {
        self.require_all
    }

    /// Result used when no role list applies.
    pub const fn fallback_when_unconfigured(&self) -> bool {
        self.fallback_when_unconfigured
    }

    /// Evaluate the gate against a user's roles.
    ///
    /// # Examples
    /// ```
    /// use fleet_console::domain::{CapabilityGate, RoleSet};
    ///
    /// let gate = CapabilityGate::allow(["MANAGER", "ADMIN"]);
    /// assert!(!gate.is_visible(&RoleSet::new(["DRIVER"])));
    /// assert!(gate.is_visible(&RoleSet::new(["ADMIN"])));
    /// ```
    pub fn is_visible(&self, roles: &RoleSet) -> bool {
        if self.allowed_roles.is_none() && self.denied_roles.is_none() {
            return self.fallback_when_unconfigured;
        }

        if let Some(denied) = self.denied_roles.as_deref()
            && roles.has_any(denied)
        {
            return false;
        }

        match self.allowed_roles.as_deref() {
            Some(allowed) if !allowed.is_empty() => {
                if self.require_all {
                    roles.has_all(allowed)
                } else {
                    roles.has_any(allowed)
                }
            }
            _ => self.fallback_when_unconfigured,
        }
    }
}

/// Evaluate `gate` against `roles`.
pub fn is_visible(gate: &CapabilityGate, roles: &RoleSet) -> bool {
    gate.is_visible(roles)
}

/// Keep the items whose gate admits `roles`, preserving order.
///
/// Items for which `gate_of` returns `None` carry no restriction and are
/// always kept.
pub fn filter_by_visibility<T, F>(items: Vec<T>, roles: &RoleSet, mut gate_of: F) -> Vec<T>
where
    F: FnMut(&T) -> Option<&CapabilityGate>,
{
    items
        .into_iter()
        .filter(|item| gate_of(item).is_none_or(|gate| gate.is_visible(roles)))
        .collect()
}

/// Predefined gates shared by routes and navigation menus.
pub struct VisibilityRules;

impl VisibilityRules {
    /// Administrators only.
    pub fn admin_only() -> CapabilityGate {
        CapabilityGate::allow([Role::Admin])
    }

    /// Managers and administrators.
    pub fn manager_or_admin() -> CapabilityGate {
        CapabilityGate::allow([Role::Manager, Role::Admin])
    }

    /// Drivers only.
    pub fn driver_only() -> CapabilityGate {
        CapabilityGate::allow([Role::Driver])
    }

    /// Administrators, managers, and drivers.
    pub fn staff_only() -> CapabilityGate {
        CapabilityGate::allow(Role::STAFF)
    }

    /// Regular users only.
    pub fn user_only() -> CapabilityGate {
        CapabilityGate::allow([Role::User])
    }

    /// Everyone except holders of `USER`.
    pub fn not_user() -> CapabilityGate {
        CapabilityGate::deny([Role::User])
    }

    /// Any authenticated user.
    pub const fn authenticated_only() -> CapabilityGate {
        CapabilityGate::unconfigured(true)
    }

    /// No restriction.
    pub const fn public() -> CapabilityGate {
        CapabilityGate::unconfigured(true)
    }
}

/// Navigation menu entry with an optional visibility gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    /// Label shown in the menu.
    pub label: String,
    /// Stable key used for selection state.
    pub key: String,
    /// Target route path.
    pub route: String,
    /// Icon name.
    pub icon: String,
    /// Optional badge text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Gate deciding whether the entry is shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<CapabilityGate>,
}

impl NavItem {
    /// Ungated entry whose key is also its route segment.
    pub fn new(label: &str, key: &str, icon: &str) -> Self {
        Self {
            label: label.to_owned(),
            key: key.to_owned(),
            route: format!("/{key}"),
            icon: icon.to_owned(),
            badge: None,
            visibility: None,
        }
    }

    /// Attach a visibility gate.
    #[must_use]
    pub fn gated(mut self, gate: CapabilityGate) -> Self {
        self.visibility = Some(gate);
        self
    }

    /// The console's main menu. Ungated entries are open to every
    /// signed-in user.
    pub fn fleet_menu() -> Vec<Self> {
        vec![
            Self::new("Dashboard", "dashboard", "dashboard"),
            Self::new("Vehicles", "vehicles", "directions_car")
                .gated(VisibilityRules::staff_only()),
            Self::new("Trips", "trips", "map"),
            Self::new("Billing", "billing", "receipt")
                .gated(VisibilityRules::manager_or_admin()),
            Self::new("Geofences", "geofences", "location_on")
                .gated(VisibilityRules::manager_or_admin()),
            Self::new("Maintenance", "maintenance", "build")
                .gated(VisibilityRules::staff_only()),
            Self::new("Notifications", "notifications", "notifications"),
            Self::new("Drivers", "drivers", "person_pin")
                .gated(VisibilityRules::manager_or_admin()),
            Self::new("Profile", "profile", "person"),
            Self::new("Admin", "admin", "admin_panel_settings")
                .gated(VisibilityRules::admin_only()),
        ]
    }

    /// Menu entries visible to `roles`, in menu order.
    pub fn visible_for(items: Vec<Self>, roles: &RoleSet) -> Vec<Self> {
        filter_by_visibility(items, roles, |item| item.visibility.as_ref())
    }
}
