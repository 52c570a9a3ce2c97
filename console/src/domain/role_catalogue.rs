//! Display rules for role names.
//!
//! Identity providers hand out a number of housekeeping roles (offline
//! access, account management) alongside the application roles. The
//! catalogue is an explicit table from role name to label and a
//! `displayable` flag; roles missing from the table are shown under their
//! own name.

use std::collections::HashMap;

use super::{Role, RoleSet};

/// Provider housekeeping roles hidden from profile badges by default.
const PROVIDER_ROLES: [&str; 14] = [
    "default-roles-smart-street",
    "offline_access",
    "uma_authorization",
    "account",
    "realm_management",
    "manage-account",
    "manage-account-links",
    "view-profile",
    "delete-account",
    "view-applications",
    "view-consent",
    "manage-consent",
    "view-groups",
    "edit_profile",
];

/// How a single role is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDisplay {
    label: String,
    displayable: bool,
}

impl RoleDisplay {
    /// Human readable label.
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Whether the role is shown in role lists.
    pub fn is_displayable(&self) -> bool {
        self.displayable
    }
}

/// Table of role labels and visibility flags.
///
/// # Examples
/// ```
/// use fleet_console::domain::{RoleCatalogue, RoleSet};
///
/// let catalogue = RoleCatalogue::default();
/// let roles = RoleSet::new(["offline_access", "MANAGER"]);
/// assert_eq!(catalogue.display_names(&roles), vec!["Manager"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCatalogue {
    entries: HashMap<String, RoleDisplay>,
}

impl RoleCatalogue {
    /// Catalogue with no entries; every role displays as itself.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add or replace a displayable role with a label.
    #[must_use]
    pub fn with_label(mut self, role: impl Into<String>, label: impl Into<String>) -> Self {
        self.entries.insert(
            role.into(),
            RoleDisplay {
                label: label.into(),
                displayable: true,
            },
        );
        self
    }

    /// Mark a role as hidden from role lists.
    #[must_use]
    pub fn hidden(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        self.entries.insert(
            role.clone(),
            RoleDisplay {
                label: role,
                displayable: false,
            },
        );
        self
    }

    /// Look up the display entry for `role`.
    pub fn entry(&self, role: &str) -> Option<&RoleDisplay> {
        self.entries.get(role)
    }

    /// Label for `role`, falling back to the role string itself.
    pub fn display_name<'a>(&'a self, role: &'a str) -> &'a str {
        self.entry(role).map_or(role, RoleDisplay::label)
    }

    /// Whether `role` is shown; unknown roles are.
    pub fn is_displayable(&self, role: &str) -> bool {
        self.entry(role).is_none_or(RoleDisplay::is_displayable)
    }

    /// Displayable roles of `roles`, in provider order.
    pub fn display_roles<'a>(&self, roles: &'a RoleSet) -> Vec<&'a str> {
        roles
            .iter()
            .filter(|role| self.is_displayable(role))
            .collect()
    }

    /// Labels of the displayable roles of `roles`.
    pub fn display_names<'a>(&'a self, roles: &'a RoleSet) -> Vec<&'a str> {
        roles
            .iter()
            .filter(|role| self.is_displayable(role))
            .map(|role| self.display_name(role))
            .collect()
    }

    /// Labels of every role in `roles`, hidden ones included.
    pub fn all_display_names<'a>(&'a self, roles: &'a RoleSet) -> Vec<&'a str> {
        roles.iter().map(|role| self.display_name(role)).collect()
    }
}

impl Default for RoleCatalogue {
    fn default() -> Self {
        let labelled = Self::empty()
            .with_label(Role::Admin.as_str(), "Administrator")
            .with_label(Role::Manager.as_str(), "Manager")
            .with_label(Role::Driver.as_str(), "Driver")
            .with_label(Role::User.as_str(), "User");
        PROVIDER_ROLES
            .into_iter()
            .fold(labelled, |catalogue, role| catalogue.hidden(role))
    }
}
