//! Application user accounts managed from the admin screens.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityFilter, EntityId, EntityKind, EntityStore, matches_search};

/// Account role stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    /// Administrator account.
    Admin,
    /// Regular account.
    User,
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    /// Backend id.
    pub id: EntityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Login email.
    pub email: String,
    /// Contact phone.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Account role.
    pub role: AccountRole,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating an account.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Login email.
    pub email: String,
    /// Initial password.
    pub password: String,
    /// Contact phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Account role.
    pub role: AccountRole,
}

impl fmt::Debug for CreateUserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserInput")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"****")
            .field("phone_number", &self.phone_number)
            .field("role", &self.role)
            .finish()
    }
}

/// Partial update of an account; unset fields are left alone.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    /// New given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// New login email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New contact phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// New password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AccountRole>,
}

impl fmt::Debug for UpdateUserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateUserInput")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("role", &self.role)
            .finish()
    }
}

/// List view filter for accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAccountFilter {
    /// Free-text search over names, email, and phone.
    pub search: String,
    /// Exact role.
    pub role: Option<AccountRole>,
}

impl EntityFilter<UserAccount> for UserAccountFilter {
    fn matches(&self, account: &UserAccount) -> bool {
        let searchable = [
            Some(account.first_name.as_str()),
            Some(account.last_name.as_str()),
            Some(account.email.as_str()),
            account.phone_number.as_deref(),
        ];
        matches_search(&self.search, searchable.into_iter().flatten())
            && self.role.is_none_or(|role| account.role == role)
    }
}

/// Sortable account columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAccountSortField {
    /// Family name, then given name.
    Name,
    /// Login email.
    Email,
    /// Creation time.
    CreatedAt,
}

impl Entity for UserAccount {
    const KIND: EntityKind = EntityKind {
        singular: "user",
        plural: "users",
        label: "User",
    };

    type Draft = CreateUserInput;
    type Patch = UpdateUserInput;
    type Filter = UserAccountFilter;
    type SortField = UserAccountSortField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn compare_by(&self, other: &Self, field: UserAccountSortField) -> Ordering {
        match field {
            UserAccountSortField::Name => self
                .last_name
                .cmp(&other.last_name)
                .then_with(|| self.first_name.cmp(&other.first_name)),
            UserAccountSortField::Email => self.email.cmp(&other.email),
            UserAccountSortField::CreatedAt => self.created_at.cmp(&other.created_at),
        }
    }
}

/// Store of user accounts.
pub type UserAccountStore<G> = EntityStore<UserAccount, G>;
