//! Shared shape of the records held by entity stores.
//!
//! Every record carries a backend-assigned [`EntityId`]. The [`Entity`]
//! trait ties a record to its labels, its create and update payloads, and
//! the filter state its list view uses.

use std::cmp::Ordering;
use std::fmt;

use pagination::SortDirection;
use serde::{Deserialize, Serialize};

/// Validation errors returned by [`EntityId::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityIdValidationError {
    /// Identifier was empty or whitespace.
    Empty,
    /// Identifier had leading or trailing whitespace.
    Padded,
}

impl fmt::Display for EntityIdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "entity id must not be empty"),
            Self::Padded => write!(f, "entity id must not have surrounding whitespace"),
        }
    }
}

impl std::error::Error for EntityIdValidationError {}

/// Stable, backend-assigned identifier of an entity.
///
/// ## Invariants
/// - Non-empty.
/// - No leading or trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Validate and construct an [`EntityId`].
    ///
    /// # Examples
    /// ```
    /// use fleet_console::domain::EntityId;
    ///
    /// let id = EntityId::new("veh-42").expect("valid id");
    /// assert_eq!(id.as_ref(), "veh-42");
    /// assert!(EntityId::new("  ").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self, EntityIdValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EntityIdValidationError::Empty);
        }
        if id.trim() != id {
            return Err(EntityIdValidationError::Padded);
        }
        Ok(Self(id))
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

/// Names used for operation keys and user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityKind {
    /// Lower-case singular, used in operation keys (`vehicle`).
    pub singular: &'static str,
    /// Lower-case plural, used in operation keys and messages (`vehicles`).
    pub plural: &'static str,
    /// Capitalised singular used at the start of messages (`Vehicle`).
    pub label: &'static str,
}

/// Filter state for one entity's list view.
pub trait EntityFilter<E>: Clone + Default + PartialEq + Send + Sync + 'static {
    /// Whether `entity` passes every configured criterion.
    fn matches(&self, entity: &E) -> bool;

    /// Whether no criterion is configured.
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Record managed by an entity store.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Labels for keys and messages.
    const KIND: EntityKind;

    /// Payload sent to create a record.
    type Draft: Serialize + Clone + Send + Sync + 'static;

    /// Payload sent to update a record.
    type Patch: Serialize + Clone + Send + Sync + 'static;

    /// Filter state for the list view.
    type Filter: EntityFilter<Self>;

    /// Columns the list view can sort by.
    type SortField: Copy + fmt::Debug + Send + Sync + 'static;

    /// Backend-assigned identifier.
    fn id(&self) -> &EntityId;

    /// Ascending comparison on `field`.
    fn compare_by(&self, other: &Self, field: Self::SortField) -> Ordering;
}

/// Column and direction selected for a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    /// Column to sort by.
    pub field: F,
    /// Direction to apply.
    pub direction: SortDirection,
}

impl<F> Sort<F> {
    /// Ascending sort on `field`.
    pub const fn asc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    /// Descending sort on `field`.
    pub const fn desc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// Case-insensitive substring match used by list view search boxes.
///
/// An empty or whitespace term matches everything.
pub fn matches_search<'a, I>(term: &str, fields: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields
        .into_iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", EntityIdValidationError::Empty)]
    #[case("   ", EntityIdValidationError::Empty)]
    #[case(" veh-1", EntityIdValidationError::Padded)]
    fn rejects_invalid_ids(#[case] raw: &str, #[case] expected: EntityIdValidationError) {
        assert_eq!(EntityId::new(raw).expect_err("invalid id"), expected);
    }

    #[test]
    fn id_deserialises_through_validation() {
        let err = serde_json::from_str::<EntityId>(r#""""#).expect_err("empty id rejected");
        assert!(err.to_string().contains("must not be empty"));
    }

    #[rstest]
    #[case("", true)]
    #[case("toy", true)]
    #[case("TOYOTA", true)]
    #[case("ford", false)]
    fn search_is_case_insensitive_substring(#[case] term: &str, #[case] expected: bool) {
        assert_eq!(matches_search(term, ["Toyota", "Corolla"]), expected);
    }
}
