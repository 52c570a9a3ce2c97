//! Per-operation loading and error tracking.
//!
//! Each store action runs under an [`OperationKey`]. Starting an operation
//! marks its key as loading and clears its last error; the returned
//! [`OperationGuard`] clears the loading mark when dropped, so early returns,
//! panics, and cancelled futures all leave the tracker consistent.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::watch;

use super::{EntityId, EntityKind};

/// Validation errors returned by [`OperationKey::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKeyValidationError {
    /// Key was empty.
    Empty,
    /// Key contained whitespace.
    ContainsWhitespace,
}

impl fmt::Display for OperationKeyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "operation key must not be empty"),
            Self::ContainsWhitespace => write!(f, "operation key must not contain whitespace"),
        }
    }
}

impl std::error::Error for OperationKeyValidationError {}

/// Name of one in-flight action, for example `vehicle-update-42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey(String);

impl OperationKey {
    /// Validate and construct a key.
    pub fn new(key: impl Into<String>) -> Result<Self, OperationKeyValidationError> {
        let key = key.into();
        if key.is_empty() {
            return Err(OperationKeyValidationError::Empty);
        }
        if key.chars().any(char::is_whitespace) {
            return Err(OperationKeyValidationError::ContainsWhitespace);
        }
        Ok(Self(key))
    }

    /// `<plural>-load`.
    pub fn load_all(kind: EntityKind) -> Self {
        Self(format!("{}-load", kind.plural))
    }

    /// `<singular>-<id>`.
    pub fn load_one(kind: EntityKind, id: &EntityId) -> Self {
        Self(format!("{}-{id}", kind.singular))
    }

    /// `<singular>-create`.
    pub fn create(kind: EntityKind) -> Self {
        Self(format!("{}-create", kind.singular))
    }

    /// `<singular>-update-<id>`.
    pub fn update(kind: EntityKind, id: &EntityId) -> Self {
        Self::action(kind, "update", id)
    }

    /// `<singular>-delete-<id>`.
    pub fn delete(kind: EntityKind, id: &EntityId) -> Self {
        Self::action(kind, "delete", id)
    }

    /// `<singular>-<action>-<id>` for entity-specific actions such as
    /// `vehicle-status-42`.
    pub fn action(kind: EntityKind, action: &str, id: &EntityId) -> Self {
        Self(format!("{}-{action}-{id}", kind.singular))
    }

    /// Key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loading and error state of one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    in_flight: usize,
    error: Option<String>,
}

impl OperationState {
    /// Whether at least one operation under this key is running.
    pub const fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Message of the last failure, if not yet cleared.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Snapshot of every key seen so far.
pub type OperationStates = HashMap<OperationKey, OperationState>;

/// Observable map from operation key to loading and error state.
#[derive(Debug)]
pub struct OperationTracker {
    states: watch::Sender<OperationStates>,
}

impl Default for OperationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationTracker {
    /// Tracker with no keys.
    pub fn new() -> Self {
        let (states, _) = watch::channel(OperationStates::new());
        Self { states }
    }

    /// Mark `key` as loading and clear its error.
    ///
    /// Overlapping operations under one key are allowed; the key stays
    /// loading until the last of them finishes.
    pub fn begin(&self, key: OperationKey) -> OperationGuard<'_> {
        self.states.send_modify(|states| {
            let state = states.entry(key.clone()).or_default();
            state.in_flight = state.in_flight.saturating_add(1);
            state.error = None;
        });
        OperationGuard { tracker: self, key }
    }

    /// Whether `key` is loading.
    pub fn is_loading(&self, key: &OperationKey) -> bool {
        self.states
            .borrow()
            .get(key)
            .is_some_and(OperationState::is_loading)
    }

    /// Last error recorded for `key`.
    pub fn error(&self, key: &OperationKey) -> Option<String> {
        self.states
            .borrow()
            .get(key)
            .and_then(|state| state.error.clone())
    }

    /// Whether any key is loading.
    pub fn is_any_loading(&self) -> bool {
        let states = self.states.borrow();
        states.values().any(OperationState::is_loading)
    }

    /// Clear the error of `key`; the key itself is kept.
    pub fn clear_error(&self, key: &OperationKey) {
        self.states.send_if_modified(|states| {
            states
                .get_mut(key)
                .and_then(|state| state.error.take())
                .is_some()
        });
    }

    /// Clear every recorded error.
    pub fn clear_all_errors(&self) {
        self.states.send_if_modified(|states| {
            let mut changed = false;
            for state in states.values_mut() {
                changed |= state.error.take().is_some();
            }
            changed
        });
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<OperationStates> {
        self.states.subscribe()
    }

    fn record_error(&self, key: &OperationKey, message: String) {
        self.states.send_modify(|states| {
            states.entry(key.clone()).or_default().error = Some(message);
        });
    }

    fn finish(&self, key: &OperationKey) {
        self.states.send_modify(|states| {
            if let Some(state) = states.get_mut(key) {
                state.in_flight = state.in_flight.saturating_sub(1);
            }
        });
    }
}

/// Running operation; clears the loading mark when dropped.
#[must_use = "dropping the guard ends the operation"]
#[derive(Debug)]
pub struct OperationGuard<'a> {
    tracker: &'a OperationTracker,
    key: OperationKey,
}

impl OperationGuard<'_> {
    /// Key this operation runs under.
    pub fn key(&self) -> &OperationKey {
        &self.key
    }

    /// Record a failure message for the key.
    pub fn fail(&self, message: impl Into<String>) {
        self.tracker.record_error(&self.key, message.into());
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish(&self.key);
    }
}
