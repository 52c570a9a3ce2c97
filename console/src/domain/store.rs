//! Observable store for one entity type.
//!
//! The store holds the collection, the selected record, and the list view
//! filters in a `watch` channel. Every remote action runs under its own
//! [`OperationKey`]: the key is loading only while the call is in flight,
//! its error is cleared when the action starts, and a failure is both
//! notified and returned. The collection is only touched after the remote
//! side confirms a change, so a failed call leaves the prior state intact.
//!
//! Overlapping calls under one key are neither queued nor cancelled;
//! their results are applied in completion order.

use std::future::Future;
use std::sync::Arc;

use pagination::{Page, PageRequest, paginate};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::http_failure::NoticeStyle;
use super::ports::{EntityGateway, GatewayError};
use super::{
    Entity, EntityFilter, EntityId, NotificationCenter, OperationGuard, OperationKey,
    OperationTracker, Severity, Sort,
};

/// Failure of a store action, after it has been recorded and notified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct StoreError {
    /// Key the action ran under.
    pub operation: OperationKey,
    /// Message recorded for the key and shown to the user.
    pub message: String,
    /// Gateway failure behind it.
    pub source: GatewayError,
}

/// Snapshot of a store's observable state.
#[derive(Debug, Clone)]
pub struct StoreState<E: Entity> {
    items: Vec<E>,
    selected: Option<E>,
    filters: E::Filter,
}

impl<E: Entity> Default for StoreState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            filters: E::Filter::default(),
        }
    }
}

impl<E: Entity> StoreState<E> {
    /// Records in collection order.
    pub fn items(&self) -> &[E] {
        self.items.as_slice()
    }

    /// Selected record, if any.
    pub fn selected(&self) -> Option<&E> {
        self.selected.as_ref()
    }

    /// Active list view filters.
    pub fn filters(&self) -> &E::Filter {
        &self.filters
    }

    /// Records passing the active filters, in collection order.
    pub fn filtered(&self) -> impl Iterator<Item = &E> {
        self.items
            .iter()
            .filter(|entity| self.filters.matches(entity))
    }
}

/// Store of one entity type backed by a remote gateway.
pub struct EntityStore<E: Entity, G: ?Sized> {
    gateway: Arc<G>,
    notifications: Arc<NotificationCenter>,
    operations: OperationTracker,
    state: watch::Sender<StoreState<E>>,
}

impl<E, G> EntityStore<E, G>
where
    E: Entity,
    G: EntityGateway<E> + ?Sized,
{
    /// Empty store over `gateway`, reporting to `notifications`.
    pub fn new(gateway: Arc<G>, notifications: Arc<NotificationCenter>) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            gateway,
            notifications,
            operations: OperationTracker::new(),
            state,
        }
    }

    /// Replace the collection with the remote one.
    ///
    /// Returns the number of records loaded. On failure the previous
    /// collection is kept.
    pub async fn load_all(&self) -> Result<usize, StoreError> {
        let kind = E::KIND;
        let items = self
            .run(
                OperationKey::load_all(kind),
                format!("Failed to load {}", kind.plural),
                self.gateway.fetch_all(),
            )
            .await?;
        let count = items.len();
        self.state.send_modify(|state| state.items = items);
        debug!(entity = kind.plural, count, "collection loaded");
        self.notifications.success(format!("Loaded {count} {}", kind.plural));
        Ok(count)
    }

    /// Fetch one record and select it. On failure the selection is cleared.
    pub async fn load_one(&self, id: &EntityId) -> Result<E, StoreError> {
        let kind = E::KIND;
        let result = self
            .run(
                OperationKey::load_one(kind, id),
                format!("{} not found", kind.label),
                self.gateway.fetch_one(id),
            )
            .await;
        let selected = result.as_ref().ok().cloned();
        self.state.send_modify(|state| state.selected = selected);
        result
    }

    /// Create a record and append it to the collection.
    ///
    /// A record with the same id that arrived through an overlapping load
    /// is overwritten rather than duplicated.
    pub async fn create(&self, draft: &E::Draft) -> Result<E, StoreError> {
        let kind = E::KIND;
        let created = self
            .run(
                OperationKey::create(kind),
                format!("Failed to create {}", kind.singular),
                self.gateway.create(draft),
            )
            .await?;
        self.state.send_modify(|state| upsert(&mut state.items, created.clone()));
        self.notifications.success(format!("{} created successfully", kind.label));
        Ok(created)
    }

    /// Update a record and replace it in place, selection included.
    pub async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, StoreError> {
        let kind = E::KIND;
        let updated = self
            .run(
                OperationKey::update(kind, id),
                format!("Failed to update {}", kind.singular),
                self.gateway.update(id, patch),
            )
            .await?;
        self.replace(updated.clone());
        self.notifications.success(format!("{} updated successfully", kind.label));
        Ok(updated)
    }

    /// Delete a record; clears the selection when it was selected.
    pub async fn delete(&self, id: &EntityId) -> Result<(), StoreError> {
        let kind = E::KIND;
        self.run(
            OperationKey::delete(kind, id),
            format!("Failed to delete {}", kind.singular),
            self.gateway.delete(id),
        )
        .await?;
        self.state.send_modify(|state| {
            state.items.retain(|entity| entity.id() != id);
            if state.selected.as_ref().is_some_and(|item| item.id() == id) {
                state.selected = None;
            }
        });
        self.notifications.success(format!("{} deleted successfully", kind.label));
        Ok(())
    }

    /// Records matching `predicate`, recomputed from the current collection.
    pub fn derived_view<F>(&self, mut predicate: F) -> Vec<E>
    where
        F: FnMut(&E) -> bool,
    {
        self.with_items(|items| {
            items
                .iter()
                .filter(|entity| predicate(entity))
                .cloned()
                .collect()
        })
    }

    /// Run `read` against the current collection without cloning it.
    pub fn with_items<R>(&self, read: impl FnOnce(&[E]) -> R) -> R {
        read(self.state.borrow().items())
    }

    /// Copy of the collection.
    pub fn items(&self) -> Vec<E> {
        self.with_items(<[E]>::to_vec)
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.with_items(<[E]>::len)
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record with `id`, if held.
    pub fn find(&self, id: &EntityId) -> Option<E> {
        self.with_items(|items| items.iter().find(|entity| entity.id() == id).cloned())
    }

    /// Selected record.
    pub fn selected(&self) -> Option<E> {
        self.state.borrow().selected.clone()
    }

    /// Select a record without contacting the backend.
    pub fn select(&self, entity: Option<E>) {
        self.state.send_modify(|state| state.selected = entity);
    }

    /// Active filters.
    pub fn filters(&self) -> E::Filter {
        self.state.borrow().filters.clone()
    }

    /// Replace the filters.
    pub fn set_filters(&self, filters: E::Filter) {
        self.state.send_if_modified(|state| {
            let changed = state.filters != filters;
            state.filters = filters;
            changed
        });
    }

    /// Adjust some filter fields and keep the rest.
    pub fn update_filters(&self, adjust: impl FnOnce(&mut E::Filter)) {
        self.state.send_if_modified(|state| {
            let before = state.filters.clone();
            adjust(&mut state.filters);
            state.filters != before
        });
    }

    /// Reset the filters to their defaults.
    pub fn clear_filters(&self) {
        self.set_filters(E::Filter::default());
    }

    /// Records passing the active filters.
    pub fn filtered(&self) -> Vec<E> {
        self.state.borrow().filtered().cloned().collect()
    }

    /// One page of the filtered records, optionally sorted.
    pub fn page(&self, request: PageRequest, sort: Option<Sort<E::SortField>>) -> Page<E> {
        let mut rows = self.filtered();
        if let Some(sort) = sort {
            rows.sort_by(|a, b| sort.direction.apply(a.compare_by(b, sort.field)));
        }
        paginate(rows, request)
    }

    /// Observe collection, selection, and filter changes.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<E>> {
        self.state.subscribe()
    }

    /// Whether the action under `key` is running.
    pub fn is_loading(&self, key: &OperationKey) -> bool {
        self.operations.is_loading(key)
    }

    /// Last error recorded for `key`.
    pub fn error(&self, key: &OperationKey) -> Option<String> {
        self.operations.error(key)
    }

    /// Whether any action is running.
    pub fn is_any_loading(&self) -> bool {
        self.operations.is_any_loading()
    }

    /// Clear the error recorded for `key`.
    pub fn clear_error(&self, key: &OperationKey) {
        self.operations.clear_error(key);
    }

    /// Clear every recorded error.
    pub fn clear_all_errors(&self) {
        self.operations.clear_all_errors();
    }

    /// Loading and error tracker.
    pub fn operations(&self) -> &OperationTracker {
        &self.operations
    }

    pub(crate) fn gateway(&self) -> &G {
        self.gateway.as_ref()
    }

    pub(crate) fn notifications(&self) -> &NotificationCenter {
        self.notifications.as_ref()
    }

    /// Replace the record sharing `entity`'s id, and the selection if it
    /// is that record. Unknown ids leave the collection unchanged.
    pub(crate) fn replace(&self, entity: E) {
        self.state.send_modify(|state| {
            if let Some(slot) = state
                .items
                .iter_mut()
                .find(|existing| existing.id() == entity.id())
            {
                *slot = entity.clone();
            }
            if state
                .selected
                .as_ref()
                .is_some_and(|selected| selected.id() == entity.id())
            {
                state.selected = Some(entity);
            }
        });
    }

    /// Run `call` under `key`, recording and notifying a failure.
    pub(crate) async fn run<T, F>(
        &self,
        key: OperationKey,
        fallback: impl Into<String>,
        call: F,
    ) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let guard = self.operations.begin(key);
        match call.await {
            Ok(value) => Ok(value),
            Err(err) => Err(self.record_failure(&guard, err, fallback.into())),
        }
    }

    fn record_failure(
        &self,
        guard: &OperationGuard<'_>,
        err: GatewayError,
        fallback: String,
    ) -> StoreError {
        let message = err.user_message().map_or(fallback, str::to_owned);
        guard.fail(message.clone());
        warn!(
            operation = %guard.key(),
            error = %err,
            "store operation failed"
        );

        match &err {
            GatewayError::Unauthenticated => {}
            GatewayError::Transport { status, .. } => {
                let style = NoticeStyle::for_status(*status);
                self.notifications.push(message.clone(), style.severity, style.duration);
            }
            _ => {
                self.notifications.push(message.clone(), Severity::Error, None);
            }
        }

        StoreError {
            operation: guard.key().clone(),
            message,
            source: err,
        }
    }
}

/// Overwrite the record sharing `entity`'s id, or append it.
fn upsert<E: Entity>(items: &mut Vec<E>, entity: E) {
    match items.iter_mut().find(|item| item.id() == entity.id()) {
        Some(slot) => *slot = entity,
        None => items.push(entity),
    }
}

#[cfg(test)]
mod tests;
