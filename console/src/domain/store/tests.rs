//! Unit tests for entity store state, operation tracking, and notifications.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::PageRequest;
use rstest::{fixture, rstest};
use tokio::sync::Notify;

use super::*;
use crate::domain::http_failure::SERVER_ERROR_MESSAGE;
use crate::domain::{Vehicle, VehicleFilter, VehicleInput, VehicleSortField, VehicleStatus};
use crate::test_support::{InMemoryGateway, vehicle, vehicle_input};

type Store = EntityStore<Vehicle, InMemoryGateway<Vehicle>>;

fn id(raw: &str) -> EntityId {
    EntityId::new(raw).expect("valid id")
}

fn fleet() -> Vec<Vehicle> {
    vec![
        vehicle("1", "Toyota", "Corolla", VehicleStatus::Active),
        vehicle("2", "Ford", "Transit", VehicleStatus::Maintenance),
        vehicle("3", "Volvo", "XC90", VehicleStatus::Active),
    ]
}

fn messages(centre: &NotificationCenter) -> Vec<(Severity, String)> {
    centre
        .notifications()
        .into_iter()
        .map(|n| (n.severity, n.message))
        .collect()
}

fn success(message: &str) -> (Severity, String) {
    (Severity::Success, message.to_owned())
}

struct Harness {
    gateway: Arc<InMemoryGateway<Vehicle>>,
    notifications: Arc<NotificationCenter>,
    store: Store,
}

#[fixture]
fn harness() -> Harness {
    let gateway = Arc::new(InMemoryGateway::with_records(fleet()));
    let notifications = Arc::new(NotificationCenter::default());
    let store = EntityStore::new(gateway.clone(), notifications.clone());
    Harness {
        gateway,
        notifications,
        store,
    }
}

#[rstest]
#[tokio::test]
async fn load_all_replaces_collection_and_notifies(harness: Harness) {
    let count = harness.store.load_all().await.expect("load succeeds");

    assert_eq!(count, 3);
    assert_eq!(harness.store.len(), 3);
    assert_eq!(
        messages(&harness.notifications),
        vec![success("Loaded 3 vehicles")]
    );
    let key = OperationKey::load_all(Vehicle::KIND);
    assert!(!harness.store.is_loading(&key));
}

#[rstest]
#[tokio::test]
async fn failed_load_keeps_previous_collection(harness: Harness) {
    harness.store.load_all().await.expect("first load succeeds");
    let outage = GatewayError::transport(500_u16, SERVER_ERROR_MESSAGE);
    harness.gateway.fail_next(outage);

    let err = harness.store.load_all().await.expect_err("load fails");

    let key = OperationKey::load_all(Vehicle::KIND);
    assert_eq!(err.operation, key);
    assert_eq!(harness.store.len(), 3);
    assert_eq!(
        harness.store.error(&key).as_deref(),
        Some(SERVER_ERROR_MESSAGE)
    );
    assert!(!harness.store.is_loading(&key));
}

#[rstest]
#[tokio::test]
async fn next_attempt_clears_previous_error(harness: Harness) {
    harness.gateway.fail_next(GatewayError::declined());
    harness.store.load_all().await.expect_err("load fails");
    let key = OperationKey::load_all(Vehicle::KIND);
    assert_eq!(
        harness.store.error(&key).as_deref(),
        Some("Failed to load vehicles")
    );

    harness.store.load_all().await.expect("retry succeeds");
    assert!(harness.store.error(&key).is_none());
}

#[rstest]
#[tokio::test]
async fn load_one_selects_or_clears(harness: Harness) {
    let found = harness.store.load_one(&id("2")).await.expect("found");
    assert_eq!(harness.store.selected(), Some(found));
    assert!(harness.notifications.is_empty());

    let missing = harness.store.load_one(&id("404")).await;
    let err = missing.expect_err("missing");
    assert!(harness.store.selected().is_none());
    assert_eq!(err.operation.as_str(), "vehicle-404");
}

#[rstest]
#[tokio::test]
async fn create_appends_confirmed_record(harness: Harness) {
    harness.store.load_all().await.expect("load succeeds");
    harness.notifications.clear_all();

    let created = harness
        .store
        .create(&vehicle_input("Kia", "Niro", VehicleStatus::Active))
        .await
        .expect("create succeeds");

    assert_eq!(created.id.as_str(), "vehicle-1");
    assert_eq!(harness.store.find(&created.id), Some(created));
    assert_eq!(
        messages(&harness.notifications),
        vec![success("Vehicle created successfully")]
    );
}

#[rstest]
#[tokio::test]
async fn created_record_can_be_updated_in_place(harness: Harness) {
    harness.store.load_all().await.expect("load succeeds");
    let created = harness
        .store
        .create(&vehicle_input("Kia", "Niro", VehicleStatus::Active))
        .await
        .expect("create succeeds");

    let patch = vehicle_input("Kia", "EV6", VehicleStatus::Maintenance);
    let updated = harness
        .store
        .update(&created.id, &patch)
        .await
        .expect("update succeeds");

    assert_eq!(updated.id, created.id);
    assert_eq!(harness.store.len(), 4);
    let found = harness.store.find(&created.id).expect("record kept");
    assert_eq!(found.model, "EV6");
    assert_eq!(found.status, VehicleStatus::Maintenance);
}

#[rstest]
#[tokio::test]
async fn update_replaces_in_place_and_refreshes_selection(harness: Harness) {
    harness.store.load_all().await.expect("load succeeds");
    harness.store.load_one(&id("2")).await.expect("selected");

    let patch = vehicle_input("Ford", "Tourneo", VehicleStatus::Active);
    harness.store.update(&id("2"), &patch).await.expect("saved");

    let models: Vec<String> = harness.store.items().into_iter().map(|v| v.model).collect();
    assert_eq!(models, ["Corolla", "Tourneo", "XC90"]);
    assert_eq!(
        harness.store.selected().map(|v| v.model),
        Some("Tourneo".to_owned())
    );
}

#[rstest]
#[tokio::test]
async fn delete_of_selected_record_clears_selection(harness: Harness) {
    harness.store.load_all().await.expect("load succeeds");
    harness.store.load_one(&id("3")).await.expect("selected");

    harness.store.delete(&id("3")).await.expect("deleted");

    assert!(harness.store.selected().is_none());
    assert!(harness.store.find(&id("3")).is_none());
    assert_eq!(harness.store.len(), 2);
}

#[rstest]
#[tokio::test]
async fn delete_of_other_record_keeps_selection(harness: Harness) {
    harness.store.load_all().await.expect("load succeeds");
    harness.store.load_one(&id("3")).await.expect("selected");

    harness.store.delete(&id("1")).await.expect("deleted");

    assert_eq!(harness.store.selected().map(|v| v.id), Some(id("3")));
}

#[rstest]
#[case(
    GatewayError::rejected("Plate already registered"),
    Some((Severity::Error, "Plate already registered"))
)]
#[case(GatewayError::declined(), Some((Severity::Error, "Failed to delete vehicle")))]
#[case(
    GatewayError::transport(429_u16, "Too many requests."),
    Some((Severity::Warning, "Too many requests."))
)]
#[case(GatewayError::unauthenticated(), None)]
#[tokio::test]
async fn failures_notify_once_by_kind(
    harness: Harness,
    #[case] failure: GatewayError,
    #[case] expected: Option<(Severity, &str)>,
) {
    harness.gateway.fail_next(failure);

    harness.store.delete(&id("1")).await.expect_err("fails");

    let expected: Vec<(Severity, String)> = expected
        .map(|(severity, message)| (severity, message.to_owned()))
        .into_iter()
        .collect();
    assert_eq!(messages(&harness.notifications), expected);
    assert_eq!(harness.gateway.records().len(), 3);
}

#[rstest]
#[tokio::test]
async fn filters_and_paging_apply_to_snapshot(harness: Harness) {
    harness.store.load_all().await.expect("load succeeds");
    harness.store.update_filters(|filter| filter.status = Some(VehicleStatus::Active));

    let page = harness.store.page(
        PageRequest::new(1, 1).expect("valid request"),
        Some(Sort::desc(VehicleSortField::MakeModel)),
    );

    assert_eq!(page.total(), 2);
    assert_eq!(page.items().first().map(|v| v.make.as_str()), Some("Volvo"));
    assert!(page.has_next());

    harness.store.clear_filters();
    assert_eq!(harness.store.filtered().len(), 3);
    assert_eq!(harness.store.filters(), VehicleFilter::default());
}

#[rstest]
#[tokio::test]
async fn unchanged_filters_do_not_wake_subscribers(harness: Harness) {
    let changes = harness.store.subscribe();

    harness.store.set_filters(VehicleFilter::default());
    assert!(!changes.has_changed().expect("sender alive"));

    harness.store.update_filters(|filter| filter.search = "ford".into());
    assert!(changes.has_changed().expect("sender alive"));
}

#[rstest]
#[tokio::test]
async fn vehicle_status_update_replaces_record(harness: Harness) {
    harness.store.load_all().await.expect("load succeeds");
    harness.notifications.clear_all();

    harness
        .store
        .update_status(&id("2"), VehicleStatus::Active)
        .await
        .expect("status update succeeds");

    assert_eq!(harness.store.counts().active, 3);
    assert_eq!(
        messages(&harness.notifications),
        vec![success("Vehicle status updated to ACTIVE")]
    );
    let key = OperationKey::action(Vehicle::KIND, "status", &id("2"));
    assert_eq!(key.as_str(), "vehicle-status-2");
    assert!(!harness.store.is_loading(&key));
}

/// Gateway whose `fetch_all` waits until released.
#[derive(Default)]
struct BlockingGateway {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl EntityGateway<Vehicle> for BlockingGateway {
    async fn fetch_all(&self) -> Result<Vec<Vehicle>, GatewayError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(fleet())
    }

    async fn fetch_one(&self, _id: &EntityId) -> Result<Vehicle, GatewayError> {
        Err(GatewayError::declined())
    }

    async fn create(&self, _draft: &VehicleInput) -> Result<Vehicle, GatewayError> {
        Err(GatewayError::declined())
    }

    async fn update(
        &self,
        _id: &EntityId,
        _patch: &VehicleInput,
    ) -> Result<Vehicle, GatewayError> {
        Err(GatewayError::declined())
    }

    async fn delete(&self, _id: &EntityId) -> Result<(), GatewayError> {
        Err(GatewayError::declined())
    }
}

#[tokio::test]
async fn loading_flag_tracks_in_flight_call_and_clears_on_abort() {
    let gateway = Arc::new(BlockingGateway::default());
    let store = Arc::new(EntityStore::<Vehicle, _>::new(
        gateway.clone(),
        Arc::new(NotificationCenter::default()),
    ));
    let key = OperationKey::load_all(Vehicle::KIND);

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.load_all().await }
    });
    gateway.entered.notified().await;
    assert!(store.is_loading(&key));
    assert!(store.is_any_loading());

    task.abort();
    assert!(task.await.expect_err("task aborted").is_cancelled());
    assert!(!store.is_loading(&key));
    assert!(store.is_empty());
}

#[tokio::test]
async fn overlapping_loads_stay_loading_until_last_finishes() {
    let gateway = Arc::new(BlockingGateway::default());
    let store = Arc::new(EntityStore::<Vehicle, _>::new(
        gateway.clone(),
        Arc::new(NotificationCenter::default()),
    ));
    let key = OperationKey::load_all(Vehicle::KIND);

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.load_all().await }
    });
    gateway.entered.notified().await;
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.load_all().await }
    });
    gateway.entered.notified().await;

    gateway.release.notify_one();
    first.await.expect("joins").expect("first load");
    assert!(store.is_loading(&key));

    gateway.release.notify_one();
    second.await.expect("joins").expect("second load");
    assert!(!store.is_loading(&key));
    assert_eq!(store.len(), 3);
}

/// Gateway whose `create` commits the record, then waits before replying.
#[derive(Default)]
struct SlowCreateGateway {
    records: std::sync::Mutex<Vec<Vehicle>>,
    committed: Notify,
    release: Notify,
}

impl SlowCreateGateway {
    fn snapshot(&self) -> Vec<Vehicle> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EntityGateway<Vehicle> for SlowCreateGateway {
    async fn fetch_all(&self) -> Result<Vec<Vehicle>, GatewayError> {
        Ok(self.snapshot())
    }

    async fn fetch_one(&self, _id: &EntityId) -> Result<Vehicle, GatewayError> {
        Err(GatewayError::declined())
    }

    async fn create(&self, draft: &VehicleInput) -> Result<Vehicle, GatewayError> {
        let created = vehicle("42", &draft.make, &draft.model, draft.status);
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(created.clone());
        self.committed.notify_one();
        self.release.notified().await;
        Ok(created)
    }

    async fn update(&self, _id: &EntityId, _patch: &VehicleInput) -> Result<Vehicle, GatewayError> {
        Err(GatewayError::declined())
    }

    async fn delete(&self, _id: &EntityId) -> Result<(), GatewayError> {
        Err(GatewayError::declined())
    }
}

#[tokio::test]
async fn create_finishing_after_overlapping_load_keeps_ids_unique() {
    let gateway = Arc::new(SlowCreateGateway::default());
    let store = Arc::new(EntityStore::<Vehicle, _>::new(
        gateway.clone(),
        Arc::new(NotificationCenter::default()),
    ));

    let create = tokio::spawn({
        let store = store.clone();
        async move {
            store
                .create(&vehicle_input("Kia", "Niro", VehicleStatus::Active))
                .await
        }
    });
    gateway.committed.notified().await;
    store.load_all().await.expect("load succeeds");
    assert_eq!(store.len(), 1);

    gateway.release.notify_one();
    create.await.expect("joins").expect("created");

    let ids: Vec<String> = store
        .items()
        .iter()
        .map(|v| v.id.as_str().to_owned())
        .collect();
    assert_eq!(ids, ["42"]);
}
