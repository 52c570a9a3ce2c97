//! Trips, their list filters, and lifecycle actions.
//!
//! A trip moves a vehicle between two locations, optionally with a driver.
//! Status changes go through a dedicated port so the backend can stamp
//! start and end times; the store replaces its copy with the record it
//! gets back.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ports::{EntityGateway, TripStatusGateway};
use super::{
    Entity, EntityFilter, EntityId, EntityKind, EntityStore, OperationKey, StoreError,
    matches_search,
};

/// Lifecycle state of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    /// Booked but not started.
    Scheduled,
    /// Vehicle is on the road.
    InProgress,
    /// Trip finished.
    Completed,
    /// Trip called off.
    Cancelled,
}

impl TripStatus {
    /// Wire name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Purpose of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    /// Customer rental.
    Rental,
    /// Drive to or from the workshop.
    Maintenance,
    /// Move between depots.
    Relocation,
    /// Unplanned emergency run.
    Emergency,
}

/// A point on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Street address.
    pub address: String,
    /// City.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

/// Vehicle summary embedded in a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripVehicle {
    /// Vehicle id.
    pub id: EntityId,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Registration plate.
    pub license_plate: String,
    /// Model year.
    #[serde(default)]
    pub year: Option<u16>,
    /// Paint colour.
    #[serde(default)]
    pub color: Option<String>,
}

/// Driver summary embedded in a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDriver {
    /// Driver id.
    pub id: EntityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Driving licence number.
    #[serde(default)]
    pub license_number: Option<String>,
}

/// A trip as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Backend id.
    pub id: EntityId,
    /// Vehicle used.
    pub vehicle_id: EntityId,
    /// Assigned driver.
    #[serde(default)]
    pub driver_id: Option<EntityId>,
    /// Purpose.
    #[serde(rename = "type")]
    pub kind: TripType,
    /// Lifecycle state.
    pub status: TripStatus,
    /// Departure point.
    pub start_location: Location,
    /// Destination.
    pub end_location: Location,
    /// Intermediate stops.
    #[serde(default)]
    pub waypoints: Option<Vec<Location>>,
    /// Actual departure.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Actual arrival.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Planned departure.
    pub scheduled_start_time: DateTime<Utc>,
    /// Planned arrival.
    #[serde(default)]
    pub scheduled_end_time: Option<DateTime<Utc>>,
    /// Distance driven in miles.
    #[serde(default)]
    pub distance: Option<f64>,
    /// Actual duration in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    /// Planned duration in minutes.
    #[serde(default)]
    pub estimated_duration: Option<u32>,
    /// Base rate charged.
    #[serde(default)]
    pub base_rate: Option<f64>,
    /// Total billed.
    #[serde(default)]
    pub total_cost: Option<f64>,
    /// Fuel share of the cost.
    #[serde(default)]
    pub fuel_cost: Option<f64>,
    /// Extra fees.
    #[serde(default)]
    pub additional_fees: Option<f64>,
    /// General notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Notes from the customer.
    #[serde(default)]
    pub customer_notes: Option<String>,
    /// Staff-only notes.
    #[serde(default)]
    pub internal_notes: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last change.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Vehicle details, when the backend populates them.
    #[serde(default)]
    pub vehicle: Option<TripVehicle>,
    /// Driver details, when the backend populates them.
    #[serde(default)]
    pub driver: Option<TripDriver>,
}

/// Payload for creating or replacing a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripInput {
    /// Vehicle to use.
    pub vehicle_id: EntityId,
    /// Driver to assign.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<EntityId>,
    /// Purpose.
    #[serde(rename = "type")]
    pub kind: TripType,
    /// Departure point.
    pub start_location: Location,
    /// Destination.
    pub end_location: Location,
    /// Intermediate stops.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<Vec<Location>>,
    /// Planned departure.
    pub scheduled_start_time: DateTime<Utc>,
    /// Planned arrival.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_end_time: Option<DateTime<Utc>>,
    /// Base rate charged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_rate: Option<f64>,
    /// Planned duration in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
    /// General notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Notes from the customer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_notes: Option<String>,
}

/// List view filter for trips.
///
/// The date bounds apply to the planned departure and are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripFilter {
    /// Free-text search over vehicle, driver, and addresses.
    pub search: String,
    /// Exact status.
    pub status: Option<TripStatus>,
    /// Exact purpose.
    pub kind: Option<TripType>,
    /// Exact vehicle.
    pub vehicle_id: Option<EntityId>,
    /// Exact driver.
    pub driver_id: Option<EntityId>,
    /// Earliest planned departure.
    pub start_date: Option<DateTime<Utc>>,
    /// Latest planned departure.
    pub end_date: Option<DateTime<Utc>>,
}

impl EntityFilter<Trip> for TripFilter {
    fn matches(&self, trip: &Trip) -> bool {
        let vehicle = trip.vehicle.as_ref();
        let driver = trip.driver.as_ref();
        let searchable = [
            vehicle.map(|v| v.make.as_str()),
            vehicle.map(|v| v.model.as_str()),
            vehicle.map(|v| v.license_plate.as_str()),
            driver.map(|d| d.first_name.as_str()),
            driver.map(|d| d.last_name.as_str()),
            Some(trip.start_location.address.as_str()),
            Some(trip.end_location.address.as_str()),
        ];
        let departure = trip.scheduled_start_time;
        matches_search(&self.search, searchable.into_iter().flatten())
            && self.status.is_none_or(|status| trip.status == status)
            && self.kind.is_none_or(|kind| trip.kind == kind)
            && self
                .vehicle_id
                .as_ref()
                .is_none_or(|vehicle_id| &trip.vehicle_id == vehicle_id)
            && self
                .driver_id
                .as_ref()
                .is_none_or(|driver_id| trip.driver_id.as_ref() == Some(driver_id))
            && self.start_date.is_none_or(|from| departure >= from)
            && self.end_date.is_none_or(|to| departure <= to)
    }
}

/// Sortable trip columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripSortField {
    /// Planned departure.
    Departure,
    /// Status.
    Status,
    /// Distance driven; unknown distances sort first.
    Distance,
}

impl Entity for Trip {
    const KIND: EntityKind = EntityKind {
        singular: "trip",
        plural: "trips",
        label: "Trip",
    };

    type Draft = TripInput;
    type Patch = TripInput;
    type Filter = TripFilter;
    type SortField = TripSortField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn compare_by(&self, other: &Self, field: TripSortField) -> Ordering {
        match field {
            TripSortField::Departure => self.scheduled_start_time.cmp(&other.scheduled_start_time),
            TripSortField::Status => status_rank(self.status).cmp(&status_rank(other.status)),
            TripSortField::Distance => match (self.distance, other.distance) {
                (Some(left), Some(right)) => left.total_cmp(&right),
                (left, right) => left.is_some().cmp(&right.is_some()),
            },
        }
    }
}

const fn status_rank(status: TripStatus) -> u8 {
    match status {
        TripStatus::InProgress => 0,
        TripStatus::Scheduled => 1,
        TripStatus::Completed => 2,
        TripStatus::Cancelled => 3,
    }
}

/// Dashboard counters over the whole trip collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TripCounts {
    /// All trips.
    pub total: usize,
    /// Trips with status `SCHEDULED`.
    pub scheduled: usize,
    /// Trips with status `IN_PROGRESS`.
    pub in_progress: usize,
    /// Trips with status `COMPLETED`.
    pub completed: usize,
    /// Trips with status `CANCELLED`.
    pub cancelled: usize,
}

impl TripCounts {
    /// Count `trips` by status.
    pub fn tally<'a>(trips: impl IntoIterator<Item = &'a Trip>) -> Self {
        trips.into_iter().fold(Self::default(), |mut counts, trip| {
            counts.total += 1;
            match trip.status {
                TripStatus::Scheduled => counts.scheduled += 1,
                TripStatus::InProgress => counts.in_progress += 1,
                TripStatus::Completed => counts.completed += 1,
                TripStatus::Cancelled => counts.cancelled += 1,
            }
            counts
        })
    }
}

/// Store of trips.
pub type TripStore<G> = EntityStore<Trip, G>;

impl<G> EntityStore<Trip, G>
where
    G: EntityGateway<Trip> + ?Sized,
{
    /// Status counters over the whole collection.
    pub fn counts(&self) -> TripCounts {
        self.with_items(|trips| TripCounts::tally(trips))
    }

    /// Trips currently on the road.
    pub fn in_progress(&self) -> Vec<Trip> {
        self.derived_view(|trip| trip.status == TripStatus::InProgress)
    }

    /// Trips using one vehicle.
    pub fn for_vehicle(&self, vehicle_id: &EntityId) -> Vec<Trip> {
        self.derived_view(|trip| &trip.vehicle_id == vehicle_id)
    }

    /// Trips assigned to one driver.
    pub fn for_driver(&self, driver_id: &EntityId) -> Vec<Trip> {
        self.derived_view(|trip| trip.driver_id.as_ref() == Some(driver_id))
    }
}

impl<G> EntityStore<Trip, G>
where
    G: EntityGateway<Trip> + TripStatusGateway + ?Sized,
{
    /// Move a trip to `status` under `trip-status-<id>`.
    pub async fn update_status(
        &self,
        id: &EntityId,
        status: TripStatus,
    ) -> Result<Trip, StoreError> {
        let key = OperationKey::action(Trip::KIND, "status", id);
        let trip = self
            .run(
                key,
                "Failed to update trip status",
                self.gateway().update_status(id, status),
            )
            .await?;
        self.replace(trip.clone());
        let message = format!("Trip status updated to {}", status.as_str());
        self.notifications().success(message);
        Ok(trip)
    }

    /// Mark a trip as started.
    pub async fn start(&self, id: &EntityId) -> Result<Trip, StoreError> {
        self.update_status(id, TripStatus::InProgress).await
    }

    /// Mark a trip as completed.
    pub async fn complete(&self, id: &EntityId) -> Result<Trip, StoreError> {
        self.update_status(id, TripStatus::Completed).await
    }

    /// Cancel a trip under `trip-cancel-<id>`.
    pub async fn cancel(&self, id: &EntityId, reason: Option<&str>) -> Result<Trip, StoreError> {
        let key = OperationKey::action(Trip::KIND, "cancel", id);
        let request = self.gateway().cancel(id, reason);
        let trip = self.run(key, "Failed to cancel trip", request).await?;
        self.replace(trip.clone());
        self.notifications().success("Trip cancelled successfully");
        Ok(trip)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ports::GatewayError;
    use crate::domain::{NotificationCenter, Severity};
    use crate::test_support::{InMemoryGateway, trip};

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).expect("valid id")
    }

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn trips(now: DateTime<Utc>) -> Vec<Trip> {
        let at = |days| now + TimeDelta::days(days);
        vec![
            trip("t1", "veh-1", TripStatus::Scheduled, now),
            Trip {
                driver_id: Some(id("drv-1")),
                ..trip("t2", "veh-1", TripStatus::InProgress, at(1))
            },
            trip("t3", "veh-2", TripStatus::Completed, at(2)),
            trip("t4", "veh-2", TripStatus::Cancelled, at(3)),
            trip("t5", "veh-3", TripStatus::Scheduled, at(4)),
        ]
    }

    #[rstest]
    #[case("corolla", 5)]
    #[case("ada", 1)]
    #[case("harbour", 1)]
    #[case("depot", 5)]
    #[case("nowhere", 0)]
    fn search_spans_vehicle_driver_and_addresses(
        now: DateTime<Utc>,
        #[case] term: &str,
        #[case] expected: usize,
    ) {
        let mut all = trips(now);
        if let Some(first) = all.first_mut() {
            first.driver = Some(TripDriver {
                id: id("drv-9"),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: None,
                phone: None,
                license_number: None,
            });
            first.end_location.address = "1 Harbour Road".into();
        }
        let filter = TripFilter {
            search: term.to_owned(),
            ..TripFilter::default()
        };
        assert_eq!(all.iter().filter(|t| filter.matches(t)).count(), expected);
    }

    #[rstest]
    fn exact_filters_and_date_range_combine(now: DateTime<Utc>) {
        let all = trips(now);
        let filter = TripFilter {
            vehicle_id: Some(id("veh-1")),
            start_date: Some(now + TimeDelta::days(1)),
            end_date: Some(now + TimeDelta::days(1)),
            ..TripFilter::default()
        };
        let matched: Vec<&str> = all
            .iter()
            .filter(|t| filter.matches(t))
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(matched, ["t2"]);

        let by_driver = TripFilter {
            driver_id: Some(id("drv-1")),
            status: Some(TripStatus::Scheduled),
            ..TripFilter::default()
        };
        assert_eq!(all.iter().filter(|t| by_driver.matches(t)).count(), 0);
    }

    #[rstest]
    fn counts_tally_by_status(now: DateTime<Utc>) {
        assert_eq!(
            TripCounts::tally(&trips(now)),
            TripCounts {
                total: 5,
                scheduled: 2,
                in_progress: 1,
                completed: 1,
                cancelled: 1,
            }
        );
    }

    #[rstest]
    fn unknown_distance_sorts_first(now: DateTime<Utc>) {
        let short = Trip {
            distance: Some(4.5),
            ..trip("a", "veh-1", TripStatus::Completed, now)
        };
        let long = Trip {
            distance: Some(12.0),
            ..trip("b", "veh-1", TripStatus::Completed, now)
        };
        let unknown = trip("c", "veh-1", TripStatus::Scheduled, now);
        assert_eq!(
            unknown.compare_by(&short, TripSortField::Distance),
            Ordering::Less
        );
        assert_eq!(
            short.compare_by(&long, TripSortField::Distance),
            Ordering::Less
        );
        assert_eq!(
            unknown.compare_by(&unknown, TripSortField::Distance),
            Ordering::Equal
        );
    }

    #[test]
    fn decodes_backend_payload() {
        let payload = serde_json::json!({
            "id": "trip-1",
            "vehicleId": "veh-1",
            "driverId": null,
            "type": "RELOCATION",
            "status": "IN_PROGRESS",
            "startLocation": { "latitude": 51.5, "longitude": -0.12, "address": "Depot A" },
            "endLocation": {
                "latitude": 51.4,
                "longitude": -0.2,
                "address": "Depot B",
                "city": "London"
            },
            "waypoints": null,
            "scheduledStartTime": "2026-06-01T09:00:00Z",
            "vehicle": { "id": "veh-1", "make": "Ford", "model": "Transit", "licensePlate": "FD-1" }
        });
        let trip: Trip = serde_json::from_value(payload).expect("trip decodes");
        assert_eq!(trip.kind, TripType::Relocation);
        assert_eq!(trip.status, TripStatus::InProgress);
        assert!(trip.driver_id.is_none());
        assert_eq!(trip.end_location.city.as_deref(), Some("London"));
        let plate = trip.vehicle.map(|v| v.license_plate);
        assert_eq!(plate.as_deref(), Some("FD-1"));
    }

    struct Harness {
        gateway: Arc<InMemoryGateway<Trip>>,
        notifications: Arc<NotificationCenter>,
        store: TripStore<InMemoryGateway<Trip>>,
    }

    #[fixture]
    fn harness(now: DateTime<Utc>) -> Harness {
        let gateway = Arc::new(InMemoryGateway::with_records(trips(now)));
        let notifications = Arc::new(NotificationCenter::default());
        let store = EntityStore::new(gateway.clone(), notifications.clone());
        Harness {
            gateway,
            notifications,
            store,
        }
    }

    fn last_message(centre: &NotificationCenter) -> Option<(Severity, String)> {
        centre
            .notifications()
            .into_iter()
            .last()
            .map(|n| (n.severity, n.message))
    }

    fn success(message: &str) -> Option<(Severity, String)> {
        Some((Severity::Success, message.to_owned()))
    }

    #[rstest]
    #[tokio::test]
    async fn views_follow_loaded_collection(harness: Harness) {
        harness.store.load_all().await.expect("load succeeds");

        assert_eq!(harness.store.counts().total, 5);
        assert_eq!(harness.store.in_progress().len(), 1);
        assert_eq!(harness.store.for_vehicle(&id("veh-2")).len(), 2);
        let for_driver = harness.store.for_driver(&id("drv-1"));
        assert_eq!(for_driver.first().map(|t| t.id.as_str()), Some("t2"));
    }

    #[rstest]
    #[tokio::test]
    async fn start_and_complete_move_through_lifecycle(harness: Harness) {
        harness.store.load_all().await.expect("load succeeds");

        harness.store.start(&id("t1")).await.expect("started");
        assert_eq!(harness.store.counts().in_progress, 2);
        let done = harness
            .store
            .complete(&id("t1"))
            .await
            .expect("complete succeeds");

        assert_eq!(done.status, TripStatus::Completed);
        assert_eq!(harness.store.counts().completed, 2);
        assert_eq!(
            last_message(&harness.notifications),
            success("Trip status updated to COMPLETED")
        );
        let key = OperationKey::action(Trip::KIND, "status", &id("t1"));
        assert_eq!(key.as_str(), "trip-status-t1");
        assert!(!harness.store.is_loading(&key));
    }

    #[rstest]
    #[tokio::test]
    async fn cancel_records_reason_and_replaces_selection(harness: Harness) {
        harness
            .store
            .load_one(&id("t5"))
            .await
            .expect("load succeeds");

        harness
            .store
            .cancel(&id("t5"), Some("customer no-show"))
            .await
            .expect("cancel succeeds");

        let selected = harness.store.selected().expect("selection kept");
        assert_eq!(selected.status, TripStatus::Cancelled);
        assert_eq!(selected.internal_notes.as_deref(), Some("customer no-show"));
        assert_eq!(
            last_message(&harness.notifications),
            success("Trip cancelled successfully")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn failed_cancel_records_error_under_cancel_key(harness: Harness) {
        harness.gateway.fail_next(GatewayError::declined());

        let err = harness
            .store
            .cancel(&id("t1"), None)
            .await
            .expect_err("cancel fails");

        let key = OperationKey::action(Trip::KIND, "cancel", &id("t1"));
        assert_eq!(err.operation, key);
        assert_eq!(
            harness.store.error(&key).as_deref(),
            Some("Failed to cancel trip")
        );
    }
}
