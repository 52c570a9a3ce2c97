//! Test utilities for the console crate.
//!
//! Shared by unit tests in `src/` and by integration tests in `tests/`
//! through the `test-support` feature. Nothing here talks to a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use serde_json::Value;

use crate::domain::ports::{EntityGateway, GatewayError, TripStatusGateway, VehicleStatusGateway};
use crate::domain::{
    AccessToken, AccountRole, CreateMaintenanceInput, CreateUserInput, Driver, DriverInput,
    DriverStatus, Entity, EntityId, Location, MaintenancePriority, MaintenanceRecord,
    MaintenanceStatus, MaintenanceType, Trip, TripInput, TripStatus, TripType, TripVehicle,
    UpdateMaintenanceInput, UpdateUserInput, UserAccount, Vehicle, VehicleInput, VehicleStatus,
};
use crate::outbound::graphql::{GraphqlHttp, HttpReply, NetworkFailure, RetrySleeper};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn entity_id(raw: &str) -> EntityId {
    EntityId::new(raw).unwrap_or_else(|err| panic!("invalid fixture id {raw:?}: {err}"))
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = TimeDelta::from_std(delta).unwrap_or_else(|error| {
            panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
        });
        *lock(&self.0) += delta;
    }

    /// Move the clock forward by whole seconds.
    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Sleeper that records every requested delay and returns at once.
#[derive(Debug, Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);

impl RecordingSleeper {
    /// Delays requested so far.
    pub fn delays(&self) -> Vec<Duration> {
        lock(&self.0).clone()
    }
}

#[async_trait]
impl RetrySleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.0).push(duration);
    }
}

/// Scripted reply for [`ScriptedHttp`].
pub type ScriptedReply = Result<HttpReply, NetworkFailure>;

/// Completed exchange with `status` and a JSON `body`.
pub fn http_reply(status: u16, body: Value) -> ScriptedReply {
    Ok(HttpReply {
        status,
        body: Some(body),
    })
}

/// Exchange that never reached the server.
pub fn network_failure() -> ScriptedReply {
    Err(NetworkFailure {
        message: "connection refused".to_owned(),
    })
}

/// HTTP exchange that plays back scripted replies in order and records
/// each request body with the bearer token it carried.
///
/// Running out of replies is a test bug and panics.
pub struct ScriptedHttp {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<(Value, String)>>,
}

impl ScriptedHttp {
    /// Exchange answering with `replies`.
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply.
    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.replies).push_back(reply);
    }

    /// Request bodies and tokens seen so far.
    pub fn requests(&self) -> Vec<(Value, String)> {
        lock(&self.requests).clone()
    }

    /// Number of requests seen so far.
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl GraphqlHttp for ScriptedHttp {
    async fn post(&self, body: &Value, token: &AccessToken) -> ScriptedReply {
        lock(&self.requests).push((body.clone(), token.expose().to_owned()));
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply left for request {body}"))
    }
}

/// Records the in-memory gateway can create and patch.
pub trait InMemoryRecord: Entity {
    /// Build a stored record from a create payload.
    fn from_draft(id: EntityId, draft: &Self::Draft) -> Self;

    /// Apply an update payload in place.
    fn apply_patch(&mut self, patch: &Self::Patch);
}

/// Entity gateway backed by a vector.
///
/// Ids for created records are `<singular>-<n>`. A failure queued with
/// [`InMemoryGateway::fail_next`] is returned by the next call of any kind.
pub struct InMemoryGateway<E> {
    records: Mutex<Vec<E>>,
    failure: Mutex<Option<GatewayError>>,
    next_id: AtomicU64,
}

impl<E: InMemoryRecord> Default for InMemoryGateway<E> {
    fn default() -> Self {
        Self::with_records(Vec::new())
    }
}

impl<E: InMemoryRecord> InMemoryGateway<E> {
    /// Gateway holding `records`.
    pub fn with_records(records: Vec<E>) -> Self {
        Self {
            records: Mutex::new(records),
            failure: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: GatewayError) {
        *lock(&self.failure) = Some(error);
    }

    /// Records as currently stored.
    pub fn records(&self) -> Vec<E> {
        lock(&self.records).clone()
    }

    fn check_failure(&self) -> Result<(), GatewayError> {
        lock(&self.failure).take().map_or(Ok(()), Err)
    }

    fn with_record<T>(
        &self,
        id: &EntityId,
        change: impl FnOnce(&mut E) -> T,
    ) -> Result<T, GatewayError> {
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|record| record.id() == id)
            .ok_or_else(|| {
                GatewayError::transport(404_u16, "The requested resource was not found.")
            })?;
        Ok(change(record))
    }
}

#[async_trait]
impl<E: InMemoryRecord> EntityGateway<E> for InMemoryGateway<E> {
    async fn fetch_all(&self) -> Result<Vec<E>, GatewayError> {
        self.check_failure()?;
        Ok(self.records())
    }

    async fn fetch_one(&self, id: &EntityId) -> Result<E, GatewayError> {
        self.check_failure()?;
        self.with_record(id, |record| record.clone())
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, GatewayError> {
        self.check_failure()?;
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = E::from_draft(entity_id(&format!("{}-{n}", E::KIND.singular)), draft);
        lock(&self.records).push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, GatewayError> {
        self.check_failure()?;
        self.with_record(id, |record| {
            record.apply_patch(patch);
            record.clone()
        })
    }

    async fn delete(&self, id: &EntityId) -> Result<(), GatewayError> {
        self.check_failure()?;
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|record| record.id() != id);
        if records.len() == before {
            return Err(GatewayError::declined());
        }
        Ok(())
    }
}

#[async_trait]
impl VehicleStatusGateway for InMemoryGateway<Vehicle> {
    async fn update_status(
        &self,
        id: &EntityId,
        status: VehicleStatus,
    ) -> Result<Vehicle, GatewayError> {
        self.check_failure()?;
        self.with_record(id, |vehicle| {
            vehicle.status = status;
            vehicle.clone()
        })
    }
}

/// Cancellation stores the reason in `internal_notes`.
#[async_trait]
impl TripStatusGateway for InMemoryGateway<Trip> {
    async fn update_status(&self, id: &EntityId, status: TripStatus) -> Result<Trip, GatewayError> {
        self.check_failure()?;
        self.with_record(id, |trip| {
            trip.status = status;
            trip.clone()
        })
    }

    async fn cancel(&self, id: &EntityId, reason: Option<&str>) -> Result<Trip, GatewayError> {
        self.check_failure()?;
        self.with_record(id, |trip| {
            trip.status = TripStatus::Cancelled;
            if let Some(reason) = reason {
                trip.internal_notes = Some(reason.to_owned());
            }
            trip.clone()
        })
    }
}

impl InMemoryRecord for Vehicle {
    fn from_draft(id: EntityId, draft: &VehicleInput) -> Self {
        let mut vehicle = vehicle(id.as_str(), &draft.make, &draft.model, draft.status);
        vehicle.apply_patch(draft);
        vehicle
    }

    fn apply_patch(&mut self, patch: &VehicleInput) {
        let input = patch.clone();
        self.make = input.make;
        self.model = input.model;
        self.year = input.year;
        self.license_plate = input.license_plate;
        self.status = input.status;
        self.vin = input.vin;
        self.color = input.color;
        self.mileage = input.mileage;
        self.fuel_type = input.fuel_type;
        self.seating_capacity = input.seating_capacity;
        self.rental_price_per_day = input.rental_price_per_day;
        self.gps_enabled = input.gps_enabled;
        self.last_maintenance_date = input.last_maintenance_date;
        self.maintenance_interval_days = input.maintenance_interval_days;
    }
}

impl InMemoryRecord for Driver {
    fn from_draft(id: EntityId, draft: &DriverInput) -> Self {
        let (first, last) = (&draft.first_name, &draft.last_name);
        let mut record = driver(id.as_str(), first, last, draft.status);
        record.apply_patch(draft);
        record
    }

    fn apply_patch(&mut self, patch: &DriverInput) {
        let input = patch.clone();
        self.first_name = input.first_name;
        self.last_name = input.last_name;
        self.email = input.email;
        self.phone = input.phone;
        self.license_number = input.license_number;
        self.license_expiry_date = input.license_expiry_date;
        self.status = input.status;
    }
}

impl InMemoryRecord for UserAccount {
    fn from_draft(id: EntityId, draft: &CreateUserInput) -> Self {
        Self {
            email: draft.email.clone(),
            phone_number: draft.phone_number.clone(),
            ..user_account(id.as_str(), &draft.first_name, &draft.last_name, draft.role)
        }
    }

    fn apply_patch(&mut self, patch: &UpdateUserInput) {
        let input = patch.clone();
        if let Some(first_name) = input.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = input.last_name {
            self.last_name = last_name;
        }
        if let Some(email) = input.email {
            self.email = email;
        }
        if input.phone_number.is_some() {
            self.phone_number = input.phone_number;
        }
        if let Some(role) = input.role {
            self.role = role;
        }
    }
}

impl InMemoryRecord for Trip {
    fn from_draft(id: EntityId, draft: &TripInput) -> Self {
        let mut trip = trip(
            id.as_str(),
            draft.vehicle_id.as_str(),
            TripStatus::Scheduled,
            draft.scheduled_start_time,
        );
        trip.vehicle = None;
        trip.apply_patch(draft);
        trip
    }

    fn apply_patch(&mut self, patch: &TripInput) {
        let input = patch.clone();
        self.vehicle_id = input.vehicle_id;
        self.driver_id = input.driver_id;
        self.kind = input.kind;
        self.start_location = input.start_location;
        self.end_location = input.end_location;
        self.waypoints = input.waypoints;
        self.scheduled_start_time = input.scheduled_start_time;
        self.scheduled_end_time = input.scheduled_end_time;
        self.base_rate = input.base_rate;
        self.estimated_duration = input.estimated_duration;
        self.notes = input.notes;
        self.customer_notes = input.customer_notes;
    }
}

impl InMemoryRecord for MaintenanceRecord {
    fn from_draft(id: EntityId, draft: &CreateMaintenanceInput) -> Self {
        let input = draft.clone();
        Self {
            id,
            vehicle_id: input.vehicle_id,
            kind: input.kind,
            status: MaintenanceStatus::Scheduled,
            priority: input.priority,
            title: input.title,
            description: input.description,
            scheduled_date: input.scheduled_date,
            completed_date: None,
            mileage_at_service: input.mileage_at_service,
            cost: input.cost,
            technician: input.technician,
            service_provider: input.service_provider,
            notes: input.notes,
        }
    }

    fn apply_patch(&mut self, patch: &UpdateMaintenanceInput) {
        let input = patch.clone();
        self.status = input.status.unwrap_or(self.status);
        self.priority = input.priority.unwrap_or(self.priority);
        self.scheduled_date = input.scheduled_date.unwrap_or(self.scheduled_date);
        if let Some(title) = input.title {
            self.title = title;
        }
        if let Some(description) = input.description {
            self.description = description;
        }
        if input.completed_date.is_some() {
            self.completed_date = input.completed_date;
        }
        if input.cost.is_some() {
            self.cost = input.cost;
        }
        if input.technician.is_some() {
            self.technician = input.technician;
        }
        if input.notes.is_some() {
            self.notes = input.notes;
        }
    }
}

/// Minimal vehicle with plate `PL-<id>`.
pub fn vehicle(id: &str, make: &str, model: &str, status: VehicleStatus) -> Vehicle {
    Vehicle {
        id: entity_id(id),
        make: make.to_owned(),
        model: model.to_owned(),
        year: 2022,
        license_plate: format!("PL-{id}"),
        vin: None,
        color: None,
        mileage: None,
        fuel_type: None,
        seating_capacity: None,
        rental_price_per_day: None,
        gps_enabled: false,
        last_maintenance_date: None,
        next_maintenance_date: None,
        maintenance_interval_days: None,
        status,
    }
}

/// Create payload matching [`vehicle`].
pub fn vehicle_input(make: &str, model: &str, status: VehicleStatus) -> VehicleInput {
    VehicleInput {
        make: make.to_owned(),
        model: model.to_owned(),
        year: 2022,
        license_plate: format!("NEW-{}", make.to_uppercase()),
        status,
        vin: None,
        color: None,
        mileage: None,
        fuel_type: None,
        seating_capacity: None,
        rental_price_per_day: None,
        gps_enabled: false,
        last_maintenance_date: None,
        maintenance_interval_days: None,
    }
}

/// Minimal driver with email `<first>@fleet.test`.
pub fn driver(id: &str, first_name: &str, last_name: &str, status: DriverStatus) -> Driver {
    Driver {
        id: entity_id(id),
        first_name: first_name.to_owned(),
        last_name: last_name.to_owned(),
        email: format!("{}@fleet.test", first_name.to_lowercase()),
        phone: None,
        license_number: None,
        license_expiry_date: None,
        status,
        hire_date: None,
        current_trip_id: None,
        rating: None,
    }
}

/// Minimal account with email `<first>.<last>@fleet.test`.
pub fn user_account(id: &str, first_name: &str, last_name: &str, role: AccountRole) -> UserAccount {
    UserAccount {
        id: entity_id(id),
        first_name: first_name.to_owned(),
        last_name: last_name.to_owned(),
        email: format!(
            "{}.{}@fleet.test",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        ),
        phone_number: None,
        role,
        created_at: None,
        updated_at: None,
    }
}

/// Scheduled, medium-priority oil change.
pub fn maintenance_record(
    id: &str,
    vehicle_id: &str,
    scheduled_date: DateTime<Utc>,
) -> MaintenanceRecord {
    MaintenanceRecord {
        id: entity_id(id),
        vehicle_id: entity_id(vehicle_id),
        kind: MaintenanceType::OilChange,
        status: MaintenanceStatus::Scheduled,
        priority: MaintenancePriority::Medium,
        title: "Oil change".to_owned(),
        description: "Routine service".to_owned(),
        scheduled_date,
        completed_date: None,
        mileage_at_service: None,
        cost: None,
        technician: None,
        service_provider: None,
        notes: None,
    }
}

fn depot(address: &str) -> Location {
    Location {
        latitude: 51.5,
        longitude: -0.12,
        address: address.to_owned(),
        city: None,
        state: None,
        zip_code: None,
    }
}

/// Rental from `North Depot` to `South Depot` in a Toyota Corolla.
pub fn trip(
    id: &str,
    vehicle_id: &str,
    status: TripStatus,
    scheduled_start_time: DateTime<Utc>,
) -> Trip {
    Trip {
        id: entity_id(id),
        vehicle_id: entity_id(vehicle_id),
        driver_id: None,
        kind: TripType::Rental,
        status,
        start_location: depot("North Depot"),
        end_location: depot("South Depot"),
        waypoints: None,
        start_time: None,
        end_time: None,
        scheduled_start_time,
        scheduled_end_time: None,
        distance: None,
        duration: None,
        estimated_duration: None,
        base_rate: None,
        total_cost: None,
        fuel_cost: None,
        additional_fees: None,
        notes: None,
        customer_notes: None,
        internal_notes: None,
        created_at: None,
        updated_at: None,
        vehicle: Some(TripVehicle {
            id: entity_id(vehicle_id),
            make: "Toyota".to_owned(),
            model: "Corolla".to_owned(),
            license_plate: format!("PL-{vehicle_id}"),
            year: None,
            color: None,
        }),
        driver: None,
    }
}

/// Create payload for a rental between the fixture depots.
pub fn trip_input(vehicle_id: &str, scheduled_start_time: DateTime<Utc>) -> TripInput {
    TripInput {
        vehicle_id: entity_id(vehicle_id),
        driver_id: None,
        kind: TripType::Rental,
        start_location: depot("North Depot"),
        end_location: depot("South Depot"),
        waypoints: None,
        scheduled_start_time,
        scheduled_end_time: None,
        base_rate: None,
        estimated_duration: None,
        notes: None,
        customer_notes: None,
    }
}
