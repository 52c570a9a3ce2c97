//! Maintenance records, their filters, and schedule-based views.
//!
//! Overdue and upcoming lists depend on the current time, which callers
//! pass in (usually from a [`mockable::Clock`]) so the views stay pure.

use std::cmp::Ordering;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::ports::EntityGateway;
use super::{Entity, EntityFilter, EntityId, EntityKind, EntityStore, matches_search};

/// Days ahead covered by the upcoming view.
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

/// Kind of work performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceType {
    /// Engine oil and filter.
    OilChange,
    /// Tyre rotation.
    TireRotation,
    /// Brake check.
    BrakeInspection,
    /// General engine service.
    EngineService,
    /// Gearbox service.
    TransmissionService,
    /// Air filter swap.
    AirFilterReplacement,
    /// Battery health check.
    BatteryCheck,
    /// Coolant and radiator.
    CoolingSystem,
    /// Exhaust work.
    ExhaustSystem,
    /// Periodic inspection.
    Inspection,
    /// Unplanned repair.
    Repair,
    /// Anything else.
    Custom,
}

/// Progress of a maintenance job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    /// Planned for a future date.
    Scheduled,
    /// Work has started.
    InProgress,
    /// Work is done.
    Completed,
    /// Job was called off.
    Cancelled,
    /// Flagged by the backend as late.
    Overdue,
}

/// Urgency of a maintenance job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenancePriority {
    /// Can wait.
    Low,
    /// Normal.
    Medium,
    /// Soon.
    High,
    /// Vehicle should not be driven.
    Critical,
}

/// A maintenance job for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    /// Backend id.
    pub id: EntityId,
    /// Vehicle being serviced.
    pub vehicle_id: EntityId,
    /// Kind of work.
    #[serde(rename = "type")]
    pub kind: MaintenanceType,
    /// Progress.
    pub status: MaintenanceStatus,
    /// Urgency.
    pub priority: MaintenancePriority,
    /// Short title.
    pub title: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Planned start.
    pub scheduled_date: DateTime<Utc>,
    /// Completion time.
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    /// Odometer reading at service.
    #[serde(default)]
    pub mileage_at_service: Option<u64>,
    /// Invoice total.
    #[serde(default)]
    pub cost: Option<f64>,
    /// Technician name.
    #[serde(default)]
    pub technician: Option<String>,
    /// Workshop name.
    #[serde(default)]
    pub service_provider: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl MaintenanceRecord {
    /// Backend-flagged overdue, or still scheduled for a time before `now`.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.status == MaintenanceStatus::Overdue
            || (self.status == MaintenanceStatus::Scheduled && self.scheduled_date < now)
    }

    /// Scheduled between `now` and the end of the upcoming window.
    pub fn is_upcoming_at(&self, now: DateTime<Utc>) -> bool {
        let horizon = now + TimeDelta::days(UPCOMING_WINDOW_DAYS);
        self.status == MaintenanceStatus::Scheduled
            && self.scheduled_date >= now
            && self.scheduled_date <= horizon
    }
}

/// Payload for scheduling a maintenance job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenanceInput {
    /// Vehicle to service.
    pub vehicle_id: EntityId,
    /// Kind of work.
    #[serde(rename = "type")]
    pub kind: MaintenanceType,
    /// Urgency.
    pub priority: MaintenancePriority,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Planned start.
    pub scheduled_date: DateTime<Utc>,
    /// Odometer reading at service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage_at_service: Option<u64>,
    /// Expected cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Technician name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    /// Workshop name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<String>,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial update of a maintenance job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaintenanceInput {
    /// New progress state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MaintenanceStatus>,
    /// New urgency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<MaintenancePriority>,
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New planned start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<DateTime<Utc>>,
    /// Completion time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
    /// Final cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Technician name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// List view filter for maintenance records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceFilter {
    /// Free-text search over title, description, technician, and provider.
    pub search: String,
    /// Exact vehicle.
    pub vehicle_id: Option<EntityId>,
    /// Exact kind of work.
    pub kind: Option<MaintenanceType>,
    /// Exact progress state.
    pub status: Option<MaintenanceStatus>,
    /// Exact urgency.
    pub priority: Option<MaintenancePriority>,
    /// Earliest scheduled date, inclusive.
    pub scheduled_from: Option<DateTime<Utc>>,
    /// Latest scheduled date, inclusive.
    pub scheduled_to: Option<DateTime<Utc>>,
}

impl EntityFilter<MaintenanceRecord> for MaintenanceFilter {
    fn matches(&self, record: &MaintenanceRecord) -> bool {
        let searchable = [
            Some(record.title.as_str()),
            Some(record.description.as_str()),
            record.technician.as_deref(),
            record.service_provider.as_deref(),
        ];
        matches_search(&self.search, searchable.into_iter().flatten())
            && self
                .vehicle_id
                .as_ref()
                .is_none_or(|vehicle| &record.vehicle_id == vehicle)
            && self.kind.is_none_or(|kind| record.kind == kind)
            && self.status.is_none_or(|status| record.status == status)
            && self.priority.is_none_or(|priority| record.priority == priority)
            && self
                .scheduled_from
                .is_none_or(|from| record.scheduled_date >= from)
            && self.scheduled_to.is_none_or(|to| record.scheduled_date <= to)
    }
}

/// Sortable maintenance columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceSortField {
    /// Planned start.
    ScheduledDate,
    /// Urgency.
    Priority,
    /// Title.
    Title,
}

impl Entity for MaintenanceRecord {
    const KIND: EntityKind = EntityKind {
        singular: "maintenance",
        plural: "maintenance records",
        label: "Maintenance record",
    };

    type Draft = CreateMaintenanceInput;
    type Patch = UpdateMaintenanceInput;
    type Filter = MaintenanceFilter;
    type SortField = MaintenanceSortField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn compare_by(&self, other: &Self, field: MaintenanceSortField) -> Ordering {
        match field {
            MaintenanceSortField::ScheduledDate => self.scheduled_date.cmp(&other.scheduled_date),
            MaintenanceSortField::Priority => self.priority.cmp(&other.priority),
            MaintenanceSortField::Title => self.title.cmp(&other.title),
        }
    }
}

/// Store of maintenance records.
pub type MaintenanceStore<G> = EntityStore<MaintenanceRecord, G>;

impl<G> EntityStore<MaintenanceRecord, G>
where
    G: EntityGateway<MaintenanceRecord> + ?Sized,
{
    /// Records that are overdue at `now`.
    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<MaintenanceRecord> {
        self.derived_view(|record| record.is_overdue_at(now))
    }

    /// Records with `CRITICAL` priority.
    pub fn critical(&self) -> Vec<MaintenanceRecord> {
        self.derived_view(|record| record.priority == MaintenancePriority::Critical)
    }

    /// Scheduled records due within the next week.
    pub fn upcoming(&self, now: DateTime<Utc>) -> Vec<MaintenanceRecord> {
        self.derived_view(|record| record.is_upcoming_at(now))
    }

    /// Records for one vehicle.
    pub fn for_vehicle(&self, vehicle_id: &EntityId) -> Vec<MaintenanceRecord> {
        self.derived_view(|record| &record.vehicle_id == vehicle_id)
    }
}
