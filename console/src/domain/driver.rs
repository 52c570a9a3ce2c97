//! Driver records and list filters.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ports::EntityGateway;
use super::{Entity, EntityFilter, EntityId, EntityKind, EntityStore, matches_search};

/// Employment state of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    /// Available for assignment.
    Active,
    /// No longer driving.
    Inactive,
    /// Barred from driving.
    Suspended,
    /// Temporarily away.
    OnLeave,
}

/// A fleet driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    /// Backend id.
    pub id: EntityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone; older payloads call it `phoneNumber`.
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
    /// Driving licence number.
    #[serde(default)]
    pub license_number: Option<String>,
    /// Driving licence expiry.
    #[serde(default)]
    pub license_expiry_date: Option<NaiveDate>,
    /// Employment state.
    pub status: DriverStatus,
    /// First working day.
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    /// Trip the driver is currently assigned to.
    #[serde(default)]
    pub current_trip_id: Option<String>,
    /// Average customer rating.
    #[serde(default)]
    pub rating: Option<f32>,
}

impl Driver {
    /// "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Payload for creating or updating a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverInput {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Driving licence number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    /// Driving licence expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_expiry_date: Option<NaiveDate>,
    /// Employment state.
    pub status: DriverStatus,
}

/// List view filter for drivers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverFilter {
    /// Free-text search over names, email, phone, and licence number.
    pub search: String,
    /// Exact status.
    pub status: Option<DriverStatus>,
}

impl EntityFilter<Driver> for DriverFilter {
    fn matches(&self, driver: &Driver) -> bool {
        let searchable = [
            Some(driver.first_name.as_str()),
            Some(driver.last_name.as_str()),
            Some(driver.email.as_str()),
            driver.phone.as_deref(),
            driver.license_number.as_deref(),
        ];
        matches_search(&self.search, searchable.into_iter().flatten())
            && self.status.is_none_or(|status| driver.status == status)
    }
}

/// Sortable driver columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverSortField {
    /// Family name, then given name.
    Name,
    /// Hire date; unknown dates first.
    HireDate,
    /// Rating; unrated drivers first.
    Rating,
}

impl Entity for Driver {
    const KIND: EntityKind = EntityKind {
        singular: "driver",
        plural: "drivers",
        label: "Driver",
    };

    type Draft = DriverInput;
    type Patch = DriverInput;
    type Filter = DriverFilter;
    type SortField = DriverSortField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn compare_by(&self, other: &Self, field: DriverSortField) -> Ordering {
        match field {
            DriverSortField::Name => self
                .last_name
                .cmp(&other.last_name)
                .then_with(|| self.first_name.cmp(&other.first_name)),
            DriverSortField::HireDate => self.hire_date.cmp(&other.hire_date),
            DriverSortField::Rating => match (self.rating, other.rating) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            },
        }
    }
}

/// Driver totals per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverCounts {
    /// All drivers.
    pub total: usize,
    /// `ACTIVE` drivers.
    pub active: usize,
    /// `INACTIVE` drivers.
    pub inactive: usize,
    /// `SUSPENDED` drivers.
    pub suspended: usize,
    /// `ON_LEAVE` drivers.
    pub on_leave: usize,
}

/// Store of fleet drivers.
pub type DriverStore<G> = EntityStore<Driver, G>;

impl<G> EntityStore<Driver, G>
where
    G: EntityGateway<Driver> + ?Sized,
{
    /// Status counters over the whole collection.
    pub fn counts(&self) -> DriverCounts {
        self.with_items(|drivers| {
            drivers
                .iter()
                .fold(DriverCounts::default(), |mut counts, driver| {
                    counts.total += 1;
                    match driver.status {
                        DriverStatus::Active => counts.active += 1,
                        DriverStatus::Inactive => counts.inactive += 1,
                        DriverStatus::Suspended => counts.suspended += 1,
                        DriverStatus::OnLeave => counts.on_leave += 1,
                    }
                    counts
                })
        })
    }

    /// Active drivers with no current trip.
    pub fn available_drivers(&self) -> Vec<Driver> {
        self.derived_view(|driver| {
            driver.status == DriverStatus::Active && driver.current_trip_id.is_none()
        })
    }
}
