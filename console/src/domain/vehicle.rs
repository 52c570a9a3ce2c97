//! Vehicle records, list filters, and vehicle-only store operations.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ports::{EntityGateway, VehicleStatusGateway};
use super::{
    Entity, EntityFilter, EntityId, EntityKind, EntityStore, OperationKey, StoreError,
    matches_search,
};

/// Operational state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    /// Available for trips.
    Active,
    /// Retired or parked.
    Inactive,
    /// In the workshop.
    Maintenance,
}

impl VehicleStatus {
    /// Wire name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

/// Fuel or drive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    /// Petrol engine.
    Gasoline,
    /// Diesel engine.
    Diesel,
    /// Battery electric.
    Electric,
    /// Hybrid drive.
    Hybrid,
}

/// A fleet vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Backend id.
    pub id: EntityId,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: u16,
    /// Registration plate.
    pub license_plate: String,
    /// Vehicle identification number.
    #[serde(default)]
    pub vin: Option<String>,
    /// Paint colour.
    #[serde(default)]
    pub color: Option<String>,
    /// Odometer reading.
    #[serde(default)]
    pub mileage: Option<u64>,
    /// Fuel type.
    #[serde(default)]
    pub fuel_type: Option<FuelType>,
    /// Number of seats.
    #[serde(default)]
    pub seating_capacity: Option<u16>,
    /// Daily rental price.
    #[serde(default)]
    pub rental_price_per_day: Option<f64>,
    /// Whether a GPS tracker is fitted.
    #[serde(default)]
    pub gps_enabled: bool,
    /// Date of the last service.
    #[serde(default)]
    pub last_maintenance_date: Option<NaiveDate>,
    /// Date of the next planned service.
    #[serde(default)]
    pub next_maintenance_date: Option<NaiveDate>,
    /// Days between services.
    #[serde(default)]
    pub maintenance_interval_days: Option<u32>,
    /// Operational state.
    pub status: VehicleStatus,
}

/// Payload for creating or replacing a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInput {
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: u16,
    /// Registration plate.
    pub license_plate: String,
    /// Initial status.
    pub status: VehicleStatus,
    /// Vehicle identification number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    /// Paint colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Odometer reading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u64>,
    /// Fuel type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<FuelType>,
    /// Number of seats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seating_capacity: Option<u16>,
    /// Daily rental price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_price_per_day: Option<f64>,
    /// Whether a GPS tracker is fitted.
    pub gps_enabled: bool,
    /// Date of the last service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_maintenance_date: Option<NaiveDate>,
    /// Days between services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_interval_days: Option<u32>,
}

/// List view filter for vehicles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleFilter {
    /// Free-text search over make, model, plate, VIN, and colour.
    pub search: String,
    /// Exact status.
    pub status: Option<VehicleStatus>,
    /// Exact make.
    pub make: Option<String>,
    /// Exact model.
    pub model: Option<String>,
}

impl EntityFilter<Vehicle> for VehicleFilter {
    fn matches(&self, vehicle: &Vehicle) -> bool {
        let searchable = [
            Some(vehicle.make.as_str()),
            Some(vehicle.model.as_str()),
            Some(vehicle.license_plate.as_str()),
            vehicle.vin.as_deref(),
            vehicle.color.as_deref(),
        ];
        matches_search(&self.search, searchable.into_iter().flatten())
            && self.status.is_none_or(|status| vehicle.status == status)
            && self.make.as_deref().is_none_or(|m| vehicle.make == m)
            && self.model.as_deref().is_none_or(|m| vehicle.model == m)
    }
}

/// Sortable vehicle columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleSortField {
    /// Manufacturer, then model.
    MakeModel,
    /// Model year.
    Year,
    /// Registration plate.
    LicensePlate,
    /// Odometer reading.
    Mileage,
    /// Status.
    Status,
}

impl Entity for Vehicle {
    const KIND: EntityKind = EntityKind {
        singular: "vehicle",
        plural: "vehicles",
        label: "Vehicle",
    };

    type Draft = VehicleInput;
    type Patch = VehicleInput;
    type Filter = VehicleFilter;
    type SortField = VehicleSortField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn compare_by(&self, other: &Self, field: VehicleSortField) -> Ordering {
        match field {
            VehicleSortField::MakeModel => self
                .make
                .cmp(&other.make)
                .then_with(|| self.model.cmp(&other.model)),
            VehicleSortField::Year => self.year.cmp(&other.year),
            VehicleSortField::LicensePlate => self.license_plate.cmp(&other.license_plate),
            VehicleSortField::Mileage => self.mileage.cmp(&other.mileage),
            VehicleSortField::Status => status_rank(self.status).cmp(&status_rank(other.status)),
        }
    }
}

const fn status_rank(status: VehicleStatus) -> u8 {
    match status {
        VehicleStatus::Active => 0,
        VehicleStatus::Maintenance => 1,
        VehicleStatus::Inactive => 2,
    }
}

/// Dashboard counters over the whole vehicle collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleCounts {
    /// All vehicles.
    pub total: usize,
    /// Vehicles with status `ACTIVE`.
    pub active: usize,
    /// Vehicles with status `MAINTENANCE`.
    pub maintenance: usize,
    /// Vehicles with status `INACTIVE`.
    pub inactive: usize,
}

impl VehicleCounts {
    /// Count `vehicles` by status.
    pub fn tally<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Self {
        vehicles
            .into_iter()
            .fold(Self::default(), |mut counts, vehicle| {
                counts.total += 1;
                match vehicle.status {
                    VehicleStatus::Active => counts.active += 1,
                    VehicleStatus::Maintenance => counts.maintenance += 1,
                    VehicleStatus::Inactive => counts.inactive += 1,
                }
                counts
            })
    }
}

/// Store of fleet vehicles.
pub type VehicleStore<G> = EntityStore<Vehicle, G>;

impl<G> EntityStore<Vehicle, G>
where
    G: EntityGateway<Vehicle> + ?Sized,
{
    /// Status counters over the whole collection.
    pub fn counts(&self) -> VehicleCounts {
        self.with_items(|vehicles| VehicleCounts::tally(vehicles))
    }

    /// Vehicles currently `ACTIVE`.
    pub fn active_vehicles(&self) -> Vec<Vehicle> {
        self.derived_view(|vehicle| vehicle.status == VehicleStatus::Active)
    }

    /// Distinct makes, sorted, for filter drop-downs.
    pub fn makes(&self) -> Vec<String> {
        self.with_items(|vehicles| {
            let mut makes: Vec<String> = vehicles.iter().map(|v| v.make.clone()).collect();
            makes.sort();
            makes.dedup();
            makes
        })
    }
}

impl<G> EntityStore<Vehicle, G>
where
    G: EntityGateway<Vehicle> + VehicleStatusGateway + ?Sized,
{
    /// Change the status of a vehicle under `vehicle-status-<id>`.
    ///
    /// On success the stored vehicle and the selection are replaced with the
    /// returned record.
    pub async fn update_status(
        &self,
        id: &EntityId,
        status: VehicleStatus,
    ) -> Result<Vehicle, StoreError> {
        let key = OperationKey::action(Vehicle::KIND, "status", id);
        let vehicle = self
            .run(
                key,
                "Failed to update vehicle status",
                self.gateway().update_status(id, status),
            )
            .await?;
        self.replace(vehicle.clone());
        let message = format!("Vehicle status updated to {}", status.as_str());
        self.notifications().success(message);
        Ok(vehicle)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::test_support::vehicle;
    use rstest::rstest;

    #[rstest]
    #[case("toyota", 1)]
    #[case("ABC", 1)]
    #[case("1hgcm", 1)]
    #[case("blue", 1)]
    #[case("", 3)]
    #[case("tesla", 0)]
    fn search_spans_descriptive_fields(#[case] term: &str, #[case] expected: usize) {
        let vehicles = [
            vehicle("1", "Toyota", "Corolla", VehicleStatus::Active),
            vehicle("2", "Ford", "Transit", VehicleStatus::Maintenance),
            Vehicle {
                license_plate: "ABC-123".into(),
                vin: Some("1HGCM82633A004352".into()),
                color: Some("Blue".into()),
                ..vehicle("3", "Volvo", "XC90", VehicleStatus::Inactive)
            },
        ];
        let filter = VehicleFilter {
            search: term.to_owned(),
            ..VehicleFilter::default()
        };
        let matched = vehicles.iter().filter(|v| filter.matches(v)).count();
        assert_eq!(matched, expected);
    }

    #[test]
    fn exact_filters_combine_with_search() {
        let corolla = vehicle("1", "Toyota", "Corolla", VehicleStatus::Active);
        let filter = VehicleFilter {
            search: "cor".into(),
            status: Some(VehicleStatus::Active),
            make: Some("Toyota".into()),
            model: None,
        };
        assert!(filter.matches(&corolla));
        let wrong_make = VehicleFilter {
            make: Some("toyota".into()),
            ..filter
        };
        assert!(!wrong_make.matches(&corolla));
    }

    #[test]
    fn counts_tally_by_status() {
        let vehicles = [
            vehicle("1", "Toyota", "Corolla", VehicleStatus::Active),
            vehicle("2", "Ford", "Transit", VehicleStatus::Maintenance),
            vehicle("3", "Ford", "Focus", VehicleStatus::Active),
        ];
        assert_eq!(
            VehicleCounts::tally(&vehicles),
            VehicleCounts {
                total: 3,
                active: 2,
                maintenance: 1,
                inactive: 0,
            }
        );
    }

    #[test]
    fn decodes_backend_payload() {
        let payload = serde_json::json!({
            "id": "veh-1",
            "make": "Toyota",
            "model": "Corolla",
            "year": 2021,
            "licensePlate": "AB-12-CD",
            "fuelType": "HYBRID",
            "gpsEnabled": true,
            "lastMaintenanceDate": "2026-01-15",
            "status": "MAINTENANCE"
        });
        let vehicle: Vehicle = serde_json::from_value(payload).expect("vehicle decodes");
        assert_eq!(vehicle.fuel_type, Some(FuelType::Hybrid));
        assert_eq!(vehicle.status, VehicleStatus::Maintenance);
        assert!(vehicle.vin.is_none());
    }
}
