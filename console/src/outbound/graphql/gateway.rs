//! Entity gateways over the GraphQL client.
//!
//! Each entity names the top-level fields its operations use and how its
//! payloads are wrapped in variables. Everything else is shared.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::client::GraphqlClient;
use super::envelope::{acknowledge, decode_payload};
use crate::domain::ports::{EntityGateway, GatewayError, TripStatusGateway, VehicleStatusGateway};
use crate::domain::{
    Driver, Entity, EntityId, MaintenanceRecord, Trip, TripStatus, UserAccount, Vehicle,
    VehicleStatus,
};

/// Field used for vehicle status changes.
pub const VEHICLE_STATUS_FIELD: &str = "updateVehicleStatus";

/// Field used for trip status changes.
pub const TRIP_STATUS_FIELD: &str = "updateTripStatus";

/// Field used to cancel a trip.
pub const TRIP_CANCEL_FIELD: &str = "cancelTrip";

/// Top-level fields of one entity's operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationFields {
    /// Whole collection.
    pub fetch_all: &'static str,
    /// One record by id.
    pub fetch_one: &'static str,
    /// Create.
    pub create: &'static str,
    /// Update by id.
    pub update: &'static str,
    /// Delete by id.
    pub delete: &'static str,
}

impl OperationFields {
    /// Every field, in operation order.
    pub const fn all(&self) -> [&'static str; 5] {
        [
            self.fetch_all,
            self.fetch_one,
            self.create,
            self.update,
            self.delete,
        ]
    }
}

/// Entities served over GraphQL.
pub trait GraphqlEntity: Entity + DeserializeOwned {
    /// Operation fields.
    const FIELDS: OperationFields;

    /// Variables for the create mutation; `{ input }` by default.
    ///
    /// # Errors
    ///
    /// Returns an error when the draft cannot be encoded.
    fn create_variables(draft: &Self::Draft) -> Result<Map<String, Value>, serde_json::Error> {
        wrap("input", draft)
    }

    /// Variables for the update mutation; `{ id, input }` by default.
    ///
    /// # Errors
    ///
    /// Returns an error when the patch cannot be encoded.
    fn update_variables(
        id: &EntityId,
        patch: &Self::Patch,
    ) -> Result<Map<String, Value>, serde_json::Error> {
        let mut variables = wrap("input", patch)?;
        variables.insert("id".to_owned(), id_value(id));
        Ok(variables)
    }
}

fn wrap<T: Serialize>(name: &str, payload: &T) -> Result<Map<String, Value>, serde_json::Error> {
    let mut variables = Map::new();
    variables.insert(name.to_owned(), serde_json::to_value(payload)?);
    Ok(variables)
}

fn id_value(id: &EntityId) -> Value {
    Value::String(id.as_str().to_owned())
}

fn id_variables(id: &EntityId) -> Map<String, Value> {
    let mut variables = Map::new();
    variables.insert("id".to_owned(), id_value(id));
    variables
}

/// `{ input: { id, ..patch } }` for update inputs that carry their own id.
fn input_with_id<T: Serialize>(
    id: &EntityId,
    patch: &T,
) -> Result<Map<String, Value>, serde_json::Error> {
    let mut input = match serde_json::to_value(patch)? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    input.insert("id".to_owned(), id_value(id));
    let mut variables = Map::new();
    variables.insert("input".to_owned(), Value::Object(input));
    Ok(variables)
}

impl GraphqlEntity for Vehicle {
    const FIELDS: OperationFields = OperationFields {
        fetch_all: "getAllVehicle",
        fetch_one: "getVehicleById",
        create: "registerVehicle",
        update: "updateVehicle",
        delete: "deleteVehicle",
    };

    fn create_variables(draft: &Self::Draft) -> Result<Map<String, Value>, serde_json::Error> {
        wrap("vehicle", draft)
    }

    fn update_variables(
        id: &EntityId,
        patch: &Self::Patch,
    ) -> Result<Map<String, Value>, serde_json::Error> {
        let mut variables = wrap("vehicle", patch)?;
        variables.insert("id".to_owned(), id_value(id));
        Ok(variables)
    }
}

impl GraphqlEntity for Driver {
    const FIELDS: OperationFields = OperationFields {
        fetch_all: "drivers",
        fetch_one: "getDriverById",
        create: "createDriver",
        update: "updateDriver",
        delete: "deleteDriver",
    };
}

impl GraphqlEntity for UserAccount {
    const FIELDS: OperationFields = OperationFields {
        fetch_all: "users",
        fetch_one: "getUserById",
        create: "CreateUser",
        update: "updateUser",
        delete: "deleteUser",
    };

    fn create_variables(draft: &Self::Draft) -> Result<Map<String, Value>, serde_json::Error> {
        wrap("userDto", draft)
    }
}

impl GraphqlEntity for MaintenanceRecord {
    const FIELDS: OperationFields = OperationFields {
        fetch_all: "maintenanceRecords",
        fetch_one: "maintenanceRecord",
        create: "createMaintenanceRecord",
        update: "updateMaintenanceRecord",
        delete: "deleteMaintenanceRecord",
    };

    fn update_variables(
        id: &EntityId,
        patch: &Self::Patch,
    ) -> Result<Map<String, Value>, serde_json::Error> {
        input_with_id(id, patch)
    }
}

impl GraphqlEntity for Trip {
    const FIELDS: OperationFields = OperationFields {
        fetch_all: "getAllTrips",
        fetch_one: "getTripById",
        create: "createTrip",
        update: "updateTrip",
        delete: "deleteTrip",
    };

    fn update_variables(
        id: &EntityId,
        patch: &Self::Patch,
    ) -> Result<Map<String, Value>, serde_json::Error> {
        input_with_id(id, patch)
    }
}

/// Every document field the gateways may run.
pub fn required_documents() -> Vec<&'static str> {
    [
        Vehicle::FIELDS,
        Driver::FIELDS,
        UserAccount::FIELDS,
        MaintenanceRecord::FIELDS,
        Trip::FIELDS,
    ]
    .iter()
    .flat_map(OperationFields::all)
    .chain([VEHICLE_STATUS_FIELD, TRIP_STATUS_FIELD, TRIP_CANCEL_FIELD])
    .collect()
}

/// [`EntityGateway`] for `E` over a shared [`GraphqlClient`].
pub struct GraphqlGateway<E> {
    client: Arc<GraphqlClient>,
    entity: PhantomData<fn() -> E>,
}

impl<E> GraphqlGateway<E> {
    /// Gateway sending requests through `client`.
    pub const fn new(client: Arc<GraphqlClient>) -> Self {
        Self {
            client,
            entity: PhantomData,
        }
    }
}

fn encoding_failed(field: &str, err: &serde_json::Error) -> GatewayError {
    GatewayError::decode(format!("encode {field} variables: {err}"))
}

#[async_trait]
impl<E: GraphqlEntity> EntityGateway<E> for GraphqlGateway<E> {
    async fn fetch_all(&self) -> Result<Vec<E>, GatewayError> {
        let field = E::FIELDS.fetch_all;
        let value = self.client.execute(field, Map::new()).await?;
        decode_payload(field, value)
    }

    async fn fetch_one(&self, id: &EntityId) -> Result<E, GatewayError> {
        let field = E::FIELDS.fetch_one;
        let value = self.client.execute(field, id_variables(id)).await?;
        decode_payload(field, value)
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, GatewayError> {
        let field = E::FIELDS.create;
        let variables = E::create_variables(draft).map_err(|err| encoding_failed(field, &err))?;
        let value = self.client.execute(field, variables).await?;
        decode_payload(field, value)
    }

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, GatewayError> {
        let field = E::FIELDS.update;
        let variables =
            E::update_variables(id, patch).map_err(|err| encoding_failed(field, &err))?;
        let value = self.client.execute(field, variables).await?;
        decode_payload(field, value)
    }

    async fn delete(&self, id: &EntityId) -> Result<(), GatewayError> {
        let field = E::FIELDS.delete;
        let value = self.client.execute(field, id_variables(id)).await?;
        acknowledge(&value)
    }
}

#[async_trait]
impl VehicleStatusGateway for GraphqlGateway<Vehicle> {
    async fn update_status(
        &self,
        id: &EntityId,
        status: VehicleStatus,
    ) -> Result<Vehicle, GatewayError> {
        let mut variables = id_variables(id);
        variables.insert(
            "status".to_owned(),
            Value::String(status.as_str().to_owned()),
        );
        let value = self.client.execute(VEHICLE_STATUS_FIELD, variables).await?;
        decode_payload(VEHICLE_STATUS_FIELD, value)
    }
}

#[async_trait]
impl TripStatusGateway for GraphqlGateway<Trip> {
    async fn update_status(&self, id: &EntityId, status: TripStatus) -> Result<Trip, GatewayError> {
        let mut variables = id_variables(id);
        variables.insert(
            "status".to_owned(),
            Value::String(status.as_str().to_owned()),
        );
        let value = self.client.execute(TRIP_STATUS_FIELD, variables).await?;
        decode_payload(TRIP_STATUS_FIELD, value)
    }

    async fn cancel(&self, id: &EntityId, reason: Option<&str>) -> Result<Trip, GatewayError> {
        let mut variables = id_variables(id);
        let reason = reason.map_or(Value::Null, |text| Value::String(text.to_owned()));
        variables.insert("reason".to_owned(), reason);
        let value = self.client.execute(TRIP_CANCEL_FIELD, variables).await?;
        decode_payload(TRIP_CANCEL_FIELD, value)
    }
}
