//! Port for the remote side of an entity store.
//!
//! Adapters turn whatever the backend returns into a tagged result: the
//! record on success, a [`GatewayError`] otherwise. Stores never see raw
//! response shapes.

use async_trait::async_trait;

use crate::domain::{Entity, EntityId, Trip, TripStatus, Vehicle, VehicleStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised by entity gateway adapters.
    pub enum GatewayError {
        /// The backend refused the request and said why.
        Rejected { message: String } => "{message}",
        /// The backend refused the request without a message.
        Declined => "request declined by the server",
        /// HTTP or network failure, already classified for display.
        /// `status` is `0` when no response arrived.
        Transport { status: u16, message: String } => "{message}",
        /// The session was rejected; sign-in has been triggered.
        Unauthenticated => "authentication required",
        /// The response did not have the expected shape.
        Decode { message: String } => "unexpected response shape: {message}",
    }
}

impl GatewayError {
    /// Message suitable for showing to the user, when the remote side or the
    /// failure classification supplied one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message } | Self::Transport { message, .. } => Some(message.as_str()),
            Self::Declined | Self::Unauthenticated | Self::Decode { .. } => None,
        }
    }
}

/// Remote collection operations for one entity type.
#[async_trait]
pub trait EntityGateway<E: Entity>: Send + Sync {
    /// Fetch the whole collection.
    async fn fetch_all(&self) -> Result<Vec<E>, GatewayError>;

    /// Fetch one record by id.
    async fn fetch_one(&self, id: &EntityId) -> Result<E, GatewayError>;

    /// Create a record and return it as stored.
    async fn create(&self, draft: &E::Draft) -> Result<E, GatewayError>;

    /// Update a record and return it as stored.
    async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, GatewayError>;

    /// Delete a record.
    async fn delete(&self, id: &EntityId) -> Result<(), GatewayError>;
}

/// Status transitions for vehicles, which have a dedicated mutation.
#[async_trait]
pub trait VehicleStatusGateway: Send + Sync {
    /// Set the status of a vehicle and return it as stored.
    async fn update_status(
        &self,
        id: &EntityId,
        status: VehicleStatus,
    ) -> Result<Vehicle, GatewayError>;
}

/// Lifecycle transitions for trips.
#[async_trait]
pub trait TripStatusGateway: Send + Sync {
    /// Move a trip to `status` and return it as stored.
    async fn update_status(
        &self,
        id: &EntityId,
        status: TripStatus,
    ) -> Result<Trip, GatewayError>;

    /// Cancel a trip, optionally recording why.
    async fn cancel(&self, id: &EntityId, reason: Option<&str>) -> Result<Trip, GatewayError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(GatewayError::rejected("Plate already registered"), Some("Plate already registered"))]
    #[case(
        GatewayError::transport(500_u16, "Server error. Please try again later."),
        Some("Server error. Please try again later.")
    )]
    #[case(GatewayError::declined(), None)]
    #[case(GatewayError::unauthenticated(), None)]
    #[case(GatewayError::decode("missing field `id`"), None)]
    fn user_message_only_for_explained_failures(
        #[case] err: GatewayError,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(err.user_message(), expected);
    }
}
