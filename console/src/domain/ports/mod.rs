//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod entity_gateway;
mod identity_provider;

pub use entity_gateway::{EntityGateway, GatewayError, TripStatusGateway, VehicleStatusGateway};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{
    DEVELOPMENT_USER_ID, FixtureIdentityProvider, IdentityError, IdentityProvider,
};
