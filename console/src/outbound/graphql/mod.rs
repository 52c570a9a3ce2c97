//! GraphQL transport adapter.
//!
//! Provides the `EntityGateway`, `VehicleStatusGateway`, and
//! `TripStatusGateway` ports over a single GraphQL endpoint. Documents are
//! plain `.graphql` files named after the operation's top-level field.

mod client;
mod documents;
mod envelope;
mod gateway;
mod http;

pub use client::{GraphqlClient, RetrySleeper, TokioSleeper};
pub use documents::{DocumentError, DocumentSet};
pub use gateway::{
    GraphqlEntity, GraphqlGateway, OperationFields, TRIP_CANCEL_FIELD, TRIP_STATUS_FIELD,
    VEHICLE_STATUS_FIELD, required_documents,
};
pub use http::{GraphqlHttp, HttpReply, NetworkFailure, ReqwestHttp};
