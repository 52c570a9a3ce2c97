//! Outbound adapters implementing domain ports for external services.
//!
//! - **graphql**: reqwest-backed GraphQL transport serving every entity
//!   gateway.
//!
//! Adapters translate between wire shapes and domain types. They contain no
//! business rules beyond failure classification.

pub mod graphql;
