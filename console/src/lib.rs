//! Fleet console core: role gating, entity stores, and notifications.
//!
//! The crate is organised as a hexagon. `domain` holds the rules and the
//! stores, `domain::ports` names what the core needs from the outside
//! world (identity provider, entity gateways), and `outbound` provides the
//! GraphQL transport adapter.

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
