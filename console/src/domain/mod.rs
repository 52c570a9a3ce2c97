//! Domain rules and stores for the fleet console.
//!
//! Purpose: keep role gating, route admission, entity state, operation
//! tracking, and notifications independent of any transport. Adapters live
//! in `crate::outbound` and reach the core through `ports`.
//!
//! Public surface:
//! - Role, RoleSet, RoleCatalogue: who the user is and how roles display.
//! - CapabilityGate, VisibilityRules, NavItem: role-based visibility.
//! - RouteGuard, RouteTable: navigation admission.
//! - EntityStore and the per-entity records (Vehicle, Driver, Trip,
//!   UserAccount, MaintenanceRecord).
//! - OperationTracker, NotificationCenter: loading, errors, and toasts.
//! - TokenRefreshTask: periodic session refresh.

pub mod driver;
pub mod entity;
pub mod http_failure;
pub mod maintenance;
pub mod notifications;
pub mod operation;
pub mod ports;
pub mod role_catalogue;
pub mod roles;
pub mod route_guard;
pub mod session;
pub mod store;
pub mod token_refresh;
pub mod trip;
pub mod user_account;
pub mod vehicle;
pub mod visibility;

pub use self::driver::{
    Driver, DriverCounts, DriverFilter, DriverInput, DriverSortField, DriverStatus, DriverStore,
};
pub use self::entity::{
    Entity, EntityFilter, EntityId, EntityIdValidationError, EntityKind, Sort, matches_search,
};
pub use self::maintenance::{
    CreateMaintenanceInput, MaintenanceFilter, MaintenancePriority, MaintenanceRecord,
    MaintenanceSortField, MaintenanceStatus, MaintenanceStore, MaintenanceType,
    UpdateMaintenanceInput,
};
pub use self::notifications::{
    Notification, NotificationCenter, NotificationDurations, NotificationId, Severity,
};
pub use self::operation::{
    OperationGuard, OperationKey, OperationKeyValidationError, OperationState, OperationStates,
    OperationTracker,
};
pub use self::role_catalogue::{RoleCatalogue, RoleDisplay};
pub use self::roles::{Role, RoleSet};
pub use self::route_guard::{
    NavigationDecision, RouteGuard, RoutePath, RoutePathValidationError, RouteRule, RouteTable,
};
pub use self::session::{AccessToken, Session, UserProfile};
pub use self::store::{EntityStore, StoreError, StoreState};
pub use self::token_refresh::{TokenRefreshHandle, TokenRefreshPolicy, TokenRefreshTask};
pub use self::trip::{
    Location, Trip, TripCounts, TripDriver, TripFilter, TripInput, TripSortField, TripStatus,
    TripStore, TripType, TripVehicle,
};
pub use self::user_account::{
    AccountRole, CreateUserInput, UpdateUserInput, UserAccount, UserAccountFilter,
    UserAccountSortField, UserAccountStore,
};
pub use self::vehicle::{
    FuelType, Vehicle, VehicleCounts, VehicleFilter, VehicleInput, VehicleSortField,
    VehicleStatus, VehicleStore,
};
pub use self::visibility::{
    CapabilityGate, NavItem, VisibilityRules, filter_by_visibility, is_visible,
};
