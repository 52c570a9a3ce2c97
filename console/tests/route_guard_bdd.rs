//! Behaviour tests for role-gated navigation.
//!
//! These scenarios drive the route guard over the fixture identity
//! provider and the fleet route table.

use std::cell::RefCell;
use std::sync::Arc;

use chrono::{Duration, Utc};
use fleet_console::domain::ports::FixtureIdentityProvider;
use fleet_console::domain::{
    AccessToken, NavigationDecision, RoleSet, RouteGuard, RoutePath, RouteTable, Session,
    UserProfile,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;

struct RouteGuardWorld {
    runtime: Runtime,
    identity: RefCell<Option<Arc<FixtureIdentityProvider>>>,
    decision: RefCell<Option<NavigationDecision>>,
}

impl RouteGuardWorld {
    fn new() -> Self {
        Self {
            runtime: Runtime::new().expect("create runtime"),
            identity: RefCell::new(None),
            decision: RefCell::new(None),
        }
    }

    fn install(&self, identity: FixtureIdentityProvider) {
        *self.identity.borrow_mut() = Some(Arc::new(identity));
    }

    fn identity(&self) -> Arc<FixtureIdentityProvider> {
        self.identity
            .borrow()
            .clone()
            .expect("identity should be configured by a given step")
    }

    fn navigate(&self, raw: &str) {
        let path = RoutePath::new(raw).expect("feature paths are absolute");
        let fallback = RoutePath::new("/dashboard").expect("fallback path");
        let guard = RouteGuard::new(self.identity(), RouteTable::fleet_defaults(fallback));
        let decision = self.runtime.block_on(guard.check(&path));
        *self.decision.borrow_mut() = Some(decision);
    }

    fn decision(&self) -> NavigationDecision {
        self.decision
            .borrow()
            .clone()
            .expect("navigation should have been attempted")
    }
}

fn session_with_roles(roles: &str) -> Session {
    Session::authenticated(
        "user-7",
        RoleSet::new(roles.split(',').map(str::trim)),
        AccessToken::new("token-7"),
        UserProfile::default(),
    )
}

#[fixture]
fn world() -> RouteGuardWorld {
    RouteGuardWorld::new()
}

#[given("an expired session with roles {roles}")]
fn an_expired_session_with_roles(world: &RouteGuardWorld, roles: String) {
    let session = session_with_roles(&roles).expiring_at(Utc::now() - Duration::minutes(5));
    world.install(FixtureIdentityProvider::signed_in(session));
}

#[given("a signed-in user with roles {roles}")]
fn a_signed_in_user_with_roles(world: &RouteGuardWorld, roles: String) {
    let session = session_with_roles(&roles);
    world.install(FixtureIdentityProvider::signed_in(session));
}

#[given("no signed-in user")]
fn no_signed_in_user(world: &RouteGuardWorld) {
    world.install(FixtureIdentityProvider::signed_out());
}

#[when("the user navigates to {path}")]
fn the_user_navigates_to(world: &RouteGuardWorld, path: String) {
    world.navigate(&path);
}

#[then("navigation is admitted")]
fn navigation_is_admitted(world: &RouteGuardWorld) {
    assert_eq!(world.decision(), NavigationDecision::Admitted);
}

#[then("navigation is redirected to {target}")]
fn navigation_is_redirected_to(world: &RouteGuardWorld, target: String) {
    let expected = RoutePath::new(target).expect("feature paths are absolute");
    assert_eq!(world.decision(), NavigationDecision::Redirect(expected));
}

#[then("sign-in is required")]
fn sign_in_is_required(world: &RouteGuardWorld) {
    assert_eq!(world.decision(), NavigationDecision::SignInRequired);
}

#[then("the sign-in flow was started")]
fn the_sign_in_flow_was_started(world: &RouteGuardWorld) {
    assert_eq!(world.identity().login_calls(), 1);
}

#[scenario(path = "tests/features/route_guard.feature")]
fn route_guard_scenarios(world: RouteGuardWorld) {
    drop(world);
}
