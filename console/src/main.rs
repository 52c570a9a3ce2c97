//! Fleet console entry point: checks navigation and summarises the fleet.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use fleet_console::config::ConsoleSettings;
use fleet_console::domain::ports::{FixtureIdentityProvider, IdentityProvider};
use fleet_console::domain::{
    Driver, DriverStore, EntityStore, MaintenanceRecord, MaintenanceStore, NavItem,
    NavigationDecision, NotificationCenter, RoleCatalogue, RouteGuard, RoutePath, RouteTable,
    StoreError, TokenRefreshTask, Trip, TripStore, UserAccount, UserAccountStore, Vehicle,
    VehicleStore,
};
use fleet_console::outbound::graphql::{
    DocumentSet, GraphqlClient, GraphqlGateway, ReqwestHttp, required_documents,
};
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `fleet-console` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fleet-console",
    about = "Check console navigation and summarise fleet data from the GraphQL API",
    version
)]
struct CliArgs {
    /// Route to check against the navigation guard. May be repeated.
    #[arg(long = "route", value_name = "path")]
    routes: Vec<String>,
    /// Only check routes; do not fetch fleet data.
    #[arg(long = "no-fetch")]
    no_fetch: bool,
}

struct Stores {
    vehicles: VehicleStore<GraphqlGateway<Vehicle>>,
    drivers: DriverStore<GraphqlGateway<Driver>>,
    trips: TripStore<GraphqlGateway<Trip>>,
    users: UserAccountStore<GraphqlGateway<UserAccount>>,
    maintenance: MaintenanceStore<GraphqlGateway<MaintenanceRecord>>,
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    // Command-line flags belong to clap; settings come from env and files.
    let settings = ConsoleSettings::load_from_iter([OsString::from("fleet-console")])
        .map_err(|error| io::Error::other(format!("load configuration: {error}")))?;

    let identity: Arc<dyn IdentityProvider> = if settings.development_identity {
        Arc::new(FixtureIdentityProvider::development())
    } else {
        Arc::new(FixtureIdentityProvider::signed_out())
    };
    let signed_in = identity
        .init()
        .await
        .map_err(|error| io::Error::other(format!("initialise identity provider: {error}")))?;
    if !signed_in {
        warn!("no signed-in session; navigation will require sign-in");
    }
    let refresh =
        TokenRefreshTask::spawn_if_signed_in(identity.clone(), settings.token_refresh_policy());

    let fallback = settings
        .fallback_route()
        .map_err(|error| io::Error::other(error.to_string()))?;
    let guard = RouteGuard::new(identity.clone(), RouteTable::fleet_defaults(fallback));
    for raw in &args.routes {
        let path = RoutePath::new(raw.as_str())
            .map_err(|error| io::Error::other(format!("route '{raw}': {error}")))?;
        match guard.check(&path).await {
            NavigationDecision::Admitted => println!("route {path}: admitted"),
            NavigationDecision::Redirect(target) => {
                println!("route {path}: redirected to {target}");
            }
            NavigationDecision::SignInRequired => println!("route {path}: sign-in required"),
        }
    }

    if let Some(session) = identity.session() {
        let catalogue = RoleCatalogue::default();
        let menu: Vec<String> = NavItem::visible_for(NavItem::fleet_menu(), session.roles())
            .into_iter()
            .map(|item| item.key)
            .collect();
        println!("user={}", session.profile().display_name());
        let roles = catalogue.display_names(session.roles());
        println!("roles={}", roles.join(", "));
        println!("menu={}", menu.join(", "));
    }

    if !args.no_fetch {
        let notifications = Arc::new(NotificationCenter::new(settings.notification_durations()));
        let stores = build_stores(&settings, identity, &notifications)?;
        load_stores(&stores).await;
        print_summary(&stores);
        notifications.shutdown();
    }

    if let Some(refresh) = refresh {
        refresh.cancel();
    }
    Ok(())
}

fn build_stores(
    settings: &ConsoleSettings,
    identity: Arc<dyn IdentityProvider>,
    notifications: &Arc<NotificationCenter>,
) -> io::Result<Stores> {
    let endpoint = settings
        .graphql_endpoint()
        .map_err(|error| io::Error::other(error.to_string()))?;
    let http = ReqwestHttp::new(endpoint, settings.request_timeout())
        .map_err(|error| io::Error::other(format!("create HTTP client: {error}")))?;
    let documents_dir = settings.documents_dir();
    let documents = DocumentSet::load(&documents_dir, required_documents())
        .map_err(|error| io::Error::other(format!("load GraphQL documents: {error}")))?;
    info!(
        endpoint = %http.endpoint(),
        documents = documents.len(),
        "graphql transport ready"
    );
    let client = Arc::new(
        GraphqlClient::new(Arc::new(http), identity, documents)
            .with_retry_policy(settings.retry_policy()),
    );

    Ok(Stores {
        vehicles: EntityStore::new(
            Arc::new(GraphqlGateway::new(client.clone())),
            notifications.clone(),
        ),
        drivers: EntityStore::new(
            Arc::new(GraphqlGateway::new(client.clone())),
            notifications.clone(),
        ),
        trips: EntityStore::new(
            Arc::new(GraphqlGateway::new(client.clone())),
            notifications.clone(),
        ),
        users: EntityStore::new(
            Arc::new(GraphqlGateway::new(client.clone())),
            notifications.clone(),
        ),
        maintenance: EntityStore::new(
            Arc::new(GraphqlGateway::new(client)),
            notifications.clone(),
        ),
    })
}

async fn load_stores(stores: &Stores) {
    let (vehicles, drivers, trips, users, maintenance) = tokio::join!(
        stores.vehicles.load_all(),
        stores.drivers.load_all(),
        stores.trips.load_all(),
        stores.users.load_all(),
        stores.maintenance.load_all(),
    );
    for (kind, outcome) in [
        ("vehicles", vehicles),
        ("drivers", drivers),
        ("trips", trips),
        ("users", users),
        ("maintenance", maintenance),
    ] {
        report_load(kind, outcome);
    }
}

fn report_load(kind: &str, outcome: Result<usize, StoreError>) {
    match outcome {
        Ok(count) => info!(kind, count, "collection loaded"),
        Err(error) => warn!(kind, error = %error, "collection failed to load"),
    }
}

fn print_summary(stores: &Stores) {
    let now = Utc::now();
    let vehicles = stores.vehicles.counts();
    let drivers = stores.drivers.counts();
    let trips = stores.trips.counts();
    println!(
        "vehicles total={} active={} maintenance={} inactive={}",
        vehicles.total, vehicles.active, vehicles.maintenance, vehicles.inactive
    );
    println!(
        "drivers total={} active={} on_leave={} suspended={} inactive={}",
        drivers.total, drivers.active, drivers.on_leave, drivers.suspended, drivers.inactive
    );
    println!(
        "trips total={} scheduled={} in_progress={} completed={} cancelled={}",
        trips.total, trips.scheduled, trips.in_progress, trips.completed, trips.cancelled
    );
    println!("users total={}", stores.users.len());
    println!(
        "maintenance total={} overdue={} upcoming={} critical={}",
        stores.maintenance.len(),
        stores.maintenance.overdue(now).len(),
        stores.maintenance.upcoming(now).len(),
        stores.maintenance.critical().len()
    );
}
