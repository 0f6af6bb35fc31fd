use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfiguredGeocoder, LogMailer};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rent_management::accounts::{AccountService, AccountSettings, SessionIssuer};
use rent_management::config::AppConfig;
use rent_management::error::AppError;
use rent_management::listings::ListingService;
use rent_management::storage::InMemoryStore;
use rent_management::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryStore::new());
    let sessions = Arc::new(SessionIssuer::from_config(&config.auth)?);
    let accounts = Arc::new(AccountService::new(
        store.clone(),
        Arc::new(LogMailer),
        sessions.clone(),
        AccountSettings::from_config(&config),
    ));
    let geocoder = ConfiguredGeocoder::from_api_key(config.geocoding.google_api_key.as_deref());
    let listings = Arc::new(ListingService::new(
        store,
        Arc::new(geocoder),
        config.paging,
    ));

    if let Some(seed) = &config.admin {
        let admin = accounts.ensure_admin(&seed.email, &seed.password)?;
        info!(user = %admin.id, "admin account available");
    }

    let app = with_operational_routes(accounts, listings, sessions)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rent management api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
