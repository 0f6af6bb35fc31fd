use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use rent_management::accounts::{
    account_router, AccountService, Mailer, SessionIssuer, UserRepository,
    VerificationTokenRepository,
};
use rent_management::listings::{listing_router, ApartmentRepository, Geocoder, ListingService};
use serde_json::json;
use std::sync::Arc;

/// The account and listing APIs plus the operational endpoints.
pub(crate) fn with_operational_routes<S, M, G>(
    accounts: Arc<AccountService<S, M>>,
    listings: Arc<ListingService<S, G>>,
    sessions: Arc<SessionIssuer>,
) -> Router
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
    G: Geocoder + 'static,
{
    account_router(accounts)
        .merge(listing_router(listings, sessions))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
