use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};

use super::domain::ApartmentId;
use super::geocoding::Geocoder;
use super::repository::ApartmentRepository;
use super::requests::{ApartmentChanges, ListingQuery};
use super::service::{require_publisher, ListingError, ListingService};
use crate::accounts::{Authenticated, SessionIssuer, UserRepository};
use crate::body::JsonBody;

type Reply = Result<Json<Value>, ListingError>;

/// Router exposing `/apartment/*`. Every route requires a session.
pub fn listing_router<S, G>(
    service: Arc<ListingService<S, G>>,
    sessions: Arc<SessionIssuer>,
) -> Router
where
    S: ApartmentRepository + UserRepository + 'static,
    G: Geocoder + 'static,
{
    Router::new()
        .route("/apartment", post(create_handler::<S, G>))
        .route("/apartment/list", get(list_handler::<S, G>))
        .route(
            "/apartment/:apartmentId",
            get(get_handler::<S, G>)
                .delete(delete_handler::<S, G>)
                .patch(edit_handler::<S, G>),
        )
        .with_state(service)
        .layer(Extension(sessions))
}

pub(crate) async fn create_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Authenticated(caller): Authenticated,
    JsonBody(body): JsonBody,
) -> Reply
where
    S: ApartmentRepository + UserRepository + 'static,
    G: Geocoder + 'static,
{
    require_publisher(&caller)?;
    let changes = ApartmentChanges::for_create(&body)?;
    let apartment = service.create_apartment(&caller, changes).await?;
    Ok(Json(json!({ "apartment": apartment })))
}

pub(crate) async fn list_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Authenticated(caller): Authenticated,
    Query(params): Query<HashMap<String, String>>,
) -> Reply
where
    S: ApartmentRepository + UserRepository + 'static,
    G: Geocoder + 'static,
{
    let query = ListingQuery::from_query(&params, service.paging())?;
    let page = service.list_apartments(&caller, &query)?;
    Ok(Json(json!(page)))
}

pub(crate) async fn get_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Authenticated(caller): Authenticated,
    Path(apartment_id): Path<String>,
) -> Reply
where
    S: ApartmentRepository + UserRepository + 'static,
    G: Geocoder + 'static,
{
    let apartment = service.get_apartment(&caller, &ApartmentId(apartment_id))?;
    Ok(Json(json!({ "apartment": apartment })))
}

pub(crate) async fn delete_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Authenticated(caller): Authenticated,
    Path(apartment_id): Path<String>,
) -> Reply
where
    S: ApartmentRepository + UserRepository + 'static,
    G: Geocoder + 'static,
{
    let removed = service.delete_apartment(&caller, &ApartmentId(apartment_id))?;
    Ok(Json(json!({ "apartmentId": removed })))
}

pub(crate) async fn edit_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Authenticated(caller): Authenticated,
    Path(apartment_id): Path<String>,
    JsonBody(body): JsonBody,
) -> Reply
where
    S: ApartmentRepository + UserRepository + 'static,
    G: Geocoder + 'static,
{
    let changes = ApartmentChanges::for_update(&body)?;
    let update = service
        .edit_apartment(&caller, &ApartmentId(apartment_id), changes)
        .await?;
    Ok(Json(json!(update)))
}
