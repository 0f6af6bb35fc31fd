use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::domain::{
    apartment_list_template, apartment_template, Apartment, ApartmentId, ApartmentListing,
};
use super::geocoding::{GeocodeError, Geocoder};
use super::repository::ApartmentRepository;
use super::requests::{ApartmentChanges, ListingQuery};
use crate::accounts::{Principal, UserId, UserRepository, UserRole};
use crate::error::error_response;
use crate::paging::PageLimits;
use crate::shape::{filter, ToPlainData};
use crate::storage::RepositoryError;
use crate::validation::ValidationError;

/// One page of `GET /apartment/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ApartmentPage {
    #[serde(rename = "totalCounts")]
    pub total_counts: usize,
    pub apartments: Value,
}

/// Result of a successful edit: the listing id and the changes applied.
#[derive(Debug, Clone, Serialize)]
pub struct ApartmentUpdate {
    #[serde(rename = "apartmentId")]
    pub apartment_id: ApartmentId,
    pub updated: Value,
}

/// Apartment listing flows with role-based visibility.
pub struct ListingService<S, G> {
    store: Arc<S>,
    geocoder: Arc<G>,
    paging: PageLimits,
}

impl<S, G> ListingService<S, G>
where
    S: ApartmentRepository + UserRepository + 'static,
    G: Geocoder + 'static,
{
    pub fn new(store: Arc<S>, geocoder: Arc<G>, paging: PageLimits) -> Self {
        Self {
            store,
            geocoder,
            paging,
        }
    }

    pub fn paging(&self) -> PageLimits {
        self.paging
    }

    /// Publishes a listing owned by the caller. The returned document has
    /// its realtor populated from the caller's session.
    pub async fn create_apartment(
        &self,
        caller: &Principal,
        mut changes: ApartmentChanges,
    ) -> Result<Value, ListingError> {
        require_publisher(caller)?;
        self.resolve_address(&mut changes).await?;

        let apartment = self
            .store
            .insert_apartment(changes.into_apartment(caller.id.clone())?)?;
        info!(realtor = %caller.id, apartment = %apartment.id, "published apartment");

        let listing = ApartmentListing {
            apartment: &apartment,
            realtor: Some(Cow::Borrowed(caller.profile())),
        };
        Ok(filter(&listing, apartment_template()))
    }

    pub fn list_apartments(
        &self,
        caller: &Principal,
        query: &ListingQuery,
    ) -> Result<ApartmentPage, ListingError> {
        let selection = query.filter_for(caller);
        let total_counts = self.store.count_apartments(&selection)?;
        let apartments = self.store.list_apartments(&selection, query.page_size)?;

        let mut realtors: HashMap<UserId, Value> = HashMap::new();
        for apartment in &apartments {
            if realtors.contains_key(&apartment.realtor) {
                continue;
            }
            let realtor = self
                .store
                .fetch_user(&apartment.realtor)?
                .map_or(Value::Null, |user| user.to_plain_data().into_owned());
            realtors.insert(apartment.realtor.clone(), realtor);
        }

        let listings: Vec<Value> = apartments
            .iter()
            .map(|apartment| {
                ApartmentListing {
                    apartment,
                    realtor: realtors.get(&apartment.realtor).map(Cow::Borrowed),
                }
                .to_plain_data()
                .into_owned()
            })
            .collect();

        Ok(ApartmentPage {
            total_counts,
            apartments: filter(&listings, apartment_list_template()),
        })
    }

    /// Returns the stored listing; `realtor` stays a plain id here.
    pub fn get_apartment(
        &self,
        caller: &Principal,
        id: &ApartmentId,
    ) -> Result<Value, ListingError> {
        let apartment = self.fetch(id)?;
        if caller.role == UserRole::Realtor && apartment.realtor != caller.id {
            warn!(user = %caller.id, apartment = %id, "realtor read another realtor's listing");
            return Err(ListingError::Forbidden);
        }
        Ok(filter(&apartment, apartment_template()))
    }

    pub fn delete_apartment(
        &self,
        caller: &Principal,
        id: &ApartmentId,
    ) -> Result<ApartmentId, ListingError> {
        let apartment = self.fetch(id)?;
        require_manager(caller, &apartment)?;
        self.store.delete_apartment(&apartment.id)?;
        info!(user = %caller.id, apartment = %apartment.id, "deleted apartment");
        Ok(apartment.id)
    }

    pub async fn edit_apartment(
        &self,
        caller: &Principal,
        id: &ApartmentId,
        mut changes: ApartmentChanges,
    ) -> Result<ApartmentUpdate, ListingError> {
        let mut apartment = self.fetch(id)?;
        require_manager(caller, &apartment)?;
        self.resolve_address(&mut changes).await?;

        changes.apply(&mut apartment);
        self.store.update_apartment(apartment.clone())?;
        info!(user = %caller.id, apartment = %apartment.id, "updated apartment");

        Ok(ApartmentUpdate {
            apartment_id: apartment.id,
            updated: changes.to_json(),
        })
    }

    fn fetch(&self, id: &ApartmentId) -> Result<Apartment, ListingError> {
        self.store
            .fetch_apartment(id)?
            .ok_or(ListingError::NotFound)
    }

    /// Replaces the coordinates with the looked-up location of `address`.
    /// Caller-supplied coordinates are kept when no geocoder is reachable.
    async fn resolve_address(&self, changes: &mut ApartmentChanges) -> Result<(), ListingError> {
        let Some(address) = changes.address.clone() else {
            return Ok(());
        };

        match self.geocoder.locate(&address).await {
            Ok(location) => {
                changes.latitude = Some(location.latitude);
                changes.longitude = Some(location.longitude);
                Ok(())
            }
            Err(GeocodeError::Unavailable(reason)) if changes.has_coordinates() => {
                warn!(%reason, "geocoder unavailable, keeping supplied coordinates");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "address lookup failed");
                Err(ListingError::InvalidAddress)
            }
        }
    }
}

/// Only realtors and admins may publish listings.
pub fn require_publisher(caller: &Principal) -> Result<(), ListingError> {
    match caller.role {
        UserRole::Realtor | UserRole::Admin => Ok(()),
        UserRole::Client => {
            warn!(user = %caller.id, "client attempted to publish a listing");
            Err(ListingError::Forbidden)
        }
    }
}

fn require_manager(caller: &Principal, apartment: &Apartment) -> Result<(), ListingError> {
    let allowed = caller.is_admin()
        || (caller.role == UserRole::Realtor && apartment.realtor == caller.id);
    if allowed {
        Ok(())
    } else {
        warn!(user = %caller.id, apartment = %apartment.id, "listing change refused");
        Err(ListingError::Forbidden)
    }
}

/// Error raised by the listing flows. Its display text is what clients see.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No permission")]
    Forbidden,
    #[error("Cannot find apartment")]
    NotFound,
    #[error("Invalid address")]
    InvalidAddress,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ListingError {
    pub fn status(&self) -> StatusCode {
        match self {
            ListingError::Validation(_) | ListingError::InvalidAddress => StatusCode::BAD_REQUEST,
            ListingError::Forbidden => StatusCode::FORBIDDEN,
            ListingError::NotFound => StatusCode::NOT_FOUND,
            ListingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ListingError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "listing request failed");
            return error_response(status, "Server error");
        }
        error_response(status, self.to_string())
    }
}
