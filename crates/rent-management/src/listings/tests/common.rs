use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::{json, Value};

use crate::accounts::tests::common::epoch;
use crate::accounts::{User, UserId, UserRole};
use crate::listings::{
    Apartment, ApartmentId, ApartmentRepository, ApartmentState, Coordinates, GeocodeError,
    Geocoder, ListingService, NoGeocoder,
};
use crate::paging::PageLimits;
use crate::storage::InMemoryStore;

/// Resolves every address to the same point.
pub(crate) struct FixedGeocoder(pub Coordinates);

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn locate(&self, _address: &str) -> Result<Coordinates, GeocodeError> {
        Ok(self.0)
    }
}

/// Knows no address at all.
pub(crate) struct UnknownAddressGeocoder;

#[async_trait]
impl Geocoder for UnknownAddressGeocoder {
    async fn locate(&self, _address: &str) -> Result<Coordinates, GeocodeError> {
        Err(GeocodeError::NotFound)
    }
}

pub(crate) const FIFTH_AVENUE: Coordinates = Coordinates {
    latitude: 40.7736,
    longitude: -73.9656,
};

pub(crate) fn build_listing_service<G: Geocoder + 'static>(
    geocoder: G,
) -> (ListingService<InMemoryStore, G>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let service = ListingService::new(store.clone(), Arc::new(geocoder), PageLimits::default());
    (service, store)
}

type OfflineListings = (ListingService<InMemoryStore, NoGeocoder>, Arc<InMemoryStore>);

pub(crate) fn offline_listing_service() -> OfflineListings {
    build_listing_service(NoGeocoder)
}

/// A complete, valid create body located by coordinates.
pub(crate) fn apartment_body() -> Value {
    json!({
        "name": "Loft",
        "description": "Sunny loft near the park",
        "size": 54,
        "price": 1200,
        "rooms": 2,
        "latitude": 40.7,
        "longitude": -73.9,
        "state": "rentable"
    })
}

/// Stores a listing owned by `realtor`, created `minutes` after the shared epoch.
pub(crate) fn seed_apartment(
    store: &InMemoryStore,
    realtor: &User,
    name: &str,
    state: ApartmentState,
    price: f64,
    minutes: i64,
) -> Apartment {
    store
        .insert_apartment(Apartment {
            id: ApartmentId::generate(),
            realtor: realtor.id.clone(),
            name: name.to_string(),
            description: format!("{name} description"),
            size: 50.0,
            price,
            rooms: 2,
            latitude: 40.0,
            longitude: -73.0,
            address: None,
            state,
            created_at: epoch() + Duration::minutes(minutes),
        })
        .expect("apartment stored")
}

/// A realtor that owns listings but is no longer stored.
pub(crate) fn departed_realtor() -> User {
    let mut user = User::with_email(
        "gone@example.com".to_string(),
        "hash".to_string(),
        UserRole::Realtor,
        true,
    );
    user.id = UserId("realtor-that-left".to_string());
    user
}
