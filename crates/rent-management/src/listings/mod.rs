//! Apartment listings: publishing, role-scoped browsing and editing.

pub mod domain;
pub mod geocoding;
pub mod repository;
pub mod requests;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    apartment_list_template, apartment_template, Apartment, ApartmentFilter, ApartmentId,
    ApartmentListing, ApartmentState, Bounds,
};
pub use geocoding::{Coordinates, GeocodeError, Geocoder, NoGeocoder};
pub use repository::ApartmentRepository;
pub use requests::{ApartmentChanges, ListingQuery};
pub use router::listing_router;
pub use service::{ApartmentPage, ApartmentUpdate, ListingError, ListingService};
