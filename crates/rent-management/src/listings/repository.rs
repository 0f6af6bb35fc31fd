use super::domain::{Apartment, ApartmentFilter, ApartmentId};
use crate::accounts::UserId;
use crate::storage::RepositoryError;

/// Storage abstraction for apartment listings.
pub trait ApartmentRepository: Send + Sync {
    fn insert_apartment(&self, apartment: Apartment) -> Result<Apartment, RepositoryError>;
    fn update_apartment(&self, apartment: Apartment) -> Result<(), RepositoryError>;
    fn fetch_apartment(&self, id: &ApartmentId) -> Result<Option<Apartment>, RepositoryError>;
    fn count_apartments(&self, filter: &ApartmentFilter) -> Result<usize, RepositoryError>;
    /// Newest first, at most `limit` entries.
    fn list_apartments(
        &self,
        filter: &ApartmentFilter,
        limit: usize,
    ) -> Result<Vec<Apartment>, RepositoryError>;
    fn delete_apartment(&self, id: &ApartmentId) -> Result<(), RepositoryError>;
    /// Removes every listing owned by `realtor`, returning how many were dropped.
    fn delete_apartments_of(&self, realtor: &UserId) -> Result<usize, RepositoryError>;
}
