use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::accounts::{
    Identity, User, UserId, UserRepository, VerificationToken, VerificationTokenRepository,
};
use crate::listings::{Apartment, ApartmentFilter, ApartmentId, ApartmentRepository};

#[derive(Debug, Default)]
struct Collections {
    users: BTreeMap<UserId, User>,
    tokens: HashMap<String, VerificationToken>,
    apartments: BTreeMap<ApartmentId, Apartment>,
}

/// Process-local store implementing every repository trait.
///
/// Cloning shares the underlying collections.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    collections: Arc<Mutex<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, RepositoryError> {
        self.collections
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

/// Newest first; ties broken by descending id so paging is stable.
fn newest_first<'a, T: 'a, K: Ord + 'a>(
    entries: impl Iterator<Item = (&'a K, &'a T)>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<&'a T> {
    let mut sorted: Vec<(&K, &T)> = entries.collect();
    sorted.sort_by_key(|&(key, value)| Reverse((created_at(value), key)));
    sorted.into_iter().map(|(_, value)| value).collect()
}

fn created_before(before: Option<DateTime<Utc>>, created_at: DateTime<Utc>) -> bool {
    before.map_or(true, |before| created_at < before)
}

/// Whether a user other than `user` already signs in with `user`'s identity.
fn identity_taken(users: &BTreeMap<UserId, User>, user: &User) -> bool {
    user.identity().is_some_and(|identity| {
        users
            .values()
            .any(|other| other.id != user.id && identity.matches(other))
    })
}

impl Collections {
    fn purge_expired_tokens(&mut self, now: DateTime<Utc>) {
        self.tokens.retain(|_, token| !token.is_expired(now));
    }
}

impl UserRepository for InMemoryStore {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.users.contains_key(&user.id) || identity_taken(&guard.users, &user) {
            return Err(RepositoryError::Conflict);
        }
        guard.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn update_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if identity_taken(&guard.users, &user) {
            return Err(RepositoryError::Conflict);
        }
        match guard.users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    fn find_user(&self, identity: Identity<'_>) -> Result<Option<User>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .users
            .values()
            .find(|user| identity.matches(user))
            .cloned())
    }

    fn count_users(&self, before: Option<DateTime<Utc>>) -> Result<usize, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .users
            .values()
            .filter(|user| created_before(before, user.created_at))
            .count())
    }

    fn list_users(
        &self,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<User>, RepositoryError> {
        let guard = self.lock()?;
        let matching = guard
            .users
            .iter()
            .filter(|(_, user)| created_before(before, user.created_at));
        let page = newest_first(matching, |user| user.created_at)
            .into_iter()
            .take(limit)
            .cloned()
            .collect();
        Ok(page)
    }

    fn delete_user(&self, id: &UserId) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard
            .users
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl VerificationTokenRepository for InMemoryStore {
    fn insert_token(&self, token: VerificationToken) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.purge_expired_tokens(Utc::now());
        if guard.tokens.contains_key(&token.token) {
            return Err(RepositoryError::Conflict);
        }
        guard.tokens.insert(token.token.clone(), token);
        Ok(())
    }

    /// Expired tokens are dropped before the lookup, so they are never returned.
    fn fetch_token(&self, token: &str) -> Result<Option<VerificationToken>, RepositoryError> {
        let mut guard = self.lock()?;
        guard.purge_expired_tokens(Utc::now());
        Ok(guard.tokens.get(token).cloned())
    }

    fn delete_token(&self, token: &str) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard
            .tokens
            .remove(token)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn delete_tokens_of(&self, user: &UserId) -> Result<usize, RepositoryError> {
        let mut guard = self.lock()?;
        let before = guard.tokens.len();
        guard.tokens.retain(|_, token| &token.user != user);
        Ok(before - guard.tokens.len())
    }
}

impl ApartmentRepository for InMemoryStore {
    fn insert_apartment(&self, apartment: Apartment) -> Result<Apartment, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.apartments.contains_key(&apartment.id) {
            return Err(RepositoryError::Conflict);
        }
        guard
            .apartments
            .insert(apartment.id.clone(), apartment.clone());
        Ok(apartment)
    }

    fn update_apartment(&self, apartment: Apartment) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        match guard.apartments.get_mut(&apartment.id) {
            Some(stored) => {
                *stored = apartment;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_apartment(&self, id: &ApartmentId) -> Result<Option<Apartment>, RepositoryError> {
        Ok(self.lock()?.apartments.get(id).cloned())
    }

    fn count_apartments(&self, filter: &ApartmentFilter) -> Result<usize, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .apartments
            .values()
            .filter(|apartment| filter.matches(apartment))
            .count())
    }

    fn list_apartments(
        &self,
        filter: &ApartmentFilter,
        limit: usize,
    ) -> Result<Vec<Apartment>, RepositoryError> {
        let guard = self.lock()?;
        let matching = guard
            .apartments
            .iter()
            .filter(|(_, apartment)| filter.matches(apartment));
        let page = newest_first(matching, |apartment| apartment.created_at)
            .into_iter()
            .take(limit)
            .cloned()
            .collect();
        Ok(page)
    }

    fn delete_apartment(&self, id: &ApartmentId) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard
            .apartments
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn delete_apartments_of(&self, realtor: &UserId) -> Result<usize, RepositoryError> {
        let mut guard = self.lock()?;
        let before = guard.apartments.len();
        guard
            .apartments
            .retain(|_, apartment| &apartment.realtor != realtor);
        Ok(before - guard.apartments.len())
    }
}
