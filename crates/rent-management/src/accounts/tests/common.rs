use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::accounts::{
    hash_password, AccountService, AccountSettings, Identity, MailError, Mailer, OutboundEmail,
    Principal, SessionIssuer, User, UserId, UserRepository, UserRole, VerificationToken,
    VerificationTokenRepository,
};
use crate::listings::{Apartment, ApartmentFilter, ApartmentId, ApartmentRepository};
use crate::storage::{InMemoryStore, RepositoryError};

pub(crate) const PASSWORD: &str = "open sesame";
/// Cheapest bcrypt work factor, to keep the suites fast.
pub(crate) const PASSWORD_COST: u32 = 4;

pub(crate) fn settings() -> AccountSettings {
    AccountSettings {
        password_cost: PASSWORD_COST,
        ..AccountSettings::default()
    }
}

pub(crate) fn issuer() -> Arc<SessionIssuer> {
    Arc::new(SessionIssuer::new(
        b"account-tests-secret",
        chrono::Duration::hours(1),
    ))
}

pub(crate) fn build_service() -> (
    AccountService<InMemoryStore, MemoryMailer>,
    Arc<InMemoryStore>,
    Arc<MemoryMailer>,
) {
    let store = Arc::new(InMemoryStore::new());
    let mailer = Arc::new(MemoryMailer::default());
    let service = AccountService::new(
        store.clone(),
        mailer.clone(),
        issuer(),
        settings(),
    );
    (service, store, mailer)
}

pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Stores an email account with [`PASSWORD`], created `minutes` after [`epoch`].
pub(crate) fn seed_user(
    store: &InMemoryStore,
    email: &str,
    role: UserRole,
    minutes: i64,
) -> User {
    let hash = hash_password(PASSWORD, PASSWORD_COST).expect("password hashes");
    let mut user = User::with_email(email.to_string(), hash, role, true);
    user.created_at = epoch() + Duration::minutes(minutes);
    store.insert_user(user).expect("user stored")
}

pub(crate) fn principal(user: &User) -> Principal {
    Principal::from_claims(&user.view()).expect("user view forms a principal")
}

pub(crate) fn bearer(issuer: &SessionIssuer, user: &User) -> String {
    let session = issuer.issue(&user.view()).expect("session issued");
    format!("Bearer {}", session.token)
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(authorization) = authorization {
        builder = builder.header(header::AUTHORIZATION, authorization);
    }
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&body).expect("serializable body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request builds")
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Pulls the verification token out of a sign-up mail.
pub(crate) fn token_from_mail(mail: &OutboundEmail) -> String {
    let (_, rest) = mail
        .html
        .split_once("/verify-email/")
        .expect("mail carries a verification link");
    rest.split('"').next().expect("link is quoted").to_string()
}

#[derive(Default, Clone)]
pub(crate) struct MemoryMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl MemoryMailer {
    pub(crate) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, message: OutboundEmail) -> Result<(), MailError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(message);
        Ok(())
    }
}

pub(crate) struct OfflineMailer;

impl Mailer for OfflineMailer {
    fn send(&self, _message: OutboundEmail) -> Result<(), MailError> {
        Err(MailError::Transport("relay refused connection".to_string()))
    }
}

/// Store whose every call fails, for exercising the 500 path.
pub(crate) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl UserRepository for UnavailableStore {
    fn insert_user(&self, _user: User) -> Result<User, RepositoryError> {
        offline()
    }

    fn update_user(&self, _user: User) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_user(&self, _id: &UserId) -> Result<Option<User>, RepositoryError> {
        offline()
    }

    fn find_user(&self, _identity: Identity<'_>) -> Result<Option<User>, RepositoryError> {
        offline()
    }

    fn count_users(&self, _before: Option<DateTime<Utc>>) -> Result<usize, RepositoryError> {
        offline()
    }

    fn list_users(
        &self,
        _before: Option<DateTime<Utc>>,
        _limit: usize,
    ) -> Result<Vec<User>, RepositoryError> {
        offline()
    }

    fn delete_user(&self, _id: &UserId) -> Result<(), RepositoryError> {
        offline()
    }
}

impl VerificationTokenRepository for UnavailableStore {
    fn insert_token(&self, _token: VerificationToken) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_token(&self, _token: &str) -> Result<Option<VerificationToken>, RepositoryError> {
        offline()
    }

    fn delete_token(&self, _token: &str) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_tokens_of(&self, _user: &UserId) -> Result<usize, RepositoryError> {
        offline()
    }
}

impl ApartmentRepository for UnavailableStore {
    fn insert_apartment(&self, _apartment: Apartment) -> Result<Apartment, RepositoryError> {
        offline()
    }

    fn update_apartment(&self, _apartment: Apartment) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_apartment(&self, _id: &ApartmentId) -> Result<Option<Apartment>, RepositoryError> {
        offline()
    }

    fn count_apartments(&self, _filter: &ApartmentFilter) -> Result<usize, RepositoryError> {
        offline()
    }

    fn list_apartments(
        &self,
        _filter: &ApartmentFilter,
        _limit: usize,
    ) -> Result<Vec<Apartment>, RepositoryError> {
        offline()
    }

    fn delete_apartment(&self, _id: &ApartmentId) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_apartments_of(&self, _realtor: &UserId) -> Result<usize, RepositoryError> {
        offline()
    }
}
