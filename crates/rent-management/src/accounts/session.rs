use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use super::domain::{user_template, UserId, UserRole};
use super::service::AccountError;
use crate::config::{AuthConfig, ConfigError};
use crate::shape::filter;

/// Caller identity recovered from a session token.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: UserId,
    pub role: UserRole,
    profile: Value,
}

impl Principal {
    /// Rebuilds the principal from decoded claims, keeping only public user fields.
    pub fn from_claims(claims: &Value) -> Option<Self> {
        let profile = filter(claims, user_template());
        let id = profile.get("_id")?.as_str()?.to_string();
        let role = profile.get("userType")?.as_str()?.parse().ok()?;
        Some(Self {
            id: UserId(id),
            role,
            profile,
        })
    }

    /// The user view the session was issued for.
    pub fn profile(&self) -> &Value {
        &self.profile
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Signed session token together with the user view it carries.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("session payload must be a JSON object")]
    InvalidProfile,
    #[error("session claims do not describe a user")]
    MalformedClaims,
    #[error("session expiry is out of range")]
    ExpiryOutOfRange,
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies HS256 session tokens.
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let ttl = config.session_ttl()?;
        Ok(Self::new(config.jwt_secret.as_bytes(), ttl))
    }

    pub fn issue(&self, profile: &Value) -> Result<Session, TokenError> {
        let Value::Object(user) = profile else {
            return Err(TokenError::InvalidProfile);
        };

        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let mut claims = user.clone();
        claims.insert("iat".into(), Value::from(issued_at.timestamp()));
        claims.insert("exp".into(), Value::from(expires_at.timestamp()));

        let token = encode(&Header::default(), &Value::Object(claims), &self.encoding)?;
        Ok(Session {
            token,
            user: profile.clone(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let data = decode::<Value>(token, &self.decoding, &Validation::default())?;
        Principal::from_claims(&data.claims).ok_or(TokenError::MalformedClaims)
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for routes that require a signed-in caller.
///
/// Needs an `Extension<Arc<SessionIssuer>>` layered on the router. Wrap in
/// `Option` where anonymous callers are allowed.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AccountError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(issuer) = parts.extensions.get::<Arc<SessionIssuer>>().cloned() else {
            error!("session issuer missing from request extensions");
            return Err(AccountError::Unauthenticated);
        };
        let token = bearer_token(&parts.headers).ok_or(AccountError::Unauthenticated)?;

        issuer.verify(token).map(Authenticated).map_err(|err| {
            debug!(error = %err, "rejected session token");
            AccountError::Unauthenticated
        })
    }
}
