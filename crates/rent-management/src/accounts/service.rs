use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::domain::{
    user_list_template, AuthType, Identity, User, UserId, UserRole, VerificationToken,
};
use super::password::{hash_password, verify_password, PasswordError, DEFAULT_PASSWORD_COST};
use super::repository::{
    MailError, Mailer, OutboundEmail, UserRepository, VerificationTokenRepository,
};
use super::requests::{
    EmailCredentials, NewUserRequest, PasswordChange, SignUpRequest, UserPatch,
    VerifyEmailRequest,
};
use super::session::{Principal, Session, SessionIssuer, TokenError};
use crate::config::AppConfig;
use crate::error::error_response;
use crate::listings::ApartmentRepository;
use crate::paging::{Page, PageLimits};
use crate::shape::filter;
use crate::storage::RepositoryError;
use crate::validation::ValidationError;

/// Values the account flows need besides storage and transport.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub frontend_url: String,
    pub mail_from: String,
    pub paging: PageLimits,
    /// bcrypt work factor for newly written password hashes.
    pub password_cost: u32,
}

impl AccountSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            frontend_url: config.mail.frontend_url.clone(),
            mail_from: config.mail.mail_from.clone(),
            paging: config.paging,
            password_cost: DEFAULT_PASSWORD_COST,
        }
    }
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3005".to_string(),
            mail_from: "test.admin@apartments.com".to_string(),
            paging: PageLimits::default(),
            password_cost: DEFAULT_PASSWORD_COST,
        }
    }
}

/// One page of the admin user listing.
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    #[serde(rename = "totalCounts")]
    pub total_counts: usize,
    pub users: Value,
}

/// Registration, sign-in and account administration.
pub struct AccountService<S, M> {
    store: Arc<S>,
    mailer: Arc<M>,
    sessions: Arc<SessionIssuer>,
    settings: AccountSettings,
}

impl<S, M> AccountService<S, M>
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        store: Arc<S>,
        mailer: Arc<M>,
        sessions: Arc<SessionIssuer>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            store,
            mailer,
            sessions,
            settings,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionIssuer> {
        &self.sessions
    }

    pub fn settings(&self) -> &AccountSettings {
        &self.settings
    }

    /// Registers an unverified email account and mails its verification link.
    pub fn sign_up_email(&self, request: SignUpRequest) -> Result<User, AccountError> {
        if self
            .store
            .find_user(Identity::Email(&request.email))?
            .is_some()
        {
            return Err(AccountError::EmailTaken);
        }

        let user = self
            .store
            .insert_user(User::with_email(
                request.email,
                self.hash(&request.password)?,
                request.role,
                false,
            ))
            .map_err(|err| taken_on_conflict(err, AccountError::EmailTaken))?;

        let token = VerificationToken::issue(user.id.clone());
        let link = format!(
            "{}/verify-email/{}",
            self.settings.frontend_url.trim_end_matches('/'),
            token.token
        );
        self.store.insert_token(token)?;

        self.mailer.send(OutboundEmail {
            to: user.email.clone().unwrap_or_default(),
            from: self.settings.mail_from.clone(),
            subject: "Email verification".to_string(),
            html: format!("Click <a href=\"{link}\">here</a> to verify your email"),
        })?;

        info!(user = %user.id, role = user.role.label(), "registered email account");
        Ok(user)
    }

    pub fn sign_in_email(&self, credentials: EmailCredentials) -> Result<Session, AccountError> {
        let Some(user) = self.store.find_user(Identity::Email(&credentials.email))? else {
            warn!("sign-in for unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        let password_matches = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(&credentials.password, hash));
        if !password_matches {
            warn!(user = %user.id, "sign-in with wrong password");
            return Err(AccountError::InvalidCredentials);
        }
        if !user.email_verified {
            return Err(AccountError::EmailNotVerified);
        }

        Ok(self.sessions.issue(&user.view())?)
    }

    /// Re-issues the caller's session with a fresh expiry.
    pub fn refresh_session(&self, caller: Option<&Principal>) -> Result<Session, AccountError> {
        let caller = caller.ok_or(AccountError::InvalidToken)?;
        Ok(self.sessions.issue(caller.profile())?)
    }

    /// Consumes a verification token and marks its owner verified.
    pub fn verify_email(&self, request: VerifyEmailRequest) -> Result<UserId, AccountError> {
        let token = self
            .store
            .fetch_token(&request.token)?
            .ok_or(AccountError::InvalidToken)?;
        if token.is_expired(Utc::now()) {
            self.store.delete_token(&token.token)?;
            return Err(AccountError::InvalidToken);
        }

        let mut user = self
            .store
            .fetch_user(&token.user)?
            .ok_or(AccountError::UserNotFound)?;
        user.email_verified = true;
        self.store.update_user(user.clone())?;
        self.store.delete_token(&token.token)?;

        info!(user = %user.id, "email verified");
        Ok(user.id)
    }

    pub fn create_user(
        &self,
        caller: &Principal,
        request: NewUserRequest,
    ) -> Result<User, AccountError> {
        require_admin(caller)?;
        if self
            .store
            .find_user(Identity::Email(&request.email))?
            .is_some()
        {
            return Err(AccountError::EmailTaken);
        }

        let user = self
            .store
            .insert_user(User::with_email(
                request.email,
                self.hash(&request.password)?,
                request.role,
                request.email_verified,
            ))
            .map_err(|err| taken_on_conflict(err, AccountError::EmailTaken))?;
        info!(admin = %caller.id, user = %user.id, role = user.role.label(), "created user");
        Ok(user)
    }

    /// Removes the caller along with every listing they own.
    pub fn delete_self(&self, caller: &Principal) -> Result<(), AccountError> {
        let user = self
            .store
            .fetch_user(&caller.id)?
            .ok_or(AccountError::UserNotFound)?;
        self.remove_with_listings(&user.id)?;
        info!(user = %user.id, "account closed by owner");
        Ok(())
    }

    pub fn change_password(
        &self,
        caller: &Principal,
        change: PasswordChange,
    ) -> Result<(), AccountError> {
        let mut user = self
            .store
            .fetch_user(&caller.id)?
            .ok_or(AccountError::UserNotFound)?;
        if user.auth_type != AuthType::Email {
            return Err(AccountError::InvalidRequest);
        }
        let old_matches = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(&change.old, hash));
        if !old_matches {
            warn!(user = %user.id, "password change with wrong current password");
            return Err(AccountError::WrongPassword);
        }

        user.password_hash = Some(self.hash(&change.password)?);
        self.store.update_user(user)?;
        info!(user = %caller.id, "password changed");
        Ok(())
    }

    pub fn list_users(&self, caller: &Principal, page: Page) -> Result<UserPage, AccountError> {
        require_admin(caller)?;
        let total_counts = self.store.count_users(page.before)?;
        let users = self.store.list_users(page.before, page.size)?;
        Ok(UserPage {
            total_counts,
            users: filter(&users, user_list_template()),
        })
    }

    pub fn delete_user(&self, caller: &Principal, id: &UserId) -> Result<UserId, AccountError> {
        require_admin(caller)?;
        let user = self
            .store
            .fetch_user(id)?
            .ok_or(AccountError::UserNotFound)?;
        if user.id == caller.id {
            return Err(AccountError::InvalidRequest);
        }

        self.remove_with_listings(&user.id)?;
        info!(admin = %caller.id, user = %user.id, "deleted user");
        Ok(user.id)
    }

    /// Applies an admin's partial update. Each changed field is checked
    /// against the account's auth type before anything is stored.
    pub fn edit_user(
        &self,
        caller: &Principal,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<User, AccountError> {
        require_admin(caller)?;
        let mut user = self
            .store
            .fetch_user(id)?
            .ok_or(AccountError::UserNotFound)?;
        let editing_self = user.id == caller.id;

        if let Some(facebook_id) = patch
            .facebook_id
            .filter(|value| user.facebook_id.as_deref() != Some(value.as_str()))
        {
            if user.auth_type != AuthType::Facebook {
                return Err(AccountError::InvalidRequest);
            }
            if self
                .store
                .find_user(Identity::Facebook(&facebook_id))?
                .is_some()
            {
                return Err(AccountError::IdentityTaken);
            }
            user.facebook_id = Some(facebook_id);
        }

        if let Some(google_id) = patch
            .google_id
            .filter(|value| user.google_id.as_deref() != Some(value.as_str()))
        {
            if user.auth_type != AuthType::Google {
                return Err(AccountError::InvalidRequest);
            }
            if self
                .store
                .find_user(Identity::Google(&google_id))?
                .is_some()
            {
                return Err(AccountError::IdentityTaken);
            }
            user.google_id = Some(google_id);
        }

        if let Some(email) = patch
            .email
            .filter(|value| user.email.as_deref() != Some(value.as_str()))
        {
            if user.auth_type == AuthType::Email
                && self.store.find_user(Identity::Email(&email))?.is_some()
            {
                return Err(AccountError::EmailTaken);
            }
            user.email = Some(email);
        }

        if let Some(verified) = patch
            .email_verified
            .filter(|value| *value != user.email_verified)
        {
            if user.auth_type != AuthType::Email || editing_self {
                return Err(AccountError::InvalidRequest);
            }
            user.email_verified = verified;
        }

        if let Some(password) = patch.password {
            if user.auth_type != AuthType::Email {
                return Err(AccountError::InvalidRequest);
            }
            user.password_hash = Some(self.hash(&password)?);
        }

        if let Some(role) = patch.role.filter(|value| *value != user.role) {
            if editing_self {
                return Err(AccountError::InvalidRequest);
            }
            user.role = role;
        }

        let taken = match user.auth_type {
            AuthType::Email => AccountError::EmailTaken,
            AuthType::Google | AuthType::Facebook => AccountError::IdentityTaken,
        };
        self.store
            .update_user(user.clone())
            .map_err(|err| taken_on_conflict(err, taken))?;
        info!(admin = %caller.id, user = %user.id, "updated user");
        Ok(user)
    }

    /// Creates a verified admin with the given credentials unless an email
    /// account with that address already exists.
    pub fn ensure_admin(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = email.trim().to_lowercase();
        if let Some(existing) = self.store.find_user(Identity::Email(&email))? {
            if existing.role != UserRole::Admin {
                warn!(user = %existing.id, "seed admin email belongs to a non-admin account");
            }
            return Ok(existing);
        }

        let admin = self
            .store
            .insert_user(User::with_email(
                email,
                self.hash(password)?,
                UserRole::Admin,
                true,
            ))
            .map_err(|err| taken_on_conflict(err, AccountError::EmailTaken))?;
        info!(user = %admin.id, "seeded admin account");
        Ok(admin)
    }

    fn hash(&self, password: &str) -> Result<String, AccountError> {
        Ok(hash_password(password, self.settings.password_cost)?)
    }

    fn remove_with_listings(&self, id: &UserId) -> Result<(), AccountError> {
        let removed = self.store.delete_apartments_of(id)?;
        self.store.delete_tokens_of(id)?;
        self.store.delete_user(id)?;
        if removed > 0 {
            info!(user = %id, apartments = removed, "removed listings of deleted user");
        }
        Ok(())
    }
}

/// The store refuses a second account with the same identity; that refusal
/// is reported to the client as `taken`.
fn taken_on_conflict(err: RepositoryError, taken: AccountError) -> AccountError {
    match err {
        RepositoryError::Conflict => taken,
        other => AccountError::Repository(other),
    }
}

fn require_admin(caller: &Principal) -> Result<(), AccountError> {
    if caller.is_admin() {
        Ok(())
    } else {
        warn!(user = %caller.id, role = caller.role.label(), "admin permission required");
        Err(AccountError::Forbidden)
    }
}

/// Error raised by the account flows. Its display text is what clients see.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Authorization error")]
    Unauthenticated,
    #[error("Email or password is invalid")]
    InvalidCredentials,
    #[error("Email is not verified yet")]
    EmailNotVerified,
    #[error("Invalid token")]
    InvalidToken,
    #[error("No permission")]
    Forbidden,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Email already exists")]
    EmailTaken,
    #[error("UserID already exists")]
    IdentityTaken,
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Cannot find user")]
    UserNotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Session(#[from] TokenError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::Validation(_)
            | AccountError::EmailTaken
            | AccountError::IdentityTaken
            | AccountError::InvalidRequest => StatusCode::BAD_REQUEST,
            AccountError::Unauthenticated
            | AccountError::InvalidCredentials
            | AccountError::InvalidToken => StatusCode::UNAUTHORIZED,
            AccountError::EmailNotVerified
            | AccountError::Forbidden
            | AccountError::WrongPassword => StatusCode::FORBIDDEN,
            AccountError::UserNotFound => StatusCode::NOT_FOUND,
            AccountError::Repository(_)
            | AccountError::Mail(_)
            | AccountError::Session(_)
            | AccountError::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "account request failed");
            return error_response(status, "Server error");
        }
        error_response(status, self.to_string())
    }
}
