use chrono::{DateTime, Utc};

use super::domain::{Identity, User, UserId, VerificationToken};
use crate::storage::RepositoryError;

/// Storage abstraction for account documents.
///
/// Inserts and updates fail with [`RepositoryError::Conflict`] when another
/// user already holds the same [`Identity`].
pub trait UserRepository: Send + Sync {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    fn update_user(&self, user: User) -> Result<(), RepositoryError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn find_user(&self, identity: Identity<'_>) -> Result<Option<User>, RepositoryError>;
    /// Users created strictly before `before`, or all users.
    fn count_users(&self, before: Option<DateTime<Utc>>) -> Result<usize, RepositoryError>;
    /// Newest first, at most `limit` entries.
    fn list_users(
        &self,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<User>, RepositoryError>;
    fn delete_user(&self, id: &UserId) -> Result<(), RepositoryError>;
}

/// Storage for outstanding email verification tokens.
pub trait VerificationTokenRepository: Send + Sync {
    fn insert_token(&self, token: VerificationToken) -> Result<(), RepositoryError>;
    fn fetch_token(&self, token: &str) -> Result<Option<VerificationToken>, RepositoryError>;
    fn delete_token(&self, token: &str) -> Result<(), RepositoryError>;
    /// Drops every token issued to `user`, returning how many were removed.
    fn delete_tokens_of(&self, user: &UserId) -> Result<usize, RepositoryError>;
}

/// Outbound transactional email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html: String,
}

/// Trait describing the mail transport (SMTP relay, SendGrid, log sink).
pub trait Mailer: Send + Sync {
    fn send(&self, message: OutboundEmail) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}
