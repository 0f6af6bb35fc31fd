//! User accounts: email registration and verification, session tokens, and
//! the admin user management endpoints.

pub mod domain;
pub(crate) mod password;
pub mod repository;
pub mod requests;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    user_list_template, user_template, AuthType, Identity, User, UserId, UserRole,
    VerificationToken,
};
pub use password::{hash_password, verify_password, PasswordError, DEFAULT_PASSWORD_COST};
pub use repository::{
    MailError, Mailer, OutboundEmail, UserRepository, VerificationTokenRepository,
};
pub use router::account_router;
pub use service::{AccountError, AccountService, AccountSettings, UserPage};
pub use session::{Authenticated, Principal, Session, SessionIssuer, TokenError};
