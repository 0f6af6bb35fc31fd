use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::paging::creation_time;
use crate::shape::{filter, Template, ToPlainData};

/// Identifier wrapper for stored users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission tier attached to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Client,
    Realtor,
    Admin,
}

impl UserRole {
    pub const ALL: [&'static str; 3] = ["client", "realtor", "admin"];
    /// Roles a visitor may pick when registering on their own.
    pub const SELF_SERVICE: [&'static str; 2] = ["client", "realtor"];

    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Client => "client",
            UserRole::Realtor => "realtor",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "client" => Ok(Self::Client),
            "realtor" => Ok(Self::Realtor),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown user type '{other}'")),
        }
    }
}

/// How the account proves its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Email,
    Google,
    Facebook,
}

impl AuthType {
    pub const fn label(self) -> &'static str {
        match self {
            AuthType::Email => "email",
            AuthType::Google => "google",
            AuthType::Facebook => "facebook",
        }
    }
}

/// Stored account document, including fields that must never leave the API.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub facebook_id: Option<String>,
    pub google_id: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub auth_type: AuthType,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn with_email(
        email: String,
        password_hash: String,
        role: UserRole,
        email_verified: bool,
    ) -> Self {
        Self {
            id: UserId::generate(),
            facebook_id: None,
            google_id: None,
            email: Some(email),
            email_verified,
            password_hash: Some(password_hash),
            role,
            auth_type: AuthType::Email,
            created_at: creation_time(),
        }
    }

    /// The key this account signs in with, if it has one.
    pub fn identity(&self) -> Option<Identity<'_>> {
        match self.auth_type {
            AuthType::Email => self.email.as_deref().map(Identity::Email),
            AuthType::Google => self.google_id.as_deref().map(Identity::Google),
            AuthType::Facebook => self.facebook_id.as_deref().map(Identity::Facebook),
        }
    }

    /// Public projection of the account as sent to clients and embedded in sessions.
    pub fn view(&self) -> Value {
        filter(self, user_template())
    }
}

impl ToPlainData for User {
    fn to_plain_data(&self) -> Cow<'_, Value> {
        let mut document = Map::new();
        document.insert("_id".into(), Value::String(self.id.0.clone()));
        if let Some(facebook_id) = &self.facebook_id {
            document.insert("facebookId".into(), Value::String(facebook_id.clone()));
        }
        if let Some(google_id) = &self.google_id {
            document.insert("googleId".into(), Value::String(google_id.clone()));
        }
        if let Some(email) = &self.email {
            document.insert("email".into(), Value::String(email.clone()));
        }
        document.insert("emailVerified".into(), Value::Bool(self.email_verified));
        if let Some(hash) = &self.password_hash {
            document.insert("hash".into(), Value::String(hash.clone()));
        }
        document.insert("userType".into(), Value::String(self.role.label().into()));
        document.insert("authType".into(), Value::String(self.auth_type.label().into()));
        document.insert("createdAt".into(), Value::String(timestamp(&self.created_at)));
        Cow::Owned(Value::Object(document))
    }
}

/// Fields of a user that may be exposed.
pub fn user_template() -> &'static Template {
    static TEMPLATE: OnceLock<Template> = OnceLock::new();
    TEMPLATE.get_or_init(|| {
        Template::leaves([
            "_id",
            "facebookId",
            "googleId",
            "email",
            "emailVerified",
            "userType",
            "authType",
            "createdAt",
        ])
    })
}

/// [`user_template`] applied to each element of a list.
pub fn user_list_template() -> &'static Template {
    static TEMPLATE: OnceLock<Template> = OnceLock::new();
    TEMPLATE.get_or_init(|| Template::array_of(user_template().clone()))
}

/// Lookup key for the three ways an account can be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity<'a> {
    Email(&'a str),
    Google(&'a str),
    Facebook(&'a str),
}

impl Identity<'_> {
    pub fn matches(&self, user: &User) -> bool {
        match self {
            Identity::Email(email) => {
                user.auth_type == AuthType::Email && user.email.as_deref() == Some(*email)
            }
            Identity::Google(id) => {
                user.auth_type == AuthType::Google && user.google_id.as_deref() == Some(*id)
            }
            Identity::Facebook(id) => {
                user.auth_type == AuthType::Facebook && user.facebook_id.as_deref() == Some(*id)
            }
        }
    }
}

/// Pending proof that a user owns the email address they registered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken {
    pub user: UserId,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    pub const TTL_SECONDS: i64 = 3600;

    pub fn issue(user: UserId) -> Self {
        let bytes: [u8; 30] = rand::random();
        Self {
            user,
            token: hex::encode(bytes),
            created_at: creation_time(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= chrono::Duration::seconds(Self::TTL_SECONDS)
    }
}

pub(crate) fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
