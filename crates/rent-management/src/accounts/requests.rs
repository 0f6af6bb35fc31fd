use serde_json::Value;

use super::domain::UserRole;
use crate::validation::{required, Fields, ValidationError};

/// Body of `POST /auth/sign-in/email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailCredentials {
    pub email: String,
    pub password: String,
}

impl EmailCredentials {
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        Fields::read_body(body, &["email", "password"], |fields| {
            Ok(Self {
                email: required("email", fields.email("email")?)?,
                password: required("password", fields.string("password")?)?,
            })
        })
    }
}

/// Body of `POST /auth/sign-up/email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

impl SignUpRequest {
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        Fields::read_body(body, &["email", "password", "userType"], |fields| {
            Ok(Self {
                email: required("email", fields.email("email")?)?,
                password: required("password", fields.string("password")?)?,
                role: required(
                    "userType",
                    fields.choice("userType", &UserRole::SELF_SERVICE)?,
                )?,
            })
        })
    }
}

/// Body of `POST /auth/verify-email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyEmailRequest {
    pub token: String,
}

impl VerifyEmailRequest {
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        Fields::read_body(body, &["token"], |fields| {
            Ok(Self {
                token: required("token", fields.string("token")?)?,
            })
        })
    }
}

/// Body of `POST /user`, used by admins to create accounts directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRequest {
    pub email: String,
    pub email_verified: bool,
    pub password: String,
    pub role: UserRole,
}

impl NewUserRequest {
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let allowed = ["email", "emailVerified", "password", "userType"];
        Fields::read_body(body, &allowed, |fields| {
            Ok(Self {
                email: required("email", fields.email("email")?)?,
                email_verified: required("emailVerified", fields.boolean("emailVerified")?)?,
                password: required("password", fields.string("password")?)?,
                role: required("userType", fields.choice("userType", &UserRole::ALL)?)?,
            })
        })
    }
}

/// Body of `PUT /user/self/password`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub old: String,
    pub password: String,
}

impl PasswordChange {
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        Fields::read_body(body, &["old", "password"], |fields| {
            Ok(Self {
                old: required("old", fields.string("old")?)?,
                password: required("password", fields.string("password")?)?,
            })
        })
    }
}

/// Body of `PATCH /user/:userId`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub facebook_id: Option<String>,
    pub google_id: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

impl UserPatch {
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let allowed = [
            "facebookId",
            "googleId",
            "email",
            "emailVerified",
            "password",
            "userType",
        ];
        Fields::read_body(body, &allowed, |fields| {
            Ok(Self {
                facebook_id: fields.string("facebookId")?,
                google_id: fields.string("googleId")?,
                email: fields.email("email")?,
                email_verified: fields.boolean("emailVerified")?,
                password: fields.string("password")?,
                role: fields.choice("userType", &UserRole::ALL)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sign_up_refuses_admin_self_registration() {
        let err = SignUpRequest::from_json(&json!({
            "email": "a@b.co",
            "password": "pw",
            "userType": "admin"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "\"userType\" must be one of [client, realtor]");
    }

    #[test]
    fn new_user_requires_the_verified_flag() {
        let err = NewUserRequest::from_json(&json!({
            "email": "a@b.co",
            "password": "pw",
            "userType": "admin"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "\"emailVerified\" is required");
    }

    #[test]
    fn patches_keep_absent_fields_empty() {
        let patch = UserPatch::from_json(&json!({ "email": " New@Mail.com " })).unwrap();
        assert_eq!(
            patch,
            UserPatch {
                email: Some("new@mail.com".to_string()),
                ..UserPatch::default()
            }
        );
    }

    #[test]
    fn sign_in_reports_the_first_invalid_field() {
        let err = EmailCredentials::from_json(&json!({ "email": "nope" })).unwrap_err();
        assert_eq!(err.to_string(), "\"email\" must be a valid email");

        let err = EmailCredentials::from_json(&json!({ "email": "a@b.co" })).unwrap_err();
        assert_eq!(err.to_string(), "\"password\" is required");
    }

    #[test]
    fn missing_fields_are_reported_before_unknown_ones() {
        let err = EmailCredentials::from_json(&json!({ "role": "x" })).unwrap_err();
        assert_eq!(err.to_string(), "\"email\" is required");

        let err = EmailCredentials::from_json(&json!({
            "email": "a@b.co",
            "password": "pw",
            "role": "x"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "\"role\" is not allowed");
    }
}
