use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde_json::{json, Value};

use super::domain::UserId;
use super::repository::{Mailer, UserRepository, VerificationTokenRepository};
use super::requests::{
    EmailCredentials, NewUserRequest, PasswordChange, SignUpRequest, UserPatch,
    VerifyEmailRequest,
};
use super::service::{AccountError, AccountService};
use super::session::Authenticated;
use crate::body::JsonBody;
use crate::listings::ApartmentRepository;
use crate::paging::Page;

type Reply = Result<Json<Value>, AccountError>;

/// Router exposing `/auth/*` and `/user/*`.
pub fn account_router<S, M>(service: Arc<AccountService<S, M>>) -> Router
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let sessions = service.sessions().clone();
    Router::new()
        .route("/auth/sign-in/email", post(sign_in_handler::<S, M>))
        .route("/auth/sign-up/email", post(sign_up_handler::<S, M>))
        .route("/auth/check-token", get(check_token_handler::<S, M>))
        .route("/auth/verify-email", post(verify_email_handler::<S, M>))
        .route("/user", post(create_user_handler::<S, M>))
        .route(
            "/user/self",
            get(get_self_handler).delete(delete_self_handler::<S, M>),
        )
        .route("/user/self/password", put(change_password_handler::<S, M>))
        .route("/user/list", get(list_users_handler::<S, M>))
        .route(
            "/user/:userId",
            delete(delete_user_handler::<S, M>).patch(edit_user_handler::<S, M>),
        )
        .with_state(service)
        .layer(Extension(sessions))
}

pub(crate) async fn sign_in_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    JsonBody(body): JsonBody,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let credentials = EmailCredentials::from_json(&body)?;
    let session = service.sign_in_email(credentials)?;
    Ok(Json(json!({ "token": session.token, "user": session.user })))
}

pub(crate) async fn sign_up_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    JsonBody(body): JsonBody,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let request = SignUpRequest::from_json(&body)?;
    service.sign_up_email(request)?;
    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn check_token_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    caller: Option<Authenticated>,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let principal = caller.as_ref().map(|Authenticated(principal)| principal);
    let session = service.refresh_session(principal)?;
    Ok(Json(json!({ "token": session.token, "user": session.user })))
}

pub(crate) async fn verify_email_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    JsonBody(body): JsonBody,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let request = VerifyEmailRequest::from_json(&body)?;
    service.verify_email(request)?;
    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn create_user_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    Authenticated(caller): Authenticated,
    JsonBody(body): JsonBody,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let request = NewUserRequest::from_json(&body)?;
    let user = service.create_user(&caller, request)?;
    Ok(Json(json!({ "user": user.view() })))
}

pub(crate) async fn get_self_handler(Authenticated(caller): Authenticated) -> Reply {
    Ok(Json(json!({ "user": caller.profile() })))
}

pub(crate) async fn delete_self_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    Authenticated(caller): Authenticated,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    service.delete_self(&caller)?;
    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn change_password_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    Authenticated(caller): Authenticated,
    JsonBody(body): JsonBody,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let change = PasswordChange::from_json(&body)?;
    service.change_password(&caller, change)?;
    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn list_users_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    Authenticated(caller): Authenticated,
    Query(params): Query<HashMap<String, String>>,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let page = Page::from_query(&params, service.settings().paging)?;
    let listing = service.list_users(&caller, page)?;
    Ok(Json(json!(listing)))
}

pub(crate) async fn delete_user_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    Authenticated(caller): Authenticated,
    Path(user_id): Path<String>,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let removed = service.delete_user(&caller, &UserId(user_id))?;
    Ok(Json(json!({ "userId": removed })))
}

pub(crate) async fn edit_user_handler<S, M>(
    State(service): State<Arc<AccountService<S, M>>>,
    Authenticated(caller): Authenticated,
    Path(user_id): Path<String>,
    JsonBody(body): JsonBody,
) -> Reply
where
    S: UserRepository + VerificationTokenRepository + ApartmentRepository + 'static,
    M: Mailer + 'static,
{
    let patch = UserPatch::from_json(&body)?;
    let user = service.edit_user(&caller, &UserId(user_id), patch)?;
    Ok(Json(json!({ "userId": user.id, "updated": user.view() })))
}
