use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::accounts::{account_router, AccountService, UserRole};

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let (service, _, _) = build_service();
    let router = account_router(Arc::new(service));

    let response = router
        .oneshot(json_request(Method::GET, "/user/self", None, None))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        read_json_body(response).await,
        json!({ "err": "Authorization error" })
    );
}

#[tokio::test]
async fn sign_up_verify_and_sign_in() {
    let (service, _, mailer) = build_service();
    let router = account_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/auth/sign-up/email",
            None,
            Some(json!({
                "email": "Renter@Example.com",
                "password": PASSWORD,
                "userType": "client"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await, json!({ "success": true }));

    let token = token_from_mail(&mailer.sent()[0]);
    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/auth/verify-email",
            None,
            Some(json!({ "token": token })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/auth/sign-in/email",
            None,
            Some(json!({ "email": "renter@example.com", "password": PASSWORD })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["user"]["email"], "renter@example.com");
    assert_eq!(body["user"]["userType"], "client");
    let session_token = body["token"].as_str().expect("token string").to_string();

    let authorization = format!("Bearer {session_token}");
    let response = router
        .oneshot(json_request(
            Method::GET,
            "/user/self",
            Some(&authorization),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["user"], body["user"]);
}

#[tokio::test]
async fn check_token_reissues_or_refuses() {
    let (service, store, _) = build_service();
    let user = seed_user(&store, "member@example.com", UserRole::Realtor, 0);
    let authorization = bearer(service.sessions(), &user);
    let router = account_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request(Method::GET, "/auth/check-token", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        read_json_body(response).await,
        json!({ "err": "Invalid token" })
    );

    let response = router
        .oneshot(json_request(
            Method::GET,
            "/auth/check-token",
            Some(&authorization),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["user"], user.view());
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn validation_failures_name_the_field() {
    let (service, _, _) = build_service();
    let router = account_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/auth/sign-up/email",
            None,
            Some(json!({ "email": "a@b.co", "password": "pw", "userType": "admin" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json_body(response).await,
        json!({ "err": "\"userType\" must be one of [client, realtor]" })
    );

    let response = router
        .oneshot(json_request(Method::POST, "/auth/sign-in/email", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json_body(response).await,
        json!({ "err": "\"email\" is required" })
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (service, _, _) = build_service();
    let router = account_router(Arc::new(service));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/sign-in/email")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert!(body["err"]
        .as_str()
        .is_some_and(|message| message.starts_with("Invalid JSON body")));
}

#[tokio::test]
async fn query_validation_runs_before_the_role_check() {
    let (service, store, _) = build_service();
    let client = seed_user(&store, "client@example.com", UserRole::Client, 0);
    let authorization = bearer(service.sessions(), &client);
    let router = account_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::GET,
            "/user/list?pageSize=0",
            Some(&authorization),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json_body(response).await,
        json!({ "err": "\"pageSize\" must be a positive number" })
    );

    let response = router
        .oneshot(json_request(
            Method::GET,
            "/user/list",
            Some(&authorization),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        read_json_body(response).await,
        json!({ "err": "No permission" })
    );
}

#[tokio::test]
async fn admins_manage_users_through_the_api() {
    let (service, store, _) = build_service();
    let admin = seed_user(&store, "admin@example.com", UserRole::Admin, 0);
    let member = seed_user(&store, "member@example.com", UserRole::Client, 1);
    let authorization = bearer(service.sessions(), &admin);
    let router = account_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::GET,
            "/user/list?pageSize=1",
            Some(&authorization),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["totalCounts"], 2);
    assert_eq!(body["users"][0]["_id"], member.id.0.as_str());

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/user/{}", member.id),
            Some(&authorization),
            Some(json!({ "userType": "realtor" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["userId"], member.id.0.as_str());
    assert_eq!(body["updated"]["userType"], "realtor");

    let response = router
        .clone()
        .oneshot(json_request(
            Method::DELETE,
            &format!("/user/{}", member.id),
            Some(&authorization),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json_body(response).await,
        json!({ "userId": member.id.0.as_str() })
    );

    let response = router
        .oneshot(json_request(
            Method::DELETE,
            &format!("/user/{}", member.id),
            Some(&authorization),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        read_json_body(response).await,
        json!({ "err": "Cannot find user" })
    );
}

#[tokio::test]
async fn storage_failures_hide_their_cause() {
    let service = AccountService::new(
        Arc::new(UnavailableStore),
        Arc::new(MemoryMailer::default()),
        issuer(),
        settings(),
    );
    let router = account_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/auth/sign-in/email",
            None,
            Some(json!({ "email": "a@b.co", "password": "pw" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json_body(response).await,
        json!({ "err": "Server error" })
    );
}
