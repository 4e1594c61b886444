//! Login, logout, the current-user endpoint and password reset.

mod common;

use axum::http::{header, HeaderValue};
use common::{TestApp, EMAIL, PASSWORD, PHONE};
use marketplace_auth::{auth::session::JwtKeys, config::AppConfig, users::UserRepository};
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn me_requires_session() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/user/me").await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["success"], false);

    let response = app
        .server
        .get("/api/v1/user/me")
        .add_cookie(cookie::Cookie::new("token", "not-a-jwt"))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn me_returns_verified_user() {
    let app = TestApp::new();
    let session = app.verified_user().await;

    let response = app
        .server
        .get("/api/v1/user/me")
        .add_cookie(cookie::Cookie::new("token", session))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], EMAIL);
    assert_eq!(body["user"]["phone"], PHONE);
}

#[tokio::test]
async fn me_for_unknown_user_is_unauthorized() {
    let app = TestApp::new();
    let keys = JwtKeys::from_config(&AppConfig::for_tests().jwt);
    let orphan = keys.sign(Uuid::new_v4()).unwrap();

    let response = app
        .server
        .get("/api/v1/user/me")
        .add_cookie(cookie::Cookie::new("token", orphan))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn bearer_header_is_accepted() {
    let app = TestApp::new();
    let session = app.verified_user().await;

    let response = app
        .server
        .get("/api/v1/user/me")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {session}")).unwrap(),
        )
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn login_sets_cookie() {
    let app = TestApp::new();
    app.verified_user().await;

    let response = app
        .server
        .post("/api/v1/user/login")
        .json(&json!({ "email": "A@X.com", "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(response.maybe_cookie("token").is_some());
    let body: Value = response.json();
    assert_eq!(body["message"], "User logged in successfully.");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.verified_user().await;

    let unknown = app
        .server
        .post("/api/v1/user/login")
        .json(&json!({ "email": "nobody@x.com", "password": PASSWORD }))
        .await;
    let wrong = app
        .server
        .post("/api/v1/user/login")
        .json(&json!({ "email": EMAIL, "password": "wrong-password" }))
        .await;

    assert_eq!(unknown.status_code(), 400);
    assert_eq!(unknown.status_code(), wrong.status_code());
    let unknown: Value = unknown.json();
    let wrong: Value = wrong.json();
    assert_eq!(unknown, wrong);
    assert_eq!(unknown["message"], "Invalid email or password.");
}

#[tokio::test]
async fn non_json_login_body_is_a_json_400() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/user/login")
        .text("email=a@x.com&password=Secret1")
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Content-Type"));
}

#[tokio::test]
async fn unverified_account_cannot_login() {
    let app = TestApp::new();
    app.register(EMAIL, PHONE, "email").await;

    let response = app
        .server
        .post("/api/v1/user/login")
        .json(&json!({ "email": EMAIL, "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = TestApp::new();
    let session = app.verified_user().await;

    let response = app
        .server
        .get("/api/v1/user/logout")
        .add_cookie(cookie::Cookie::new("token", session))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["message"], "Logged out successfully.");
    let cleared = response.maybe_cookie("token").expect("cookie overwritten");
    assert_eq!(cleared.value(), "");
}

#[tokio::test]
async fn forgot_password_for_unknown_email_is_not_found() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/user/password/forgot")
        .json(&json!({ "email": EMAIL }))
        .await;
    assert_eq!(response.status_code(), 404);
}

/// Pull the raw token out of the reset link in the last email sent.
fn reset_token_from_mail(app: &TestApp) -> String {
    let mail = app.mailer.last_to(EMAIL).expect("reset email");
    assert_eq!(mail.subject, "Reset Your Password");
    let start = mail.html_body.find("/password/reset/").unwrap() + "/password/reset/".len();
    mail.html_body[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect()
}

#[tokio::test]
async fn reset_password_flow() {
    let app = TestApp::new();
    app.verified_user().await;

    let response = app
        .server
        .post("/api/v1/user/password/forgot")
        .json(&json!({ "email": EMAIL }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["message"], "Email sent to a@x.com successfully.");

    let token = reset_token_from_mail(&app);
    assert_eq!(token.len(), 40);

    let response = app
        .server
        .put(&format!("/api/v1/user/password/reset/{token}"))
        .json(&json!({ "password": "NewSecret1", "confirmPassword": "Different" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .server
        .put(&format!("/api/v1/user/password/reset/{token}"))
        .json(&json!({ "password": "NewSecret1", "confirmPassword": "NewSecret1" }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(response.maybe_cookie("token").is_some());
    let body: Value = response.json();
    assert_eq!(body["message"], "Password reset successfully.");

    let response = app
        .server
        .post("/api/v1/user/login")
        .json(&json!({ "email": EMAIL, "password": "NewSecret1" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .server
        .put(&format!("/api/v1/user/password/reset/{token}"))
        .json(&json!({ "password": "Again1", "confirmPassword": "Again1" }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["message"], "Reset password token is invalid or has expired.");
}

#[tokio::test]
async fn failed_reset_email_clears_token() {
    let app = TestApp::new();
    app.verified_user().await;
    app.mailer.set_failing(true);

    let response = app
        .server
        .post("/api/v1/user/password/forgot")
        .json(&json!({ "email": EMAIL }))
        .await;
    assert_eq!(response.status_code(), 500);

    let user = app.users.find_verified_by_email(EMAIL).await.unwrap().unwrap();
    assert!(user.reset_password_token_hash.is_none());
    assert!(user.reset_password_expire.is_none());
}
