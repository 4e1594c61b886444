//! Shared setup for HTTP integration tests.

#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum_test::TestServer;
use marketplace_auth::{
    app::build_app,
    config::AppConfig,
    notify::{Mailer, OutboundEmail, Sms, SmsSender},
    state::AppState,
    users::{MemoryUserRepository, UserRepository},
};
use serde_json::{json, Value};

pub const NAME: &str = "A";
pub const EMAIL: &str = "a@x.com";
pub const PHONE: &str = "+919812345678";
pub const PASSWORD: &str = "Secret1";

/// Mailer that records every message and can be switched to fail.
#[derive(Default, Clone)]
pub struct CapturingMailer {
    pub sent: Arc<RwLock<Vec<OutboundEmail>>>,
    pub fail: Arc<RwLock<bool>>,
}

impl CapturingMailer {
    pub fn set_failing(&self, fail: bool) {
        *self.fail.write().unwrap() = fail;
    }

    pub fn last_to(&self, recipient: &str) -> Option<OutboundEmail> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.recipient == recipient)
            .cloned()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, email: OutboundEmail) -> anyhow::Result<()> {
        if *self.fail.read().unwrap() {
            anyhow::bail!("smtp relay unavailable");
        }
        self.sent.write().unwrap().push(email);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct CapturingSms {
    pub sent: Arc<RwLock<Vec<Sms>>>,
}

#[async_trait]
impl SmsSender for CapturingSms {
    async fn send(&self, sms: Sms) -> anyhow::Result<String> {
        let mut sent = self.sent.write().unwrap();
        sent.push(sms);
        Ok(format!("SM{}", sent.len()))
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub users: Arc<MemoryUserRepository>,
    pub mailer: CapturingMailer,
    pub sms: CapturingSms,
}

impl TestApp {
    pub fn new() -> Self {
        let users = Arc::new(MemoryUserRepository::new());
        let mailer = CapturingMailer::default();
        let sms = CapturingSms::default();
        let state = AppState::from_parts(
            Arc::new(AppConfig::for_tests()),
            users.clone(),
            Arc::new(mailer.clone()),
            Arc::new(sms.clone()),
        );
        let server = TestServer::new(build_app(state)).expect("Failed to create test server");
        Self {
            server,
            users,
            mailer,
            sms,
        }
    }

    pub async fn register(&self, email: &str, phone: &str, method: &str) -> axum_test::TestResponse {
        self.server
            .post("/api/v1/user/register")
            .json(&json!({
                "name": NAME,
                "email": email,
                "phone": phone,
                "password": PASSWORD,
                "verificationMethod": method,
            }))
            .await
    }

    /// Code currently stored on the newest pending record for `email`.
    pub async fn stored_code(&self, email: &str, phone: &str) -> Option<String> {
        self.users
            .find_unverified_newest_first(email, phone)
            .await
            .unwrap()
            .into_iter()
            .next()
            .and_then(|u| u.verification_code)
    }

    pub async fn verify(&self, email: &str, phone: &str, otp: Value) -> axum_test::TestResponse {
        self.server
            .post("/api/v1/user/otp-verification")
            .json(&json!({ "email": email, "phone": phone, "otp": otp }))
            .await
    }

    /// Register and verify the default user; returns the session cookie value.
    pub async fn verified_user(&self) -> String {
        let res = self.register(EMAIL, PHONE, "email").await;
        assert_eq!(res.status_code(), 200);
        let code = self.stored_code(EMAIL, PHONE).await.expect("code stored");
        let res = self.verify(EMAIL, PHONE, json!(code)).await;
        assert_eq!(res.status_code(), 200);
        res.maybe_cookie("token")
            .expect("No session cookie")
            .value()
            .to_string()
    }
}
