use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
    pub account_verified: bool,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    #[serde(skip_serializing)]
    pub verification_code_expire: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_password_token_hash: Option<String>, // sha256 hex, plaintext never stored
    #[serde(skip_serializing)]
    pub reset_password_expire: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    // Code and expiry travel together; these are the only writers.
    pub fn set_verification_code(&mut self, code: String, expires_at: OffsetDateTime) {
        self.verification_code = Some(code);
        self.verification_code_expire = Some(expires_at);
    }

    pub fn clear_verification_code(&mut self) {
        self.verification_code = None;
        self.verification_code_expire = None;
    }

    pub fn set_reset_token(&mut self, token_hash: String, expires_at: OffsetDateTime) {
        self.reset_password_token_hash = Some(token_hash);
        self.reset_password_expire = Some(expires_at);
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_password_token_hash = None;
        self.reset_password_expire = None;
    }

    /// Promote to verified. Verification code fields are cleared at the same time.
    pub fn mark_verified(&mut self) {
        self.account_verified = true;
        self.clear_verification_code();
    }
}

/// Fields supplied when registering. Everything else starts empty.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// Throttle applied atomically when an unverified record is created.
#[derive(Debug, Clone, Copy)]
pub struct AttemptLimit {
    pub max_attempts: u64,
    /// Only unverified records created at or after this instant count.
    pub since: OffsetDateTime,
}
