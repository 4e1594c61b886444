use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use super::dto::{RegisterRequest, VerificationMethod};
use super::password::{hash_password, is_valid_email, normalize_email};
use super::phone::PhoneValidator;
use super::verification::issue_code;
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::{AttemptLimit, NewUser},
};

/// A registration request that passed field validation.
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub method: VerificationMethod,
}

fn required(field: Option<String>) -> AppResult<String> {
    match field {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::validation("All fields are required.")),
    }
}

impl RegisterRequest {
    pub fn validate(self, phones: &PhoneValidator) -> AppResult<Registration> {
        let name = required(self.name)?.trim().to_string();
        let email = normalize_email(&required(self.email)?);
        let phone = required(self.phone)?.trim().to_string();
        let password = required(self.password)?;
        let method = required(self.verification_method)?;

        let method = VerificationMethod::parse(&method)
            .ok_or_else(|| AppError::validation("Invalid verification method."))?;
        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid email."));
        }
        if !phones.is_valid(&phone) {
            return Err(AppError::validation("Invalid phone number."));
        }

        Ok(Registration {
            name,
            email,
            phone,
            password,
            method,
        })
    }
}

/// Create a pending account and send it a verification code.
///
/// The duplicate and attempt checks here answer most requests early; the
/// repository applies the same rules again inside `create_unverified`.
#[instrument(skip(state, req))]
pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<String> {
    let reg = req.validate(&state.phones)?;

    if state
        .users
        .find_verified_by_email_or_phone(&reg.email, &reg.phone)
        .await?
        .is_some()
    {
        warn!(email = %reg.email, "email or phone already verified");
        return Err(AppError::DuplicateAccount);
    }

    let cfg = &state.config.verification;
    let limit = AttemptLimit {
        max_attempts: cfg.max_registration_attempts,
        since: OffsetDateTime::now_utc() - Duration::minutes(cfg.attempt_window_minutes),
    };
    let attempts = state
        .users
        .count_unverified_attempts(&reg.email, &reg.phone, limit.since)
        .await?;
    if attempts >= limit.max_attempts {
        warn!(email = %reg.email, attempts, "registration attempts exhausted");
        return Err(AppError::TooManyAttempts(limit.max_attempts));
    }

    let password_hash = hash_password(&reg.password)?;
    let user = state
        .users
        .create_unverified(
            NewUser {
                name: reg.name,
                email: reg.email,
                phone: reg.phone,
                password_hash,
            },
            limit,
        )
        .await?;
    info!(user_id = %user.id, "pending user created");

    issue_code(state, user, reg.method).await
}
