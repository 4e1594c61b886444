//! Issuing one-time codes and checking them.

use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use super::dto::{VerificationMethod, VerifyOtpRequest};
use super::password::normalize_email;
use super::secrets::{codes_match, generate_verification_code};
use crate::{
    error::{AppError, AppResult},
    notify::{templates, Mailer, OutboundEmail, Sms, SmsSender},
    state::AppState,
    users::User,
};

/// Delivers a verification code to the user. Returns the message shown to the client.
#[async_trait]
pub trait CodeChannel: Send + Sync {
    async fn send(&self, user: &User, code: &str) -> AppResult<String>;
}

pub struct EmailChannel {
    mailer: Arc<dyn Mailer>,
    ttl_minutes: i64,
}

#[async_trait]
impl CodeChannel for EmailChannel {
    async fn send(&self, user: &User, code: &str) -> AppResult<String> {
        let email = OutboundEmail {
            recipient: user.email.clone(),
            subject: templates::VERIFICATION_SUBJECT.to_string(),
            html_body: templates::verification_email(code, self.ttl_minutes),
        };
        self.mailer
            .send(email)
            .await
            .map_err(|e| AppError::DispatchFailure(format!("Verification code failed to send: {e:#}")))?;
        Ok(format!("Verification email successfully sent to {}", user.name))
    }
}

pub struct SmsChannel {
    sms: Arc<dyn SmsSender>,
}

#[async_trait]
impl CodeChannel for SmsChannel {
    async fn send(&self, user: &User, code: &str) -> AppResult<String> {
        if !user.phone.starts_with('+') {
            return Err(AppError::validation("Invalid phone number format."));
        }
        let sms = Sms {
            to: user.phone.clone(),
            body: templates::verification_sms(code),
        };
        let message_id = self
            .sms
            .send(sms)
            .await
            .map_err(|e| AppError::DispatchFailure(format!("Verification code failed to send: {e:#}")))?;
        info!(user_id = %user.id, %message_id, "verification sms accepted");
        Ok("OTP sent via SMS.".to_string())
    }
}

impl VerificationMethod {
    pub fn channel(self, state: &AppState) -> Box<dyn CodeChannel> {
        match self {
            VerificationMethod::Email => Box::new(EmailChannel {
                mailer: state.mailer.clone(),
                ttl_minutes: state.config.verification.otp_ttl_minutes,
            }),
            VerificationMethod::Phone => Box::new(SmsChannel {
                sms: state.sms.clone(),
            }),
        }
    }
}

/// Store a fresh code on `user` and deliver it.
///
/// If delivery fails the stored code is cleared again, so a code nobody
/// received can never be redeemed.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn issue_code(
    state: &AppState,
    mut user: User,
    method: VerificationMethod,
) -> AppResult<String> {
    let code = generate_verification_code();
    let expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.verification.otp_ttl_minutes);
    user.set_verification_code(code.clone(), expires_at);
    state.users.update(&user).await?;

    match method.channel(state).send(&user, &code).await {
        Ok(message) => {
            info!(?method, "verification code dispatched");
            Ok(message)
        }
        Err(e) => {
            user.clear_verification_code();
            if let Err(rollback) = state.users.update(&user).await {
                warn!(error = %rollback, "could not clear undelivered verification code");
            }
            Err(e)
        }
    }
}

/// Redeem a code. On success the newest pending record for the email/phone
/// becomes verified; older pending duplicates are deleted.
#[instrument(skip(state, req))]
pub async fn verify_otp(state: &AppState, req: VerifyOtpRequest) -> AppResult<User> {
    let (email, phone, otp) = match (req.email.as_deref(), req.phone.as_deref(), req.otp.as_ref()) {
        (Some(e), Some(p), Some(o)) if !e.trim().is_empty() && !p.trim().is_empty() => {
            (normalize_email(e), p.trim().to_string(), o.as_code())
        }
        _ => return Err(AppError::validation("All fields are required.")),
    };

    if !state.phones.is_valid(&phone) {
        return Err(AppError::validation("Invalid phone number."));
    }

    let mut candidates = state.users.find_unverified_newest_first(&email, &phone).await?;
    if candidates.is_empty() {
        warn!(email = %email, "no pending registration");
        return Err(AppError::NotFound("User not found.".into()));
    }
    let mut user = candidates.swap_remove(0);

    if !candidates.is_empty() {
        let removed = state
            .users
            .delete_unverified_except(user.id, &email, &phone)
            .await?;
        info!(kept = %user.id, removed, "removed duplicate pending registrations");
    }

    if !codes_match(user.verification_code.as_deref(), &otp) {
        warn!(user_id = %user.id, "invalid otp");
        return Err(AppError::InvalidCode);
    }

    let now = OffsetDateTime::now_utc();
    match user.verification_code_expire {
        Some(expires_at) if now <= expires_at => {}
        _ => {
            warn!(user_id = %user.id, "expired otp");
            return Err(AppError::Expired);
        }
    }

    user.mark_verified();
    state.users.update(&user).await?;
    info!(user_id = %user.id, "account verified");
    Ok(user)
}
