//! Forgot-password email and token redemption.

use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use super::dto::{ForgotPasswordRequest, ResetPasswordRequest};
use super::password::{hash_password, normalize_email};
use super::secrets::{generate_reset_token, hash_reset_token};
use crate::{
    error::{AppError, AppResult},
    notify::{templates, OutboundEmail},
    state::AppState,
    users::User,
};

/// Mail a single-use reset link to a verified account.
///
/// Only the SHA-256 of the token is stored. When the email cannot be sent the
/// stored hash is cleared again.
#[instrument(skip(state, req))]
pub async fn request_reset(state: &AppState, req: ForgotPasswordRequest) -> AppResult<String> {
    let email = match req.email.as_deref() {
        Some(e) if !e.trim().is_empty() => normalize_email(e),
        _ => return Err(AppError::validation("Email is required.")),
    };

    let mut user = state
        .users
        .find_verified_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    let token = generate_reset_token();
    let expires_at = OffsetDateTime::now_utc()
        + Duration::minutes(state.config.verification.reset_token_ttl_minutes);
    user.set_reset_token(hash_reset_token(&token), expires_at);
    state.users.update(&user).await?;

    let url = templates::reset_url(&state.config.frontend_url, &token);
    let outbound = OutboundEmail {
        recipient: user.email.clone(),
        subject: templates::RESET_SUBJECT.to_string(),
        html_body: templates::reset_email(&url),
    };

    if let Err(e) = state.mailer.send(outbound).await {
        warn!(user_id = %user.id, error = %e, "reset email failed");
        user.clear_reset_token();
        if let Err(rollback) = state.users.update(&user).await {
            warn!(error = %rollback, "could not clear undelivered reset token");
        }
        return Err(AppError::DispatchFailure(format!("{e:#}")));
    }

    info!(user_id = %user.id, "reset email sent");
    Ok(format!("Email sent to {} successfully.", user.email))
}

/// Redeem a reset token and set a new password. The token is consumed.
#[instrument(skip(state, token, req))]
pub async fn reset_password(
    state: &AppState,
    token: &str,
    req: ResetPasswordRequest,
) -> AppResult<User> {
    let now = OffsetDateTime::now_utc();
    let mut user = state
        .users
        .find_by_reset_token(&hash_reset_token(token), now)
        .await?
        .ok_or(AppError::InvalidOrExpiredResetToken)?;

    let password = match req.password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(AppError::validation("Password is required.")),
    };
    if req.confirm_password.as_deref() != Some(password.as_str()) {
        return Err(AppError::PasswordMismatch);
    }

    user.password_hash = hash_password(&password)?;
    user.clear_reset_token();
    state.users.update(&user).await?;
    info!(user_id = %user.id, "password reset");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::users::{AttemptLimit, NewUser};

    async fn verified_user(state: &AppState) -> User {
        let mut user = state
            .users
            .create_unverified(
                NewUser {
                    name: "A".into(),
                    email: "a@x.com".into(),
                    phone: "+919812345678".into(),
                    password_hash: hash_password("old-pass").unwrap(),
                },
                AttemptLimit {
                    max_attempts: 3,
                    since: OffsetDateTime::now_utc() - Duration::hours(1),
                },
            )
            .await
            .unwrap();
        user.mark_verified();
        state.users.update(&user).await.unwrap();
        user
    }

    fn forgot(email: &str) -> ForgotPasswordRequest {
        ForgotPasswordRequest {
            email: Some(email.into()),
        }
    }

    fn new_password(p: &str, c: &str) -> ResetPasswordRequest {
        ResetPasswordRequest {
            password: Some(p.into()),
            confirm_password: Some(c.into()),
        }
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let state = AppState::fake();
        let err = request_reset(&state, forgot("nobody@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn request_stores_only_the_hash() {
        let state = AppState::fake();
        let user = verified_user(&state).await;
        let msg = request_reset(&state, forgot("A@x.com")).await.unwrap();
        assert_eq!(msg, "Email sent to a@x.com successfully.");

        let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
        let hash = stored.reset_password_token_hash.unwrap();
        assert_eq!(hash.len(), 64);
        let ttl = stored.reset_password_expire.unwrap() - OffsetDateTime::now_utc();
        assert!(ttl <= Duration::minutes(15) && ttl > Duration::minutes(14));
    }

    #[tokio::test]
    async fn token_is_single_use() {
        let state = AppState::fake();
        let mut user = verified_user(&state).await;
        user.set_reset_token(
            hash_reset_token("tok"),
            OffsetDateTime::now_utc() + Duration::minutes(15),
        );
        state.users.update(&user).await.unwrap();

        let err = reset_password(&state, "tok", new_password("a", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PasswordMismatch));

        let updated = reset_password(&state, "tok", new_password("new-pass", "new-pass"))
            .await
            .unwrap();
        assert!(verify_password("new-pass", &updated.password_hash).unwrap());
        assert!(updated.reset_password_token_hash.is_none());

        let err = reset_password(&state, "tok", new_password("x", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredResetToken));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let state = AppState::fake();
        let mut user = verified_user(&state).await;
        user.set_reset_token(
            hash_reset_token("old"),
            OffsetDateTime::now_utc() - Duration::seconds(1),
        );
        state.users.update(&user).await.unwrap();

        let err = reset_password(&state, "old", new_password("p", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredResetToken));
    }
}
