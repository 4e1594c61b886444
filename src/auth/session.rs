//! Stateless session tokens: signing, verification, cookie transport, login.

use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tower_cookies::{
    cookie::{time::Duration as CookieDuration, SameSite},
    Cookie, Cookies,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::claims::Claims;
use super::dto::LoginRequest;
use super::password::{burn_dummy_verification, normalize_email, verify_password};
use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
    state::AppState,
    users::User,
};

pub const SESSION_COOKIE: &str = "token";

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }

    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    fn sign_at(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Signature, expiry, issuer and audience. No server-side lookup.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// A freshly signed token and the user it was issued to.
#[derive(Debug)]
pub struct IssuedSession {
    pub token: String,
    pub user: User,
}

pub fn issue_session(keys: &JwtKeys, user: User) -> AppResult<IssuedSession> {
    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "session issued");
    Ok(IssuedSession { token, user })
}

/// Http-only cookie whose lifetime matches the token's own expiry.
pub fn set_session_cookie(cookies: &Cookies, state: &AppState, token: &str) {
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie.secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::minutes(state.config.jwt.ttl_minutes))
        .build();
    cookies.add(cookie);
}

/// Overwrites the cookie with an empty, already-expired one. Tokens copied
/// out before logout stay valid until their own `exp`.
pub fn clear_session_cookie(cookies: &Cookies) {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::ZERO)
        .expires(tower_cookies::cookie::time::OffsetDateTime::now_utc())
        .build();
    cookies.add(cookie);
}

/// Password login for verified accounts. Unknown email and wrong password
/// are indistinguishable to the caller.
pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<IssuedSession> {
    let (email, password) = match (req.email.as_deref(), req.password.as_deref()) {
        (Some(e), Some(p)) if !e.trim().is_empty() && !p.is_empty() => (normalize_email(e), p),
        _ => return Err(AppError::validation("Email and password are required.")),
    };

    let user = match state.users.find_verified_by_email(&email).await? {
        Some(u) => u,
        None => {
            burn_dummy_verification(password);
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    let ok = match verify_password(password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "stored hash unreadable");
            false
        }
    };
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    issue_session(&JwtKeys::from_ref(state), user)
}
