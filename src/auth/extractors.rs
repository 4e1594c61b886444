use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use tower_cookies::cookie::Cookie;
use tracing::debug;
use uuid::Uuid;

use super::session::{JwtKeys, SESSION_COOKIE};
use crate::error::AppError;

/// `Json` body whose rejections render as `{success: false, message}` with 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Validates the session token and yields the user id.
///
/// The `token` cookie is checked first, then an `Authorization: Bearer` header.
pub struct AuthUser(pub Uuid);

fn token_from_cookie(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_string())
}

fn token_from_bearer(parts: &Parts) -> Option<String> {
    let auth = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_cookie(parts)
            .or_else(|| token_from_bearer(parts))
            .ok_or_else(|| AppError::Unauthorized("Please login to access this resource.".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            debug!(error = %e, "session token rejected");
            AppError::Unauthorized("Invalid or expired session.".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}
