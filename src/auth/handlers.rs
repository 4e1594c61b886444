use axum::{
    extract::{FromRef, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tower_cookies::Cookies;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MeResponse, MessageResponse,
            RegisterRequest, ResetPasswordRequest, VerifyOtpRequest,
        },
        extractors::{ApiJson, AuthUser},
        registration, reset,
        session::{self, clear_session_cookie, issue_session, set_session_cookie, JwtKeys},
        verification,
    },
    error::{AppError, AppResult},
    state::AppState,
    users::User,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/otp-verification", post(verify_otp))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/me", get(get_me))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/:token", put(reset_password))
}

fn signed_in(
    state: &AppState,
    cookies: &Cookies,
    user: User,
    message: &str,
) -> AppResult<Json<AuthResponse>> {
    let issued = issue_session(&JwtKeys::from_ref(state), user)?;
    set_session_cookie(cookies, state, &issued.token);
    Ok(Json(AuthResponse {
        success: true,
        user: issued.user.into(),
        message: message.to_string(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<Json<MessageResponse>> {
    let message = registration::register(&state, payload).await?;
    Ok(Json(MessageResponse::ok(message)))
}

#[instrument(skip(state, cookies, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    cookies: Cookies,
    ApiJson(payload): ApiJson<VerifyOtpRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = verification::verify_otp(&state, payload).await?;
    signed_in(&state, &cookies, user, "Account Verified.")
}

#[instrument(skip(state, cookies, payload))]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let issued = session::login(&state, payload).await?;
    set_session_cookie(&cookies, &state, &issued.token);
    Ok(Json(AuthResponse {
        success: true,
        user: issued.user.into(),
        message: "User logged in successfully.".to_string(),
    }))
}

#[instrument(skip(cookies))]
pub async fn logout(cookies: Cookies) -> Json<MessageResponse> {
    clear_session_cookie(&cookies);
    info!("session cookie cleared");
    Json(MessageResponse::ok("Logged out successfully."))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<MeResponse>> {
    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "session for missing user");
        AppError::Unauthorized("User not found.".into())
    })?;

    Ok(Json(MeResponse {
        success: true,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let message = reset::request_reset(&state, payload).await?;
    Ok(Json(MessageResponse::ok(message)))
}

#[instrument(skip(state, cookies, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(token): Path<String>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = reset::reset_password(&state, &token, payload).await?;
    signed_in(&state, &cookies, user, "Password reset successfully.")
}
