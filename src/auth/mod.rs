use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod phone;
pub mod registration;
pub mod reset;
mod secrets;
pub mod session;
pub mod verification;

pub use extractors::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new().nest("/user", handlers::user_routes())
}
