use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{AttemptLimit, NewUser, User};

#[derive(Debug, Error)]
pub enum RepoError {
    /// A verified record already owns this email or phone.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("registration attempt limit ({0}) reached")]
    LimitReached(u64),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence contract for user accounts.
///
/// `create_unverified` and `update` are the enforcement points for the
/// verified-uniqueness and attempt-limit rules; callers may pre-check with
/// the read methods but must not rely on them.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new unverified user unless a verified owner of the email or
    /// phone exists (`Conflict`) or the attempt limit is hit (`LimitReached`).
    async fn create_unverified(&self, new: NewUser, limit: AttemptLimit) -> RepoResult<User>;

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn find_verified_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn find_verified_by_email_or_phone(
        &self,
        email: &str,
        phone: &str,
    ) -> RepoResult<Option<User>>;

    /// Unverified records sharing the email or phone, created at or after `since`.
    async fn count_unverified_attempts(
        &self,
        email: &str,
        phone: &str,
        since: OffsetDateTime,
    ) -> RepoResult<u64>;

    /// Unverified records sharing the email or phone, newest `created_at` first.
    async fn find_unverified_newest_first(&self, email: &str, phone: &str)
        -> RepoResult<Vec<User>>;

    /// Delete unverified records sharing the email or phone, except `keep`.
    async fn delete_unverified_except(&self, keep: Uuid, email: &str, phone: &str)
        -> RepoResult<u64>;

    /// User holding this reset token hash whose expiry is after `now`.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> RepoResult<Option<User>>;

    /// Persist all mutable fields. Fails with `Conflict` if verifying would
    /// create a second verified owner of an email or phone.
    async fn update(&self, user: &User) -> RepoResult<()>;

    /// Remove unverified users created before `cutoff`.
    async fn delete_unverified_created_before(&self, cutoff: OffsetDateTime) -> RepoResult<u64>;
}
