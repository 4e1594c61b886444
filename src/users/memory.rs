//! In-memory user repository, used by tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{RepoError, RepoResult, UserRepository};
use super::repo_types::{AttemptLimit, NewUser, User};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

fn shares_identity(user: &User, email: &str, phone: &str) -> bool {
    user.email == email || user.phone == phone
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, oldest first.
    pub async fn all(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        users
    }

    /// Store `user` as-is, skipping the registration checks. Lets tests stage
    /// a record that slipped in while another was being verified.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Overwrite `created_at` (for testing purposes).
    pub async fn set_created_at(&self, id: Uuid, created_at: OffsetDateTime) -> RepoResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| RepoError::Backend(anyhow::anyhow!("user {id} not found")))?;
        user.created_at = created_at;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_unverified(&self, new: NewUser, limit: AttemptLimit) -> RepoResult<User> {
        // Single write guard: the checks and the insert are one critical section.
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.account_verified && shares_identity(u, &new.email, &new.phone))
        {
            return Err(RepoError::Conflict("verified email or phone".into()));
        }

        let attempts = users
            .values()
            .filter(|u| {
                !u.account_verified
                    && shares_identity(u, &new.email, &new.phone)
                    && u.created_at >= limit.since
            })
            .count() as u64;
        if attempts >= limit.max_attempts {
            return Err(RepoError::LimitReached(limit.max_attempts));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            password_hash: new.password_hash,
            account_verified: false,
            verification_code: None,
            verification_code_expire: None,
            reset_password_token_hash: None,
            reset_password_expire: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_verified_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.account_verified && u.email == email)
            .cloned())
    }

    async fn find_verified_by_email_or_phone(
        &self,
        email: &str,
        phone: &str,
    ) -> RepoResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.account_verified && shares_identity(u, email, phone))
            .cloned())
    }

    async fn count_unverified_attempts(
        &self,
        email: &str,
        phone: &str,
        since: OffsetDateTime,
    ) -> RepoResult<u64> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|u| !u.account_verified && shares_identity(u, email, phone) && u.created_at >= since)
            .count() as u64)
    }

    async fn find_unverified_newest_first(
        &self,
        email: &str,
        phone: &str,
    ) -> RepoResult<Vec<User>> {
        let mut found: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| !u.account_verified && shares_identity(u, email, phone))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn delete_unverified_except(
        &self,
        keep: Uuid,
        email: &str,
        phone: &str,
    ) -> RepoResult<u64> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|id, u| *id == keep || u.account_verified || !shares_identity(u, email, phone));
        Ok((before - users.len()) as u64)
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> RepoResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| {
                u.reset_password_token_hash.as_deref() == Some(token_hash)
                    && u.reset_password_expire.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn update(&self, user: &User) -> RepoResult<()> {
        let mut users = self.users.write().await;
        if user.account_verified {
            if let Some(owner) = users.values().find(|u| {
                u.id != user.id && u.account_verified && shares_identity(u, &user.email, &user.phone)
            }) {
                let field = if owner.email == user.email { "email" } else { "phone" };
                return Err(RepoError::Conflict(format!("verified {field}")));
            }
        }
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| RepoError::Backend(anyhow::anyhow!("user {} not found", user.id)))?;
        let created_at = stored.created_at;
        *stored = user.clone();
        stored.created_at = created_at;
        Ok(())
    }

    async fn delete_unverified_created_before(&self, cutoff: OffsetDateTime) -> RepoResult<u64> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|_, u| u.account_verified || u.created_at >= cutoff);
        Ok((before - users.len()) as u64)
    }
}
