use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::repo::{RepoError, RepoResult, UserRepository};
use super::repo_types::{AttemptLimit, NewUser, User};

const USER_COLUMNS: &str = r#"
    id, name, email, phone, password_hash, account_verified,
    verification_code, verification_code_expire,
    reset_password_token_hash, reset_password_expire, created_at
"#;

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return RepoError::Conflict(db.constraint().unwrap_or("unique").to_string());
            }
        }
        RepoError::Backend(anyhow::Error::new(e))
    }
}

/// Postgres-backed user repository. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_unverified(&self, new: NewUser, limit: AttemptLimit) -> RepoResult<User> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // Serialize concurrent registrations touching the same email or phone.
        // Keys are locked in sorted order so two requests never deadlock.
        let mut keys = [format!("email:{}", new.email), format!("phone:{}", new.phone)];
        keys.sort();
        for key in &keys {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        let verified_exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE account_verified AND (email = $1 OR phone = $2)
            )
            "#,
        )
        .bind(&new.email)
        .bind(&new.phone)
        .fetch_one(&mut *tx)
        .await?;
        if verified_exists {
            return Err(RepoError::Conflict("verified email or phone".into()));
        }

        let attempts: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE NOT account_verified AND (email = $1 OR phone = $2) AND created_at >= $3
            "#,
        )
        .bind(&new.email)
        .bind(&new.phone)
        .bind(limit.since)
        .fetch_one(&mut *tx)
        .await?;
        if attempts as u64 >= limit.max_attempts {
            return Err(RepoError::LimitReached(limit.max_attempts));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, phone, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.context("commit tx")?;
        debug!(user_id = %user.id, "unverified user inserted");
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_verified_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND account_verified"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_verified_by_email_or_phone(
        &self,
        email: &str,
        phone: &str,
    ) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE account_verified AND (email = $1 OR phone = $2)
            LIMIT 1
            "#
        ))
        .bind(email)
        .bind(phone)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn count_unverified_attempts(
        &self,
        email: &str,
        phone: &str,
        since: OffsetDateTime,
    ) -> RepoResult<u64> {
        let n: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE NOT account_verified AND (email = $1 OR phone = $2) AND created_at >= $3
            "#,
        )
        .bind(email)
        .bind(phone)
        .bind(since)
        .fetch_one(&self.db)
        .await?;
        Ok(n as u64)
    }

    async fn find_unverified_newest_first(
        &self,
        email: &str,
        phone: &str,
    ) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE NOT account_verified AND (email = $1 OR phone = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(email)
        .bind(phone)
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn delete_unverified_except(
        &self,
        keep: Uuid,
        email: &str,
        phone: &str,
    ) -> RepoResult<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id <> $1 AND NOT account_verified AND (email = $2 OR phone = $3)
            "#,
        )
        .bind(keep)
        .bind(email)
        .bind(phone)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE reset_password_token_hash = $1 AND reset_password_expire > $2
            "#
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, user: &User) -> RepoResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE users SET
                name = $2,
                email = $3,
                phone = $4,
                password_hash = $5,
                account_verified = $6,
                verification_code = $7,
                verification_code_expire = $8,
                reset_password_token_hash = $9,
                reset_password_expire = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.account_verified)
        .bind(&user.verification_code)
        .bind(user.verification_code_expire)
        .bind(&user.reset_password_token_hash)
        .bind(user.reset_password_expire)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(RepoError::Backend(anyhow::anyhow!("user {} not found", user.id)));
        }
        Ok(())
    }

    async fn delete_unverified_created_before(&self, cutoff: OffsetDateTime) -> RepoResult<u64> {
        let res = sqlx::query("DELETE FROM users WHERE NOT account_verified AND created_at < $1")
            .bind(cutoff)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
