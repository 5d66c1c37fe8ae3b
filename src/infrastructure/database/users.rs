use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::domain::{ApiKeyStatus, User, UserApiKey};
use crate::infrastructure::error::AppResult;

/// Stockage des comptes utilisateurs
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> AppResult<User>;
    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn update_user(&self, user: &User) -> AppResult<User>;
}

/// Stockage des clés API
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn create_api_key(&self, key: &UserApiKey) -> AppResult<UserApiKey>;
    async fn find_api_key(&self, id: Uuid) -> AppResult<Option<UserApiKey>>;
    async fn find_api_key_by_value(&self, value: &str) -> AppResult<Option<UserApiKey>>;
    async fn list_api_keys(&self, user_id: Uuid) -> AppResult<Vec<UserApiKey>>;
    async fn update_api_key(&self, key: &UserApiKey) -> AppResult<UserApiKey>;
    async fn delete_api_key(&self, id: Uuid) -> AppResult<()>;
    /// Passe en `expired` les clés actives dont l'échéance est dépassée
    async fn expire_api_keys(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

const USER_COLUMNS: &str = "id, username, email, hashed_password, full_name, roles, is_active, \
     is_provider, last_login, created_at, updated_at";

const API_KEY_COLUMNS: &str = "id, user_id, name, value, status, rate_limit, expire_at, \
     last_used_at, created_at, updated_at";

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: &User) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {USER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .bind(&user.full_name)
            .bind(&user.roles)
            .bind(user.is_active)
            .bind(user.is_provider)
            .bind(user.last_login)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, user: &User) -> AppResult<User> {
        let sql = format!(
            "UPDATE users SET email = $2, hashed_password = $3, full_name = $4, roles = $5, \
             is_active = $6, is_provider = $7, last_login = $8, updated_at = $9 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .bind(&user.full_name)
            .bind(&user.roles)
            .bind(user.is_active)
            .bind(user.is_provider)
            .bind(user.last_login)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl ApiKeyStore for PgStore {
    async fn create_api_key(&self, key: &UserApiKey) -> AppResult<UserApiKey> {
        let sql = format!(
            "INSERT INTO user_api_keys ({API_KEY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {API_KEY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, UserApiKey>(&sql)
            .bind(key.id)
            .bind(key.user_id)
            .bind(&key.name)
            .bind(&key.value)
            .bind(key.status)
            .bind(key.rate_limit)
            .bind(key.expire_at)
            .bind(key.last_used_at)
            .bind(key.created_at)
            .bind(key.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_api_key(&self, id: Uuid) -> AppResult<Option<UserApiKey>> {
        let sql = format!("SELECT {API_KEY_COLUMNS} FROM user_api_keys WHERE id = $1");
        Ok(sqlx::query_as::<_, UserApiKey>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_api_key_by_value(&self, value: &str) -> AppResult<Option<UserApiKey>> {
        let sql = format!("SELECT {API_KEY_COLUMNS} FROM user_api_keys WHERE value = $1");
        Ok(sqlx::query_as::<_, UserApiKey>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_api_keys(&self, user_id: Uuid) -> AppResult<Vec<UserApiKey>> {
        let sql = format!(
            "SELECT {API_KEY_COLUMNS} FROM user_api_keys WHERE user_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, UserApiKey>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_api_key(&self, key: &UserApiKey) -> AppResult<UserApiKey> {
        let sql = format!(
            "UPDATE user_api_keys SET name = $2, status = $3, rate_limit = $4, expire_at = $5, \
             last_used_at = $6, updated_at = $7 WHERE id = $1 RETURNING {API_KEY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, UserApiKey>(&sql)
            .bind(key.id)
            .bind(&key.name)
            .bind(key.status)
            .bind(key.rate_limit)
            .bind(key.expire_at)
            .bind(key.last_used_at)
            .bind(key.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_api_key(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM user_api_keys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn expire_api_keys(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE user_api_keys SET status = $1, updated_at = $2 \
             WHERE status = $3 AND expire_at IS NOT NULL AND expire_at <= $2",
        )
        .bind(ApiKeyStatus::Expired)
        .bind(now)
        .bind(ApiKeyStatus::Active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
