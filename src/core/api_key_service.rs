// core/api_key_service.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{ApiKeyStatus, UserApiKey};
use crate::infrastructure::database::{ApiKeyStore, Database};
use crate::infrastructure::error::{AppError, AppResult};
use crate::utils::security::{generate_api_key, mask_api_key};
use crate::utils::Config;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 100, message = "Le nom doit contenir entre 1 et 100 caractères"))]
    pub name: String,
    #[validate(range(min = 1, max = 3650, message = "La durée doit être comprise entre 1 et 3650 jours"))]
    pub expires_days: Option<i64>,
    #[validate(range(min = 1, message = "La limite doit être positive"))]
    pub rate_limit: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateApiKeyRequest {
    #[validate(length(min = 1, max = 100, message = "Le nom doit contenir entre 1 et 100 caractères"))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
    #[validate(range(min = 1, max = 3650, message = "La durée doit être comprise entre 1 et 3650 jours"))]
    pub expires_days: Option<i64>,
}

/// Vue d'une clé API ; la valeur n'est révélée qu'à la création
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub key: String,
    pub status: ApiKeyStatus,
    pub is_active: bool,
    pub rate_limit: Option<i32>,
    pub expire_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKeyResponse {
    fn build(key: UserApiKey, value: String) -> Self {
        Self {
            id: key.id,
            name: key.name,
            key: value,
            status: key.status,
            is_active: key.status == ApiKeyStatus::Active,
            rate_limit: key.rate_limit,
            expire_at: key.expire_at,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
            updated_at: key.updated_at,
        }
    }

    pub fn masked(key: UserApiKey) -> Self {
        let value = mask_api_key(&key.value);
        Self::build(key, value)
    }

    pub fn revealed(key: UserApiKey) -> Self {
        let value = key.value.clone();
        Self::build(key, value)
    }
}

pub struct ApiKeyService {
    db: Database,
    config: Arc<Config>,
}

impl ApiKeyService {
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Crée une clé ; seule cette réponse contient la valeur complète
    pub async fn create(&self, user_id: Uuid, request: CreateApiKeyRequest) -> AppResult<ApiKeyResponse> {
        request.validate()?;

        let days = request.expires_days.unwrap_or(self.config.api_key_expiry_days);
        let key = UserApiKey::new(
            user_id,
            request.name,
            generate_api_key(),
            Some(Utc::now() + Duration::days(days)),
            request.rate_limit,
        );
        let key = self.db.create_api_key(&key).await?;
        info!("🔑 Clé API {} créée pour l'utilisateur {}", key.id, user_id);

        Ok(ApiKeyResponse::revealed(key))
    }

    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<ApiKeyResponse>> {
        let keys = self.db.list_api_keys(user_id).await?;
        Ok(keys.into_iter().map(ApiKeyResponse::masked).collect())
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<ApiKeyResponse> {
        Ok(ApiKeyResponse::masked(self.owned(user_id, id).await?))
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, request: UpdateApiKeyRequest) -> AppResult<ApiKeyResponse> {
        request.validate()?;
        let mut key = self.owned(user_id, id).await?;

        if let Some(name) = request.name {
            key.name = name;
        }
        if let Some(active) = request.is_active {
            key.set_active(active);
        }
        if let Some(days) = request.expires_days {
            key.expire_at = Some(Utc::now() + Duration::days(days));
        }
        key.updated_at = Utc::now();

        let key = self.db.update_api_key(&key).await?;
        Ok(ApiKeyResponse::masked(key))
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        let key = self.owned(user_id, id).await?;
        self.db.delete_api_key(key.id).await?;
        info!("🗑️ Clé API {} supprimée", key.id);
        Ok(())
    }

    async fn owned(&self, user_id: Uuid, id: Uuid) -> AppResult<UserApiKey> {
        self.db
            .find_api_key(id)
            .await?
            .filter(|k| k.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("API key".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth_service::tests::{registered_user, service as auth_service};

    fn service(db: &Database) -> ApiKeyService {
        ApiKeyService::new(db.clone(), Arc::new(Config::default()))
    }

    fn create_request(name: &str) -> CreateApiKeyRequest {
        CreateApiKeyRequest { name: name.to_string(), expires_days: None, rate_limit: Some(60) }
    }

    #[tokio::test]
    async fn test_key_is_revealed_once_then_masked() {
        let db = Database::in_memory();
        let user = registered_user(&db, "alice").await;
        let keys = service(&db);

        let created = keys.create(user.id, create_request("ci")).await.unwrap();
        assert!(created.key.starts_with("qh_"));
        assert_eq!(created.key.len(), 35);
        assert!(created.expire_at.is_some());

        let listed = keys.list(user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_ne!(listed[0].key, created.key);
        assert!(listed[0].key.ends_with(&created.key[created.key.len() - 4..]));
        assert!(listed[0].key.contains('*'));
    }

    #[tokio::test]
    async fn test_keys_are_scoped_to_owner() {
        let db = Database::in_memory();
        let alice = registered_user(&db, "alice").await;
        let bob = registered_user(&db, "bob").await;
        let keys = service(&db);

        let created = keys.create(alice.id, create_request("mine")).await.unwrap();
        let err = keys.get(bob.id, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(keys.delete(bob.id, created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_revoked_key_no_longer_authenticates() {
        let db = Database::in_memory();
        let user = registered_user(&db, "carol").await;
        let keys = service(&db);
        let auth = auth_service(&db);

        let created = keys.create(user.id, create_request("ci")).await.unwrap();
        let caller = auth.user_from_api_key(&created.key).await.unwrap();
        assert_eq!(caller.id, user.id);
        assert!(keys.get(user.id, created.id).await.unwrap().last_used_at.is_some());

        let revoked = keys
            .update(user.id, created.id, UpdateApiKeyRequest { is_active: Some(false), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(revoked.status, ApiKeyStatus::Revoked);
        assert!(auth.user_from_api_key(&created.key).await.is_err());

        keys.update(user.id, created.id, UpdateApiKeyRequest { is_active: Some(true), ..Default::default() })
            .await
            .unwrap();
        assert!(auth.user_from_api_key(&created.key).await.is_ok());
    }
}
