// core/registry_service.rs
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::domain::RegistryItem;
use crate::infrastructure::database::{Database, RegistryStore};
use crate::infrastructure::error::{AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRegistryItemRequest {
    #[validate(length(min = 1, max = 255, message = "Le nom doit contenir entre 1 et 255 caractères"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50, message = "La version est requise"))]
    pub version: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRegistryItemRequest {
    #[validate(length(min = 1, max = 255, message = "Le nom doit contenir entre 1 et 255 caractères"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50, message = "La version est requise"))]
    pub version: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Registre public des applications
pub struct RegistryService {
    db: Database,
}

impl RegistryService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, provider_id: Uuid, request: CreateRegistryItemRequest) -> AppResult<RegistryItem> {
        request.validate()?;
        let item = RegistryItem::new(
            provider_id,
            request.name,
            request.description,
            request.version,
            request.tags,
        );
        let item = self.db.create_registry_item(&item).await?;
        info!("📚 Entrée de registre {} v{} créée", item.name, item.version);
        Ok(item)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<RegistryItem> {
        self.db
            .find_registry_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Registry item".to_string()))
    }

    pub async fn list(&self, provider_id: Option<Uuid>) -> AppResult<Vec<RegistryItem>> {
        self.db.list_registry_items(provider_id).await
    }

    pub async fn search(&self, query: &str) -> AppResult<Vec<RegistryItem>> {
        let query = query.trim();
        if query.is_empty() {
            return self.db.list_registry_items(None).await;
        }
        self.db.search_registry_items(query).await
    }

    /// Toutes les versions publiées sous un même nom
    pub async fn versions(&self, name: &str) -> AppResult<Vec<RegistryItem>> {
        self.db.list_registry_versions(name).await
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, request: UpdateRegistryItemRequest) -> AppResult<RegistryItem> {
        request.validate()?;
        let mut item = self.owned(user_id, id).await?;

        if let Some(name) = request.name {
            item.name = name;
        }
        if request.description.is_some() {
            item.description = request.description;
        }
        if let Some(version) = request.version {
            item.version = version;
        }
        if let Some(tags) = request.tags {
            item.tags = tags;
        }
        item.updated_at = Utc::now();

        self.db.update_registry_item(&item).await
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        let item = self.owned(user_id, id).await?;
        self.db.delete_registry_item(item.id).await?;
        info!("🗑️ Entrée de registre {} supprimée", item.id);
        Ok(())
    }

    async fn owned(&self, user_id: Uuid, id: Uuid) -> AppResult<RegistryItem> {
        let item = self.get(id).await?;
        if item.provider_id != user_id {
            return Err(AppError::Forbidden("Not enough permissions".to_string()));
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, version: &str, tags: &[&str]) -> CreateRegistryItemRequest {
        CreateRegistryItemRequest {
            name: name.to_string(),
            description: Some("Quantum search".into()),
            version: version.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_only_provider_can_modify() {
        let registry = RegistryService::new(Database::in_memory());
        let provider = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let item = registry.create(provider, request("grover", "1.0.0", &[])).await.unwrap();

        let err = registry
            .update(stranger, item.id, UpdateRegistryItemRequest { version: Some("2.0.0".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.client_message(), "Not enough permissions");
        assert!(matches!(registry.delete(stranger, item.id).await, Err(AppError::Forbidden(_))));

        registry.delete(provider, item.id).await.unwrap();
        assert!(matches!(registry.get(item.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_search_and_versions() {
        let registry = RegistryService::new(Database::in_memory());
        let provider = Uuid::new_v4();
        registry.create(provider, request("grover", "1.0.0", &["search"])).await.unwrap();
        registry.create(provider, request("grover", "1.1.0", &["search"])).await.unwrap();
        registry.create(provider, request("qaoa", "0.1.0", &["optimization"])).await.unwrap();

        assert_eq!(registry.search("GROV").await.unwrap().len(), 2);
        assert_eq!(registry.search("optim").await.unwrap().len(), 1);
        assert_eq!(registry.versions("grover").await.unwrap().len(), 2);
        assert_eq!(registry.list(Some(provider)).await.unwrap().len(), 3);
        assert!(registry.list(Some(Uuid::new_v4())).await.unwrap().is_empty());
    }
}
