use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::domain::RegistryItem;
use crate::infrastructure::error::AppResult;

/// Stockage du registre public
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn create_registry_item(&self, item: &RegistryItem) -> AppResult<RegistryItem>;
    async fn find_registry_item(&self, id: Uuid) -> AppResult<Option<RegistryItem>>;
    async fn find_registry_item_by_app(&self, app_id: Uuid) -> AppResult<Option<RegistryItem>>;
    async fn list_registry_items(&self, provider_id: Option<Uuid>) -> AppResult<Vec<RegistryItem>>;
    /// Recherche insensible à la casse sur le nom, la description et les tags
    async fn search_registry_items(&self, query: &str) -> AppResult<Vec<RegistryItem>>;
    /// Toutes les entrées portant ce nom, la plus récente d'abord
    async fn list_registry_versions(&self, name: &str) -> AppResult<Vec<RegistryItem>>;
    async fn update_registry_item(&self, item: &RegistryItem) -> AppResult<RegistryItem>;
    async fn delete_registry_item(&self, id: Uuid) -> AppResult<()>;
}

const REGISTRY_COLUMNS: &str =
    "id, name, description, version, tags, provider_id, quantum_app_id, created_at, updated_at";

/// Échappe les jokers LIKE d'une saisie utilisateur
pub(super) fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl RegistryStore for PgStore {
    async fn create_registry_item(&self, item: &RegistryItem) -> AppResult<RegistryItem> {
        let sql = format!(
            "INSERT INTO registry_items ({REGISTRY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {REGISTRY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, RegistryItem>(&sql)
            .bind(item.id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.version)
            .bind(&item.tags)
            .bind(item.provider_id)
            .bind(item.quantum_app_id)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_registry_item(&self, id: Uuid) -> AppResult<Option<RegistryItem>> {
        let sql = format!("SELECT {REGISTRY_COLUMNS} FROM registry_items WHERE id = $1");
        Ok(sqlx::query_as::<_, RegistryItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_registry_item_by_app(&self, app_id: Uuid) -> AppResult<Option<RegistryItem>> {
        let sql = format!(
            "SELECT {REGISTRY_COLUMNS} FROM registry_items WHERE quantum_app_id = $1 \
             ORDER BY created_at DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, RegistryItem>(&sql)
            .bind(app_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_registry_items(&self, provider_id: Option<Uuid>) -> AppResult<Vec<RegistryItem>> {
        let sql = format!(
            "SELECT {REGISTRY_COLUMNS} FROM registry_items \
             WHERE ($1::UUID IS NULL OR provider_id = $1) ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, RegistryItem>(&sql)
            .bind(provider_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn search_registry_items(&self, query: &str) -> AppResult<Vec<RegistryItem>> {
        let sql = format!(
            "SELECT {REGISTRY_COLUMNS} FROM registry_items \
             WHERE name ILIKE $1 OR description ILIKE $1 \
             OR EXISTS (SELECT 1 FROM UNNEST(tags) AS tag WHERE tag ILIKE $1) \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, RegistryItem>(&sql)
            .bind(like_pattern(query))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_registry_versions(&self, name: &str) -> AppResult<Vec<RegistryItem>> {
        let sql = format!(
            "SELECT {REGISTRY_COLUMNS} FROM registry_items WHERE name = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, RegistryItem>(&sql)
            .bind(name)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_registry_item(&self, item: &RegistryItem) -> AppResult<RegistryItem> {
        let sql = format!(
            "UPDATE registry_items SET name = $2, description = $3, version = $4, tags = $5, \
             updated_at = $6 WHERE id = $1 RETURNING {REGISTRY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, RegistryItem>(&sql)
            .bind(item.id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.version)
            .bind(&item.tags)
            .bind(item.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_registry_item(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM registry_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("grover"), "%grover%");
        assert_eq!(like_pattern("100%_sure"), "%100\\%\\_sure%");
    }
}
