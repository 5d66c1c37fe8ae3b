use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::domain::Project;
use crate::infrastructure::error::AppResult;

/// Stockage des projets
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, project: &Project) -> AppResult<Project>;
    async fn find_project(&self, id: Uuid) -> AppResult<Option<Project>>;
    async fn list_projects(&self, user_id: Uuid) -> AppResult<Vec<Project>>;
    async fn update_project(&self, project: &Project) -> AppResult<Project>;
    async fn delete_project(&self, id: Uuid) -> AppResult<()>;
}

const PROJECT_COLUMNS: &str =
    "id, name, description, user_id, quantum_app_id, repo, created_at, updated_at";

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(&self, project: &Project) -> AppResult<Project> {
        let sql = format!(
            "INSERT INTO projects ({PROJECT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PROJECT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(project.id)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.user_id)
            .bind(project.quantum_app_id)
            .bind(&project.repo)
            .bind(project.created_at)
            .bind(project.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_project(&self, id: Uuid) -> AppResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_projects(&self, user_id: Uuid) -> AppResult<Vec<Project>> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_project(&self, project: &Project) -> AppResult<Project> {
        let sql = format!(
            "UPDATE projects SET name = $2, description = $3, quantum_app_id = $4, repo = $5, \
             updated_at = $6 WHERE id = $1 RETURNING {PROJECT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(project.id)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.quantum_app_id)
            .bind(&project.repo)
            .bind(project.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_project(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
