use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::PgStore;
use crate::domain::{AppVersion, Project, QuantumApp};
use crate::infrastructure::error::AppResult;

/// Publication d'une nouvelle version « latest », enregistrée atomiquement :
/// l'application (créée ou mise à jour), la version, et le projet lié le cas échéant.
#[derive(Debug, Clone)]
pub struct ReleaseRecord {
    pub app: QuantumApp,
    pub app_is_new: bool,
    pub version: AppVersion,
    pub project: Option<Project>,
}

/// Stockage des applications quantiques et de leurs versions
#[async_trait]
pub trait AppStore: Send + Sync {
    async fn create_app(&self, app: &QuantumApp) -> AppResult<QuantumApp>;
    async fn find_app(&self, id: Uuid) -> AppResult<Option<QuantumApp>>;
    async fn find_app_by_name(&self, developer_id: Uuid, name: &str) -> AppResult<Option<QuantumApp>>;
    async fn list_apps(&self, developer_id: Uuid) -> AppResult<Vec<QuantumApp>>;
    async fn update_app(&self, app: &QuantumApp) -> AppResult<QuantumApp>;
    /// Supprime l'application, ses versions, annonces et entrées de registre
    async fn delete_app(&self, id: Uuid) -> AppResult<()>;

    async fn save_release(&self, release: &ReleaseRecord) -> AppResult<()>;
    /// Version complète, contenu du paquet inclus
    async fn find_version(&self, id: Uuid) -> AppResult<Option<AppVersion>>;
    /// Versions d'une application, la plus récente d'abord, sans le contenu des paquets
    async fn list_versions(&self, app_id: Uuid) -> AppResult<Vec<AppVersion>>;
    async fn update_version(&self, version: &AppVersion) -> AppResult<AppVersion>;
    async fn increment_download_count(&self, app_id: Uuid) -> AppResult<()>;
}

const APP_COLUMNS: &str = "id, developer_id, name, description, app_type, status, visibility, \
     latest_version_id, api_url, documentation_url, license_type, license_url, readme_content, \
     repository_url, is_in_registry, registry_published_at, featured_in_registry, \
     registry_download_count, created_at, updated_at";

const VERSION_SUMMARY_COLUMNS: &str = "id, quantum_app_id, version_number, sdk_used, \
     input_schema, output_schema, preferred_platform, preferred_device_id, number_of_qubits, \
     source_repo, package_path, package_checksum, release_notes, is_latest, status, \
     created_at, updated_at";

impl PgStore {
    async fn insert_app(tx: &mut Transaction<'_, Postgres>, app: &QuantumApp) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO quantum_apps ({APP_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"
        );
        sqlx::query(&sql)
            .bind(app.id)
            .bind(app.developer_id)
            .bind(&app.name)
            .bind(&app.description)
            .bind(app.app_type)
            .bind(&app.status)
            .bind(app.visibility)
            .bind(app.latest_version_id)
            .bind(&app.api_url)
            .bind(&app.documentation_url)
            .bind(app.license_type)
            .bind(&app.license_url)
            .bind(&app.readme_content)
            .bind(&app.repository_url)
            .bind(app.is_in_registry)
            .bind(app.registry_published_at)
            .bind(app.featured_in_registry)
            .bind(app.registry_download_count)
            .bind(app.created_at)
            .bind(app.updated_at)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn write_app(tx: &mut Transaction<'_, Postgres>, app: &QuantumApp) -> AppResult<QuantumApp> {
        // Le compteur de téléchargements n'est modifié que par increment_download_count
        let sql = format!(
            "UPDATE quantum_apps SET name = $2, description = $3, app_type = $4, status = $5, \
             visibility = $6, latest_version_id = $7, api_url = $8, documentation_url = $9, \
             license_type = $10, license_url = $11, readme_content = $12, repository_url = $13, \
             is_in_registry = $14, registry_published_at = $15, featured_in_registry = $16, \
             updated_at = $17 WHERE id = $1 RETURNING {APP_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, QuantumApp>(&sql)
            .bind(app.id)
            .bind(&app.name)
            .bind(&app.description)
            .bind(app.app_type)
            .bind(&app.status)
            .bind(app.visibility)
            .bind(app.latest_version_id)
            .bind(&app.api_url)
            .bind(&app.documentation_url)
            .bind(app.license_type)
            .bind(&app.license_url)
            .bind(&app.readme_content)
            .bind(&app.repository_url)
            .bind(app.is_in_registry)
            .bind(app.registry_published_at)
            .bind(app.featured_in_registry)
            .bind(app.updated_at)
            .fetch_one(&mut **tx)
            .await?)
    }

    async fn insert_version(tx: &mut Transaction<'_, Postgres>, version: &AppVersion) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO app_versions (id, quantum_app_id, version_number, sdk_used, input_schema, \
             output_schema, preferred_platform, preferred_device_id, number_of_qubits, source_repo, \
             package_path, package_data, package_checksum, release_notes, is_latest, status, \
             created_at, updated_at) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        )
        .bind(version.id)
        .bind(version.quantum_app_id)
        .bind(&version.version_number)
        .bind(&version.sdk_used)
        .bind(&version.input_schema)
        .bind(&version.output_schema)
        .bind(&version.preferred_platform)
        .bind(&version.preferred_device_id)
        .bind(version.number_of_qubits)
        .bind(&version.source_repo)
        .bind(&version.package_path)
        .bind(&version.package_data)
        .bind(&version.package_checksum)
        .bind(&version.release_notes)
        .bind(version.is_latest)
        .bind(version.status)
        .bind(version.created_at)
        .bind(version.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AppStore for PgStore {
    async fn create_app(&self, app: &QuantumApp) -> AppResult<QuantumApp> {
        let mut tx = self.pool.begin().await?;
        Self::insert_app(&mut tx, app).await?;
        tx.commit().await?;
        Ok(app.clone())
    }

    async fn find_app(&self, id: Uuid) -> AppResult<Option<QuantumApp>> {
        let sql = format!("SELECT {APP_COLUMNS} FROM quantum_apps WHERE id = $1");
        Ok(sqlx::query_as::<_, QuantumApp>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_app_by_name(&self, developer_id: Uuid, name: &str) -> AppResult<Option<QuantumApp>> {
        let sql = format!(
            "SELECT {APP_COLUMNS} FROM quantum_apps WHERE developer_id = $1 AND name = $2 \
             ORDER BY created_at LIMIT 1"
        );
        Ok(sqlx::query_as::<_, QuantumApp>(&sql)
            .bind(developer_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_apps(&self, developer_id: Uuid) -> AppResult<Vec<QuantumApp>> {
        let sql = format!(
            "SELECT {APP_COLUMNS} FROM quantum_apps WHERE developer_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, QuantumApp>(&sql)
            .bind(developer_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_app(&self, app: &QuantumApp) -> AppResult<QuantumApp> {
        let mut tx = self.pool.begin().await?;
        let updated = Self::write_app(&mut tx, app).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_app(&self, id: Uuid) -> AppResult<()> {
        // Les versions, annonces et entrées de registre suivent par ON DELETE CASCADE
        sqlx::query("DELETE FROM quantum_apps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_release(&self, release: &ReleaseRecord) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        if release.app_is_new {
            Self::insert_app(&mut tx, &release.app).await?;
        } else {
            Self::write_app(&mut tx, &release.app).await?;
        }

        sqlx::query(
            "UPDATE app_versions SET is_latest = FALSE, updated_at = NOW() \
             WHERE quantum_app_id = $1 AND is_latest",
        )
        .bind(release.app.id)
        .execute(&mut *tx)
        .await?;

        Self::insert_version(&mut tx, &release.version).await?;

        if let Some(project) = &release.project {
            sqlx::query("UPDATE projects SET quantum_app_id = $2, updated_at = $3 WHERE id = $1")
                .bind(project.id)
                .bind(project.quantum_app_id)
                .bind(project.updated_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_version(&self, id: Uuid) -> AppResult<Option<AppVersion>> {
        let sql = format!(
            "SELECT {VERSION_SUMMARY_COLUMNS}, package_data FROM app_versions WHERE id = $1"
        );
        Ok(sqlx::query_as::<_, AppVersion>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_versions(&self, app_id: Uuid) -> AppResult<Vec<AppVersion>> {
        let sql = format!(
            "SELECT {VERSION_SUMMARY_COLUMNS} FROM app_versions WHERE quantum_app_id = $1 \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, AppVersion>(&sql)
            .bind(app_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_version(&self, version: &AppVersion) -> AppResult<AppVersion> {
        let sql = format!(
            "UPDATE app_versions SET status = $2, release_notes = $3, is_latest = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {VERSION_SUMMARY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, AppVersion>(&sql)
            .bind(version.id)
            .bind(version.status)
            .bind(&version.release_notes)
            .bind(version.is_latest)
            .bind(version.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn increment_download_count(&self, app_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE quantum_apps SET registry_download_count = registry_download_count + 1 \
             WHERE id = $1",
        )
        .bind(app_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
