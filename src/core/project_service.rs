// core/project_service.rs
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::core::quantum_app_service::QuantumAppService;
use crate::domain::{AppVersion, Project, QuantumApp};
use crate::infrastructure::database::{AppStore, Database, ProjectStore};
use crate::infrastructure::error::{AppError, AppResult};
use crate::utils::validation::validate_package_filename;
use crate::utils::Config;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Le nom doit contenir entre 1 et 255 caractères"))]
    pub name: String,
    pub description: Option<String>,
    pub repo: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Le nom doit contenir entre 1 et 255 caractères"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub repo: Option<String>,
}

fn default_visibility() -> String {
    "private".to_string()
}

/// Publication d'un projet comme application quantique
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProjectRelease {
    #[validate(length(min = 1, max = 255, message = "Le nom doit contenir entre 1 et 255 caractères"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub app_type: String,
    #[validate(length(min = 1, max = 50, message = "Le numéro de version est requis"))]
    pub version_number: String,
    #[validate(length(min = 1, max = 50, message = "Le SDK est requis"))]
    pub sdk_used: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub preferred_platform: Option<String>,
    pub preferred_device_id: Option<String>,
    #[validate(range(min = 1, message = "Le nombre de qubits doit être positif"))]
    pub number_of_qubits: Option<i32>,
    pub package_path: Option<String>,
    pub release_notes: Option<String>,
}

/// Paquet joint à une publication multipart
#[derive(Debug)]
pub struct ReleasePackage {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseOutcome {
    pub project: Project,
    pub app: QuantumApp,
    pub version: AppVersion,
}

pub struct ProjectService {
    db: Database,
    apps: QuantumAppService,
}

impl ProjectService {
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        let apps = QuantumAppService::new(db.clone(), config);
        Self { db, apps }
    }

    pub async fn create(&self, user_id: Uuid, request: CreateProjectRequest) -> AppResult<Project> {
        request.validate()?;
        let project = Project::new(user_id, request.name, request.description, request.repo);
        let project = self.db.create_project(&project).await?;
        info!("📁 Projet {} créé", project.id);
        Ok(project)
    }

    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Project>> {
        self.db.list_projects(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, project_id: Uuid) -> AppResult<Project> {
        self.db
            .find_project(project_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Project".to_string()))
    }

    pub async fn update(&self, user_id: Uuid, project_id: Uuid, request: UpdateProjectRequest) -> AppResult<Project> {
        request.validate()?;
        let mut project = self.get(user_id, project_id).await?;

        if let Some(name) = request.name {
            project.name = name;
        }
        if request.description.is_some() {
            project.description = request.description;
        }
        if request.repo.is_some() {
            project.repo = request.repo;
        }
        project.updated_at = Utc::now();

        self.db.update_project(&project).await
    }

    pub async fn delete(&self, user_id: Uuid, project_id: Uuid) -> AppResult<()> {
        let project = self.get(user_id, project_id).await?;
        self.db.delete_project(project.id).await?;
        info!("🗑️ Projet {} supprimé", project.id);
        Ok(())
    }

    /// Publie le projet : crée l'application au premier appel, puis ajoute
    /// une nouvelle version « latest » à l'application liée.
    pub async fn release(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        release: ProjectRelease,
        package: Option<ReleasePackage>,
    ) -> AppResult<ReleaseOutcome> {
        release.validate()?;
        let mut project = self.get(user_id, project_id).await?;

        let linked = match project.quantum_app_id {
            Some(app_id) => self.db.find_app(app_id).await?,
            None => None,
        };
        let app_is_new = linked.is_none();
        let mut app = match linked {
            Some(app) => app,
            None => {
                let mut app = QuantumApp::new(user_id, release.name.clone(), release.app_type.parse()?);
                app.description = release.description.clone();
                app.visibility = release.visibility.parse()?;
                app
            }
        };
        if app.repository_url.is_none() {
            app.repository_url = project.repo.clone();
        }

        let mut version = AppVersion::new(app.id, release.version_number, release.sdk_used);
        version.input_schema = release.input_schema;
        version.output_schema = release.output_schema;
        version.preferred_platform = release.preferred_platform;
        version.preferred_device_id = release.preferred_device_id;
        version.number_of_qubits = release.number_of_qubits;
        version.package_path = release.package_path;
        version.release_notes = release.release_notes;

        if let Some(package) = package {
            let filename = validate_package_filename(&package.filename)?;
            let validated = self.apps.check_package(&package.data)?;
            version.package_checksum = Some(validated.checksum);
            version.package_path = Some(filename);
            version.package_data = Some(package.data);
        }

        project.quantum_app_id = Some(app.id);
        project.updated_at = Utc::now();

        let (app, version) = self
            .apps
            .save_latest_version(app, app_is_new, version, Some(project.clone()))
            .await?;

        info!(
            "🚀 Projet {} publié: {} v{}",
            project.id, app.name, version.version_number
        );
        Ok(ReleaseOutcome {
            project,
            app,
            version: AppVersion { package_data: None, ..version },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth_service::tests::registered_user;
    use crate::core::package::tests::bell_package;

    fn service(db: &Database) -> ProjectService {
        ProjectService::new(db.clone(), Arc::new(Config::default()))
    }

    fn project_request(name: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            description: None,
            repo: Some("https://github.com/acme/bell".into()),
        }
    }

    fn release(version: &str) -> ProjectRelease {
        ProjectRelease {
            name: "Bell".into(),
            description: Some("Bell pair".into()),
            app_type: "circuit".into(),
            version_number: version.to_string(),
            sdk_used: "qiskit".into(),
            visibility: default_visibility(),
            input_schema: None,
            output_schema: None,
            preferred_platform: None,
            preferred_device_id: None,
            number_of_qubits: Some(2),
            package_path: None,
            release_notes: None,
        }
    }

    #[tokio::test]
    async fn test_projects_are_scoped_to_owner() {
        let db = Database::in_memory();
        let alice = registered_user(&db, "alice").await;
        let bob = registered_user(&db, "bob").await;
        let projects = service(&db);

        let project = projects.create(alice.id, project_request("bell")).await.unwrap();
        assert_eq!(projects.list(alice.id).await.unwrap().len(), 1);
        assert!(projects.list(bob.id).await.unwrap().is_empty());

        let err = projects.get(bob.id, project.id).await.unwrap_err();
        assert_eq!(err.client_message(), "Project not found");

        let updated = projects
            .update(alice.id, project.id, UpdateProjectRequest { name: Some("bell-v2".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.name, "bell-v2");

        projects.delete(alice.id, project.id).await.unwrap();
        assert!(projects.get(alice.id, project.id).await.is_err());
    }

    #[tokio::test]
    async fn test_first_release_creates_app_then_adds_versions() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let projects = service(&db);
        let project = projects.create(dev.id, project_request("bell")).await.unwrap();

        let first = projects.release(dev.id, project.id, release("1.0.0"), None).await.unwrap();
        assert_eq!(first.project.quantum_app_id, Some(first.app.id));
        assert_eq!(first.app.repository_url.as_deref(), Some("https://github.com/acme/bell"));
        assert_eq!(first.version.source_repo.as_deref(), Some("https://github.com/acme/bell"));

        let second = projects.release(dev.id, project.id, release("1.1.0"), None).await.unwrap();
        assert_eq!(second.app.id, first.app.id);
        assert_eq!(second.app.latest_version_id, Some(second.version.id));

        let stored = projects.get(dev.id, project.id).await.unwrap();
        assert!(stored.is_released());
        let versions = db.list_versions(first.app.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions.iter().filter(|v| v.is_latest).count(), 1);
    }

    #[tokio::test]
    async fn test_release_with_package_stores_checksum() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let projects = service(&db);
        let project = projects.create(dev.id, project_request("bell")).await.unwrap();

        let package = ReleasePackage { filename: "dist/bell.zip".into(), data: bell_package() };
        let outcome = projects
            .release(dev.id, project.id, release("1.0.0"), Some(package))
            .await
            .unwrap();
        assert_eq!(outcome.version.package_path.as_deref(), Some("bell.zip"));
        assert_eq!(outcome.version.package_checksum.map(|c| c.len()), Some(64));

        let stored = db.find_version(outcome.version.id).await.unwrap().unwrap();
        assert!(stored.has_package());
    }

    #[tokio::test]
    async fn test_release_with_invalid_package_is_rejected() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let projects = service(&db);
        let project = projects.create(dev.id, project_request("bell")).await.unwrap();

        let package = ReleasePackage { filename: "bell.zip".into(), data: b"not a zip".to_vec() };
        let err = projects
            .release(dev.id, project.id, release("1.0.0"), Some(package))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidPackage(_)));
        assert!(!projects.get(dev.id, project.id).await.unwrap().is_released());
    }
}
