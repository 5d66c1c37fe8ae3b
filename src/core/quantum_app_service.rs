// core/quantum_app_service.rs
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::core::package::{validate_package, ValidatedPackage, ValidatedPackageData};
use crate::domain::{
    AppType, AppVersion, AppVisibility, LicenseType, Project, QuantumApp, RegistryItem,
    VersionStatus,
};
use crate::infrastructure::database::{AppStore, Database, RegistryStore, ReleaseRecord};
use crate::infrastructure::error::{AppError, AppResult};
use crate::utils::validation::validate_package_filename;
use crate::utils::Config;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppRequest {
    #[validate(length(min = 1, max = 255, message = "Le nom doit contenir entre 1 et 255 caractères"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub app_type: String,
    pub visibility: Option<String>,
    pub license_type: Option<String>,
    pub license_url: Option<String>,
    pub api_url: Option<String>,
    pub documentation_url: Option<String>,
    pub readme_content: Option<String>,
    pub repository_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAppRequest {
    #[validate(length(min = 1, max = 255, message = "Le nom doit contenir entre 1 et 255 caractères"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub app_type: Option<String>,
    pub visibility: Option<String>,
    pub license_type: Option<String>,
    pub license_url: Option<String>,
    pub api_url: Option<String>,
    pub documentation_url: Option<String>,
    pub readme_content: Option<String>,
    pub repository_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVersionRequest {
    #[validate(length(min = 1, max = 50, message = "Le numéro de version est requis"))]
    pub version_number: String,
    #[validate(length(min = 1, max = 50, message = "Le SDK est requis"))]
    pub sdk_used: String,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub preferred_platform: Option<String>,
    pub preferred_device_id: Option<String>,
    #[validate(range(min = 1, message = "Le nombre de qubits doit être positif"))]
    pub number_of_qubits: Option<i32>,
    pub package_path: Option<String>,
    pub release_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVersionStatusRequest {
    pub status: VersionStatus,
    pub release_notes: Option<String>,
}

/// Application avec toutes ses versions
#[derive(Debug, Serialize)]
pub struct AppDetails {
    #[serde(flatten)]
    pub app: QuantumApp,
    pub versions: Vec<AppVersion>,
    pub latest_version: Option<AppVersion>,
}

/// Paquet servi au téléchargement
#[derive(Debug)]
pub struct PackageDownload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Résultat d'un téléversement de paquet
#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub app: QuantumApp,
    pub version: AppVersion,
    pub created: bool,
}

/// Service des applications quantiques : CRUD, versions, paquets et publication
pub struct QuantumAppService {
    db: Database,
    config: Arc<Config>,
}

impl QuantumAppService {
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    pub async fn create_app(&self, developer_id: Uuid, request: CreateAppRequest) -> AppResult<QuantumApp> {
        request.validate()?;

        let mut app = QuantumApp::new(developer_id, request.name, request.app_type.parse()?);
        app.description = request.description;
        if let Some(visibility) = request.visibility {
            app.visibility = visibility.parse()?;
        }
        if let Some(license) = request.license_type {
            app.license_type = license.parse()?;
        }
        app.license_url = request.license_url;
        app.api_url = request.api_url;
        app.documentation_url = request.documentation_url;
        app.readme_content = request.readme_content;
        app.repository_url = request.repository_url;

        let app = self.db.create_app(&app).await?;
        info!("⚛️ Application {} créée ({})", app.name, app.id);
        Ok(app)
    }

    /// Applications d'un développeur ; un autre utilisateur n'en voit que les publiques
    pub async fn list_apps(&self, viewer_id: Uuid, developer_id: Uuid) -> AppResult<Vec<QuantumApp>> {
        let apps = self.db.list_apps(developer_id).await?;
        if viewer_id == developer_id {
            return Ok(apps);
        }
        Ok(apps
            .into_iter()
            .filter(|app| app.visibility == AppVisibility::Public)
            .collect())
    }

    pub async fn get_app(&self, user_id: Uuid, app_id: Uuid) -> AppResult<AppDetails> {
        let app = self.readable(user_id, app_id).await?;
        let versions = self.db.list_versions(app.id).await?;
        let latest_version = versions.iter().find(|v| v.is_latest).cloned();
        Ok(AppDetails { app, versions, latest_version })
    }

    pub async fn update_app(&self, user_id: Uuid, app_id: Uuid, request: UpdateAppRequest) -> AppResult<QuantumApp> {
        request.validate()?;
        let mut app = self.owned(user_id, app_id).await?;

        if let Some(name) = request.name {
            app.name = name;
        }
        if let Some(app_type) = request.app_type {
            app.app_type = app_type.parse::<AppType>()?;
        }
        if let Some(visibility) = request.visibility {
            app.visibility = visibility.parse::<AppVisibility>()?;
        }
        if let Some(license) = request.license_type {
            app.license_type = license.parse::<LicenseType>()?;
        }
        if request.description.is_some() {
            app.description = request.description;
        }
        if request.license_url.is_some() {
            app.license_url = request.license_url;
        }
        if request.api_url.is_some() {
            app.api_url = request.api_url;
        }
        if request.documentation_url.is_some() {
            app.documentation_url = request.documentation_url;
        }
        if request.readme_content.is_some() {
            app.readme_content = request.readme_content;
        }
        if request.repository_url.is_some() {
            app.repository_url = request.repository_url;
        }
        app.updated_at = Utc::now();

        self.db.update_app(&app).await
    }

    pub async fn delete_app(&self, user_id: Uuid, app_id: Uuid) -> AppResult<()> {
        let app = self.owned(user_id, app_id).await?;
        self.db.delete_app(app.id).await?;
        info!("🗑️ Application {} supprimée", app.id);
        Ok(())
    }

    /// Ajoute une version qui devient la nouvelle version « latest »
    pub async fn create_version(
        &self,
        user_id: Uuid,
        app_id: Uuid,
        request: CreateVersionRequest,
    ) -> AppResult<AppVersion> {
        request.validate()?;
        let app = self.owned(user_id, app_id).await?;

        let mut version = AppVersion::new(app.id, request.version_number, request.sdk_used);
        version.input_schema = request.input_schema;
        version.output_schema = request.output_schema;
        version.preferred_platform = request.preferred_platform;
        version.preferred_device_id = request.preferred_device_id;
        version.number_of_qubits = request.number_of_qubits;
        version.package_path = request.package_path;
        version.release_notes = request.release_notes;

        let (_, version) = self.save_latest_version(app, false, version, None).await?;
        Ok(version)
    }

    pub async fn list_versions(&self, user_id: Uuid, app_id: Uuid) -> AppResult<Vec<AppVersion>> {
        let app = self.readable(user_id, app_id).await?;
        self.db.list_versions(app.id).await
    }

    pub async fn get_version(&self, user_id: Uuid, app_id: Uuid, version_id: Uuid) -> AppResult<AppVersion> {
        let app = self.readable(user_id, app_id).await?;
        self.version_of(&app, version_id).await
    }

    /// Contenu du paquet d'une version
    pub async fn download(&self, user_id: Uuid, app_id: Uuid, version_id: Uuid) -> AppResult<PackageDownload> {
        let app = self.readable(user_id, app_id).await?;
        let version = self.version_of(&app, version_id).await?;

        if !version.has_package() {
            return Err(AppError::NotFound("Package".to_string()));
        }
        if app.is_in_registry {
            self.db.increment_download_count(app.id).await?;
        }

        let filename = version.download_filename();
        let data = version.package_data.unwrap_or_default();
        info!("📥 Téléchargement de {} ({} octets)", filename, data.len());
        Ok(PackageDownload { filename, data })
    }

    /// Change le statut d'une version puis recalcule celui de l'application
    pub async fn update_version_status(
        &self,
        user_id: Uuid,
        app_id: Uuid,
        version_id: Uuid,
        request: UpdateVersionStatusRequest,
    ) -> AppResult<AppVersion> {
        let mut app = self.owned(user_id, app_id).await?;
        let mut version = self.version_of(&app, version_id).await?;

        version.transition_to(request.status)?;
        if request.release_notes.is_some() {
            version.release_notes = request.release_notes;
        }
        let version = self.db.update_version(&version).await?;

        let versions = self.db.list_versions(app.id).await?;
        app.refresh_status(&versions);
        self.db.update_app(&app).await?;

        info!("🔄 Version {} passée en {}", version.version_number, version.status.as_str());
        Ok(version)
    }

    /// Valide un paquet zip et l'enregistre comme nouvelle version.
    /// L'application est retrouvée par le nom déclaré dans le manifeste.
    pub async fn upload_package(&self, developer_id: Uuid, filename: &str, data: Vec<u8>) -> AppResult<UploadOutcome> {
        let filename = validate_package_filename(filename)?;
        let package = self.check_package(&data)?;
        let manifest = package.manifest;

        let existing = self.db.find_app_by_name(developer_id, &manifest.name).await?;
        let created = existing.is_none();
        let app = match existing {
            Some(mut app) => {
                manifest.apply_to_app(&mut app)?;
                app
            }
            None => manifest.to_app(developer_id)?,
        };

        let version = manifest.to_version(
            &app,
            &filename,
            ValidatedPackageData { data, checksum: package.checksum },
        );
        let (app, version) = self.save_latest_version(app, created, version, None).await?;

        info!(
            "📦 Paquet {} enregistré: {} v{}",
            filename, app.name, version.version_number
        );
        Ok(UploadOutcome { app, version: strip_package(version), created })
    }

    /// Publie l'application dans le registre public
    pub async fn publish(&self, user_id: Uuid, app_id: Uuid) -> AppResult<RegistryItem> {
        let mut app = self.owned(user_id, app_id).await?;

        let latest = match app.latest_version_id {
            Some(id) => self.db.find_version(id).await?,
            None => None,
        }
        .ok_or_else(|| AppError::BadRequest("Quantum app has no version to publish".to_string()))?;

        let tags = vec![app.app_type.as_str().to_string(), latest.sdk_used.clone()];
        let item = match self.db.find_registry_item_by_app(app.id).await? {
            Some(mut item) => {
                item.name = app.name.clone();
                item.description = app.description.clone();
                item.version = latest.version_number.clone();
                item.tags = tags;
                item.updated_at = Utc::now();
                self.db.update_registry_item(&item).await?
            }
            None => {
                let mut item = RegistryItem::new(
                    app.developer_id,
                    app.name.clone(),
                    app.description.clone(),
                    latest.version_number.clone(),
                    tags,
                );
                item.quantum_app_id = Some(app.id);
                self.db.create_registry_item(&item).await?
            }
        };

        let now = Utc::now();
        app.is_in_registry = true;
        app.registry_published_at = Some(now);
        app.visibility = AppVisibility::Public;
        app.updated_at = now;
        self.db.update_app(&app).await?;

        info!("🌐 Application {} publiée dans le registre (v{})", app.name, item.version);
        Ok(item)
    }

    /// Vérifie la taille puis le contenu d'un paquet
    pub(crate) fn check_package(&self, data: &[u8]) -> AppResult<ValidatedPackage> {
        if data.len() > self.config.max_upload_bytes() {
            return Err(AppError::PayloadTooLarge(format!(
                "Package exceeds the maximum size of {} MB",
                self.config.max_upload_size_mb
            )));
        }
        validate_package(data).map_err(|errors| {
            warn!("❌ Paquet refusé: {:?}", errors);
            AppError::InvalidPackage(errors)
        })
    }

    /// Enregistre `version` comme version « latest » de `app`, dans une seule écriture
    pub(crate) async fn save_latest_version(
        &self,
        mut app: QuantumApp,
        app_is_new: bool,
        mut version: AppVersion,
        project: Option<Project>,
    ) -> AppResult<(QuantumApp, AppVersion)> {
        let mut versions = if app_is_new {
            Vec::new()
        } else {
            self.db.list_versions(app.id).await?
        };

        if versions.iter().any(|v| v.version_number == version.version_number) {
            return Err(AppError::BadRequest(format!(
                "Version {} already exists for this app",
                version.version_number
            )));
        }

        version.quantum_app_id = app.id;
        version.is_latest = true;
        if version.source_repo.is_none() {
            version.source_repo = app.repository_url.clone();
        }
        app.latest_version_id = Some(version.id);
        versions.push(version.clone());
        app.refresh_status(&versions);

        self.db
            .save_release(&ReleaseRecord {
                app: app.clone(),
                app_is_new,
                version: version.clone(),
                project,
            })
            .await?;

        Ok((app, version))
    }

    async fn version_of(&self, app: &QuantumApp, version_id: Uuid) -> AppResult<AppVersion> {
        self.db
            .find_version(version_id)
            .await?
            .filter(|v| v.quantum_app_id == app.id)
            .ok_or_else(|| AppError::NotFound("App version".to_string()))
    }

    /// Application du développeur, sinon 404
    pub(crate) async fn owned(&self, user_id: Uuid, app_id: Uuid) -> AppResult<QuantumApp> {
        self.db
            .find_app(app_id)
            .await?
            .filter(|app| app.developer_id == user_id)
            .ok_or_else(|| AppError::NotFound("Quantum app".to_string()))
    }

    /// Lecture autorisée au développeur et, pour les applications publiques, à tous
    async fn readable(&self, user_id: Uuid, app_id: Uuid) -> AppResult<QuantumApp> {
        self.db
            .find_app(app_id)
            .await?
            .filter(|app| app.developer_id == user_id || app.visibility == AppVisibility::Public)
            .ok_or_else(|| AppError::NotFound("Quantum app".to_string()))
    }
}

fn strip_package(version: AppVersion) -> AppVersion {
    AppVersion { package_data: None, ..version }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth_service::tests::registered_user;
    use crate::core::package::tests::{bell_package, build_zip, cli_manifest, BELL_QASM};
    use crate::core::package::MANIFEST_FILE;
    use crate::domain::quantum_app::APP_STATUS_RELEASED;

    fn service(db: &Database) -> QuantumAppService {
        QuantumAppService::new(db.clone(), Arc::new(Config::default()))
    }

    fn create_request(name: &str) -> CreateAppRequest {
        CreateAppRequest {
            name: name.to_string(),
            description: Some("Amplitude amplification".into()),
            app_type: "Algorithm".into(),
            visibility: None,
            license_type: None,
            license_url: None,
            api_url: None,
            documentation_url: None,
            readme_content: None,
            repository_url: Some("https://github.com/acme/grover".into()),
        }
    }

    fn version_request(number: &str) -> CreateVersionRequest {
        CreateVersionRequest {
            version_number: number.to_string(),
            sdk_used: "qiskit".into(),
            input_schema: None,
            output_schema: None,
            preferred_platform: None,
            preferred_device_id: None,
            number_of_qubits: Some(3),
            package_path: None,
            release_notes: None,
        }
    }

    fn package_with_version(version: &str) -> Vec<u8> {
        let mut manifest = cli_manifest();
        manifest["version"] = Value::String(version.to_string());
        let manifest = manifest.to_string();
        build_zip(&[(MANIFEST_FILE, manifest.as_bytes()), ("bell.qasm", BELL_QASM.as_bytes())])
    }

    #[tokio::test]
    async fn test_versions_keep_a_single_latest() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let apps = service(&db);
        let app = apps.create_app(dev.id, create_request("grover")).await.unwrap();

        let v1 = apps.create_version(dev.id, app.id, version_request("1.0.0")).await.unwrap();
        assert_eq!(v1.source_repo.as_deref(), Some("https://github.com/acme/grover"));
        let v2 = apps.create_version(dev.id, app.id, version_request("1.1.0")).await.unwrap();

        let details = apps.get_app(dev.id, app.id).await.unwrap();
        assert_eq!(details.versions.len(), 2);
        assert_eq!(details.versions.iter().filter(|v| v.is_latest).count(), 1);
        assert_eq!(details.app.latest_version_id, Some(v2.id));
        assert_eq!(details.latest_version.map(|v| v.id), Some(v2.id));

        let err = apps.create_version(dev.id, app.id, version_request("1.0.0")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_other_users_cannot_see_private_apps() {
        let db = Database::in_memory();
        let alice = registered_user(&db, "alice").await;
        let bob = registered_user(&db, "bob").await;
        let apps = service(&db);
        let app = apps.create_app(alice.id, create_request("grover")).await.unwrap();

        let err = apps.get_app(bob.id, app.id).await.unwrap_err();
        assert_eq!(err.client_message(), "Quantum app not found");
        assert!(apps.delete_app(bob.id, app.id).await.is_err());
    }

    #[tokio::test]
    async fn test_status_transitions_update_app_status() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let apps = service(&db);
        let app = apps.create_app(dev.id, create_request("grover")).await.unwrap();
        let version = apps.create_version(dev.id, app.id, version_request("1.0.0")).await.unwrap();

        let request = |status| UpdateVersionStatusRequest { status, release_notes: None };
        apps.update_version_status(dev.id, app.id, version.id, request(VersionStatus::Released))
            .await
            .unwrap();
        let details = apps.get_app(dev.id, app.id).await.unwrap();
        assert_eq!(details.app.status, vec![APP_STATUS_RELEASED.to_string()]);

        let err = apps
            .update_version_status(dev.id, app.id, version.id, request(VersionStatus::Draft))
            .await
            .unwrap_err();
        assert_eq!(err.client_message(), "Invalid status transition from released to draft");
    }

    #[tokio::test]
    async fn test_upload_creates_then_versions_app() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let apps = service(&db);

        let first = apps.upload_package(dev.id, "bell.zip", bell_package()).await.unwrap();
        assert!(first.created);
        assert_eq!(first.app.name, "Bell State");
        assert_eq!(first.app.app_type, AppType::Circuit);
        assert_eq!(first.version.sdk_used, "qiskit");
        assert_eq!(first.version.number_of_qubits, Some(2));
        assert!(first.version.package_checksum.is_some());

        let second = apps
            .upload_package(dev.id, "bell-2.zip", package_with_version("1.1.0"))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.app.id, first.app.id);

        let download = apps.download(dev.id, first.app.id, second.version.id).await.unwrap();
        assert_eq!(download.filename, "bell-2.zip");
        assert!(!download.data.is_empty());

        let err = apps.upload_package(dev.id, "bell-3.zip", bell_package()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let apps = service(&db);

        let err = apps.upload_package(dev.id, "bell.tar.gz", bell_package()).await.unwrap_err();
        assert_eq!(err.client_message(), "Only .zip files are allowed");

        let empty = build_zip(&[("readme.txt", b"hello")]);
        match apps.upload_package(dev.id, "empty.zip", empty).await.unwrap_err() {
            AppError::InvalidPackage(errors) => {
                assert_eq!(errors, vec!["Missing quantum_manifest.json in package".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let small = QuantumAppService::new(
            db.clone(),
            Arc::new(Config { max_upload_size_mb: 0, ..Config::default() }),
        );
        let err = small.upload_package(dev.id, "bell.zip", bell_package()).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_download_without_package_is_not_found() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let apps = service(&db);
        let app = apps.create_app(dev.id, create_request("grover")).await.unwrap();
        let version = apps.create_version(dev.id, app.id, version_request("1.0.0")).await.unwrap();

        let err = apps.download(dev.id, app.id, version.id).await.unwrap_err();
        assert_eq!(err.client_message(), "Package not found");
    }

    #[tokio::test]
    async fn test_publish_upserts_registry_item() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let bob = registered_user(&db, "bob").await;
        let apps = service(&db);
        let app = apps.create_app(dev.id, create_request("grover")).await.unwrap();

        let err = apps.publish(dev.id, app.id).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        apps.create_version(dev.id, app.id, version_request("1.0.0")).await.unwrap();
        let item = apps.publish(dev.id, app.id).await.unwrap();
        assert_eq!(item.tags, vec!["algorithm".to_string(), "qiskit".to_string()]);
        assert_eq!(item.quantum_app_id, Some(app.id));

        apps.create_version(dev.id, app.id, version_request("2.0.0")).await.unwrap();
        let republished = apps.publish(dev.id, app.id).await.unwrap();
        assert_eq!(republished.id, item.id);
        assert_eq!(republished.version, "2.0.0");

        let public = apps.get_app(bob.id, app.id).await.unwrap();
        assert!(public.app.is_in_registry);
        assert_eq!(public.app.visibility, AppVisibility::Public);
    }

    #[tokio::test]
    async fn test_registry_downloads_are_counted() {
        let db = Database::in_memory();
        let dev = registered_user(&db, "alice").await;
        let apps = service(&db);
        let upload = apps.upload_package(dev.id, "bell.zip", bell_package()).await.unwrap();
        apps.publish(dev.id, upload.app.id).await.unwrap();

        apps.download(dev.id, upload.app.id, upload.version.id).await.unwrap();
        apps.download(dev.id, upload.app.id, upload.version.id).await.unwrap();

        let app = apps.get_app(dev.id, upload.app.id).await.unwrap().app;
        assert_eq!(app.registry_download_count, 2);
    }
}
