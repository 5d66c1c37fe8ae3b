use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::infrastructure::error::AppError;

/// Statuts agrégés d'une application
pub const APP_STATUS_DRAFT: &str = "DRAFT";
pub const APP_STATUS_RELEASED: &str = "RELEASED";
pub const APP_STATUS_DEPRECATED: &str = "DEPRECATED";

/// Normalise une valeur textuelle d'énumération ("Apache-2.0" -> "apache20")
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Catégorie d'application
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Algorithm,
    Circuit,
    Model,
    Tool,
    Agent,
    Library,
    Other,
}

impl AppType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppType::Algorithm => "algorithm",
            AppType::Circuit => "circuit",
            AppType::Model => "model",
            AppType::Tool => "tool",
            AppType::Agent => "agent",
            AppType::Library => "library",
            AppType::Other => "other",
        }
    }
}

impl FromStr for AppType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "algorithm" => Ok(AppType::Algorithm),
            "circuit" => Ok(AppType::Circuit),
            "model" => Ok(AppType::Model),
            "tool" => Ok(AppType::Tool),
            "agent" => Ok(AppType::Agent),
            "library" => Ok(AppType::Library),
            "other" => Ok(AppType::Other),
            _ => Err(AppError::BadRequest(format!("Unsupported application type: {}", s))),
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibilité d'une application
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppVisibility {
    Public,
    #[default]
    Private,
    Restricted,
}

impl FromStr for AppVisibility {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "public" => Ok(AppVisibility::Public),
            "private" => Ok(AppVisibility::Private),
            "restricted" => Ok(AppVisibility::Restricted),
            _ => Err(AppError::BadRequest(format!("Unsupported visibility: {}", s))),
        }
    }
}

/// Licence d'une application
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LicenseType {
    #[default]
    Mit,
    Apache2,
    Gpl3,
    Bsd,
    Proprietary,
    Other,
}

impl FromStr for LicenseType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "mit" => Ok(LicenseType::Mit),
            "apache2" | "apache20" | "apache" => Ok(LicenseType::Apache2),
            "gpl3" | "gplv3" | "gpl30" => Ok(LicenseType::Gpl3),
            "bsd" | "bsd3" | "bsd3clause" => Ok(LicenseType::Bsd),
            "proprietary" => Ok(LicenseType::Proprietary),
            "other" => Ok(LicenseType::Other),
            _ => Err(AppError::BadRequest(format!("Unsupported license type: {}", s))),
        }
    }
}

/// Cycle de vie d'une version
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    #[default]
    Draft,
    Testing,
    Released,
    Deprecated,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::Testing => "testing",
            VersionStatus::Released => "released",
            VersionStatus::Deprecated => "deprecated",
        }
    }

    /// Transitions autorisées :
    /// draft -> testing | released, testing -> released | draft, released -> deprecated
    pub fn can_transition_to(&self, next: VersionStatus) -> bool {
        matches!(
            (self, next),
            (VersionStatus::Draft, VersionStatus::Testing)
                | (VersionStatus::Draft, VersionStatus::Released)
                | (VersionStatus::Testing, VersionStatus::Released)
                | (VersionStatus::Testing, VersionStatus::Draft)
                | (VersionStatus::Released, VersionStatus::Deprecated)
        )
    }
}

/// Application quantique publiée par un développeur
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuantumApp {
    pub id: Uuid,
    pub developer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub app_type: AppType,
    pub status: Vec<String>,
    pub visibility: AppVisibility,
    pub latest_version_id: Option<Uuid>,
    pub api_url: Option<String>,
    pub documentation_url: Option<String>,
    pub license_type: LicenseType,
    pub license_url: Option<String>,
    pub readme_content: Option<String>,
    pub repository_url: Option<String>,

    // Registre
    pub is_in_registry: bool,
    pub registry_published_at: Option<DateTime<Utc>>,
    pub featured_in_registry: bool,
    pub registry_download_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuantumApp {
    pub fn new(developer_id: Uuid, name: String, app_type: AppType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            developer_id,
            name,
            description: None,
            app_type,
            status: vec![APP_STATUS_DRAFT.to_string()],
            visibility: AppVisibility::default(),
            latest_version_id: None,
            api_url: None,
            documentation_url: None,
            license_type: LicenseType::default(),
            license_url: None,
            readme_content: None,
            repository_url: None,
            is_in_registry: false,
            registry_published_at: None,
            featured_in_registry: false,
            registry_download_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recalcule le statut agrégé à partir des versions
    pub fn refresh_status(&mut self, versions: &[AppVersion]) {
        let status = if versions.iter().any(|v| v.status == VersionStatus::Released) {
            APP_STATUS_RELEASED
        } else if !versions.is_empty()
            && versions.iter().all(|v| v.status == VersionStatus::Deprecated)
        {
            APP_STATUS_DEPRECATED
        } else {
            APP_STATUS_DRAFT
        };
        self.status = vec![status.to_string()];
        self.updated_at = Utc::now();
    }
}

/// Instantané immuable du paquet et des métadonnées d'une application
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppVersion {
    pub id: Uuid,
    pub quantum_app_id: Uuid,
    pub version_number: String,
    pub sdk_used: String,
    pub input_schema: Option<Value>,
    pub output_schema: Option<Value>,
    pub preferred_platform: Option<String>,
    pub preferred_device_id: Option<String>,
    pub number_of_qubits: Option<i32>,
    pub source_repo: Option<String>,
    pub package_path: Option<String>,

    /// Contenu brut du zip, servi uniquement par le téléchargement
    #[serde(skip_serializing, default)]
    #[sqlx(default)]
    pub package_data: Option<Vec<u8>>,

    /// SHA256 du paquet
    pub package_checksum: Option<String>,

    pub release_notes: Option<String>,
    pub is_latest: bool,
    pub status: VersionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppVersion {
    pub fn new(quantum_app_id: Uuid, version_number: String, sdk_used: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            quantum_app_id,
            version_number,
            sdk_used,
            input_schema: None,
            output_schema: None,
            preferred_platform: None,
            preferred_device_id: None,
            number_of_qubits: None,
            source_repo: None,
            package_path: None,
            package_data: None,
            package_checksum: None,
            release_notes: None,
            is_latest: true,
            status: VersionStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_package(&self) -> bool {
        self.package_data.as_ref().map(|d| !d.is_empty()).unwrap_or(false)
    }

    /// Nom de fichier proposé au téléchargement
    pub fn download_filename(&self) -> String {
        self.package_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or("package.zip")
            .to_string()
    }

    /// Applique une transition de statut si elle est autorisée
    pub fn transition_to(&mut self, next: VersionStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::BadRequest(format!(
                "Invalid status transition from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
