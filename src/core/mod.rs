// core/mod.rs
pub mod api_key_service;
pub mod auth_service;
pub mod job_service;
pub mod marketplace_service;
pub mod package;
pub mod project_service;
pub mod quantum_app_service;
pub mod registry_service;

// Ré-exports pour faciliter l'import
pub use api_key_service::ApiKeyService;
pub use auth_service::AuthService;
pub use job_service::JobService;
pub use marketplace_service::MarketplaceService;
pub use package::{validate_manifest, validate_package, Manifest, ValidatedPackage};
pub use project_service::ProjectService;
pub use quantum_app_service::QuantumAppService;
pub use registry_service::RegistryService;
