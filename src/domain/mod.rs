//! # Domain Models Module
//!
//! Entités métier du hub, partagées par les services, les routes et les
//! deux implémentations du stockage.
//!
//! ## Structure
//! - `user.rs` / `api_key.rs` : comptes et clés API
//! - `project.rs` : projets de développement
//! - `quantum_app.rs` : applications, versions et leurs cycles de vie
//! - `registry.rs` : entrées du registre public
//! - `marketplace.rs` : annonces, notes et abonnements
//! - `job.rs` : exécutions et résultats
//!
//! ## Conventions
//! - Les champs sensibles (hash, contenu des paquets) ne sont jamais sérialisés
//! - Les énumérations sont stockées en VARCHAR minuscule
//! - Les transitions d'état vivent sur les entités elles-mêmes

pub mod api_key;
pub mod job;
pub mod marketplace;
pub mod project;
pub mod quantum_app;
pub mod registry;
pub mod user;

pub use api_key::{ApiKeyStatus, UserApiKey};
pub use job::{Job, JobPriority, JobResult, JobStatus, JobType};
pub use marketplace::{
    ListingRating, ListingStatus, MarketplaceListing, Subscription, SubscriptionStatus,
    SubscriptionType,
};
pub use project::Project;
pub use quantum_app::{AppType, AppVersion, AppVisibility, LicenseType, QuantumApp, VersionStatus};
pub use registry::RegistryItem;
pub use user::User;
