//! # Database Module
//!
//! Accès aux données du hub. Chaque domaine expose un trait de stockage
//! (`UserStore`, `ProjectStore`, ...) défini dans son propre fichier avec
//! son implémentation PostgreSQL. `MemoryStore` implémente les mêmes traits
//! en mémoire pour les tests et le mode `DATABASE_URL=memory`.

pub mod apps;
pub mod jobs;
pub mod marketplace;
pub mod memory;
pub mod projects;
pub mod registry;
pub mod users;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::infrastructure::error::AppResult;
use crate::utils::Config;

pub use apps::{AppStore, ReleaseRecord};
pub use jobs::JobStore;
pub use marketplace::{ListingFilter, MarketplaceStore};
pub use memory::MemoryStore;
pub use projects::ProjectStore;
pub use registry::RegistryStore;
pub use users::{ApiKeyStore, UserStore};

/// Ensemble des opérations de stockage utilisées par les services
pub trait Store:
    UserStore + ApiKeyStore + ProjectStore + AppStore + RegistryStore + MarketplaceStore + JobStore
{
}

impl<T> Store for T where
    T: UserStore
        + ApiKeyStore
        + ProjectStore
        + AppStore
        + RegistryStore
        + MarketplaceStore
        + JobStore
{
}

/// Stockage PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Gestion de l'accès aux données, partagée entre les handlers
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn Store>,
}

impl Database {
    /// Ouvre le stockage décrit par la configuration et applique les migrations
    pub async fn connect(config: &Config) -> AppResult<Self> {
        if config.uses_memory_store() {
            info!("🧠 Stockage en mémoire activé (DATABASE_URL=memory)");
            return Ok(Self::in_memory());
        }

        info!("🔌 Connexion à la base de données PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;
        info!("✅ Connexion établie avec succès");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("✅ Migrations appliquées");

        Ok(Self { store: Arc::new(PgStore::new(pool)) })
    }

    /// Stockage en mémoire, vide
    pub fn in_memory() -> Self {
        Self { store: Arc::new(MemoryStore::default()) }
    }
}

impl Deref for Database {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}
