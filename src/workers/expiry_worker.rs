use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::infrastructure::database::{ApiKeyStore, Database, MarketplaceStore};
use crate::infrastructure::error::AppResult;

/// Configuration du worker d'expiration
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Intervalle entre deux passes (secondes)
    pub interval_seconds: u64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self { interval_seconds: 300 }
    }
}

/// Bilan d'une passe
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryReport {
    pub api_keys: u64,
    pub subscriptions: u64,
}

/// Marque comme expirées les clés API et les abonnements arrivés à échéance
pub struct ExpiryWorker {
    config: ExpiryConfig,
    db: Database,
}

impl ExpiryWorker {
    pub fn new(config: ExpiryConfig, db: Database) -> Self {
        Self { config, db }
    }

    /// Boucle infinie ; une passe en erreur est journalisée puis retentée au cycle suivant
    pub async fn start(self) {
        info!("⏳ Worker d'expiration démarré (intervalle: {}s)", self.config.interval_seconds);
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.interval_seconds.max(1)));

        loop {
            ticker.tick().await;
            match self.run_once(Utc::now()).await {
                Ok(report) if report != ExpiryReport::default() => {
                    info!(
                        "✅ Expiration: {} clé(s) API, {} abonnement(s)",
                        report.api_keys, report.subscriptions
                    );
                }
                Ok(_) => debug!("🔄 Rien à expirer"),
                Err(e) => error!("❌ Erreur lors de la passe d'expiration: {}", e),
            }
        }
    }

    /// Exécute une passe à l'instant `now`
    pub async fn run_once(&self, now: DateTime<Utc>) -> AppResult<ExpiryReport> {
        let api_keys = self.db.expire_api_keys(now).await?;
        let subscriptions = self.db.expire_subscriptions(now).await?;
        Ok(ExpiryReport { api_keys, subscriptions })
    }
}

/// Lance le worker en tâche de fond
pub fn start_expiry_worker(config: ExpiryConfig, db: Database) -> JoinHandle<()> {
    tokio::spawn(ExpiryWorker::new(config, db).start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth_service::tests::registered_user;
    use crate::domain::{
        ApiKeyStatus, MarketplaceListing, Subscription, SubscriptionStatus, SubscriptionType, UserApiKey,
    };
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_run_once_expires_only_past_keys() {
        let db = Database::in_memory();
        let user = registered_user(&db, "alice").await;
        let now = Utc::now();

        let stale = UserApiKey::new(user.id, "old".into(), "qh_old".into(), Some(now - ChronoDuration::days(1)), None);
        let fresh = UserApiKey::new(user.id, "new".into(), "qh_new".into(), Some(now + ChronoDuration::days(1)), None);
        db.create_api_key(&stale).await.unwrap();
        db.create_api_key(&fresh).await.unwrap();

        let worker = ExpiryWorker::new(ExpiryConfig::default(), db.clone());
        let report = worker.run_once(now).await.unwrap();
        assert_eq!(report, ExpiryReport { api_keys: 1, subscriptions: 0 });

        let stale = db.find_api_key(stale.id).await.unwrap().unwrap();
        let fresh = db.find_api_key(fresh.id).await.unwrap().unwrap();
        assert_eq!(stale.status, ApiKeyStatus::Expired);
        assert_eq!(fresh.status, ApiKeyStatus::Active);

        // Deuxième passe : déjà expirée, plus rien à faire
        assert_eq!(worker.run_once(now).await.unwrap(), ExpiryReport::default());
    }

    #[tokio::test]
    async fn test_run_once_expires_ended_subscriptions() {
        let db = Database::in_memory();
        let now = Utc::now();
        let listing = MarketplaceListing::new(Uuid::new_v4(), Uuid::new_v4(), "Bell".into(), 10.0);
        let consumer = Uuid::new_v4();

        let ended = Subscription::new(consumer, &listing, SubscriptionType::Basic, Some(now - ChronoDuration::hours(1)));
        let running = Subscription::new(consumer, &listing, SubscriptionType::Basic, Some(now + ChronoDuration::days(30)));
        let open_ended = Subscription::new(consumer, &listing, SubscriptionType::Free, None);
        for sub in [&ended, &running, &open_ended] {
            db.create_subscription(sub).await.unwrap();
        }

        let worker = ExpiryWorker::new(ExpiryConfig::default(), db.clone());
        assert_eq!(worker.run_once(now).await.unwrap(), ExpiryReport { api_keys: 0, subscriptions: 1 });

        for (id, expected) in [
            (ended.id, SubscriptionStatus::Expired),
            (running.id, SubscriptionStatus::Active),
            (open_ended.id, SubscriptionStatus::Active),
        ] {
            assert_eq!(db.find_subscription(id).await.unwrap().unwrap().status, expected);
        }

        assert_eq!(worker.run_once(now).await.unwrap(), ExpiryReport::default());
    }
}
