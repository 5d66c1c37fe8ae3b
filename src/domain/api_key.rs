use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// État d'une clé API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyStatus {
    Active,
    Expired,
    Revoked,
}

/// Clé API rattachée à un utilisateur
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,

    /// Valeur complète (`qh_...`), unique
    pub value: String,

    pub status: ApiKeyStatus,

    /// Requêtes par minute autorisées (informatif)
    pub rate_limit: Option<i32>,

    pub expire_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserApiKey {
    pub fn new(
        user_id: Uuid,
        name: String,
        value: String,
        expire_at: Option<DateTime<Utc>>,
        rate_limit: Option<i32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            value,
            status: ApiKeyStatus::Active,
            rate_limit,
            expire_at,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Une clé n'authentifie que si elle est active et non expirée
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ApiKeyStatus::Active && !self.is_expired_at(now)
    }

    pub fn set_active(&mut self, active: bool) {
        self.status = if active { ApiKeyStatus::Active } else { ApiKeyStatus::Revoked };
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_usability() {
        let now = Utc::now();
        let mut key = UserApiKey::new(Uuid::new_v4(), "ci".into(), "qh_x".into(), Some(now + Duration::days(1)), None);
        assert!(key.is_usable_at(now));
        assert!(!key.is_usable_at(now + Duration::days(2)));

        key.set_active(false);
        assert_eq!(key.status, ApiKeyStatus::Revoked);
        assert!(!key.is_usable_at(now));

        key.set_active(true);
        assert!(key.is_usable_at(now));
    }

    #[test]
    fn test_key_without_expiry_never_expires() {
        let key = UserApiKey::new(Uuid::new_v4(), "forever".into(), "qh_y".into(), None, Some(60));
        assert!(!key.is_expired_at(Utc::now() + Duration::days(3650)));
    }
}
