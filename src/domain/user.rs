use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Rôle attribué par défaut à un nouvel utilisateur
pub const DEFAULT_ROLE: &str = "CONSUMER";

/// Utilisateur du hub
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,

    /// Nom d'utilisateur unique (50 caractères maximum)
    pub username: String,

    /// Email unique
    pub email: String,

    /// Hash Argon2, jamais sérialisé
    #[serde(skip_serializing, default)]
    pub hashed_password: String,

    pub full_name: Option<String>,

    /// Rôles (`CONSUMER` par défaut)
    pub roles: Vec<String>,

    pub is_active: bool,

    /// Fournisseur d'applications sur la marketplace
    pub is_provider: bool,

    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        hashed_password: String,
        full_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            hashed_password,
            full_name,
            roles: vec![DEFAULT_ROLE.to_string()],
            is_active: true,
            is_provider: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Enregistre une connexion réussie
    pub fn touch_login(&mut self) {
        let now = Utc::now();
        self.last_login = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("alice".into(), "alice@example.com".into(), "hash".into(), None);
        assert_eq!(user.roles, vec!["CONSUMER".to_string()]);
        assert!(user.is_active);
        assert!(!user.is_provider);
        assert!(user.last_login.is_none());
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User::new("bob".into(), "bob@example.com".into(), "secret-hash".into(), None);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["username"], "bob");
    }
}
