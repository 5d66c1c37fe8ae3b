use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Projet de développement, éventuellement publié comme application quantique
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub user_id: Uuid,
    pub quantum_app_id: Option<Uuid>,
    pub repo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(user_id: Uuid, name: String, description: Option<String>, repo: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            user_id,
            quantum_app_id: None,
            repo,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_released(&self) -> bool {
        self.quantum_app_id.is_some()
    }
}
