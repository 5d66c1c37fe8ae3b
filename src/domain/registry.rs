use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Entrée du registre public
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistryItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub tags: Vec<String>,
    pub provider_id: Uuid,

    /// Application d'origine quand l'entrée vient d'une publication
    pub quantum_app_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistryItem {
    pub fn new(
        provider_id: Uuid,
        name: String,
        description: Option<String>,
        version: String,
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            version,
            tags,
            provider_id,
            quantum_app_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recherche insensible à la casse sur le nom, la description et les tags
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_name_description_and_tags() {
        let item = RegistryItem::new(
            Uuid::new_v4(),
            "Grover Search".into(),
            Some("Amplitude amplification".into()),
            "1.0.0".into(),
            vec!["Qiskit".into(), "search".into()],
        );
        assert!(item.matches("grover"));
        assert!(item.matches("AMPLITUDE"));
        assert!(item.matches("qisk"));
        assert!(!item.matches("shor"));
    }
}
