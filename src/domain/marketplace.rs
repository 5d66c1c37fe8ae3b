use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// État d'une annonce
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Pending,
    Active,
    Suspended,
    Delisted,
}

/// Formule d'abonnement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionType {
    #[default]
    Free,
    Basic,
    Professional,
    Enterprise,
    Custom,
}

/// État d'un abonnement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
    Suspended,
}

/// Annonce de marketplace pour une application
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MarketplaceListing {
    pub id: Uuid,
    pub quantum_app_id: Uuid,
    pub listed_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub currency: String,
    pub status: ListingStatus,

    /// Note moyenne (0 à 5)
    pub rating: f64,
    pub rating_count: i32,

    pub preview_enabled: bool,
    pub support_email: Option<String>,
    pub support_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MarketplaceListing {
    pub fn new(quantum_app_id: Uuid, listed_by: Uuid, name: String, price: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            quantum_app_id,
            listed_by,
            name,
            description: None,
            price,
            currency: "USD".to_string(),
            status: ListingStatus::default(),
            rating: 0.0,
            rating_count: 0,
            preview_enabled: false,
            support_email: None,
            support_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recalcule la moyenne à partir de toutes les notes
    pub fn apply_ratings(&mut self, ratings: &[ListingRating]) {
        self.rating_count = ratings.len() as i32;
        self.rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().map(|r| r.rating).sum::<f64>() / ratings.len() as f64
        };
        self.updated_at = Utc::now();
    }

    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

/// Note laissée par un utilisateur (une seule par annonce)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ListingRating {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub user_id: Uuid,
    pub rating: f64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ListingRating {
    pub fn new(listing_id: Uuid, user_id: Uuid, rating: f64, comment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            listing_id,
            user_id,
            rating,
            comment,
            created_at: Utc::now(),
        }
    }
}

/// Abonnement d'un utilisateur à une annonce
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quantum_app_id: Uuid,
    pub listing_id: Uuid,
    pub subscription_type: SubscriptionType,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: SubscriptionStatus,
    pub service_uri: Option<String>,
    pub rate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        user_id: Uuid,
        listing: &MarketplaceListing,
        subscription_type: SubscriptionType,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            quantum_app_id: listing.quantum_app_id,
            listing_id: listing.id,
            subscription_type,
            start_date: now,
            end_date,
            status: SubscriptionStatus::Active,
            service_uri: None,
            rate: Some(listing.price),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    pub fn cancel(&mut self) {
        let now = Utc::now();
        self.status = SubscriptionStatus::Cancelled;
        self.end_date = Some(now);
        self.updated_at = now;
    }
}
