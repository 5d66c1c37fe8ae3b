// core/marketplace_service.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    ListingRating, ListingStatus, MarketplaceListing, Subscription, SubscriptionType,
};
use crate::infrastructure::database::{AppStore, Database, ListingFilter, MarketplaceStore};
use crate::infrastructure::error::{AppError, AppResult};
use crate::utils::validation::validate_rating;

fn active() -> ListingStatus {
    ListingStatus::Active
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingRequest {
    pub quantum_app_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Le nom doit contenir entre 1 et 255 caractères"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Le prix ne peut pas être négatif"))]
    pub price: f64,
    #[validate(length(equal = 3, message = "La devise doit être un code ISO à 3 lettres"))]
    pub currency: Option<String>,
    #[serde(default = "active")]
    pub status: ListingStatus,
    #[serde(default)]
    pub preview_enabled: bool,
    #[validate(email(message = "Format d'email invalide"))]
    pub support_email: Option<String>,
    pub support_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateListingRequest {
    #[validate(length(min = 1, max = 255, message = "Le nom doit contenir entre 1 et 255 caractères"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Le prix ne peut pas être négatif"))]
    pub price: Option<f64>,
    #[validate(length(equal = 3, message = "La devise doit être un code ISO à 3 lettres"))]
    pub currency: Option<String>,
    pub status: Option<ListingStatus>,
    pub preview_enabled: Option<bool>,
    #[validate(email(message = "Format d'email invalide"))]
    pub support_email: Option<String>,
    pub support_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RateListingRequest {
    #[validate(custom = "validate_rating")]
    pub rating: f64,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub subscription_type: SubscriptionType,
    pub end_date: Option<DateTime<Utc>>,
}

/// Annonce accompagnée de ses notes
#[derive(Debug, Serialize)]
pub struct ListingDetails {
    #[serde(flatten)]
    pub listing: MarketplaceListing,
    pub ratings: Vec<ListingRating>,
}

/// Service de la marketplace : annonces, notes et abonnements
pub struct MarketplaceService {
    db: Database,
}

impl MarketplaceService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Met une application en vente ; une seule annonce par application
    pub async fn create_listing(&self, user_id: Uuid, request: CreateListingRequest) -> AppResult<MarketplaceListing> {
        request.validate()?;

        let app = self
            .db
            .find_app(request.quantum_app_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quantum app".to_string()))?;
        if app.developer_id != user_id {
            return Err(AppError::Forbidden("Not enough permissions".to_string()));
        }
        if self.db.find_listing_by_app(app.id).await?.is_some() {
            return Err(AppError::Conflict("A listing already exists for this app".to_string()));
        }

        let mut listing = MarketplaceListing::new(app.id, user_id, request.name, request.price);
        listing.description = request.description;
        if let Some(currency) = request.currency {
            listing.currency = currency.to_uppercase();
        }
        listing.status = request.status;
        listing.preview_enabled = request.preview_enabled;
        listing.support_email = request.support_email;
        listing.support_url = request.support_url;

        let listing = self.db.create_listing(&listing).await?;
        info!("🛒 Annonce {} créée pour l'application {}", listing.id, app.id);
        Ok(listing)
    }

    pub async fn list_listings(&self, filter: ListingFilter) -> AppResult<Vec<MarketplaceListing>> {
        self.db.list_listings(filter).await
    }

    /// Recherche parmi les annonces actives
    pub async fn search_listings(&self, query: &str) -> AppResult<Vec<MarketplaceListing>> {
        let query = query.trim();
        if query.is_empty() {
            return self
                .db
                .list_listings(ListingFilter { status: Some(ListingStatus::Active), ..Default::default() })
                .await;
        }
        self.db.search_listings(query).await
    }

    pub async fn get_listing(&self, id: Uuid) -> AppResult<ListingDetails> {
        let listing = self.find_listing(id).await?;
        let ratings = self.db.list_ratings(listing.id).await?;
        Ok(ListingDetails { listing, ratings })
    }

    pub async fn update_listing(&self, user_id: Uuid, id: Uuid, request: UpdateListingRequest) -> AppResult<MarketplaceListing> {
        request.validate()?;
        let mut listing = self.owned_listing(user_id, id).await?;

        if let Some(name) = request.name {
            listing.name = name;
        }
        if request.description.is_some() {
            listing.description = request.description;
        }
        if let Some(price) = request.price {
            listing.price = price;
        }
        if let Some(currency) = request.currency {
            listing.currency = currency.to_uppercase();
        }
        if let Some(status) = request.status {
            listing.status = status;
        }
        if let Some(preview) = request.preview_enabled {
            listing.preview_enabled = preview;
        }
        if request.support_email.is_some() {
            listing.support_email = request.support_email;
        }
        if request.support_url.is_some() {
            listing.support_url = request.support_url;
        }
        listing.updated_at = Utc::now();

        self.db.update_listing(&listing).await
    }

    pub async fn delete_listing(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        let listing = self.owned_listing(user_id, id).await?;
        self.db.delete_listing(listing.id).await?;
        info!("🗑️ Annonce {} retirée", listing.id);
        Ok(())
    }

    /// Note une annonce ; une nouvelle note remplace la précédente
    pub async fn rate_listing(&self, user_id: Uuid, id: Uuid, request: RateListingRequest) -> AppResult<MarketplaceListing> {
        request.validate()?;
        let mut listing = self.find_listing(id).await?;
        if listing.listed_by == user_id {
            return Err(AppError::BadRequest("Cannot rate your own offering".to_string()));
        }

        let rating = ListingRating::new(listing.id, user_id, request.rating, request.comment);
        self.db.upsert_rating(&rating).await?;

        let ratings = self.db.list_ratings(listing.id).await?;
        listing.apply_ratings(&ratings);
        let listing = self.db.update_listing(&listing).await?;

        info!("⭐ Annonce {} notée {} ({} avis)", listing.id, request.rating, listing.rating_count);
        Ok(listing)
    }

    pub async fn subscribe(&self, user_id: Uuid, id: Uuid, request: SubscribeRequest) -> AppResult<Subscription> {
        let listing = self.find_listing(id).await?;

        if listing.listed_by == user_id {
            return Err(AppError::BadRequest("Cannot subscribe to your own offering".to_string()));
        }
        if listing.status != ListingStatus::Active {
            return Err(AppError::BadRequest("Offering is not available".to_string()));
        }
        if self.db.find_active_subscription(user_id, listing.id).await?.is_some() {
            return Err(AppError::BadRequest("Already subscribed to this offering".to_string()));
        }
        if let Some(end) = request.end_date {
            if end <= Utc::now() {
                return Err(AppError::BadRequest("End date must be in the future".to_string()));
            }
        }

        let subscription = Subscription::new(user_id, &listing, request.subscription_type, request.end_date);
        let subscription = self.db.create_subscription(&subscription).await?;
        info!("📝 Abonnement {} créé sur l'annonce {}", subscription.id, listing.id);
        Ok(subscription)
    }

    pub async fn list_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        self.db.list_subscriptions(user_id).await
    }

    pub async fn cancel_subscription(&self, user_id: Uuid, id: Uuid) -> AppResult<Subscription> {
        let mut subscription = self
            .db
            .find_subscription(id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Subscription".to_string()))?;

        if !subscription.is_active() {
            return Err(AppError::BadRequest("Subscription is not active".to_string()));
        }

        subscription.cancel();
        let subscription = self.db.update_subscription(&subscription).await?;
        info!("🚫 Abonnement {} annulé", subscription.id);
        Ok(subscription)
    }

    async fn find_listing(&self, id: Uuid) -> AppResult<MarketplaceListing> {
        self.db
            .find_listing(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Offering".to_string()))
    }

    async fn owned_listing(&self, user_id: Uuid, id: Uuid) -> AppResult<MarketplaceListing> {
        let listing = self.find_listing(id).await?;
        if listing.listed_by != user_id {
            return Err(AppError::Forbidden("Not enough permissions".to_string()));
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AppType, QuantumApp, SubscriptionStatus};

    struct Fixture {
        db: Database,
        market: MarketplaceService,
        provider: Uuid,
        app: QuantumApp,
    }

    async fn fixture() -> Fixture {
        let db = Database::in_memory();
        let provider = Uuid::new_v4();
        let app = db
            .create_app(&QuantumApp::new(provider, "qaoa".into(), AppType::Algorithm))
            .await
            .unwrap();
        Fixture { market: MarketplaceService::new(db.clone()), db, provider, app }
    }

    fn listing_request(app_id: Uuid) -> CreateListingRequest {
        CreateListingRequest {
            quantum_app_id: app_id,
            name: "QAOA solver".into(),
            description: Some("Max-cut optimisation".into()),
            price: 9.5,
            currency: None,
            status: ListingStatus::Active,
            preview_enabled: false,
            support_email: None,
            support_url: None,
        }
    }

    #[tokio::test]
    async fn test_one_listing_per_app() {
        let f = fixture().await;
        f.market.create_listing(f.provider, listing_request(f.app.id)).await.unwrap();

        let err = f.market.create_listing(f.provider, listing_request(f.app.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = f.market.create_listing(Uuid::new_v4(), listing_request(f.app.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_subscription_rules() {
        let f = fixture().await;
        let listing = f.market.create_listing(f.provider, listing_request(f.app.id)).await.unwrap();
        let consumer = Uuid::new_v4();

        let err = f.market.subscribe(f.provider, listing.id, SubscribeRequest::default()).await.unwrap_err();
        assert_eq!(err.client_message(), "Cannot subscribe to your own offering");

        let sub = f.market.subscribe(consumer, listing.id, SubscribeRequest::default()).await.unwrap();
        assert_eq!(sub.rate, Some(9.5));
        assert!(f.market.subscribe(consumer, listing.id, SubscribeRequest::default()).await.is_err());

        let cancelled = f.market.cancel_subscription(consumer, sub.id).await.unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert!(f.market.cancel_subscription(consumer, sub.id).await.is_err());

        f.market
            .subscribe(consumer, listing.id, SubscribeRequest::default())
            .await
            .unwrap();
        assert_eq!(f.market.list_subscriptions(consumer).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_inactive_listing_rejects_subscriptions() {
        let f = fixture().await;
        let mut request = listing_request(f.app.id);
        request.status = ListingStatus::Suspended;
        let listing = f.market.create_listing(f.provider, request).await.unwrap();

        let err = f.market.subscribe(Uuid::new_v4(), listing.id, SubscribeRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(f.market.search_listings("qaoa").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ratings_replace_and_average() {
        let f = fixture().await;
        let listing = f.market.create_listing(f.provider, listing_request(f.app.id)).await.unwrap();
        let (ana, ben) = (Uuid::new_v4(), Uuid::new_v4());

        let rate = |rating| RateListingRequest { rating, comment: None };
        f.market.rate_listing(ana, listing.id, rate(2.0)).await.unwrap();
        f.market.rate_listing(ben, listing.id, rate(4.0)).await.unwrap();
        let updated = f.market.rate_listing(ana, listing.id, rate(5.0)).await.unwrap();
        assert_eq!(updated.rating_count, 2);
        assert!((updated.rating - 4.5).abs() < f64::EPSILON);

        assert!(matches!(
            f.market.rate_listing(ana, listing.id, rate(7.0)).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            f.market.rate_listing(f.provider, listing.id, rate(5.0)).await,
            Err(AppError::BadRequest(_))
        ));

        let details = f.market.get_listing(listing.id).await.unwrap();
        assert_eq!(details.ratings.len(), 2);
    }

    #[tokio::test]
    async fn test_deleting_app_removes_listing() {
        let f = fixture().await;
        let listing = f.market.create_listing(f.provider, listing_request(f.app.id)).await.unwrap();
        f.db.delete_app(f.app.id).await.unwrap();
        assert!(matches!(f.market.get_listing(listing.id).await, Err(AppError::NotFound(_))));
    }
}
