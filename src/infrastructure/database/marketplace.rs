use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::registry::like_pattern;
use super::PgStore;
use crate::domain::{
    ListingRating, ListingStatus, MarketplaceListing, Subscription, SubscriptionStatus,
};
use crate::infrastructure::error::AppResult;

/// Filtres de la liste des annonces
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingFilter {
    pub listed_by: Option<Uuid>,
    pub status: Option<ListingStatus>,
}

impl ListingFilter {
    pub fn accepts(&self, listing: &MarketplaceListing) -> bool {
        self.listed_by.map(|id| listing.listed_by == id).unwrap_or(true)
            && self.status.map(|s| listing.status == s).unwrap_or(true)
    }
}

/// Stockage de la marketplace : annonces, notes et abonnements
#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn create_listing(&self, listing: &MarketplaceListing) -> AppResult<MarketplaceListing>;
    async fn find_listing(&self, id: Uuid) -> AppResult<Option<MarketplaceListing>>;
    async fn find_listing_by_app(&self, app_id: Uuid) -> AppResult<Option<MarketplaceListing>>;
    async fn list_listings(&self, filter: ListingFilter) -> AppResult<Vec<MarketplaceListing>>;
    /// Recherche parmi les annonces actives
    async fn search_listings(&self, query: &str) -> AppResult<Vec<MarketplaceListing>>;
    async fn update_listing(&self, listing: &MarketplaceListing) -> AppResult<MarketplaceListing>;
    async fn delete_listing(&self, id: Uuid) -> AppResult<()>;

    /// Remplace la note existante de l'utilisateur, le cas échéant
    async fn upsert_rating(&self, rating: &ListingRating) -> AppResult<ListingRating>;
    async fn list_ratings(&self, listing_id: Uuid) -> AppResult<Vec<ListingRating>>;

    async fn create_subscription(&self, subscription: &Subscription) -> AppResult<Subscription>;
    async fn find_subscription(&self, id: Uuid) -> AppResult<Option<Subscription>>;
    async fn find_active_subscription(&self, user_id: Uuid, listing_id: Uuid) -> AppResult<Option<Subscription>>;
    async fn list_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<Subscription>>;
    async fn update_subscription(&self, subscription: &Subscription) -> AppResult<Subscription>;
    /// Passe en `expired` les abonnements actifs dont la date de fin est dépassée
    async fn expire_subscriptions(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

const LISTING_COLUMNS: &str = "id, quantum_app_id, listed_by, name, description, price, currency, \
     status, rating, rating_count, preview_enabled, support_email, support_url, created_at, updated_at";

const RATING_COLUMNS: &str = "id, listing_id, user_id, rating, comment, created_at";

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, quantum_app_id, listing_id, subscription_type, \
     start_date, end_date, status, service_uri, rate, created_at, updated_at";

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn create_listing(&self, listing: &MarketplaceListing) -> AppResult<MarketplaceListing> {
        let sql = format!(
            "INSERT INTO marketplace_listings ({LISTING_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {LISTING_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, MarketplaceListing>(&sql)
            .bind(listing.id)
            .bind(listing.quantum_app_id)
            .bind(listing.listed_by)
            .bind(&listing.name)
            .bind(&listing.description)
            .bind(listing.price)
            .bind(&listing.currency)
            .bind(listing.status)
            .bind(listing.rating)
            .bind(listing.rating_count)
            .bind(listing.preview_enabled)
            .bind(&listing.support_email)
            .bind(&listing.support_url)
            .bind(listing.created_at)
            .bind(listing.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_listing(&self, id: Uuid) -> AppResult<Option<MarketplaceListing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM marketplace_listings WHERE id = $1");
        Ok(sqlx::query_as::<_, MarketplaceListing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_listing_by_app(&self, app_id: Uuid) -> AppResult<Option<MarketplaceListing>> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM marketplace_listings WHERE quantum_app_id = $1"
        );
        Ok(sqlx::query_as::<_, MarketplaceListing>(&sql)
            .bind(app_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_listings(&self, filter: ListingFilter) -> AppResult<Vec<MarketplaceListing>> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM marketplace_listings \
             WHERE ($1::UUID IS NULL OR listed_by = $1) \
             AND ($2::VARCHAR IS NULL OR status = $2) \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, MarketplaceListing>(&sql)
            .bind(filter.listed_by)
            .bind(filter.status)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn search_listings(&self, query: &str) -> AppResult<Vec<MarketplaceListing>> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM marketplace_listings \
             WHERE status = $2 AND (name ILIKE $1 OR description ILIKE $1) \
             ORDER BY rating DESC, created_at DESC"
        );
        Ok(sqlx::query_as::<_, MarketplaceListing>(&sql)
            .bind(like_pattern(query))
            .bind(ListingStatus::Active)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_listing(&self, listing: &MarketplaceListing) -> AppResult<MarketplaceListing> {
        let sql = format!(
            "UPDATE marketplace_listings SET name = $2, description = $3, price = $4, currency = $5, \
             status = $6, rating = $7, rating_count = $8, preview_enabled = $9, support_email = $10, \
             support_url = $11, updated_at = $12 WHERE id = $1 RETURNING {LISTING_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, MarketplaceListing>(&sql)
            .bind(listing.id)
            .bind(&listing.name)
            .bind(&listing.description)
            .bind(listing.price)
            .bind(&listing.currency)
            .bind(listing.status)
            .bind(listing.rating)
            .bind(listing.rating_count)
            .bind(listing.preview_enabled)
            .bind(&listing.support_email)
            .bind(&listing.support_url)
            .bind(listing.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_listing(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM marketplace_listings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_rating(&self, rating: &ListingRating) -> AppResult<ListingRating> {
        let sql = format!(
            "INSERT INTO listing_ratings ({RATING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (listing_id, user_id) \
             DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, \
             created_at = EXCLUDED.created_at \
             RETURNING {RATING_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, ListingRating>(&sql)
            .bind(rating.id)
            .bind(rating.listing_id)
            .bind(rating.user_id)
            .bind(rating.rating)
            .bind(&rating.comment)
            .bind(rating.created_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_ratings(&self, listing_id: Uuid) -> AppResult<Vec<ListingRating>> {
        let sql = format!(
            "SELECT {RATING_COLUMNS} FROM listing_ratings WHERE listing_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, ListingRating>(&sql)
            .bind(listing_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_subscription(&self, subscription: &Subscription) -> AppResult<Subscription> {
        let sql = format!(
            "INSERT INTO subscriptions ({SUBSCRIPTION_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(subscription.id)
            .bind(subscription.user_id)
            .bind(subscription.quantum_app_id)
            .bind(subscription.listing_id)
            .bind(subscription.subscription_type)
            .bind(subscription.start_date)
            .bind(subscription.end_date)
            .bind(subscription.status)
            .bind(&subscription.service_uri)
            .bind(subscription.rate)
            .bind(subscription.created_at)
            .bind(subscription.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_subscription(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1");
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_active_subscription(&self, user_id: Uuid, listing_id: Uuid) -> AppResult<Option<Subscription>> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE user_id = $1 AND listing_id = $2 AND status = $3 LIMIT 1"
        );
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(user_id)
            .bind(listing_id)
            .bind(SubscriptionStatus::Active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_subscription(&self, subscription: &Subscription) -> AppResult<Subscription> {
        let sql = format!(
            "UPDATE subscriptions SET subscription_type = $2, end_date = $3, status = $4, \
             service_uri = $5, rate = $6, updated_at = $7 WHERE id = $1 RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(subscription.id)
            .bind(subscription.subscription_type)
            .bind(subscription.end_date)
            .bind(subscription.status)
            .bind(&subscription.service_uri)
            .bind(subscription.rate)
            .bind(subscription.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn expire_subscriptions(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = $1, updated_at = $2 \
             WHERE status = $3 AND end_date IS NOT NULL AND end_date <= $2",
        )
        .bind(SubscriptionStatus::Expired)
        .bind(now)
        .bind(SubscriptionStatus::Active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
