use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    ApiKeyStore, AppStore, JobStore, ListingFilter, MarketplaceStore, ProjectStore, RegistryStore,
    ReleaseRecord, UserStore,
};
use crate::domain::{
    ApiKeyStatus, AppVersion, Job, JobResult, ListingRating, ListingStatus, MarketplaceListing,
    Project, QuantumApp, RegistryItem, Subscription, SubscriptionStatus, User, UserApiKey,
};
use crate::infrastructure::error::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    api_keys: HashMap<Uuid, UserApiKey>,
    projects: HashMap<Uuid, Project>,
    apps: HashMap<Uuid, QuantumApp>,
    versions: HashMap<Uuid, AppVersion>,
    registry: HashMap<Uuid, RegistryItem>,
    listings: HashMap<Uuid, MarketplaceListing>,
    ratings: HashMap<Uuid, ListingRating>,
    subscriptions: HashMap<Uuid, Subscription>,
    jobs: HashMap<Uuid, Job>,
    job_results: HashMap<Uuid, JobResult>,
}

/// Stockage en mémoire, protégé par un verrou unique.
/// Reproduit les contraintes d'unicité et les suppressions en cascade du schéma SQL.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

fn conflict() -> AppError {
    AppError::Conflict("Resource already exists".to_string())
}

fn newest_first<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items
}

impl MemoryState {
    fn delete_listing_cascade(&mut self, listing_id: Uuid) {
        self.listings.remove(&listing_id);
        self.ratings.retain(|_, r| r.listing_id != listing_id);
        self.subscriptions.retain(|_, s| s.listing_id != listing_id);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &User) -> AppResult<User> {
        let mut state = self.state.lock().await;
        let taken = state.users.values().any(|u| {
            u.username == user.username || u.email.to_lowercase() == user.email.to_lowercase()
        });
        if taken {
            return Err(conflict());
        }
        state.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        let email = email.to_lowercase();
        Ok(state.users.values().find(|u| u.email.to_lowercase() == email).cloned())
    }

    async fn update_user(&self, user: &User) -> AppResult<User> {
        let mut state = self.state.lock().await;
        let email_taken = state
            .users
            .values()
            .any(|u| u.id != user.id && u.email.to_lowercase() == user.email.to_lowercase());
        if email_taken {
            return Err(conflict());
        }
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user.clone())
            }
            None => Err(AppError::NotFound("User".to_string())),
        }
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn create_api_key(&self, key: &UserApiKey) -> AppResult<UserApiKey> {
        let mut state = self.state.lock().await;
        if state.api_keys.values().any(|k| k.value == key.value) {
            return Err(conflict());
        }
        state.api_keys.insert(key.id, key.clone());
        Ok(key.clone())
    }

    async fn find_api_key(&self, id: Uuid) -> AppResult<Option<UserApiKey>> {
        Ok(self.state.lock().await.api_keys.get(&id).cloned())
    }

    async fn find_api_key_by_value(&self, value: &str) -> AppResult<Option<UserApiKey>> {
        let state = self.state.lock().await;
        Ok(state.api_keys.values().find(|k| k.value == value).cloned())
    }

    async fn list_api_keys(&self, user_id: Uuid) -> AppResult<Vec<UserApiKey>> {
        let state = self.state.lock().await;
        let keys = state.api_keys.values().filter(|k| k.user_id == user_id).cloned().collect();
        Ok(newest_first(keys, |k| k.created_at))
    }

    async fn update_api_key(&self, key: &UserApiKey) -> AppResult<UserApiKey> {
        let mut state = self.state.lock().await;
        match state.api_keys.get_mut(&key.id) {
            Some(existing) => {
                *existing = key.clone();
                Ok(key.clone())
            }
            None => Err(AppError::NotFound("API key".to_string())),
        }
    }

    async fn delete_api_key(&self, id: Uuid) -> AppResult<()> {
        self.state.lock().await.api_keys.remove(&id);
        Ok(())
    }

    async fn expire_api_keys(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut count = 0;
        for key in state.api_keys.values_mut() {
            if key.status == ApiKeyStatus::Active && key.is_expired_at(now) {
                key.status = ApiKeyStatus::Expired;
                key.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, project: &Project) -> AppResult<Project> {
        self.state.lock().await.projects.insert(project.id, project.clone());
        Ok(project.clone())
    }

    async fn find_project(&self, id: Uuid) -> AppResult<Option<Project>> {
        Ok(self.state.lock().await.projects.get(&id).cloned())
    }

    async fn list_projects(&self, user_id: Uuid) -> AppResult<Vec<Project>> {
        let state = self.state.lock().await;
        let projects = state.projects.values().filter(|p| p.user_id == user_id).cloned().collect();
        Ok(newest_first(projects, |p| p.created_at))
    }

    async fn update_project(&self, project: &Project) -> AppResult<Project> {
        let mut state = self.state.lock().await;
        match state.projects.get_mut(&project.id) {
            Some(existing) => {
                *existing = project.clone();
                Ok(project.clone())
            }
            None => Err(AppError::NotFound("Project".to_string())),
        }
    }

    async fn delete_project(&self, id: Uuid) -> AppResult<()> {
        self.state.lock().await.projects.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl AppStore for MemoryStore {
    async fn create_app(&self, app: &QuantumApp) -> AppResult<QuantumApp> {
        self.state.lock().await.apps.insert(app.id, app.clone());
        Ok(app.clone())
    }

    async fn find_app(&self, id: Uuid) -> AppResult<Option<QuantumApp>> {
        Ok(self.state.lock().await.apps.get(&id).cloned())
    }

    async fn find_app_by_name(&self, developer_id: Uuid, name: &str) -> AppResult<Option<QuantumApp>> {
        let state = self.state.lock().await;
        let mut matches: Vec<&QuantumApp> = state
            .apps
            .values()
            .filter(|a| a.developer_id == developer_id && a.name == name)
            .collect();
        matches.sort_by_key(|a| a.created_at);
        Ok(matches.first().map(|a| (*a).clone()))
    }

    async fn list_apps(&self, developer_id: Uuid) -> AppResult<Vec<QuantumApp>> {
        let state = self.state.lock().await;
        let apps = state.apps.values().filter(|a| a.developer_id == developer_id).cloned().collect();
        Ok(newest_first(apps, |a| a.created_at))
    }

    async fn update_app(&self, app: &QuantumApp) -> AppResult<QuantumApp> {
        let mut state = self.state.lock().await;
        match state.apps.get_mut(&app.id) {
            Some(existing) => {
                let downloads = existing.registry_download_count;
                *existing = app.clone();
                existing.registry_download_count = downloads;
                Ok(existing.clone())
            }
            None => Err(AppError::NotFound("Quantum app".to_string())),
        }
    }

    async fn delete_app(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.apps.remove(&id);

        let versions: Vec<Uuid> = state
            .versions
            .values()
            .filter(|v| v.quantum_app_id == id)
            .map(|v| v.id)
            .collect();
        state.versions.retain(|_, v| v.quantum_app_id != id);
        let orphan_jobs: Vec<Uuid> = state
            .jobs
            .values()
            .filter(|j| versions.contains(&j.app_version_id))
            .map(|j| j.id)
            .collect();
        state.jobs.retain(|_, j| !versions.contains(&j.app_version_id));
        state.job_results.retain(|_, r| !orphan_jobs.contains(&r.job_id));

        let listings: Vec<Uuid> = state
            .listings
            .values()
            .filter(|l| l.quantum_app_id == id)
            .map(|l| l.id)
            .collect();
        for listing_id in listings {
            state.delete_listing_cascade(listing_id);
        }

        state.registry.retain(|_, item| item.quantum_app_id != Some(id));

        for project in state.projects.values_mut() {
            if project.quantum_app_id == Some(id) {
                project.quantum_app_id = None;
            }
        }
        Ok(())
    }

    async fn save_release(&self, release: &ReleaseRecord) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let app_id = release.app.id;

        let duplicate = state.versions.values().any(|v| {
            v.quantum_app_id == app_id && v.version_number == release.version.version_number
        });
        if duplicate {
            return Err(conflict());
        }
        if !release.app_is_new && !state.apps.contains_key(&app_id) {
            return Err(AppError::NotFound("Quantum app".to_string()));
        }

        let downloads = state
            .apps
            .get(&app_id)
            .map(|a| a.registry_download_count)
            .unwrap_or(release.app.registry_download_count);
        let mut app = release.app.clone();
        app.registry_download_count = downloads;
        state.apps.insert(app_id, app);

        for version in state.versions.values_mut() {
            if version.quantum_app_id == app_id && version.is_latest {
                version.is_latest = false;
                version.updated_at = Utc::now();
            }
        }
        state.versions.insert(release.version.id, release.version.clone());

        if let Some(project) = &release.project {
            state.projects.insert(project.id, project.clone());
        }
        Ok(())
    }

    async fn find_version(&self, id: Uuid) -> AppResult<Option<AppVersion>> {
        Ok(self.state.lock().await.versions.get(&id).cloned())
    }

    async fn list_versions(&self, app_id: Uuid) -> AppResult<Vec<AppVersion>> {
        let state = self.state.lock().await;
        let versions = state
            .versions
            .values()
            .filter(|v| v.quantum_app_id == app_id)
            .map(|v| AppVersion { package_data: None, ..v.clone() })
            .collect();
        Ok(newest_first(versions, |v| v.created_at))
    }

    async fn update_version(&self, version: &AppVersion) -> AppResult<AppVersion> {
        let mut state = self.state.lock().await;
        match state.versions.get_mut(&version.id) {
            Some(existing) => {
                existing.status = version.status;
                existing.release_notes = version.release_notes.clone();
                existing.is_latest = version.is_latest;
                existing.updated_at = version.updated_at;
                Ok(AppVersion { package_data: None, ..existing.clone() })
            }
            None => Err(AppError::NotFound("App version".to_string())),
        }
    }

    async fn increment_download_count(&self, app_id: Uuid) -> AppResult<()> {
        if let Some(app) = self.state.lock().await.apps.get_mut(&app_id) {
            app.registry_download_count += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn create_registry_item(&self, item: &RegistryItem) -> AppResult<RegistryItem> {
        self.state.lock().await.registry.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn find_registry_item(&self, id: Uuid) -> AppResult<Option<RegistryItem>> {
        Ok(self.state.lock().await.registry.get(&id).cloned())
    }

    async fn find_registry_item_by_app(&self, app_id: Uuid) -> AppResult<Option<RegistryItem>> {
        let state = self.state.lock().await;
        let items = state
            .registry
            .values()
            .filter(|i| i.quantum_app_id == Some(app_id))
            .cloned()
            .collect();
        Ok(newest_first(items, |i| i.created_at).into_iter().next())
    }

    async fn list_registry_items(&self, provider_id: Option<Uuid>) -> AppResult<Vec<RegistryItem>> {
        let state = self.state.lock().await;
        let items = state
            .registry
            .values()
            .filter(|i| provider_id.map(|p| i.provider_id == p).unwrap_or(true))
            .cloned()
            .collect();
        Ok(newest_first(items, |i| i.created_at))
    }

    async fn search_registry_items(&self, query: &str) -> AppResult<Vec<RegistryItem>> {
        let state = self.state.lock().await;
        let items = state.registry.values().filter(|i| i.matches(query)).cloned().collect();
        Ok(newest_first(items, |i| i.created_at))
    }

    async fn list_registry_versions(&self, name: &str) -> AppResult<Vec<RegistryItem>> {
        let state = self.state.lock().await;
        let items = state.registry.values().filter(|i| i.name == name).cloned().collect();
        Ok(newest_first(items, |i| i.created_at))
    }

    async fn update_registry_item(&self, item: &RegistryItem) -> AppResult<RegistryItem> {
        let mut state = self.state.lock().await;
        match state.registry.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(item.clone())
            }
            None => Err(AppError::NotFound("Registry item".to_string())),
        }
    }

    async fn delete_registry_item(&self, id: Uuid) -> AppResult<()> {
        self.state.lock().await.registry.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn create_listing(&self, listing: &MarketplaceListing) -> AppResult<MarketplaceListing> {
        let mut state = self.state.lock().await;
        if state.listings.values().any(|l| l.quantum_app_id == listing.quantum_app_id) {
            return Err(conflict());
        }
        state.listings.insert(listing.id, listing.clone());
        Ok(listing.clone())
    }

    async fn find_listing(&self, id: Uuid) -> AppResult<Option<MarketplaceListing>> {
        Ok(self.state.lock().await.listings.get(&id).cloned())
    }

    async fn find_listing_by_app(&self, app_id: Uuid) -> AppResult<Option<MarketplaceListing>> {
        let state = self.state.lock().await;
        Ok(state.listings.values().find(|l| l.quantum_app_id == app_id).cloned())
    }

    async fn list_listings(&self, filter: ListingFilter) -> AppResult<Vec<MarketplaceListing>> {
        let state = self.state.lock().await;
        let listings = state.listings.values().filter(|l| filter.accepts(l)).cloned().collect();
        Ok(newest_first(listings, |l| l.created_at))
    }

    async fn search_listings(&self, query: &str) -> AppResult<Vec<MarketplaceListing>> {
        let state = self.state.lock().await;
        let mut listings: Vec<MarketplaceListing> = state
            .listings
            .values()
            .filter(|l| l.status == ListingStatus::Active && l.matches(query))
            .cloned()
            .collect();
        listings.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(listings)
    }

    async fn update_listing(&self, listing: &MarketplaceListing) -> AppResult<MarketplaceListing> {
        let mut state = self.state.lock().await;
        match state.listings.get_mut(&listing.id) {
            Some(existing) => {
                *existing = listing.clone();
                Ok(listing.clone())
            }
            None => Err(AppError::NotFound("Listing".to_string())),
        }
    }

    async fn delete_listing(&self, id: Uuid) -> AppResult<()> {
        self.state.lock().await.delete_listing_cascade(id);
        Ok(())
    }

    async fn upsert_rating(&self, rating: &ListingRating) -> AppResult<ListingRating> {
        let mut state = self.state.lock().await;
        let existing = state
            .ratings
            .values_mut()
            .find(|r| r.listing_id == rating.listing_id && r.user_id == rating.user_id);
        match existing {
            Some(existing) => {
                existing.rating = rating.rating;
                existing.comment = rating.comment.clone();
                existing.created_at = rating.created_at;
                Ok(existing.clone())
            }
            None => {
                state.ratings.insert(rating.id, rating.clone());
                Ok(rating.clone())
            }
        }
    }

    async fn list_ratings(&self, listing_id: Uuid) -> AppResult<Vec<ListingRating>> {
        let state = self.state.lock().await;
        let ratings = state.ratings.values().filter(|r| r.listing_id == listing_id).cloned().collect();
        Ok(newest_first(ratings, |r| r.created_at))
    }

    async fn create_subscription(&self, subscription: &Subscription) -> AppResult<Subscription> {
        self.state.lock().await.subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription.clone())
    }

    async fn find_subscription(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.state.lock().await.subscriptions.get(&id).cloned())
    }

    async fn find_active_subscription(&self, user_id: Uuid, listing_id: Uuid) -> AppResult<Option<Subscription>> {
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .values()
            .find(|s| s.user_id == user_id && s.listing_id == listing_id && s.is_active())
            .cloned())
    }

    async fn list_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let state = self.state.lock().await;
        let subs = state.subscriptions.values().filter(|s| s.user_id == user_id).cloned().collect();
        Ok(newest_first(subs, |s| s.created_at))
    }

    async fn update_subscription(&self, subscription: &Subscription) -> AppResult<Subscription> {
        let mut state = self.state.lock().await;
        match state.subscriptions.get_mut(&subscription.id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(subscription.clone())
            }
            None => Err(AppError::NotFound("Subscription".to_string())),
        }
    }

    async fn expire_subscriptions(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut count = 0;
        for sub in state.subscriptions.values_mut() {
            let ended = sub.end_date.map(|end| end <= now).unwrap_or(false);
            if sub.status == SubscriptionStatus::Active && ended {
                sub.status = SubscriptionStatus::Expired;
                sub.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(&self, job: &Job) -> AppResult<Job> {
        self.state.lock().await.jobs.insert(job.id, job.clone());
        Ok(job.clone())
    }

    async fn find_job(&self, id: Uuid) -> AppResult<Option<Job>> {
        Ok(self.state.lock().await.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self, user_id: Uuid) -> AppResult<Vec<Job>> {
        let state = self.state.lock().await;
        let jobs = state.jobs.values().filter(|j| j.user_id == user_id).cloned().collect();
        Ok(newest_first(jobs, |j| j.created_at))
    }

    async fn update_job(&self, job: &Job) -> AppResult<Job> {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(job.clone())
            }
            None => Err(AppError::NotFound("Job".to_string())),
        }
    }

    async fn save_job_result(&self, job: &Job, result: &JobResult) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.job_results.values().any(|r| r.job_id == job.id) {
            return Err(conflict());
        }
        if !state.jobs.contains_key(&job.id) {
            return Err(AppError::NotFound("Job".to_string()));
        }
        state.jobs.insert(job.id, job.clone());
        state.job_results.insert(result.id, result.clone());
        Ok(())
    }

    async fn find_job_result(&self, job_id: Uuid) -> AppResult<Option<JobResult>> {
        let state = self.state.lock().await;
        Ok(state.job_results.values().find(|r| r.job_id == job_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AppType;

    #[tokio::test]
    async fn test_unique_username_and_email() {
        let store = MemoryStore::default();
        store
            .create_user(&User::new("alice".into(), "alice@example.com".into(), "h".into(), None))
            .await
            .unwrap();

        let same_email = User::new("alice2".into(), "ALICE@example.com".into(), "h".into(), None);
        assert!(matches!(store.create_user(&same_email).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_release_moves_latest_flag() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let mut app = QuantumApp::new(owner, "bell".into(), AppType::Circuit);

        let v1 = AppVersion::new(app.id, "1.0.0".into(), "qiskit".into());
        app.latest_version_id = Some(v1.id);
        store
            .save_release(&ReleaseRecord { app: app.clone(), app_is_new: true, version: v1.clone(), project: None })
            .await
            .unwrap();

        let v2 = AppVersion::new(app.id, "1.1.0".into(), "qiskit".into());
        app.latest_version_id = Some(v2.id);
        store
            .save_release(&ReleaseRecord { app: app.clone(), app_is_new: false, version: v2.clone(), project: None })
            .await
            .unwrap();

        let versions = store.list_versions(app.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions.iter().filter(|v| v.is_latest).count(), 1);
        assert!(store.find_version(v2.id).await.unwrap().unwrap().is_latest);

        let duplicate = AppVersion::new(app.id, "1.1.0".into(), "qiskit".into());
        let result = store
            .save_release(&ReleaseRecord { app, app_is_new: false, version: duplicate, project: None })
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_app_cascades() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let app = QuantumApp::new(owner, "grover".into(), AppType::Algorithm);
        let version = AppVersion::new(app.id, "0.1.0".into(), "qiskit".into());
        store
            .save_release(&ReleaseRecord { app: app.clone(), app_is_new: true, version, project: None })
            .await
            .unwrap();

        let listing = MarketplaceListing::new(app.id, owner, "Grover".into(), 5.0);
        store.create_listing(&listing).await.unwrap();
        let mut item = RegistryItem::new(owner, "grover".into(), None, "0.1.0".into(), vec![]);
        item.quantum_app_id = Some(app.id);
        store.create_registry_item(&item).await.unwrap();

        store.delete_app(app.id).await.unwrap();
        assert!(store.list_versions(app.id).await.unwrap().is_empty());
        assert!(store.find_listing(listing.id).await.unwrap().is_none());
        assert!(store.find_registry_item(item.id).await.unwrap().is_none());
    }
}
