//! # Marketplace Routes
//!
//! Annonces (lecture publique), notes et abonnements (authentifiés).

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::routes::middleware::CurrentUser;
use crate::api::{response, AppState};
use crate::core::marketplace_service::{
    CreateListingRequest, RateListingRequest, SubscribeRequest, UpdateListingRequest,
};
use crate::core::MarketplaceService;
use crate::domain::ListingStatus;
use crate::infrastructure::database::ListingFilter;
use crate::infrastructure::error::AppResult;
use crate::utils::PaginationParams;

fn service(state: &AppState) -> MarketplaceService {
    MarketplaceService::new(state.db.clone())
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub listed_by: Option<Uuid>,
    pub status: Option<ListingStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[post("/marketplace/listings")]
pub async fn create_listing(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<CreateListingRequest>,
) -> AppResult<HttpResponse> {
    let listing = service(&state).create_listing(user.id, payload.into_inner()).await?;
    Ok(response::created("Listing created", listing))
}

#[get("/marketplace/listings")]
pub async fn list_listings(
    state: web::Data<AppState>,
    query: web::Query<ListingQuery>,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let filter = ListingFilter { listed_by: query.listed_by, status: query.status };
    let listings = service(&state).list_listings(filter).await?;
    Ok(response::paginated(listings, &pagination))
}

#[get("/marketplace/listings/search")]
pub async fn search_listings(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let listings = service(&state).search_listings(&query.q).await?;
    Ok(response::paginated(listings, &pagination))
}

#[get("/marketplace/listings/{id}")]
pub async fn get_listing(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let details = service(&state).get_listing(path.into_inner()).await?;
    Ok(response::ok(details))
}

#[put("/marketplace/listings/{id}")]
pub async fn update_listing(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateListingRequest>,
) -> AppResult<HttpResponse> {
    let listing = service(&state)
        .update_listing(user.id, path.into_inner(), payload.into_inner())
        .await?;
    Ok(response::ok(listing))
}

#[delete("/marketplace/listings/{id}")]
pub async fn delete_listing(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    service(&state).delete_listing(user.id, path.into_inner()).await?;
    Ok(response::message("Listing deleted"))
}

#[post("/marketplace/listings/{id}/rate")]
pub async fn rate_listing(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<RateListingRequest>,
) -> AppResult<HttpResponse> {
    let listing = service(&state)
        .rate_listing(user.id, path.into_inner(), payload.into_inner())
        .await?;
    Ok(response::ok(listing))
}

/// Le corps est facultatif : abonnement `free` sans date de fin par défaut
#[post("/marketplace/listings/{id}/subscribe")]
pub async fn subscribe(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: Option<web::Json<SubscribeRequest>>,
) -> AppResult<HttpResponse> {
    let request = payload.map(|p| p.into_inner()).unwrap_or_default();
    let subscription = service(&state)
        .subscribe(user.id, path.into_inner(), request)
        .await?;
    Ok(response::created("Subscribed", subscription))
}

#[get("/marketplace/subscriptions")]
pub async fn list_subscriptions(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let subscriptions = service(&state).list_subscriptions(user.id).await?;
    Ok(response::paginated(subscriptions, &pagination))
}

#[post("/marketplace/subscriptions/{id}/cancel")]
pub async fn cancel_subscription(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let subscription = service(&state)
        .cancel_subscription(user.id, path.into_inner())
        .await?;
    Ok(response::ok(subscription))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_listing)
        .service(list_listings)
        .service(search_listings)
        .service(get_listing)
        .service(update_listing)
        .service(delete_listing)
        .service(rate_listing)
        .service(subscribe)
        .service(list_subscriptions)
        .service(cancel_subscription);
}

#[cfg(test)]
mod tests {
    use crate::api;
    use crate::api::tests::{bearer_for, json_body, test_state};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;

    #[actix_web::test]
    async fn test_listing_rating_and_subscription_flow() {
        let state = test_state();
        let alice = bearer_for(&state, "alice").await;
        let bob = bearer_for(&state, "bob").await;
        let app = test::init_service(App::new().configure(|cfg| api::configure_app(cfg, state.clone()))).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/apps")
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"name": "Shor", "type": "algorithm", "visibility": "public"}))
            .to_request();
        let app_id = json_body(test::call_service(&app, req).await).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let listing = json!({"quantum_app_id": app_id, "name": "Shor factoring", "description": "Integer factoring", "price": 9.5});
        let req = test::TestRequest::post()
            .uri("/api/v1/marketplace/listings")
            .insert_header(("Authorization", alice.clone()))
            .set_json(listing.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["status"], "active");
        let listing_id = body["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/api/v1/marketplace/listings")
            .insert_header(("Authorization", alice.clone()))
            .set_json(listing)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get().uri("/api/v1/marketplace/listings/search?q=factoring").to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        assert_eq!(body["meta"]["total_items"], 1);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/marketplace/listings/{}/rate", listing_id))
            .insert_header(("Authorization", bob.clone()))
            .set_json(json!({"rating": 4.0, "comment": "fast"}))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        assert_eq!(body["data"]["rating_count"], 1);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/marketplace/listings/{}/subscribe", listing_id))
            .insert_header(("Authorization", alice))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["errors"][0]["message"], "Cannot subscribe to your own offering");

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/marketplace/listings/{}/subscribe", listing_id))
            .insert_header(("Authorization", bob.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let subscription_id = json_body(resp).await["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/marketplace/subscriptions/{}/cancel", subscription_id))
            .insert_header(("Authorization", bob.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["data"]["status"], "cancelled");

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/marketplace/listings/{}", listing_id))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        assert_eq!(body["data"]["ratings"][0]["comment"], "fast");
    }

    #[actix_web::test]
    async fn test_list_filters_by_status() {
        let state = test_state();
        let alice = bearer_for(&state, "alice").await;
        let app = test::init_service(App::new().configure(|cfg| api::configure_app(cfg, state.clone()))).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/apps")
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"name": "VQE", "type": "algorithm"}))
            .to_request();
        let app_id = json_body(test::call_service(&app, req).await).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let req = test::TestRequest::post()
            .uri("/api/v1/marketplace/listings")
            .insert_header(("Authorization", alice))
            .set_json(json!({"quantum_app_id": app_id, "name": "VQE", "price": 0.0, "status": "pending"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/api/v1/marketplace/listings?status=active").to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        assert_eq!(body["meta"]["total_items"], 0);

        let req = test::TestRequest::get().uri("/api/v1/marketplace/listings?status=pending").to_request();
        let body = json_body(test::call_service(&app, req).await).await;
        assert_eq!(body["meta"]["total_items"], 1);
    }
}
