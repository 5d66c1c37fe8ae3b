//! Registre public : lecture ouverte, écriture authentifiée

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::routes::middleware::CurrentUser;
use crate::api::{response, AppState};
use crate::core::registry_service::{CreateRegistryItemRequest, UpdateRegistryItemRequest};
use crate::core::RegistryService;
use crate::infrastructure::error::AppResult;
use crate::utils::PaginationParams;

fn service(state: &AppState) -> RegistryService {
    RegistryService::new(state.db.clone())
}

#[derive(Debug, Deserialize)]
pub struct RegistryListQuery {
    pub provider_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[post("/registry")]
pub async fn create_item(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<CreateRegistryItemRequest>,
) -> AppResult<HttpResponse> {
    let item = service(&state).create(user.id, payload.into_inner()).await?;
    Ok(response::created("Registry item created", item))
}

#[get("/registry")]
pub async fn list_items(
    state: web::Data<AppState>,
    query: web::Query<RegistryListQuery>,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let items = service(&state).list(query.provider_id).await?;
    Ok(response::paginated(items, &pagination))
}

#[get("/registry/search")]
pub async fn search_items(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let items = service(&state).search(&query.q).await?;
    Ok(response::paginated(items, &pagination))
}

#[get("/registry/versions/{name}")]
pub async fn item_versions(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let items = service(&state).versions(&path.into_inner()).await?;
    Ok(response::ok(items))
}

#[get("/registry/{id}")]
pub async fn get_item(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let item = service(&state).get(path.into_inner()).await?;
    Ok(response::ok(item))
}

#[put("/registry/{id}")]
pub async fn update_item(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateRegistryItemRequest>,
) -> AppResult<HttpResponse> {
    let item = service(&state)
        .update(user.id, path.into_inner(), payload.into_inner())
        .await?;
    Ok(response::ok(item))
}

#[delete("/registry/{id}")]
pub async fn delete_item(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    service(&state).delete(user.id, path.into_inner()).await?;
    Ok(response::message("Registry item deleted"))
}

/// `/search` et `/versions/{name}` passent avant `/{id}`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_item)
        .service(list_items)
        .service(search_items)
        .service(item_versions)
        .service(get_item)
        .service(update_item)
        .service(delete_item);
}
