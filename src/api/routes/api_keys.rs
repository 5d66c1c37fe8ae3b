use actix_web::{delete, get, post, put, web, HttpResponse};
use uuid::Uuid;

use crate::api::routes::middleware::CurrentUser;
use crate::api::{response, AppState};
use crate::core::api_key_service::{CreateApiKeyRequest, UpdateApiKeyRequest};
use crate::core::ApiKeyService;
use crate::infrastructure::error::AppResult;
use crate::utils::PaginationParams;

fn service(state: &AppState) -> ApiKeyService {
    ApiKeyService::new(state.db.clone(), state.config.clone())
}

#[post("/api-keys")]
pub async fn create_api_key(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<CreateApiKeyRequest>,
) -> AppResult<HttpResponse> {
    let key = service(&state).create(user.id, payload.into_inner()).await?;
    Ok(response::created("API key created", key))
}

#[get("/api-keys")]
pub async fn list_api_keys(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let keys = service(&state).list(user.id).await?;
    Ok(response::paginated(keys, &pagination))
}

#[get("/api-keys/{id}")]
pub async fn get_api_key(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let key = service(&state).get(user.id, path.into_inner()).await?;
    Ok(response::ok(key))
}

#[put("/api-keys/{id}")]
pub async fn update_api_key(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateApiKeyRequest>,
) -> AppResult<HttpResponse> {
    let key = service(&state)
        .update(user.id, path.into_inner(), payload.into_inner())
        .await?;
    Ok(response::ok(key))
}

#[delete("/api-keys/{id}")]
pub async fn delete_api_key(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    service(&state).delete(user.id, path.into_inner()).await?;
    Ok(response::message("API key deleted"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_api_key)
        .service(list_api_keys)
        .service(get_api_key)
        .service(update_api_key)
        .service(delete_api_key);
}
