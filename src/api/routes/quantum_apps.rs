//! # Quantum App Routes
//!
//! CRUD des applications, gestion des versions, téléversement et
//! téléchargement des paquets zip, publication dans le registre.
//!
//! Les applications publiques sont lisibles par tout utilisateur authentifié ;
//! les écritures sont réservées au développeur.

use actix_multipart::Multipart;
use actix_web::{delete, get, http::header, post, put, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::routes::middleware::CurrentUser;
use crate::api::routes::upload::read_multipart;
use crate::api::{response, AppState};
use crate::core::quantum_app_service::{
    CreateAppRequest, CreateVersionRequest, UpdateAppRequest, UpdateVersionStatusRequest,
};
use crate::core::QuantumAppService;
use crate::infrastructure::error::{AppError, AppResult};
use crate::utils::PaginationParams;

fn service(state: &AppState) -> QuantumAppService {
    QuantumAppService::new(state.db.clone(), state.config.clone())
}

#[derive(Debug, Deserialize)]
pub struct AppListQuery {
    pub user_id: Option<Uuid>,
}

/// `attachment` avec un nom ASCII de repli et le nom complet encodé (RFC 5987)
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

#[post("/apps")]
pub async fn create_app(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<CreateAppRequest>,
) -> AppResult<HttpResponse> {
    let app = service(&state).create_app(user.id, payload.into_inner()).await?;
    Ok(response::created("Quantum app created", app))
}

#[get("/apps")]
pub async fn list_apps(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    query: web::Query<AppListQuery>,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let developer_id = query.user_id.unwrap_or(user.id);
    let apps = service(&state).list_apps(user.id, developer_id).await?;
    Ok(response::paginated(apps, &pagination))
}

/// Téléversement d'un paquet zip (champ `file`)
#[post("/apps/upload")]
pub async fn upload_app_package(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = read_multipart(payload, state.config.max_upload_bytes()).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let outcome = service(&state)
        .upload_package(user.id, &file.filename, file.data)
        .await?;
    let message = if outcome.created {
        "Quantum app created from package"
    } else {
        "New version added from package"
    };
    Ok(response::created(message, outcome))
}

#[get("/apps/{id}")]
pub async fn get_app(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let details = service(&state).get_app(user.id, path.into_inner()).await?;
    Ok(response::ok(details))
}

#[put("/apps/{id}")]
pub async fn update_app(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateAppRequest>,
) -> AppResult<HttpResponse> {
    let app = service(&state)
        .update_app(user.id, path.into_inner(), payload.into_inner())
        .await?;
    Ok(response::ok(app))
}

#[delete("/apps/{id}")]
pub async fn delete_app(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    service(&state).delete_app(user.id, path.into_inner()).await?;
    Ok(response::message("Quantum app deleted"))
}

#[post("/apps/{id}/publish")]
pub async fn publish_app(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let item = service(&state).publish(user.id, path.into_inner()).await?;
    Ok(response::created("Quantum app published to the registry", item))
}

#[post("/apps/{id}/versions")]
pub async fn create_version(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<CreateVersionRequest>,
) -> AppResult<HttpResponse> {
    let version = service(&state)
        .create_version(user.id, path.into_inner(), payload.into_inner())
        .await?;
    Ok(response::created("Version created", version))
}

#[get("/apps/{id}/versions")]
pub async fn list_versions(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let versions = service(&state).list_versions(user.id, path.into_inner()).await?;
    Ok(response::paginated(versions, &pagination))
}

#[get("/apps/{id}/versions/{version_id}")]
pub async fn get_version(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (app_id, version_id) = path.into_inner();
    let version = service(&state).get_version(user.id, app_id, version_id).await?;
    Ok(response::ok(version))
}

#[put("/apps/{id}/versions/{version_id}/status")]
pub async fn update_version_status(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<(Uuid, Uuid)>,
    payload: web::Json<UpdateVersionStatusRequest>,
) -> AppResult<HttpResponse> {
    let (app_id, version_id) = path.into_inner();
    let version = service(&state)
        .update_version_status(user.id, app_id, version_id, payload.into_inner())
        .await?;
    Ok(response::ok(version))
}

#[get("/apps/{id}/versions/{version_id}/download")]
pub async fn download_version(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (app_id, version_id) = path.into_inner();
    let package = service(&state).download(user.id, app_id, version_id).await?;

    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header((header::CONTENT_DISPOSITION, content_disposition(&package.filename)))
        .body(package.data))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_app)
        .service(list_apps)
        .service(upload_app_package)
        .service(get_app)
        .service(update_app)
        .service(delete_app)
        .service(publish_app)
        .service(create_version)
        .service(list_versions)
        .service(get_version)
        .service(update_version_status)
        .service(download_version);
}
