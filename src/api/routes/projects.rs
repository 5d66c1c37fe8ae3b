//! Routes des projets et de leur publication comme application quantique

use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse};
use uuid::Uuid;

use crate::api::routes::middleware::CurrentUser;
use crate::api::routes::upload::read_multipart;
use crate::api::{response, AppState};
use crate::core::project_service::{
    CreateProjectRequest, ProjectRelease, ReleasePackage, UpdateProjectRequest,
};
use crate::core::ProjectService;
use crate::infrastructure::error::{AppError, AppResult};
use crate::utils::PaginationParams;

fn service(state: &AppState) -> ProjectService {
    ProjectService::new(state.db.clone(), state.config.clone())
}

#[post("/projects")]
pub async fn create_project(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<CreateProjectRequest>,
) -> AppResult<HttpResponse> {
    let project = service(&state).create(user.id, payload.into_inner()).await?;
    Ok(response::created("Project created", project))
}

#[get("/projects")]
pub async fn list_projects(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let projects = service(&state).list(user.id).await?;
    Ok(response::paginated(projects, &pagination))
}

#[get("/projects/{id}")]
pub async fn get_project(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let project = service(&state).get(user.id, path.into_inner()).await?;
    Ok(response::ok(project))
}

#[put("/projects/{id}")]
pub async fn update_project(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateProjectRequest>,
) -> AppResult<HttpResponse> {
    let project = service(&state)
        .update(user.id, path.into_inner(), payload.into_inner())
        .await?;
    Ok(response::ok(project))
}

#[delete("/projects/{id}")]
pub async fn delete_project(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    service(&state).delete(user.id, path.into_inner()).await?;
    Ok(response::message("Project deleted"))
}

#[post("/projects/{id}/release")]
pub async fn release_project(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<ProjectRelease>,
) -> AppResult<HttpResponse> {
    let outcome = service(&state)
        .release(user.id, path.into_inner(), payload.into_inner(), None)
        .await?;
    Ok(response::created("Project released", outcome))
}

/// Publication multipart : champ `release` (JSON) et champ `file` (paquet zip)
#[post("/projects/{id}/release/upload")]
pub async fn release_project_upload(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = read_multipart(payload, state.config.max_upload_bytes()).await?;

    let raw = form
        .field("release")
        .ok_or_else(|| AppError::BadRequest("Missing release field".to_string()))?;
    let release: ProjectRelease = serde_json::from_str(raw)
        .map_err(|e| AppError::BadRequest(format!("Invalid release field: {}", e)))?;
    let package = form
        .take_file("file")
        .map(|file| ReleasePackage { filename: file.filename, data: file.data });

    let outcome = service(&state)
        .release(user.id, path.into_inner(), release, package)
        .await?;
    Ok(response::created("Project released", outcome))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_project)
        .service(list_projects)
        .service(get_project)
        .service(update_project)
        .service(delete_project)
        .service(release_project)
        .service(release_project_upload);
}

#[cfg(test)]
mod tests {
    use crate::api;
    use crate::api::routes::upload::tests::{content_type, multipart_body};
    use crate::api::tests::{bearer_for, json_body, test_state};
    use crate::core::package::tests::bell_package;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    fn release(version: &str) -> Value {
        json!({
            "name": "Bell",
            "type": "circuit",
            "version_number": version,
            "sdk_used": "qiskit",
            "visibility": "public",
        })
    }

    #[actix_web::test]
    async fn test_project_release_flow() {
        let state = test_state();
        let auth = bearer_for(&state, "alice").await;
        let app = test::init_service(App::new().configure(|cfg| api::configure_app(cfg, state.clone()))).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/projects")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({"name": "bell", "repo": "https://github.com/acme/bell"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let project_id = json_body(resp).await["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/projects/{}/release", project_id))
            .insert_header(("Authorization", auth.clone()))
            .set_json(release("1.0.0"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["project"]["quantum_app_id"], body["data"]["app"]["id"]);
        assert_eq!(body["data"]["version"]["is_latest"], true);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/projects/{}/release", project_id))
            .insert_header(("Authorization", auth))
            .set_json(release("1.0.0"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_multipart_release_with_package() {
        let state = test_state();
        let auth = bearer_for(&state, "alice").await;
        let app = test::init_service(App::new().configure(|cfg| api::configure_app(cfg, state.clone()))).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/projects")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({"name": "bell"}))
            .to_request();
        let project_id = json_body(test::call_service(&app, req).await).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let package = bell_package();
        let release = release("1.0.0").to_string();
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/projects/{}/release/upload", project_id))
            .insert_header(("Authorization", auth))
            .insert_header(content_type())
            .set_payload(multipart_body(&[("file", "bell.zip", package.as_slice())], &[("release", release.as_str())]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["version"]["package_path"], "bell.zip");
        assert!(body["data"]["version"]["package_checksum"].is_string());
    }

    #[actix_web::test]
    async fn test_other_users_project_is_not_found() {
        let state = test_state();
        let alice = bearer_for(&state, "alice").await;
        let bob = bearer_for(&state, "bob").await;
        let app = test::init_service(App::new().configure(|cfg| api::configure_app(cfg, state.clone()))).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/projects")
            .insert_header(("Authorization", alice))
            .set_json(json!({"name": "secret"}))
            .to_request();
        let project_id = json_body(test::call_service(&app, req).await).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/projects/{}", project_id))
            .insert_header(("Authorization", bob))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["errors"][0]["message"], "Project not found");
    }
}
