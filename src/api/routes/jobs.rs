use actix_web::{get, post, put, web, HttpResponse};
use uuid::Uuid;

use crate::api::routes::middleware::CurrentUser;
use crate::api::{response, AppState};
use crate::core::job_service::{CreateJobRequest, SubmitResultRequest, UpdateJobStatusRequest};
use crate::core::JobService;
use crate::infrastructure::error::AppResult;
use crate::utils::PaginationParams;

fn service(state: &AppState) -> JobService {
    JobService::new(state.db.clone())
}

/// Crée un job d'exécution
#[post("/jobs")]
pub async fn create_job(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<CreateJobRequest>,
) -> AppResult<HttpResponse> {
    let job = service(&state).create(user.id, payload.into_inner()).await?;
    Ok(response::created("Job created", job))
}

/// Liste les jobs de l'utilisateur
#[get("/jobs")]
pub async fn list_jobs(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    pagination: web::Query<PaginationParams>,
) -> AppResult<HttpResponse> {
    let jobs = service(&state).list(user.id).await?;
    Ok(response::paginated(jobs, &pagination))
}

/// Récupère un job et son résultat
#[get("/jobs/{id}")]
pub async fn get_job(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let details = service(&state).get(user.id, path.into_inner()).await?;
    Ok(response::ok(details))
}

#[post("/jobs/{id}/cancel")]
pub async fn cancel_job(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let job = service(&state).cancel(user.id, path.into_inner()).await?;
    Ok(response::ok(job))
}

#[put("/jobs/{id}/status")]
pub async fn update_job_status(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateJobStatusRequest>,
) -> AppResult<HttpResponse> {
    let job = service(&state)
        .update_status(user.id, path.into_inner(), payload.into_inner())
        .await?;
    Ok(response::ok(job))
}

#[post("/jobs/{id}/result")]
pub async fn submit_job_result(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<SubmitResultRequest>,
) -> AppResult<HttpResponse> {
    let details = service(&state)
        .submit_result(user.id, path.into_inner(), payload.into_inner())
        .await?;
    Ok(response::created("Job result recorded", details))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_job)
        .service(list_jobs)
        .service(get_job)
        .service(cancel_job)
        .service(update_job_status)
        .service(submit_job_result);
}
