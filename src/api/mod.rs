pub mod response;
pub mod routes;

use actix_web::{error::InternalError, web, HttpRequest, HttpResponse, Responder};
use std::sync::Arc;

use crate::infrastructure::database::Database;
use crate::infrastructure::error::{AppError, ErrorEnvelope};
use crate::utils::{Config, ServiceKind};

/// État partagé entre les handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        Self { db, config }
    }
}

/// Erreur d'extraction (JSON, formulaire, query, chemin) rendue dans l'enveloppe standard
fn extractor_error(err: impl std::fmt::Display, error: AppError) -> actix_web::Error {
    let response = HttpResponse::build(error.status_code()).json(ErrorEnvelope::from_error(&error));
    InternalError::from_response(err.to_string(), response).into()
}

/// Configure l'application complète : état, extracteurs, services activés et santé
pub fn configure_app(cfg: &mut web::ServiceConfig, state: web::Data<AppState>) {
    let upload_limit = state.config.max_upload_bytes();

    cfg.app_data(state.clone())
        .app_data(web::JsonConfig::default().limit(upload_limit).error_handler(|err, _| {
            let message = err.to_string();
            extractor_error(err, AppError::BadRequest(message))
        }))
        .app_data(web::FormConfig::default().error_handler(|err, _| {
            let message = err.to_string();
            extractor_error(err, AppError::BadRequest(message))
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _| {
            let message = err.to_string();
            extractor_error(err, AppError::BadRequest(message))
        }))
        .app_data(web::PathConfig::default().error_handler(|err, _| {
            extractor_error(err, AppError::NotFound("Resource".to_string()))
        }));

    config(cfg, &state.config);
    cfg.default_service(web::route().to(not_found));
}

/// Configure les routes des services activés
pub fn config(cfg: &mut web::ServiceConfig, settings: &Config) {
    let mut scope = web::scope("/api/v1");

    for service in &settings.enabled_services {
        scope = match service {
            ServiceKind::Auth => scope
                .configure(routes::auth::configure)
                .configure(routes::api_keys::configure),
            ServiceKind::Project => scope.configure(routes::projects::configure),
            ServiceKind::QuantumApp => scope.configure(routes::quantum_apps::configure),
            ServiceKind::Registry => scope.configure(routes::registry::configure),
            ServiceKind::Marketplace => scope.configure(routes::marketplace::configure),
            ServiceKind::Job => scope.configure(routes::jobs::configure),
        };
    }

    cfg.service(scope);
    cfg.service(web::resource("/health").route(web::get().to(health_check)));
}

/// Endpoint de santé pour les probes
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Route inconnue : 404 dans l'enveloppe standard
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound(format!("Route {}", req.path())))
}
