//! Relais HTTP vers les services amont (reqwest)

use actix_web::{
    http::{
        header::{HeaderName, HeaderValue},
        StatusCode,
    },
    web, HttpRequest, HttpResponse, Responder,
};
use futures_util::StreamExt;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::{GatewayConfig, Upstream};
use crate::infrastructure::error::{AppError, AppResult};

/// En-têtes propres à une connexion, jamais relayés
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// État partagé du gateway : table de routage et client HTTP
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    client: Client,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config: Arc::new(config), client })
    }
}

/// Santé du gateway lui-même
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "api-gateway",
    }))
}

/// Relaye la requête vers le service propriétaire du chemin
async fn forward(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<GatewayState>,
) -> AppResult<HttpResponse> {
    let upstream = state
        .config
        .resolve(req.path())
        .ok_or_else(|| AppError::NotFound(format!("Route {}", req.path())))?;
    let body = read_body(payload, &state.config).await?;

    let url = match req.query_string() {
        "" => format!("{}{}", upstream.base_url, req.path()),
        query => format!("{}{}?{}", upstream.base_url, req.path(), query),
    };
    debug!("➡️ {} {} -> {}", req.method(), req.path(), url);

    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .map_err(|_| AppError::BadRequest(format!("Unsupported method {}", req.method())))?;

    let mut outgoing = state
        .client
        .request(method, &url)
        .headers(request_headers(&req))
        .body(body.to_vec());
    if let Some(peer) = req.connection_info().realip_remote_addr() {
        outgoing = outgoing.header("x-forwarded-for", peer);
    }

    let response = outgoing.send().await.map_err(|e| unavailable(upstream, e))?;
    relay_response(response, upstream).await
}

/// Lit le corps de la requête, plafonné à `GATEWAY_MAX_BODY_MB`
async fn read_body(mut payload: web::Payload, config: &GatewayConfig) -> AppResult<web::Bytes> {
    let limit = config.max_body_bytes();
    let mut body = web::BytesMut::new();

    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;
        if body.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "Request body exceeds the maximum size of {} MB",
                config.max_body_mb
            )));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body.freeze())
}

fn unavailable(upstream: &Upstream, error: reqwest::Error) -> AppError {
    if error.is_timeout() {
        warn!("⏱️ {} service: délai dépassé", upstream.label);
        AppError::Timeout(format!("{} service timed out", upstream.label))
    } else {
        error!("❌ {} service injoignable: {}", upstream.label, error);
        AppError::ServiceUnavailable(upstream.label.clone())
    }
}

/// En-têtes de bout en bout de la requête entrante
fn request_headers(req: &HttpRequest) -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in req.headers() {
        if is_hop_by_hop(name.as_str()) || name.as_str() == "host" || name.as_str() == "content-length" {
            continue;
        }
        let name = reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes());
        let value = reqwest::header::HeaderValue::from_bytes(value.as_bytes());
        if let (Ok(name), Ok(value)) = (name, value) {
            headers.append(name, value);
        }
    }
    headers
}

async fn relay_response(response: reqwest::Response, upstream: &Upstream) -> AppResult<HttpResponse> {
    let status = StatusCode::from_u16(response.status().as_u16())
        .map_err(|_| AppError::ServiceUnavailable(upstream.label.clone()))?;

    let mut builder = HttpResponse::build(status);
    for (name, value) in response.headers() {
        if is_hop_by_hop(name.as_str()) || name.as_str() == "content-length" {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_str().as_bytes());
        let value = HeaderValue::from_bytes(value.as_bytes());
        if let (Ok(name), Ok(value)) = (name, value) {
            builder.append_header((name, value));
        }
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| unavailable(upstream, e))?;
    Ok(builder.body(body))
}

/// Routes du gateway : santé puis relais de tout le reste
pub fn configure(cfg: &mut web::ServiceConfig, state: GatewayState) {
    cfg.app_data(web::Data::new(state))
        .service(web::resource("/api/health").route(web::get().to(health_check)))
        .default_service(web::to(forward));
}
