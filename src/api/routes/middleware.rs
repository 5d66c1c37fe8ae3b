//! # API Middleware
//!
//! - `ProcessTime` : ajoute l'en-tête `X-Process-Time` (secondes) à chaque réponse
//! - `CurrentUser` : extracteur qui résout l'appelant à partir de
//!   `Authorization: Bearer <jwt>` ou de `X-API-Key: <clé>`
//!
//! Le token JWT doit être un token d'accès valide ; une clé API doit être
//! active et non expirée. Dans les deux cas l'utilisateur doit être actif.

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue, AUTHORIZATION},
    web, Error, FromRequest, HttpRequest,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::time::Instant;

use crate::api::AppState;
use crate::core::AuthService;
use crate::domain::User;
use crate::infrastructure::error::AppError;

pub const PROCESS_TIME_HEADER: &str = "x-process-time";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Formate une durée en secondes pour `X-Process-Time`
pub fn process_time_value(started: Instant) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{:.6}", started.elapsed().as_secs_f64())).ok()
}

/// Middleware de mesure du temps de traitement
pub struct ProcessTime;

impl<S, B> Transform<S, ServiceRequest> for ProcessTime
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ProcessTimeService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ProcessTimeService { service })
    }
}

pub struct ProcessTimeService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for ProcessTimeService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut response = fut.await?;
            if let Some(value) = process_time_value(started) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(PROCESS_TIME_HEADER), value);
            }
            Ok(response)
        })
    }
}

/// Utilisateur authentifié de la requête
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim().to_string())
    } else {
        None
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);
        let api_key = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Box::pin(async move {
            let state = state
                .ok_or_else(|| AppError::InternalError("Application state not configured".to_string()))?;
            let auth = AuthService::new(state.db.clone(), state.config.clone());

            let user = match (token, api_key) {
                (Some(token), _) => auth.user_from_token(&token).await?,
                (None, Some(key)) => auth.user_from_api_key(&key).await?,
                (None, None) => return Err(AppError::Unauthorized("Not authenticated".to_string())),
            };
            Ok(CurrentUser(user))
        })
    }
}
