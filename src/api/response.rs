//! Enveloppe des réponses réussies : `{"success": true, "message"?, "data"?, "meta"?}`

use actix_web::HttpResponse;
use serde::Serialize;

use crate::utils::{PaginationMeta, PaginationParams};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, message: None, data: Some(data), meta: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// 200 avec données
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::new(data))
}

/// 201 avec données et message
pub fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::new(data).with_message(message))
}

/// 200 avec un message seul
pub fn message(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::<()> {
        success: true,
        message: Some(message.to_string()),
        data: None,
        meta: None,
    })
}

/// Page d'une liste, avec `meta`
pub fn paginated<T: Serialize>(items: Vec<T>, params: &PaginationParams) -> HttpResponse {
    let (page, meta) = params.paginate(items);
    HttpResponse::Ok().json(ApiResponse {
        success: true,
        message: None,
        data: Some(page),
        meta: Some(meta),
    })
}
