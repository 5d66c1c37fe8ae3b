use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use serde_json::Value;
use sqlx::Error as SqlxError;
use validator::ValidationErrors;

pub type AppResult<T> = Result<T, AppError>;

/// Erreurs du hub, chacune associée à un statut HTTP et à un message client
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Token ou clé API absent, invalide ou expiré
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Appelant authentifié mais pas propriétaire
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Le nom de la ressource, sans suffixe : `NotFound("App")`
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Échec des règles `validator`, détaillé champ par champ (422)
    #[error("validation: {0}")]
    ValidationError(ValidationErrors),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Paquet d'application refusé, avec la liste complète des problèmes (400)
    #[error("invalid package: {}", .0.join("; "))]
    InvalidPackage(Vec<String>),

    /// Paquet ou corps au-delà de la limite configurée (413)
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal: {0}")]
    InternalError(String),

    #[error("database: {0}")]
    DatabaseError(SqlxError),

    #[error("serialization: {0}")]
    SerializationError(serde_json::Error),

    /// Variable d'environnement manquante ou illisible
    #[error("configuration: {0}")]
    ConfigurationError(String),

    /// Service amont injoignable, nommé par son libellé (503)
    #[error("{0} service unavailable")]
    ServiceUnavailable(String),

    /// Délai dépassé côté amont (504)
    #[error("timeout: {0}")]
    Timeout(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) | AppError::InvalidPackage(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InternalError(_)
            | AppError::DatabaseError(_)
            | AppError::SerializationError(_)
            | AppError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Message renvoyé au client (les détails internes restent dans les logs)
    pub fn client_message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Timeout(msg) => msg.clone(),
            AppError::NotFound(resource) => format!("{} not found", resource),
            AppError::ValidationError(_) => "Validation failed".to_string(),
            AppError::InvalidPackage(_) => "Invalid package".to_string(),
            AppError::ServiceUnavailable(service) => format!("{} service unavailable", service),
            AppError::InternalError(_)
            | AppError::DatabaseError(_)
            | AppError::SerializationError(_)
            | AppError::ConfigurationError(_) => "Internal server error".to_string(),
        }
    }

    /// Détails structurés joints à l'erreur
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let fields: serde_json::Map<String, Value> = errors
                    .field_errors()
                    .iter()
                    .map(|(field, errs)| {
                        let messages: Vec<Value> = errs
                            .iter()
                            .map(|err| {
                                Value::String(
                                    err.message
                                        .as_ref()
                                        .map(|m| m.to_string())
                                        .unwrap_or_else(|| err.code.to_string()),
                                )
                            })
                            .collect();
                        (field.to_string(), Value::Array(messages))
                    })
                    .collect();
                Some(Value::Object(fields))
            }
            AppError::InvalidPackage(errors) => Some(serde_json::json!({ "errors": errors })),
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        } else {
            tracing::debug!("⚠️ {}", self);
        }

        HttpResponse::build(status).json(ErrorEnvelope::from_error(self))
    }
}

/// Détail d'une erreur dans l'enveloppe
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub status_code: u16,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Enveloppe d'erreur standardisée
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub errors: Vec<ErrorDetail>,
    pub data: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            errors: vec![ErrorDetail {
                status_code: status.as_u16(),
                error: status.canonical_reason().unwrap_or("Error").to_string(),
                message: message.into(),
                details,
            }],
            data: None,
        }
    }

    pub fn from_error(error: &AppError) -> Self {
        Self::new(error.status_code(), error.client_message(), error.details())
    }
}

/// Code PostgreSQL d'une violation d'unicité
const UNIQUE_VIOLATION: &str = "23505";

impl From<SqlxError> for AppError {
    fn from(error: SqlxError) -> Self {
        let unique_violation = error
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code == UNIQUE_VIOLATION)
            .unwrap_or(false);

        match error {
            SqlxError::RowNotFound => AppError::NotFound("Resource".to_string()),
            _ if unique_violation => AppError::Conflict("Resource already exists".to_string()),
            other => AppError::DatabaseError(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::ConfigurationError(format!("Migration failed: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::SerializationError(error)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors)
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::InternalError(format!("IO error: {}", error))
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(_: zip::result::ZipError) -> Self {
        AppError::InvalidPackage(vec!["Invalid zip file".to_string()])
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid multipart payload: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            AppError::Timeout("Upstream request timeout".to_string())
        } else {
            AppError::InternalError(format!("HTTP request error: {}", error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_error_envelope_shape() {
        let response = AppError::NotFound("Project".to_string()).error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_json_diff::assert_json_eq!(
            json,
            serde_json::json!({
                "success": false,
                "errors": [{
                    "status_code": 404,
                    "error": "Not Found",
                    "message": "Project not found"
                }],
                "data": null
            })
        );
    }

    #[actix_web::test]
    async fn test_invalid_package_lists_every_problem() {
        let error = AppError::InvalidPackage(vec![
            "Missing quantum_manifest.json in package".to_string(),
            "No .qasm files found in package".to_string(),
        ]);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);

        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errors"][0]["message"], "Invalid package");
        assert_eq!(json["errors"][0]["details"]["errors"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let error = AppError::InternalError("connection pool exhausted".to_string());
        assert_eq!(error.client_message(), "Internal server error");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
