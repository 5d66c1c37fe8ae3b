//! # API Gateway
//!
//! Point d'entrée unique devant les services : chaque requête `/api/v1/...`
//! est relayée vers le service propriétaire du préfixe le plus long.
//!
//! | Préfixe | Service |
//! |---|---|
//! | `/api/v1/auth`, `/api/v1/users`, `/api/v1/api-keys` | auth |
//! | `/api/v1/projects` | project |
//! | `/api/v1/apps` | quantum-app |
//! | `/api/v1/registry` | registry |
//! | `/api/v1/marketplace` | marketplace |
//! | `/api/v1/jobs` | job |
//!
//! Un préfixe inconnu donne un 404, un service injoignable un 503.

pub mod proxy;

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::infrastructure::error::{AppError, AppResult};

pub use proxy::{configure, GatewayState};

/// Service amont et préfixes qu'il possède
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Nom affiché dans les erreurs (`Auth service unavailable`)
    pub label: String,
    pub base_url: String,
    pub prefixes: Vec<String>,
}

impl Upstream {
    pub fn new(label: &str, base_url: impl Into<String>, prefixes: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
    pub max_body_mb: usize,
    pub upstreams: Vec<Upstream>,
}

impl GatewayConfig {
    /// Table de routage par défaut à partir des URLs des services
    pub fn with_urls(
        auth: &str,
        project: &str,
        quantum_app: &str,
        registry: &str,
        marketplace: &str,
        job: &str,
    ) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_seconds: 30,
            max_body_mb: 50,
            upstreams: vec![
                Upstream::new("Auth", auth, &["/api/v1/auth", "/api/v1/users", "/api/v1/api-keys"]),
                Upstream::new("Project", project, &["/api/v1/projects"]),
                Upstream::new("Quantum app", quantum_app, &["/api/v1/apps"]),
                Upstream::new("Registry", registry, &["/api/v1/registry"]),
                Upstream::new("Marketplace", marketplace, &["/api/v1/marketplace"]),
                Upstream::new("Job", job, &["/api/v1/jobs"]),
            ],
        }
    }

    /// Charger la configuration depuis les variables d'environnement
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let url = |name: &str, default: &str| env::var(name).unwrap_or_else(|_| default.to_string());
        let mut config = Self::with_urls(
            &url("AUTH_SERVICE_URL", "http://localhost:8001"),
            &url("PROJECT_SERVICE_URL", "http://localhost:8002"),
            &url("QUANTUM_APP_SERVICE_URL", "http://localhost:8003"),
            &url("REGISTRY_SERVICE_URL", "http://localhost:8004"),
            &url("MARKETPLACE_SERVICE_URL", "http://localhost:8005"),
            &url("JOB_SERVICE_URL", "http://localhost:8006"),
        );

        config.host = env::var("GATEWAY_HOST").unwrap_or(config.host);
        config.port = parse_var("GATEWAY_PORT", config.port)?;
        config.timeout_seconds = parse_var("GATEWAY_TIMEOUT_SECONDS", config.timeout_seconds)?;
        config.max_body_mb = parse_var("GATEWAY_MAX_BODY_MB", config.max_body_mb)?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb * 1024 * 1024
    }

    /// Service propriétaire du chemin : préfixe le plus long, aligné sur un segment
    pub fn resolve(&self, path: &str) -> Option<&Upstream> {
        self.upstreams
            .iter()
            .flat_map(|u| u.prefixes.iter().map(move |p| (p.as_str(), u)))
            .filter(|(prefix, _)| {
                path == *prefix
                    || path
                        .strip_prefix(prefix)
                        .map(|rest| rest.starts_with('/'))
                        .unwrap_or(false)
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, upstream)| upstream)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::ConfigurationError(format!("{} must be a number", name))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig::with_urls(
            "http://auth:8001/",
            "http://project:8002",
            "http://apps:8003",
            "http://registry:8004",
            "http://market:8005",
            "http://jobs:8006",
        )
    }

    #[test]
    fn test_resolve_by_prefix() {
        let config = config();
        assert_eq!(config.resolve("/api/v1/auth/login").map(|u| u.label.as_str()), Some("Auth"));
        assert_eq!(config.resolve("/api/v1/users/me").map(|u| u.label.as_str()), Some("Auth"));
        assert_eq!(config.resolve("/api/v1/apps").map(|u| u.label.as_str()), Some("Quantum app"));
        assert_eq!(
            config.resolve("/api/v1/marketplace/listings/search").map(|u| u.label.as_str()),
            Some("Marketplace")
        );
        assert_eq!(config.resolve("/api/v1/jobs/42/cancel").map(|u| u.base_url.as_str()), Some("http://jobs:8006"));
    }

    #[test]
    fn test_resolve_respects_segment_boundaries() {
        let config = config();
        assert!(config.resolve("/api/v1/applications").is_none());
        assert!(config.resolve("/api/v1").is_none());
        assert!(config.resolve("/health").is_none());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut config = config();
        config
            .upstreams
            .push(Upstream::new("Search", "http://search:9000", &["/api/v1/registry/search"]));

        assert_eq!(config.resolve("/api/v1/registry/search").map(|u| u.label.as_str()), Some("Search"));
        assert_eq!(config.resolve("/api/v1/registry/42").map(|u| u.label.as_str()), Some("Registry"));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        assert_eq!(config().upstreams[0].base_url, "http://auth:8001");
    }
}
