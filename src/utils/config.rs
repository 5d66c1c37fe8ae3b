// utils/config.rs
use crate::infrastructure::error::{AppError, AppResult};
use dotenv::dotenv;
use std::env;
use std::str::FromStr;

/// Services HTTP exposés par le binaire principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Auth,
    Project,
    QuantumApp,
    Registry,
    Marketplace,
    Job,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 6] = [
        ServiceKind::Auth,
        ServiceKind::Project,
        ServiceKind::QuantumApp,
        ServiceKind::Registry,
        ServiceKind::Marketplace,
        ServiceKind::Job,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Auth => "auth",
            ServiceKind::Project => "project",
            ServiceKind::QuantumApp => "quantum-app",
            ServiceKind::Registry => "registry",
            ServiceKind::Marketplace => "marketplace",
            ServiceKind::Job => "job",
        }
    }
}

impl FromStr for ServiceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "auth" => Ok(ServiceKind::Auth),
            "project" | "projects" => Ok(ServiceKind::Project),
            "quantum-app" | "apps" => Ok(ServiceKind::QuantumApp),
            "registry" => Ok(ServiceKind::Registry),
            "marketplace" => Ok(ServiceKind::Marketplace),
            "job" | "jobs" => Ok(ServiceKind::Job),
            other => Err(AppError::ConfigurationError(format!(
                "Service inconnu dans ENABLED_SERVICES: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Serveur
    pub service_name: String,
    pub server_host: String,
    pub server_port: u16,
    pub workers: usize,

    // Base de données
    pub database_url: String,
    pub database_max_connections: u32,

    // Sécurité
    pub jwt_secret: String,
    pub jwt_access_token_expiry_minutes: i64,
    pub jwt_refresh_token_expiry_days: i64,
    pub api_key_expiry_days: i64,

    // Paquets
    pub max_upload_size_mb: usize,

    // Services actifs et maintenance
    pub enabled_services: Vec<ServiceKind>,
    pub expiry_sweep_interval_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "quantum-hub".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            workers: 4,
            database_url: "memory".to_string(),
            database_max_connections: 10,
            jwt_secret: "change-me-in-production-please-32chars".to_string(),
            jwt_access_token_expiry_minutes: 30,
            jwt_refresh_token_expiry_days: 7,
            api_key_expiry_days: 90,
            max_upload_size_mb: 50,
            enabled_services: ServiceKind::ALL.to_vec(),
            expiry_sweep_interval_seconds: 300,
        }
    }
}

impl Config {
    /// Charger la configuration depuis les variables d'environnement
    pub fn from_env() -> AppResult<Self> {
        // Charger le fichier .env si présent
        dotenv().ok();

        let defaults = Config::default();

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            AppError::ConfigurationError(
                "Variable d'environnement requise manquante: JWT_SECRET".to_string(),
            )
        })?;

        let enabled_services = match env::var("ENABLED_SERVICES") {
            Ok(raw) if !raw.trim().is_empty() && raw.trim() != "all" => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(ServiceKind::from_str)
                .collect::<AppResult<Vec<_>>>()?,
            _ => defaults.enabled_services.clone(),
        };

        Ok(Config {
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", "8000")?,
            workers: parse_var("WORKERS", "4")?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
            jwt_secret,
            jwt_access_token_expiry_minutes: parse_var("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", "30")?,
            jwt_refresh_token_expiry_days: parse_var("JWT_REFRESH_TOKEN_EXPIRY_DAYS", "7")?,
            api_key_expiry_days: parse_var("API_KEY_EXPIRY_DAYS", "90")?,
            max_upload_size_mb: parse_var("MAX_UPLOAD_SIZE_MB", "50")?,
            enabled_services,
            expiry_sweep_interval_seconds: parse_var("EXPIRY_SWEEP_INTERVAL_SECONDS", "300")?,
        })
    }

    /// Taille maximale d'un paquet en octets
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb * 1024 * 1024
    }

    pub fn is_enabled(&self, service: ServiceKind) -> bool {
        self.enabled_services.contains(&service)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == "memory"
    }
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> AppResult<T> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| AppError::ConfigurationError(format!("{} must be a number", name)))
}
