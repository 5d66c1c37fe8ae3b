// utils/mod.rs
pub mod config;
pub mod helpers;
pub mod security;
pub mod telemetry;
pub mod validation;

// Ré-exports pour faciliter l'import
pub use config::{Config, ServiceKind};
pub use helpers::{PaginationMeta, PaginationParams};
pub use security::{
    create_token, verify_token, TokenClaims, TokenType,
    hash_password, verify_password,
    generate_api_key, mask_api_key, sha256_hash,
};
pub use telemetry::setup_tracing;
