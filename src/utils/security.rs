// utils/security.rs
use crate::infrastructure::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Préfixe des clés API du hub
pub const API_KEY_PREFIX: &str = "qh";

/// Nature d'un token JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims JWT communs aux tokens d'accès et de rafraîchissement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: Uuid,          // User ID
    pub username: String,
    pub token_type: TokenType,
    pub exp: usize,         // Expiration timestamp
    pub iat: usize,         // Issued at timestamp
    pub jti: String,        // Token ID
}

/// Générer un token JWT signé (HS256)
pub fn create_token(
    user_id: Uuid,
    username: &str,
    token_type: TokenType,
    ttl: Duration,
    secret: &str,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id,
        username: username.to_string(),
        token_type,
        exp: (now + ttl).timestamp() as usize,
        iat: now.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Failed to generate token: {}", e)))
}

/// Vérifier un token et son type attendu
pub fn verify_token(token: &str, expected: TokenType, secret: &str) -> AppResult<TokenClaims> {
    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Could not validate credentials".to_string()))?;

    if data.claims.token_type != expected {
        return Err(AppError::Unauthorized("Invalid token type".to_string()));
    }

    Ok(data.claims)
}

/// Générer un hash de mot de passe avec Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
        Argon2,
    };

    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
}

/// Vérifier un mot de passe contre un hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    use argon2::{
        password_hash::{PasswordHash, PasswordVerifier},
        Argon2,
    };

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::InternalError(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Générer une clé API (`qh_` suivi de 32 caractères alphanumériques)
pub fn generate_api_key() -> String {
    format!("{}_{}", API_KEY_PREFIX, generate_random_string(32))
}

/// Masquer une clé API pour l'affichage : seul le suffixe reste lisible
pub fn mask_api_key(key: &str) -> String {
    let prefix = format!("{}_", API_KEY_PREFIX);
    let body = key.strip_prefix(&prefix).unwrap_or(key);
    let visible = body.len().min(4);
    let (hidden, tail) = body.split_at(body.len() - visible);
    format!("{}{}{}", prefix, "*".repeat(hidden.len()), tail)
}

/// Générer une chaîne aléatoire
pub fn generate_random_string(length: usize) -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Calculer un hash SHA256
pub fn sha256_hash(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
