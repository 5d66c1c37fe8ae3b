// core/auth_service.rs
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::domain::User;
use crate::infrastructure::database::{ApiKeyStore, Database, UserStore};
use crate::infrastructure::error::{AppError, AppResult};
use crate::utils::security::{create_token, hash_password, verify_password, verify_token, TokenType};
use crate::utils::validation::validate_username;
use crate::utils::Config;

/// Requête d'inscription
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 50, message = "Le nom d'utilisateur doit contenir entre 3 et 50 caractères"),
        custom = "validate_username"
    )]
    pub username: String,
    #[validate(email(message = "Format d'email invalide"))]
    pub email: String,
    #[validate(length(min = 8, message = "Le mot de passe doit contenir au moins 8 caractères"))]
    pub password: String,
    pub full_name: Option<String>,
}

/// Identifiants de connexion (nom d'utilisateur ou email)
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Le nom d'utilisateur est requis"))]
    pub username: String,
    #[validate(length(min = 1, message = "Le mot de passe est requis"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Mise à jour du profil courant
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Format d'email invalide"))]
    pub email: Option<String>,
    pub full_name: Option<String>,
    #[validate(length(min = 8, message = "Le mot de passe doit contenir au moins 8 caractères"))]
    pub password: Option<String>,
}

/// Paire de tokens renvoyée après authentification
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// Service d'authentification : comptes, tokens et résolution de l'appelant
pub struct AuthService {
    db: Database,
    config: Arc<Config>,
}

impl AuthService {
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Inscription d'un nouvel utilisateur
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthTokens> {
        request.validate()?;

        if self.db.find_user_by_username(&request.username).await?.is_some() {
            return Err(AppError::BadRequest("Username already registered".to_string()));
        }
        if self.db.find_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::BadRequest("Email already registered".to_string()));
        }

        let user = User::new(
            request.username,
            request.email,
            hash_password(&request.password)?,
            request.full_name,
        );
        let user = self.db.create_user(&user).await?;
        info!("👤 Nouvel utilisateur inscrit: {}", user.username);

        self.issue_tokens(user)
    }

    /// Authentification par nom d'utilisateur (ou email) et mot de passe
    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthTokens> {
        request.validate()?;

        let user = match self.db.find_user_by_username(&request.username).await? {
            Some(user) => Some(user),
            None => self.db.find_user_by_email(&request.username).await?,
        };

        let mut user = match user {
            Some(user) if verify_password(&request.password, &user.hashed_password)? => user,
            _ => {
                warn!("🔐 Échec de connexion pour {}", request.username);
                return Err(AppError::Unauthorized("Incorrect username or password".to_string()));
            }
        };

        if !user.is_active {
            return Err(AppError::BadRequest("Inactive user".to_string()));
        }

        user.touch_login();
        let user = self.db.update_user(&user).await?;
        info!("🔐 Connexion réussie: {}", user.username);

        self.issue_tokens(user)
    }

    /// Échange un refresh token contre une nouvelle paire
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let claims = verify_token(refresh_token, TokenType::Refresh, &self.config.jwt_secret)?;
        let user = self
            .db
            .find_user_by_id(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))?;

        self.issue_tokens(user)
    }

    /// Résout l'utilisateur d'un token d'accès
    pub async fn user_from_token(&self, token: &str) -> AppResult<User> {
        let claims = verify_token(token, TokenType::Access, &self.config.jwt_secret)?;
        let user = self
            .db
            .find_user_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))?;

        Self::ensure_active(user)
    }

    /// Résout l'utilisateur d'une clé API et enregistre son utilisation
    pub async fn user_from_api_key(&self, value: &str) -> AppResult<User> {
        let now = Utc::now();
        let mut key = self
            .db
            .find_api_key_by_value(value)
            .await?
            .filter(|k| k.is_usable_at(now))
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired API key".to_string()))?;

        key.last_used_at = Some(now);
        self.db.update_api_key(&key).await?;

        let user = self
            .db
            .find_user_by_id(key.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired API key".to_string()))?;

        Self::ensure_active(user)
    }

    /// Met à jour l'email, le nom complet ou le mot de passe
    pub async fn update_profile(&self, mut user: User, request: UpdateUserRequest) -> AppResult<User> {
        request.validate()?;

        if let Some(email) = request.email {
            if !email.eq_ignore_ascii_case(&user.email) {
                let taken = self.db.find_user_by_email(&email).await?;
                if taken.map(|other| other.id != user.id).unwrap_or(false) {
                    return Err(AppError::BadRequest("Email already registered".to_string()));
                }
            }
            user.email = email;
        }
        if let Some(full_name) = request.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(password) = request.password {
            user.hashed_password = hash_password(&password)?;
        }
        user.updated_at = Utc::now();

        self.db.update_user(&user).await
    }

    fn ensure_active(user: User) -> AppResult<User> {
        if user.is_active {
            Ok(user)
        } else {
            Err(AppError::BadRequest("Inactive user".to_string()))
        }
    }

    fn issue_tokens(&self, user: User) -> AppResult<AuthTokens> {
        let access_ttl = Duration::minutes(self.config.jwt_access_token_expiry_minutes);
        let refresh_ttl = Duration::days(self.config.jwt_refresh_token_expiry_days);

        Ok(AuthTokens {
            access_token: create_token(
                user.id,
                &user.username,
                TokenType::Access,
                access_ttl,
                &self.config.jwt_secret,
            )?,
            refresh_token: create_token(
                user.id,
                &user.username,
                TokenType::Refresh,
                refresh_ttl,
                &self.config.jwt_secret,
            )?,
            token_type: "bearer".to_string(),
            expires_in: access_ttl.num_seconds(),
            user,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn service(db: &Database) -> AuthService {
        AuthService::new(db.clone(), Arc::new(Config::default()))
    }

    pub fn register_request(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "super-secret-1".to_string(),
            full_name: None,
        }
    }

    /// Inscrit un utilisateur de test et renvoie son compte
    pub async fn registered_user(db: &Database, username: &str) -> User {
        service(db).register(register_request(username)).await.unwrap().user
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let db = Database::in_memory();
        let auth = service(&db);

        let tokens = auth.register(register_request("alice")).await.unwrap();
        assert_eq!(tokens.token_type, "bearer");
        assert_eq!(tokens.expires_in, 30 * 60);

        let login = auth
            .login(LoginRequest { username: "alice@example.com".into(), password: "super-secret-1".into() })
            .await
            .unwrap();
        assert!(login.user.last_login.is_some());

        let me = auth.user_from_token(&login.access_token).await.unwrap();
        assert_eq!(me.id, tokens.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let db = Database::in_memory();
        let auth = service(&db);
        auth.register(register_request("bob")).await.unwrap();

        let err = auth.register(register_request("bob")).await.unwrap_err();
        assert_eq!(err.client_message(), "Username already registered");

        let mut other = register_request("bobby");
        other.email = "BOB@example.com".into();
        let err = auth.register(other).await.unwrap_err();
        assert_eq!(err.client_message(), "Email already registered");
    }

    #[tokio::test]
    async fn test_invalid_registration_fields() {
        let db = Database::in_memory();
        let mut request = register_request("carol");
        request.username = "carol smith".into();
        request.password = "short".into();

        let err = service(&db).register(request).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let db = Database::in_memory();
        let auth = service(&db);
        auth.register(register_request("dave")).await.unwrap();

        let err = auth
            .login(LoginRequest { username: "dave".into(), password: "nope-nope".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(err.client_message(), "Incorrect username or password");
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let db = Database::in_memory();
        let auth = service(&db);
        let tokens = auth.register(register_request("erin")).await.unwrap();

        assert!(auth.refresh(&tokens.access_token).await.is_err());
        let renewed = auth.refresh(&tokens.refresh_token).await.unwrap();
        assert_eq!(renewed.user.id, tokens.user.id);
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_login() {
        let db = Database::in_memory();
        let auth = service(&db);
        let mut user = auth.register(register_request("frank")).await.unwrap().user;
        user.is_active = false;
        db.update_user(&user).await.unwrap();

        let err = auth
            .login(LoginRequest { username: "frank".into(), password: "super-secret-1".into() })
            .await
            .unwrap_err();
        assert_eq!(err.client_message(), "Inactive user");
    }

    #[tokio::test]
    async fn test_update_profile_checks_email() {
        let db = Database::in_memory();
        let auth = service(&db);
        auth.register(register_request("gina")).await.unwrap();
        let henry = auth.register(register_request("henry")).await.unwrap().user;

        let err = auth
            .update_profile(
                henry.clone(),
                UpdateUserRequest { email: Some("gina@example.com".into()), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert_eq!(err.client_message(), "Email already registered");

        let updated = auth
            .update_profile(
                henry,
                UpdateUserRequest {
                    full_name: Some("Henry H.".into()),
                    password: Some("another-secret".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Henry H."));
        auth.login(LoginRequest { username: "henry".into(), password: "another-secret".into() })
            .await
            .unwrap();
    }
}
