//! Routes d'authentification : inscription, connexion, renouvellement et profil

use actix_web::{get, post, put, web, Either, HttpResponse};

use crate::api::routes::middleware::CurrentUser;
use crate::api::{response, AppState};
use crate::core::auth_service::{LoginRequest, RefreshRequest, RegisterRequest, UpdateUserRequest};
use crate::core::AuthService;
use crate::infrastructure::error::AppResult;

fn service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), state.config.clone())
}

#[post("/auth/register")]
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let tokens = service(&state).register(payload.into_inner()).await?;
    Ok(response::created("User registered successfully", tokens))
}

/// Connexion en JSON ou en formulaire OAuth2 (`username`, `password`)
#[post("/auth/login")]
pub async fn login(
    state: web::Data<AppState>,
    payload: Either<web::Json<LoginRequest>, web::Form<LoginRequest>>,
) -> AppResult<HttpResponse> {
    let credentials = match payload {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };
    let tokens = service(&state).login(credentials).await?;
    Ok(response::ok(tokens))
}

#[post("/auth/refresh")]
pub async fn refresh(
    state: web::Data<AppState>,
    payload: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    let tokens = service(&state).refresh(&payload.refresh_token).await?;
    Ok(response::ok(tokens))
}

#[get("/users/me")]
pub async fn me(CurrentUser(user): CurrentUser) -> AppResult<HttpResponse> {
    Ok(response::ok(user))
}

#[put("/users/me")]
pub async fn update_me(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<UpdateUserRequest>,
) -> AppResult<HttpResponse> {
    let user = service(&state).update_profile(user, payload.into_inner()).await?;
    Ok(response::ok(user))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(refresh)
        .service(me)
        .service(update_me);
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{bearer_for, json_body, test_state};
    use crate::api;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;

    #[actix_web::test]
    async fn test_register_login_and_me() {
        let state = test_state();
        let app = test::init_service(App::new().configure(|cfg| api::configure_app(cfg, state.clone()))).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({"username": "alice", "email": "alice@example.com", "password": "super-secret-1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["token_type"], "bearer");
        assert!(body["data"]["user"].get("hashed_password").is_none());

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_form([("username", "alice"), ("password", "super-secret-1")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let token = json_body(resp).await["data"]["access_token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/v1/users/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["data"]["username"], "alice");
    }

    #[actix_web::test]
    async fn test_bad_credentials_and_missing_auth() {
        let state = test_state();
        bearer_for(&state, "bob").await;
        let app = test::init_service(App::new().configure(|cfg| api::configure_app(cfg, state.clone()))).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({"username": "bob", "password": "wrong-password"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["message"], "Incorrect username or password");

        let req = test::TestRequest::get().uri("/api/v1/users/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_duplicate_register_and_validation() {
        let state = test_state();
        bearer_for(&state, "carol").await;
        let app = test::init_service(App::new().configure(|cfg| api::configure_app(cfg, state.clone()))).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({"username": "carol", "email": "other@example.com", "password": "super-secret-1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({"username": "d", "email": "not-an-email", "password": "x"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(resp).await;
        assert!(body["errors"][0]["details"].get("email").is_some());
    }
}
