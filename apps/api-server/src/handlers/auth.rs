//! Authentication handlers.

use actix_web::{HttpResponse, web};
use std::sync::Arc;

use quill_core::domain::User;
use quill_core::ports::{PasswordService, TokenService};
use quill_core::validation::validate_registration;
use quill_shared::ApiResponse;
use quill_shared::dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    validate_registration(&req.username, &req.email, &req.password)
        .map_err(AppError::Validation)?;

    // Check for existing accounts
    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }
    if state.users.find_by_username(&req.username).await?.is_some() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    // Hash password
    let password_hash = password_service
        .hash(&req.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    // Create user
    let user = User::new(req.username, req.email, password_hash);
    let saved = state.users.insert(user).await?;
    tracing::info!(username = %saved.username, "User registered");

    // Generate token
    let token = token_service
        .generate_token(saved.id, &saved.username, saved.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: token_service.expiration_seconds() as u64,
    })))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    // Find user by email
    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    // Verify password
    let valid = password_service
        .verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::Unauthorized);
    }

    // Generate token
    let token = token_service
        .generate_token(user.id, &user.username, user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: token_service.expiration_seconds() as u64,
    })))
}

/// GET /api/auth/me - Protected route
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(UserResponse::from(&user))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use quill_infra::auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
    use serde_json::Value;

    fn services() -> (
        web::Data<Arc<dyn TokenService>>,
        web::Data<Arc<dyn PasswordService>>,
    ) {
        let token: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
            issuer: "test".to_string(),
        }));
        let password: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
        (web::Data::new(token), web::Data::new(password))
    }

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_rt::test]
    async fn register_then_login() {
        let state = web::Data::new(AppState::in_memory());
        let (token, password) = services();

        let registered = register(
            state.clone(),
            token.clone(),
            password.clone(),
            web::Json(RegisterRequest {
                username: "writer".to_string(),
                email: "writer@example.com".to_string(),
                password: "hunter22".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(registered.status(), StatusCode::CREATED);

        let logged_in = login(
            state,
            token,
            password,
            web::Json(LoginRequest {
                email: "writer@example.com".to_string(),
                password: "hunter22".to_string(),
            }),
        )
        .await
        .unwrap();

        let body = body_json(logged_in).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["token_type"], "Bearer");
        assert!(!body["data"]["access_token"].as_str().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn register_rejects_duplicate_email() {
        let state = web::Data::new(AppState::in_memory());
        let (token, password) = services();
        let request = RegisterRequest {
            username: "writer".to_string(),
            email: "writer@example.com".to_string(),
            password: "hunter22".to_string(),
        };

        register(
            state.clone(),
            token.clone(),
            password.clone(),
            web::Json(request.clone()),
        )
        .await
        .unwrap();

        let err = register(state, token, password, web::Json(request))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[actix_rt::test]
    async fn register_reports_every_invalid_field() {
        let state = web::Data::new(AppState::in_memory());
        let (token, password) = services();

        let err = register(
            state,
            token,
            password,
            web::Json(RegisterRequest {
                username: "x".to_string(),
                email: "nope".to_string(),
                password: "tiny".to_string(),
            }),
        )
        .await
        .unwrap_err();

        match err {
            AppError::Validation(violations) => assert_eq!(violations.len(), 3),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[actix_rt::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let state = web::Data::new(AppState::in_memory());
        let (token, password) = services();

        register(
            state.clone(),
            token.clone(),
            password.clone(),
            web::Json(RegisterRequest {
                username: "writer".to_string(),
                email: "writer@example.com".to_string(),
                password: "hunter22".to_string(),
            }),
        )
        .await
        .unwrap();

        let err = login(
            state,
            token,
            password,
            web::Json(LoginRequest {
                email: "writer@example.com".to_string(),
                password: "wrong".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized));
    }
}
