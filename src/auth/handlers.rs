use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::info;

use crate::auth::service::{
    ForgotPasswordInput, LoginInput, LogoutInput, RefreshInput, RegisterInput, ResetPasswordInput,
};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutBody {
    pub refresh_token: Option<String>,
}

/// Registers the auth routes under `/api/v1/auth`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/forgot-password", web::post().to(forgot_password))
            .route("/reset-password", web::post().to(reset_password))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me)),
    );
}

// Get token from Authorization header
fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("No authorization token provided".into()))
}

pub async fn register(
    req: web::Json<RegisterInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for email: {}", req.email);
    let session = state.auth.register(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(session))
}

pub async fn login(
    req: web::Json<LoginInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);
    let session = state.auth.login(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session))
}

pub async fn forgot_password(
    req: web::Json<ForgotPasswordInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.auth.forgot_password(req.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": state.auth.forgot_password_response_message()
    })))
}

pub async fn reset_password(
    req: web::Json<ResetPasswordInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.auth.reset_password(req.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password reset successfully"
    })))
}

pub async fn refresh(
    req: web::Json<RefreshInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let tokens = state.auth.refresh(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

pub async fn logout(
    req: HttpRequest,
    body: Option<web::Json<LogoutBody>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)?;
    let payload = state.tokens.verify_access_token(token)?;

    let refresh_token = body.and_then(|b| b.into_inner().refresh_token);
    state
        .auth
        .logout(LogoutInput {
            user_id: payload.sub,
            refresh_token,
        })
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully logged out"
    })))
}

pub async fn me(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)?;
    let payload = state.tokens.verify_access_token(token)?;

    let user = state.auth.get_me(payload.sub).await?;
    Ok(HttpResponse::Ok().json(user))
}
