use actix_web::{web, HttpResponse};

use crate::api::message;
use crate::models::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest,
    VerifyOtpRequest,
};
use crate::services::auth_service;
use crate::state::AppState;
use crate::utils::AppError;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created, OTP sent to email"),
        (status = 400, description = "Missing required field"),
        (status = 409, description = "User already exists"),
        (status = 500, description = "Error sending email")
    )
)]
pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let email = request.email.clone().unwrap_or_default();
    log::info!("📝 POST /api/auth/register - email: {}", email);

    match auth_service::register(&state, request.into_inner()).await {
        Ok(text) => Ok(message(text)),
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "User not verified")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let email = request.email.clone();
    log::info!("🔐 POST /api/auth/login - email: {}", email);

    match auth_service::login(&state, request.into_inner()).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "OTP sent to email"),
        (status = 404, description = "User not found")
    )
)]
pub async fn forgot_password(
    state: web::Data<AppState>,
    request: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔑 POST /api/auth/forgot-password - email: {}", request.email);
    auth_service::forgot_password(&state, request.into_inner())
        .await
        .map(message)
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    tag = "Auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP verified"),
        (status = 400, description = "Invalid or expired OTP")
    )
)]
pub async fn verify_otp(
    state: web::Data<AppState>,
    request: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse, AppError> {
    let email = request.email.clone();
    log::info!("✓ POST /api/auth/verify-otp - email: {}", email);

    match auth_service::verify_otp(&state, request.into_inner()).await {
        Ok(text) => Ok(message(text)),
        Err(e) => {
            log::warn!("❌ OTP verification failed: {} - {}", email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset successful"),
        (status = 400, description = "User not verified")
    )
)]
pub async fn reset_password(
    state: web::Data<AppState>,
    request: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔑 POST /api/auth/reset-password - email: {}", request.email);
    auth_service::reset_password(&state, request.into_inner())
        .await
        .map(message)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/forgot-password", web::post().to(forgot_password))
            .route("/verify-otp", web::post().to(verify_otp))
            .route("/reset-password", web::post().to(reset_password)),
    );
}
