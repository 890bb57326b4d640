use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::database::is_duplicate_key;
use crate::models::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, OtpPurpose, RegisterRequest,
    ResetPasswordRequest, User, UserProfile, VerifyOtpRequest,
};
use crate::services::image_service::PROFILE_FOLDER;
use crate::services::mail_service::Mail;
use crate::state::AppState;
use crate::utils::{crypto, spawn_crypto_blocking, AppError};

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user _id (hex)
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

pub fn generate_jwt(user: &User, config: &JwtConfig) -> Result<String, AppError> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::Internal("Cannot issue a token for an unsaved user".into()))?;
    let now = Utc::now();
    let exp = Duration::try_hours(config.ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal("Token lifetime out of range".into()))?;

    let claims = Claims {
        sub: user_id.to_hex(),
        email: user.email.clone(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: config.audience.clone(),
        iss: config.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

pub fn verify_token(token: &str, config: &JwtConfig) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.audience.clone()]);

    let mut issuers = HashSet::new();
    issuers.insert(config.issuer.clone());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Emails are matched case-insensitively by storing them lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn required(value: Option<&str>, message: &str) -> Result<String, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| AppError::InvalidRequest(message.to_string()))
}

/// Like [`required`] but keeps surrounding whitespace: passwords are hashed
/// and compared exactly as sent.
pub(crate) fn required_secret(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::InvalidRequest(message.to_string()))
}

pub(crate) fn otp_expiry(ttl_minutes: i64) -> BsonDateTime {
    BsonDateTime::from_millis(
        BsonDateTime::now()
            .timestamp_millis()
            .saturating_add(ttl_minutes.saturating_mul(60_000)),
    )
}

/// Generates an OTP and hashes it off the async workers.
/// Returns `(plain, hash)`; only the hash is ever stored.
pub(crate) async fn new_otp(cost: u32) -> Result<(String, String), AppError> {
    let otp = crypto::generate_otp();
    let plain = otp.clone();
    let hash = spawn_crypto_blocking(move || crypto::hash_secret(&otp, cost)).await?;
    Ok((plain, hash))
}

pub(crate) async fn find_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    Ok(state
        .db
        .users()
        .find_one(doc! { "email": normalize_email(email) })
        .await?)
}

pub(crate) async fn save_user(state: &AppState, user: &User) -> Result<(), AppError> {
    let id = user
        .id
        .ok_or_else(|| AppError::Internal("Cannot save a user without _id".into()))?;

    state
        .db
        .users()
        .replace_one(doc! { "_id": id }, user)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict("Email already in use".to_string())
            } else {
                AppError::from(e)
            }
        })?;
    Ok(())
}

// User registration
pub async fn register(state: &AppState, request: RegisterRequest) -> Result<String, AppError> {
    let full_name = required(request.full_name.as_deref(), "Full name is required")?;
    let email = normalize_email(&required(request.email.as_deref(), "Email is required")?);
    let password = required_secret(request.password, "Password is required")?;

    if find_by_email(state, &email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let avt = match request.avt.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(source) => state.images.upload_source(source, PROFILE_FOLDER).await?,
        None => String::new(),
    };

    let cost = state.config.bcrypt_cost;
    let password_hash = spawn_crypto_blocking(move || crypto::hash_secret(&password, cost)).await?;
    let (otp, otp_hash) = new_otp(cost).await?;

    let mut user = User::new(full_name, request.age, request.phone, email.clone(), password_hash, avt);
    user.issue_otp(otp_hash, OtpPurpose::Register, otp_expiry(state.config.otp_ttl_minutes));

    state.db.users().insert_one(&user).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict("User already exists".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    log::info!("✅ User registered (unverified): {}", email);

    state
        .mailer
        .send(&Mail::otp(&email, "OTP Verification", &otp))
        .await
        .map_err(|e| {
            log::error!("❌ Failed to send registration OTP to {}: {}", email, e);
            AppError::UpstreamError("Error sending email".to_string())
        })?;

    Ok("OTP sent to email".to_string())
}

// User login
pub async fn login(state: &AppState, request: LoginRequest) -> Result<LoginResponse, AppError> {
    let user = find_by_email(state, &request.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let password = request.password;
    let user = spawn_crypto_blocking(move || {
        user.check_login(&password)?;
        Ok(user)
    })
    .await?;

    let token = generate_jwt(&user, &state.config.jwt)?;

    Ok(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: UserProfile::from(user),
    })
}

// Forgot password: issues a reset OTP
pub async fn forgot_password(
    state: &AppState,
    request: ForgotPasswordRequest,
) -> Result<String, AppError> {
    let mut user = find_by_email(state, &request.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let (otp, otp_hash) = new_otp(state.config.bcrypt_cost).await?;
    user.issue_otp(otp_hash, OtpPurpose::ResetPassword, otp_expiry(state.config.otp_ttl_minutes));
    save_user(state, &user).await?;

    state
        .mailer
        .send(&Mail::otp(&user.email, "OTP Verification", &otp))
        .await
        .map_err(|e| {
            log::error!("❌ Failed to send reset OTP to {}: {}", user.email, e);
            AppError::UpstreamError("Error sending email".to_string())
        })?;

    log::info!("🔑 Password reset OTP issued: {}", user.email);
    Ok("OTP sent to email".to_string())
}

/// Message for a successful verification, by the purpose the client sent.
pub fn verified_message(purpose: Option<&str>) -> &'static str {
    match purpose {
        Some("register") => "User verified and registered",
        Some("resetPassword") => "User verified for password reset",
        Some("update") => "User email/phone verified after update",
        _ => "OTP verified successfully",
    }
}

pub async fn verify_otp(state: &AppState, request: VerifyOtpRequest) -> Result<String, AppError> {
    let user = find_by_email(state, &request.email)
        .await?
        .ok_or_else(|| AppError::InvalidRequest("Invalid OTP".to_string()))?;

    let code = request.otp;
    let now = BsonDateTime::now();
    let (user, issued_for) = spawn_crypto_blocking(move || {
        let mut user = user;
        let issued_for = user.confirm_otp(&code, now)?;
        Ok((user, issued_for))
    })
    .await?;

    save_user(state, &user).await?;

    log::info!("✅ OTP verified for {} ({:?})", user.email, issued_for);
    Ok(verified_message(request.purpose.as_deref()).to_string())
}

pub async fn reset_password(
    state: &AppState,
    request: ResetPasswordRequest,
) -> Result<String, AppError> {
    let new_password = required_secret(Some(request.new_password), "New password is required")?;

    let mut user = find_by_email(state, &request.email)
        .await?
        .ok_or_else(|| AppError::InvalidRequest("User not verified".to_string()))?;

    if !user.verified || !user.reset_authorized {
        return Err(AppError::InvalidRequest("User not verified".to_string()));
    }

    let cost = state.config.bcrypt_cost;
    let password_hash =
        spawn_crypto_blocking(move || crypto::hash_secret(&new_password, cost)).await?;
    user.reset_password(password_hash)?;
    save_user(state, &user).await?;

    log::info!("🔑 Password reset: {}", user.email);
    Ok("Password reset successful".to_string())
}
