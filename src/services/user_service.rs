use futures::stream::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};

use crate::database::parse_id;
use crate::models::{OtpPurpose, UpdateProfileRequest, User, UserProfile};
use crate::services::auth_service::{
    find_by_email, new_otp, normalize_email, otp_expiry, save_user,
};
use crate::services::image_service::{UploadedFile, PROFILE_FOLDER};
use crate::services::mail_service::Mail;
use crate::state::AppState;
use crate::utils::AppError;

pub async fn list_users(state: &AppState) -> Result<Vec<UserProfile>, AppError> {
    let cursor = state
        .db
        .users()
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?;

    let users: Vec<User> = cursor.try_collect().await?;
    Ok(users.into_iter().map(UserProfile::from).collect())
}

async fn find_by_id(state: &AppState, user_id: &str) -> Result<User, AppError> {
    let id = parse_id(user_id)?;
    state
        .db
        .users()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn get_profile(state: &AppState, user_id: &str) -> Result<UserProfile, AppError> {
    Ok(UserProfile::from(find_by_id(state, user_id).await?))
}

/// Applies a profile update. A changed email or phone drops the verified
/// flag and sends a fresh OTP to the (new) address.
pub async fn update_profile(
    state: &AppState,
    user_id: &str,
    request: UpdateProfileRequest,
) -> Result<String, AppError> {
    let mut user = find_by_id(state, user_id).await?;

    if let Some(full_name) = request.new_full_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        user.full_name = full_name.to_string();
    }
    if let Some(age) = request.new_age {
        user.age = Some(age);
    }
    if let Some(source) = request.new_avt.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        user.avt = state.images.upload_source(source, PROFILE_FOLDER).await?;
    }

    let mut require_verification = false;

    if let Some(new_email) = request.new_email.as_deref().map(normalize_email).filter(|e| !e.is_empty()) {
        if new_email != user.email {
            if find_by_email(state, &new_email).await?.is_some() {
                return Err(AppError::Conflict("Email already in use".to_string()));
            }
            user.email = new_email;
            require_verification = true;
        }
    }

    if let Some(new_phone) = request.new_phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        if user.phone.as_deref() != Some(new_phone) {
            user.phone = Some(new_phone.to_string());
            require_verification = true;
        }
    }

    let pending_otp = if require_verification {
        let (otp, otp_hash) = new_otp(state.config.bcrypt_cost).await?;
        user.verified = false;
        user.issue_otp(otp_hash, OtpPurpose::Update, otp_expiry(state.config.otp_ttl_minutes));
        Some(otp)
    } else {
        None
    };

    user.updated_at = BsonDateTime::now();
    save_user(state, &user).await?;

    if let Some(otp) = pending_otp {
        // Delivery failure does not undo the update
        let mail = Mail::otp(&user.email, "OTP Verification for Profile Update", &otp);
        if let Err(e) = state.mailer.send(&mail).await {
            log::warn!("⚠️  Error sending OTP email during profile update: {}", e);
        }
    }

    log::info!("✅ Profile updated: {}", user.email);
    Ok(profile_update_message(require_verification))
}

pub fn profile_update_message(require_verification: bool) -> String {
    if require_verification {
        "Profile updated successfully. Please verify your email (OTP sent).".to_string()
    } else {
        "Profile updated successfully.".to_string()
    }
}

/// Uploads an avatar and stores its URL on the user.
pub async fn upload_avatar(
    state: &AppState,
    user_id: &str,
    file: UploadedFile,
) -> Result<String, AppError> {
    let id = parse_id(user_id)?;
    let url = state
        .images
        .upload(file.bytes, &file.content_type, PROFILE_FOLDER)
        .await?;

    let result = state
        .db
        .users()
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "avt": url.as_str(), "updatedAt": BsonDateTime::now() } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(url)
}
