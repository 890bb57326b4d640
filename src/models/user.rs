use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::{crypto, error::AppError};

/// What an issued OTP unlocks once verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum OtpPurpose {
    Register,
    ResetPassword,
    Update,
}

/// User document (MongoDB collection `users`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub full_name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub phone: Option<String>,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    #[serde(default)]
    pub avt: String,
    /// bcrypt hash of the pending OTP, if any
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub otp_expires_at: Option<BsonDateTime>,
    #[serde(default)]
    pub otp_purpose: Option<OtpPurpose>,
    #[serde(default)]
    pub reset_authorized: bool,
    #[serde(default)]
    pub verified: bool,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl User {
    pub fn new(
        full_name: String,
        age: Option<u32>,
        phone: Option<String>,
        email: String,
        password_hash: String,
        avt: String,
    ) -> Self {
        let now = BsonDateTime::now();
        Self {
            id: None,
            full_name,
            age,
            phone,
            email,
            password: password_hash,
            avt,
            otp: None,
            otp_expires_at: None,
            otp_purpose: None,
            reset_authorized: false,
            verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stores a freshly hashed OTP. Any earlier pending code is replaced.
    pub fn issue_otp(&mut self, otp_hash: String, purpose: OtpPurpose, expires_at: BsonDateTime) {
        self.otp = Some(otp_hash);
        self.otp_expires_at = Some(expires_at);
        self.otp_purpose = Some(purpose);
        self.updated_at = BsonDateTime::now();
    }

    /// Checks `code` against the pending OTP and, on match, marks the user verified.
    ///
    /// On any failure the record is left untouched.
    pub fn confirm_otp(&mut self, code: &str, now: BsonDateTime) -> Result<OtpPurpose, AppError> {
        let stored = self
            .otp
            .as_deref()
            .ok_or_else(|| AppError::InvalidRequest("Invalid OTP".to_string()))?;

        if let Some(expires_at) = self.otp_expires_at {
            if now > expires_at {
                return Err(AppError::InvalidRequest("OTP expired".to_string()));
            }
        }

        if !crypto::verify_secret(code.trim(), stored) {
            return Err(AppError::InvalidRequest("Invalid OTP".to_string()));
        }

        let purpose = self.otp_purpose.unwrap_or(OtpPurpose::Register);
        self.verified = true;
        self.otp = None;
        self.otp_expires_at = None;
        self.otp_purpose = None;
        if purpose == OtpPurpose::ResetPassword {
            self.reset_authorized = true;
        }
        self.updated_at = now;

        Ok(purpose)
    }

    /// Credential check used by login. Wrong password and unverified account
    /// are distinct failures; unknown email is handled by the caller.
    pub fn check_login(&self, password: &str) -> Result<(), AppError> {
        if !crypto::verify_secret(password, &self.password) {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
        if !self.verified {
            return Err(AppError::Forbidden(
                "User not verified. Please verify your account.".to_string(),
            ));
        }
        Ok(())
    }

    /// Consumes a reset authorization granted by a reset-purpose OTP.
    pub fn reset_password(&mut self, new_password_hash: String) -> Result<(), AppError> {
        if !self.verified || !self.reset_authorized {
            return Err(AppError::InvalidRequest("User not verified".to_string()));
        }
        self.password = new_password_hash;
        self.reset_authorized = false;
        self.updated_at = BsonDateTime::now();
        Ok(())
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub age: Option<u32>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Image URL or data URI uploaded to the profile folder
    pub avt: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    #[serde(default)]
    pub purpose: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub new_full_name: Option<String>,
    pub new_age: Option<u32>,
    pub new_phone: Option<String>,
    pub new_email: Option<String>,
    pub new_avt: Option<String>,
}

/// Public view of a user: never carries password or OTP.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub age: Option<u32>,
    pub phone: Option<String>,
    pub email: String,
    pub avt: String,
    pub verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        UserProfile {
            id: u.id.map(|id| id.to_hex()).unwrap_or_default(),
            full_name: u.full_name,
            age: u.age,
            phone: u.phone,
            email: u.email,
            avt: u.avt,
            verified: u.verified,
            created_at: u.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: u.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}
