use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::CloudinaryConfig;
use crate::utils::error::AppError;

pub const PROFILE_FOLDER: &str = "VFood/Profile";
pub const CATEGORY_FOLDER: &str = "VFood/Category";
pub const PRODUCT_FOLDER: &str = "VFood/Product";

/// A file part received in a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Third-party image host. Every upload resolves to a public URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Uploads raw file bytes (e.g. a multipart part) into `folder`.
    async fn upload(&self, bytes: Vec<u8>, content_type: &str, folder: &str)
        -> Result<String, AppError>;

    /// Uploads from a remote URL or a data URI.
    async fn upload_source(&self, source: &str, folder: &str) -> Result<String, AppError>;
}

pub fn to_data_uri(bytes: &[u8], content_type: &str) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

// ==================== CLOUDINARY ====================

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: Option<String>,
    error: Option<CloudinaryErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

/// Signed uploads against the Cloudinary Upload API.
///
/// Signatures use SHA-256, so the Cloudinary product environment must have
/// its signature algorithm set to SHA-256.
pub struct CloudinaryImageHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryImageHost {
    pub fn new(config: CloudinaryConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        )
    }
}

/// Cloudinary signature: the signed params sorted by name, joined as
/// `k=v&k=v`, with the API secret appended, hashed and hex encoded.
pub fn sign_upload(folder: &str, timestamp: i64, api_secret: &str) -> String {
    let to_sign = format!("folder={}&timestamp={}{}", folder, timestamp, api_secret);
    hex::encode(Sha256::digest(to_sign.as_bytes()))
}

#[async_trait]
impl ImageHost for CloudinaryImageHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        folder: &str,
    ) -> Result<String, AppError> {
        self.upload_source(&to_data_uri(&bytes, content_type), folder).await
    }

    async fn upload_source(&self, source: &str, folder: &str) -> Result<String, AppError> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign_upload(folder, timestamp, &self.config.api_secret);
        let timestamp = timestamp.to_string();

        let form = [
            ("file", source),
            ("folder", folder),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("signature", signature.as_str()),
        ];

        let response = self.client.post(self.upload_url()).form(&form).send().await?;
        let status = response.status();
        let body: CloudinaryUploadResponse = response.json().await?;

        match (body.secure_url, body.error) {
            (Some(url), _) if status.is_success() => {
                log::info!("🖼️  Image uploaded to {}", folder);
                Ok(url)
            }
            (_, Some(err)) => Err(AppError::UpstreamError(format!(
                "Image upload failed: {}",
                err.message
            ))),
            _ => Err(AppError::UpstreamError(format!(
                "Image upload failed with status {}",
                status
            ))),
        }
    }
}

// ==================== INLINE (no Cloudinary) ====================

/// Fallback used when no image host is configured: files become data URIs
/// and remote sources are kept as given.
pub struct InlineImageHost;

#[async_trait]
impl ImageHost for InlineImageHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        folder: &str,
    ) -> Result<String, AppError> {
        log::debug!("Inlining {} bytes for {}", bytes.len(), folder);
        Ok(to_data_uri(&bytes, content_type))
    }

    async fn upload_source(&self, source: &str, _folder: &str) -> Result<String, AppError> {
        Ok(source.to_string())
    }
}
