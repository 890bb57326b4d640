use std::sync::Arc;

use crate::config::Config;
use crate::database::MongoDB;
use crate::services::image_service::{CloudinaryImageHost, ImageHost, InlineImageHost};
use crate::services::mail_service::{LogMailer, Mailer, SmtpMailer};
use crate::utils::error::AppError;

/// Shared, read-only state handed to every handler through `web::Data`.
pub struct AppState {
    pub db: MongoDB,
    pub config: Config,
    pub images: Arc<dyn ImageHost>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: MongoDB, config: Config) -> Result<Self, AppError> {
        let images: Arc<dyn ImageHost> = match &config.cloudinary {
            Some(cloudinary) => {
                log::info!("🖼️  Image host: Cloudinary ({})", cloudinary.cloud_name);
                Arc::new(CloudinaryImageHost::new(cloudinary.clone())?)
            }
            None => {
                log::warn!("⚠️  CLOUDINARY_* not set, images will be stored inline");
                Arc::new(InlineImageHost)
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => {
                log::info!("📧 Mailer: SMTP via {}:{}", smtp.host, smtp.port);
                Arc::new(SmtpMailer::new(smtp)?)
            }
            None => {
                log::warn!("⚠️  SMTP_* not set, OTP emails will only be logged");
                Arc::new(LogMailer)
            }
        };

        Ok(Self {
            db,
            config,
            images,
            mailer,
        })
    }

    /// State with explicit collaborators, for tests that swap them out.
    #[cfg(test)]
    pub fn with_collaborators(
        db: MongoDB,
        config: Config,
        images: Arc<dyn ImageHost>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            config,
            images,
            mailer,
        }
    }
}
