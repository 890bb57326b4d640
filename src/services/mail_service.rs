use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    pub fn otp(to: &str, subject: &str, otp: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: subject.to_string(),
            body: format!("Your OTP is {}", otp),
        }
    }
}

/// Email delivery. `Ok(())` means the provider accepted the message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &Mail) -> Result<(), AppError>;
}

/// SMTP over STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let from = config.from_address.parse::<Mailbox>().map_err(|e| {
            AppError::Internal(format!("Invalid sender '{}': {}", config.from_address, e))
        })?;

        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Internal(format!("Invalid SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &Mail) -> Result<(), AppError> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .map_err(|_| AppError::InvalidRequest(format!("Invalid email address: {}", mail.to)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| AppError::Internal(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::UpstreamError(format!("SMTP error: {}", e)))?;

        log::info!("📧 Email sent to {} ({})", mail.to, mail.subject);
        Ok(())
    }
}

/// Development mailer: logs instead of delivering.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &Mail) -> Result<(), AppError> {
        log::warn!(
            "📧 SMTP not configured, mail to {} not delivered: {} / {}",
            mail.to,
            mail.subject,
            mail.body
        );
        Ok(())
    }
}
