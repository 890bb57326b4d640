use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Origins used by the Expo dev server and the web build.
const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://localhost:8081,http://localhost:19006";

const MAX_JWT_TTL_HOURS: i64 = 24 * 365;
const MAX_OTP_TTL_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_name: String,
    pub jwt: JwtConfig,
    pub otp_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// `DATABASE_URL` is the only required variable.
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        let database_name = env::var("DATABASE_NAME")
            .unwrap_or_else(|_| database_name_from_url(&database_url));

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("⚠️  JWT_SECRET not set, using an insecure development secret");
            "default-secret-change-me".to_string()
        });

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),
            database_url,
            database_name,
            jwt: JwtConfig {
                secret: jwt_secret,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "vfood-api".to_string()),
                audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "vfood-app".to_string()),
                ttl_hours: bounded(
                    "JWT_TTL_HOURS",
                    parse_or("JWT_TTL_HOURS", 24),
                    1,
                    MAX_JWT_TTL_HOURS,
                ),
            },
            otp_ttl_minutes: bounded(
                "OTP_TTL_MINUTES",
                parse_or("OTP_TTL_MINUTES", 10),
                1,
                MAX_OTP_TTL_MINUTES,
            ),
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            cors_origins: split_origins(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            cloudinary: cloudinary_from_env(),
            smtp: smtp_from_env(),
        })
    }
}

fn cloudinary_from_env() -> Option<CloudinaryConfig> {
    Some(CloudinaryConfig {
        cloud_name: env::var("CLOUDINARY_CLOUD_NAME").ok()?,
        api_key: env::var("CLOUDINARY_API_KEY").ok()?,
        api_secret: env::var("CLOUDINARY_API_SECRET").ok()?,
    })
}

fn smtp_from_env() -> Option<SmtpConfig> {
    let username = env::var("SMTP_USERNAME").ok()?;
    Some(SmtpConfig {
        host: env::var("SMTP_HOST").ok()?,
        port: parse_or("SMTP_PORT", 587),
        from_address: env::var("MAIL_FROM").unwrap_or_else(|_| username.clone()),
        password: env::var("SMTP_PASSWORD").ok()?,
        username,
    })
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            log::warn!("⚠️  Invalid {} value '{}': {}, using default {}", key, raw, e, default);
            default
        }),
        Err(_) => default,
    }
}

fn bounded(key: &str, value: i64, min: i64, max: i64) -> i64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("⚠️  {} value {} out of range, using {}", key, value, clamped);
    }
    clamped
}

/// Last path segment of a MongoDB URI, without query string.
fn database_name_from_url(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("VFood")
        .to_string()
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
impl Config {
    /// Configuration for tests that never touches the environment.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "mongodb://localhost:27017/vfood_test".to_string(),
            database_name: "vfood_test".to_string(),
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                issuer: "vfood-api".to_string(),
                audience: "vfood-app".to_string(),
                ttl_hours: 1,
            },
            otp_ttl_minutes: 10,
            bcrypt_cost: 4,
            cors_origins: split_origins(DEFAULT_CORS_ORIGINS),
            cloudinary: None,
            smtp: None,
        }
    }
}
