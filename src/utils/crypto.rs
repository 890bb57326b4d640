use crate::utils::error::AppError;
use rand::Rng;

/// Hashes a password or OTP with a per-call random salt.
pub fn hash_secret(secret: &str, cost: u32) -> Result<String, AppError> {
    Ok(bcrypt::hash(secret, cost)?)
}

/// Compares a candidate against a stored bcrypt hash. A malformed stored
/// hash counts as a mismatch.
pub fn verify_secret(candidate: &str, stored_hash: &str) -> bool {
    match bcrypt::verify(candidate, stored_hash) {
        Ok(valid) => valid,
        Err(e) => {
            log::warn!("⚠️  Stored hash could not be parsed: {}", e);
            false
        }
    }
}

/// Generates a 6-digit numeric OTP.
pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}
