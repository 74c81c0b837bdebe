use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, Rng};
use ring::hmac;
use secrecy::{ExposeSecret, Secret};
use sqlx::PgConnection;

use crate::models::email_verification::{EmailVerification, OtpPurpose};

/// Codes stay valid for ten minutes.
pub const OTP_TTL_MINUTES: i64 = 10;
/// Wrong codes allowed before a code is burned.
pub const MAX_ATTEMPTS: i32 = 5;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum OtpError {
    #[error("Invalid or expired OTP")]
    NotFound,

    #[error("OTP has expired")]
    Expired,

    #[error("OTP has already been used")]
    AlreadyUsed,

    #[error("Too many failed attempts, request a new code")]
    TooManyAttempts,

    #[error("Invalid OTP")]
    Mismatch,
}

/// Generates a zero-padded 6-digit numeric code.
pub fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:06}", n)
}

pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(OTP_TTL_MINUTES)
}

/// Keyed hash of OTP codes so plaintext codes are never stored.
#[derive(Clone)]
pub struct OtpHasher {
    key: hmac::Key,
}

impl OtpHasher {
    pub fn new(secret: &Secret<String>) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.expose_secret().as_bytes()),
        }
    }

    fn message(email: &str, purpose: OtpPurpose, code: &str) -> Vec<u8> {
        format!("{}\n{}\n{}", email, purpose.as_str(), code).into_bytes()
    }

    /// Hex-encoded HMAC-SHA256 of the code bound to its email and purpose.
    pub fn hash(&self, email: &str, purpose: OtpPurpose, code: &str) -> String {
        let tag = hmac::sign(&self.key, &Self::message(email, purpose, code));
        hex::encode(tag.as_ref())
    }

    /// Constant-time comparison against a stored hash.
    pub fn matches(&self, email: &str, purpose: OtpPurpose, code: &str, stored_hash: &str) -> bool {
        match hex::decode(stored_hash) {
            Ok(tag) => hmac::verify(&self.key, &Self::message(email, purpose, code), &tag).is_ok(),
            Err(_) => false,
        }
    }
}

/// Checks a submitted code against the latest verification row for the email.
///
/// Order matters: a used or expired row is rejected before the code is compared,
/// so a correct code cannot revive it.
pub fn check_code(
    hasher: &OtpHasher,
    record: &EmailVerification,
    code: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    if record.used {
        return Err(OtpError::AlreadyUsed);
    }
    if record.expires_at < now {
        return Err(OtpError::Expired);
    }
    if record.attempts >= MAX_ATTEMPTS {
        return Err(OtpError::TooManyAttempts);
    }

    let purpose = record.purpose().ok_or(OtpError::NotFound)?;
    if !hasher.matches(&record.email, purpose, code.trim(), &record.otp_hash) {
        return Err(OtpError::Mismatch);
    }

    Ok(())
}

/// Checks a code against the latest row for (email, purpose) and consumes it on success.
///
/// Runs inside the caller's transaction. The outer error is a database failure;
/// the inner one is a rejected code. Only a wrong code on a live row counts as an
/// attempt, so the caller should commit even when the code was rejected.
pub async fn verify_and_consume(
    conn: &mut PgConnection,
    hasher: &OtpHasher,
    email: &str,
    purpose: OtpPurpose,
    code: &str,
) -> Result<Result<(), OtpError>, sqlx::Error> {
    let record = match EmailVerification::find_latest_for_update(&mut *conn, email, purpose).await? {
        Some(record) => record,
        None => return Ok(Err(OtpError::NotFound)),
    };

    match check_code(hasher, &record, code, Utc::now()) {
        Ok(()) => {
            EmailVerification::consume(&mut *conn, record.id).await?;
            Ok(Ok(()))
        }
        Err(OtpError::Mismatch) => {
            EmailVerification::increment_attempts(&mut *conn, record.id).await?;
            tracing::debug!(email = %email, attempts = record.attempts + 1, "OTP mismatch");
            Ok(Err(OtpError::Mismatch))
        }
        Err(e) => Ok(Err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn hasher() -> OtpHasher {
        OtpHasher::new(&Secret::new("otp-test-secret".to_string()))
    }

    fn record(hasher: &OtpHasher, code: &str, now: DateTime<Utc>) -> EmailVerification {
        EmailVerification {
            id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            purpose: OtpPurpose::EmailVerification.as_str().to_string(),
            otp_hash: hasher.hash("jane@example.com", OtpPurpose::EmailVerification, code),
            attempts: 0,
            used: false,
            verified: false,
            expires_at: expiry_from(now),
            created_at: now,
            used_at: None,
        }
    }

    #[test]
    fn test_generate_code_shape() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_hash_is_not_plaintext_and_is_bound_to_purpose() {
        let h = hasher();
        let hash = h.hash("jane@example.com", OtpPurpose::EmailVerification, "123456");
        assert!(!hash.contains("123456"));
        assert!(h.matches("jane@example.com", OtpPurpose::EmailVerification, "123456", &hash));
        assert!(!h.matches("jane@example.com", OtpPurpose::PasswordReset, "123456", &hash));
        assert!(!h.matches("john@example.com", OtpPurpose::EmailVerification, "123456", &hash));
        assert!(!h.matches("jane@example.com", OtpPurpose::EmailVerification, "123456", "zz"));
    }

    #[test]
    fn test_valid_code_accepted() {
        let h = hasher();
        let now = Utc::now();
        let rec = record(&h, "042042", now);
        assert_eq!(check_code(&h, &rec, "042042", now), Ok(()));
        assert_eq!(check_code(&h, &rec, " 042042 ", now), Ok(()));
    }

    #[test]
    fn test_wrong_code_rejected() {
        let h = hasher();
        let now = Utc::now();
        let rec = record(&h, "042042", now);
        assert_eq!(check_code(&h, &rec, "111111", now), Err(OtpError::Mismatch));
    }

    #[test]
    fn test_expired_code_rejected() {
        let h = hasher();
        let now = Utc::now();
        let rec = record(&h, "042042", now);
        let later = now + Duration::minutes(OTP_TTL_MINUTES) + Duration::seconds(1);
        assert_eq!(check_code(&h, &rec, "042042", later), Err(OtpError::Expired));
    }

    #[test]
    fn test_used_code_rejected() {
        let h = hasher();
        let now = Utc::now();
        let mut rec = record(&h, "042042", now);
        rec.used = true;
        assert_eq!(check_code(&h, &rec, "042042", now), Err(OtpError::AlreadyUsed));
    }

    #[test]
    fn test_attempt_limit() {
        let h = hasher();
        let now = Utc::now();
        let mut rec = record(&h, "042042", now);
        rec.attempts = MAX_ATTEMPTS;
        assert_eq!(
            check_code(&h, &rec, "042042", now),
            Err(OtpError::TooManyAttempts)
        );
    }
}
