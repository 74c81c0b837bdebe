use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(thiserror::Error, Debug)]
pub enum PasswordError {
    #[error("Failed to generate salt")]
    RandomFailed,

    #[error("Invalid password hash format")]
    InvalidFormat,
}

/// Hashes a password with a random salt.
///
/// Format: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt).map_err(|_| PasswordError::RandomFailed)?;

    let iterations = NonZeroU32::new(ITERATIONS).ok_or(PasswordError::InvalidFormat)?;
    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(ALGORITHM, iterations, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        ITERATIONS,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Checks a password against a hash produced by `hash_password`.
///
/// Returns `Ok(false)` on mismatch and an error only if the stored hash is malformed.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let mut parts = stored.split('$');
    let (scheme, iterations, salt, hash) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(s), Some(i), Some(salt), Some(hash), None) => (s, i, salt, hash),
        _ => return Err(PasswordError::InvalidFormat),
    };

    if scheme != SCHEME {
        return Err(PasswordError::InvalidFormat);
    }

    let iterations = iterations
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(PasswordError::InvalidFormat)?;
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| PasswordError::InvalidFormat)?;
    let hash = STANDARD_NO_PAD
        .decode(hash)
        .map_err(|_| PasswordError::InvalidFormat)?;

    Ok(pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("pbkdf2-sha256$100000$"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let h1 = hash_password("same").unwrap();
        let h2 = hash_password("same").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_malformed_hash() {
        assert!(verify_password("x", "plaintext").is_err());
        assert!(verify_password("x", "bcrypt$1$a$b").is_err());
        assert!(verify_password("x", "pbkdf2-sha256$0$AAAA$AAAA").is_err());
    }
}
